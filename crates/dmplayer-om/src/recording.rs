//! In-process measurement backend
//!
//! `RecordingSdk` implements the measurement traits by appending every call
//! to a shared journal. Individual calls can be made to fail, which is how
//! error isolation is exercised without a native library.

use crate::sdk::*;
use crate::types::SessionId;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// A measurement call as seen by the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SdkCall {
    Activate,
    CreateSession {
        partner: String,
        version: String,
        vendors: Vec<String>,
        content_url: Option<String>,
    },
    RegisterAdView {
        view_id: String,
    },
    SessionStart,
    SessionFinish,
    SessionError {
        error_type: ErrorType,
        message: String,
    },
    ImpressionOccurred,
    Loaded {
        properties: VastProperties,
    },
    Start {
        duration: f32,
        player_volume: f32,
    },
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    Complete,
    Skipped,
    Pause,
    Resume,
    BufferStart,
    BufferFinish,
    AdUserInteraction {
        interaction: InteractionType,
    },
    VolumeChange {
        volume: f32,
    },
    PlayerStateChange {
        state: PlayerState,
    },
}

impl SdkCall {
    /// Stable call name, also used to select calls for fault injection
    pub fn name(&self) -> &'static str {
        match self {
            SdkCall::Activate => "activate",
            SdkCall::CreateSession { .. } => "create_session",
            SdkCall::RegisterAdView { .. } => "register_ad_view",
            SdkCall::SessionStart => "session_start",
            SdkCall::SessionFinish => "session_finish",
            SdkCall::SessionError { .. } => "session_error",
            SdkCall::ImpressionOccurred => "impression_occurred",
            SdkCall::Loaded { .. } => "loaded",
            SdkCall::Start { .. } => "start",
            SdkCall::FirstQuartile => "first_quartile",
            SdkCall::Midpoint => "midpoint",
            SdkCall::ThirdQuartile => "third_quartile",
            SdkCall::Complete => "complete",
            SdkCall::Skipped => "skipped",
            SdkCall::Pause => "pause",
            SdkCall::Resume => "resume",
            SdkCall::BufferStart => "buffer_start",
            SdkCall::BufferFinish => "buffer_finish",
            SdkCall::AdUserInteraction { .. } => "ad_user_interaction",
            SdkCall::VolumeChange { .. } => "volume_change",
            SdkCall::PlayerStateChange { .. } => "player_state_change",
        }
    }
}

/// Journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkCallRecord {
    pub sequence: u64,
    /// Library-side session, `None` for calls on the SDK itself
    pub session_id: Option<SessionId>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub call: SdkCall,
}

#[derive(Default)]
struct Journal {
    active: bool,
    sequence: u64,
    records: Vec<SdkCallRecord>,
    failing: HashSet<String>,
}

/// Measurement backend that records calls instead of measuring
#[derive(Clone, Default)]
pub struct RecordingSdk {
    journal: Arc<Mutex<Journal>>,
}

impl RecordingSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call with this name fail
    pub fn fail_on(&self, call_name: impl Into<String>) {
        lock(&self.journal).failing.insert(call_name.into());
    }

    /// Stop injecting failures
    pub fn clear_failures(&self) {
        lock(&self.journal).failing.clear();
    }

    /// All successful calls so far, in order
    pub fn calls(&self) -> Vec<SdkCallRecord> {
        lock(&self.journal).records.clone()
    }

    /// Names of all successful calls so far, in order
    pub fn call_names(&self) -> Vec<&'static str> {
        lock(&self.journal)
            .records
            .iter()
            .map(|r| r.call.name())
            .collect()
    }

    /// Number of successful calls with this name
    pub fn count(&self, call_name: &str) -> usize {
        lock(&self.journal)
            .records
            .iter()
            .filter(|r| r.call.name() == call_name)
            .count()
    }

    /// Forget recorded calls, keeping activation and injected failures
    pub fn clear(&self) {
        lock(&self.journal).records.clear();
    }

    fn record(&self, session_id: Option<SessionId>, call: SdkCall) -> Result<()> {
        record(&self.journal, session_id, call)
    }
}

fn lock(journal: &Mutex<Journal>) -> MutexGuard<'_, Journal> {
    journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn record(journal: &Mutex<Journal>, session_id: Option<SessionId>, call: SdkCall) -> Result<()> {
    let mut journal = lock(journal);
    let name = call.name();
    if journal.failing.contains(name) {
        return Err(Error::sdk(format!("{} failed", name)));
    }
    journal.sequence += 1;
    let record = SdkCallRecord {
        sequence: journal.sequence,
        session_id,
        timestamp: Utc::now(),
        call,
    };
    trace!(sequence = record.sequence, call = name, "Recorded measurement call");
    journal.records.push(record);
    Ok(())
}

impl MeasurementSdk for RecordingSdk {
    fn version(&self) -> String {
        format!("{}-recording", env!("CARGO_PKG_VERSION"))
    }

    fn is_active(&self) -> bool {
        lock(&self.journal).active
    }

    fn activate(&mut self) -> Result<()> {
        self.record(None, SdkCall::Activate)?;
        lock(&self.journal).active = true;
        Ok(())
    }

    fn create_session(
        &mut self,
        _configuration: SessionConfiguration,
        context: SessionContext,
    ) -> Result<Box<dyn AdSession>> {
        if !self.is_active() {
            return Err(Error::SdkInactive);
        }
        let session_id = SessionId::new();
        self.record(
            Some(session_id),
            SdkCall::CreateSession {
                partner: context.partner.name().to_string(),
                version: context.partner.version().to_string(),
                vendors: context
                    .resources
                    .iter()
                    .map(|r| r.vendor_key().to_string())
                    .collect(),
                content_url: context.content_url.clone(),
            },
        )?;
        Ok(Box::new(RecordingSession {
            journal: Arc::clone(&self.journal),
            session_id,
        }))
    }
}

struct RecordingSession {
    journal: Arc<Mutex<Journal>>,
    session_id: SessionId,
}

impl RecordingSession {
    fn record(&self, call: SdkCall) -> Result<()> {
        record(&self.journal, Some(self.session_id), call)
    }
}

impl AdSession for RecordingSession {
    fn register_ad_view(&mut self, view: &dyn HostView) -> Result<()> {
        self.record(SdkCall::RegisterAdView {
            view_id: view.view_id().to_string(),
        })
    }

    fn start(&mut self) -> Result<()> {
        self.record(SdkCall::SessionStart)
    }

    fn finish(&mut self) -> Result<()> {
        self.record(SdkCall::SessionFinish)
    }

    fn error(&mut self, error_type: ErrorType, message: &str) -> Result<()> {
        self.record(SdkCall::SessionError {
            error_type,
            message: message.to_string(),
        })
    }

    fn ad_events(&mut self) -> Result<Box<dyn AdEvents>> {
        Ok(Box::new(RecordingEmitter {
            journal: Arc::clone(&self.journal),
            session_id: self.session_id,
        }))
    }

    fn media_events(&mut self) -> Result<Box<dyn MediaEvents>> {
        Ok(Box::new(RecordingEmitter {
            journal: Arc::clone(&self.journal),
            session_id: self.session_id,
        }))
    }
}

/// Serves as both the ad-events and the media-events emitter
struct RecordingEmitter {
    journal: Arc<Mutex<Journal>>,
    session_id: SessionId,
}

impl RecordingEmitter {
    fn record(&self, call: SdkCall) -> Result<()> {
        record(&self.journal, Some(self.session_id), call)
    }
}

impl AdEvents for RecordingEmitter {
    fn impression_occurred(&mut self) -> Result<()> {
        self.record(SdkCall::ImpressionOccurred)
    }

    fn loaded(&mut self, properties: VastProperties) -> Result<()> {
        self.record(SdkCall::Loaded { properties })
    }
}

impl MediaEvents for RecordingEmitter {
    fn start(&mut self, duration: f32, player_volume: f32) -> Result<()> {
        self.record(SdkCall::Start {
            duration,
            player_volume,
        })
    }

    fn first_quartile(&mut self) -> Result<()> {
        self.record(SdkCall::FirstQuartile)
    }

    fn midpoint(&mut self) -> Result<()> {
        self.record(SdkCall::Midpoint)
    }

    fn third_quartile(&mut self) -> Result<()> {
        self.record(SdkCall::ThirdQuartile)
    }

    fn complete(&mut self) -> Result<()> {
        self.record(SdkCall::Complete)
    }

    fn skipped(&mut self) -> Result<()> {
        self.record(SdkCall::Skipped)
    }

    fn pause(&mut self) -> Result<()> {
        self.record(SdkCall::Pause)
    }

    fn resume(&mut self) -> Result<()> {
        self.record(SdkCall::Resume)
    }

    fn buffer_start(&mut self) -> Result<()> {
        self.record(SdkCall::BufferStart)
    }

    fn buffer_finish(&mut self) -> Result<()> {
        self.record(SdkCall::BufferFinish)
    }

    fn ad_user_interaction(&mut self, interaction: InteractionType) -> Result<()> {
        self.record(SdkCall::AdUserInteraction { interaction })
    }

    fn volume_change(&mut self, volume: f32) -> Result<()> {
        self.record(SdkCall::VolumeChange { volume })
    }

    fn player_state_change(&mut self, state: PlayerState) -> Result<()> {
        self.record(SdkCall::PlayerStateChange { state })
    }
}

/// Host view with a fixed id and service script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHostView {
    view_id: String,
    service_script: String,
}

impl StaticHostView {
    pub fn new(view_id: impl Into<String>, service_script: impl Into<String>) -> Self {
        Self {
            view_id: view_id.into(),
            service_script: service_script.into(),
        }
    }
}

impl HostView for StaticHostView {
    fn view_id(&self) -> &str {
        &self.view_id
    }

    fn service_script(&self) -> Result<String> {
        if self.service_script.is_empty() {
            return Err(Error::ServiceScript(format!(
                "no service script bundled for view {}",
                self.view_id
            )));
        }
        Ok(self.service_script.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_requires_activation() {
        let mut sdk = RecordingSdk::new();
        let context = SessionContext {
            partner: Partner::new("Dailymotion", "0.2.8").unwrap(),
            service_script: "omid".into(),
            resources: Vec::new(),
            content_url: None,
            custom_reference_data: None,
        };
        let config = SessionConfiguration::native_video().unwrap();

        assert!(matches!(
            sdk.create_session(config, context.clone()),
            Err(Error::SdkInactive)
        ));

        sdk.activate().unwrap();
        let mut session = sdk.create_session(config, context).unwrap();
        session.start().unwrap();
        assert_eq!(sdk.call_names(), vec!["activate", "create_session", "session_start"]);
    }

    #[test]
    fn test_fault_injection() {
        let mut sdk = RecordingSdk::new();
        sdk.fail_on("activate");
        assert_eq!(sdk.activate(), Err(Error::sdk("activate failed")));
        assert!(!sdk.is_active());
        assert!(sdk.calls().is_empty());

        sdk.clear_failures();
        sdk.activate().unwrap();
        assert_eq!(sdk.count("activate"), 1);
        assert_eq!(sdk.calls()[0].sequence, 1);
        assert_eq!(sdk.calls()[0].session_id, None);
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = SdkCallRecord {
            sequence: 7,
            session_id: None,
            timestamp: Utc::now(),
            call: SdkCall::VolumeChange { volume: 0.0 },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["call"], "volume_change");
        assert_eq!(json["sequence"], 7);
        assert_eq!(json["volume"], 0.0);
    }

    #[test]
    fn test_static_host_view() {
        let view = StaticHostView::new("player-1", "");
        assert_eq!(view.view_id(), "player-1");
        assert!(matches!(view.service_script(), Err(Error::ServiceScript(_))));
    }
}
