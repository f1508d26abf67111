//! Open Measurement bridge - translates player events into ad session calls
//!
//! Owns:
//! - The single open ad session and its two event emitters
//! - Quartile progress of the current ad
//! - Volume, pause flag and the host-provided player state
//! - Error reporting to the log and the registered listener
//!
//! Every handler returns `Result<(), EventFailure>`; `report` turns a
//! failure into a flagged session (runtime failures only), an error log line
//! and a listener callback. A failure never leaks out of `on_player_event`.

use crate::{
    listener::{ErrorListener, EventFailure},
    payload::parse_verification_scripts,
    quartile::{self, Milestone, Quartile, QuartileTracker},
    sdk::*,
    types::*,
    Result,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

/// Duration used while no valid ad duration is known, avoids dividing by zero
const DEFAULT_AD_DURATION: f32 = 1.0;

/// Session-scoped handles, dropped together when the session ends
struct ActiveSession {
    id: SessionId,
    session: Box<dyn AdSession>,
    ad_events: Box<dyn AdEvents>,
    media_events: Box<dyn MediaEvents>,
    quartile: QuartileTracker,
}

/// Adapter between the player event stream and the measurement library
pub struct OmBridge {
    sdk: Box<dyn MeasurementSdk>,
    config: BridgeConfig,
    session: Option<ActiveSession>,
    ad_duration: f32,
    is_ad_paused: bool,
    volume: f32,
    player_state: Option<PlayerState>,
    listener: Option<Arc<dyn ErrorListener>>,
}

impl OmBridge {
    /// Create a bridge over a measurement library
    pub fn new(sdk: impl MeasurementSdk + 'static, config: BridgeConfig) -> Self {
        Self {
            sdk: Box::new(sdk),
            config,
            session: None,
            ad_duration: DEFAULT_AD_DURATION,
            is_ad_paused: false,
            volume: 1.0,
            player_state: None,
            listener: None,
        }
    }

    /// Activate the measurement library if it is not active yet
    pub fn ensure_initialized(&mut self) -> Result<()> {
        if !self.sdk.is_active() {
            self.sdk.activate()?;
            info!(version = %self.sdk.version(), "Measurement SDK activated");
        }
        Ok(())
    }

    /// Version of the underlying measurement library
    pub fn sdk_version(&self) -> String {
        self.sdk.version()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Register or clear the error listener; the last registration wins
    pub fn set_error_listener(&mut self, listener: Option<Arc<dyn ErrorListener>>) {
        self.listener = listener;
    }

    /// Player state provided by the host, if any
    pub fn player_state(&self) -> Option<PlayerState> {
        self.player_state
    }

    /// Set the player state provided by the host.
    ///
    /// A state different from the current one is pushed to the open session
    /// immediately. While a state is set, fullscreen events from the player
    /// are ignored. `None` hands state tracking back to the player.
    pub fn set_player_state(&mut self, state: Option<PlayerState>) {
        if let Some(new_state) = state {
            if self.player_state != Some(new_state) {
                if let Err(failure) = self.notify_player_state(new_state) {
                    self.report(failure);
                }
            }
        }
        self.player_state = state;
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Identifier of the open session
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Quartile reached by the open session
    pub fn quartile(&self) -> Option<Quartile> {
        self.session.as_ref().map(|s| s.quartile.current())
    }

    pub fn ad_duration(&self) -> f32 {
        self.ad_duration
    }

    pub fn is_ad_paused(&self) -> bool {
        self.is_ad_paused
    }

    /// Current volume, 0.0 when muted
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Handle one player event
    pub fn on_player_event(&mut self, view: &dyn HostView, event: &PlayerEvent) {
        trace!(event = event.name(), view = view.view_id(), "Player event");
        if let Err(failure) = self.dispatch(view, event) {
            self.report(failure);
        }
    }

    fn dispatch(
        &mut self,
        view: &dyn HostView,
        event: &PlayerEvent,
    ) -> std::result::Result<(), EventFailure> {
        match event {
            PlayerEvent::AdLoaded {
                payload,
                position,
                skip_offset,
                auto_play,
            } => self.on_ad_loaded(
                view,
                payload.as_deref(),
                position.as_deref(),
                *skip_offset,
                *auto_play,
            ),
            PlayerEvent::AdStart { ad_duration } => {
                self.ad_duration = if ad_duration.is_finite() && *ad_duration > 0.0 {
                    *ad_duration
                } else {
                    DEFAULT_AD_DURATION
                };
                self.is_ad_paused = false;
                if let Err(failure) = self.start_session() {
                    self.report(failure);
                }
                self.send_volume()
            }
            PlayerEvent::AdEnd { reason, error } => {
                let outcome = match reason {
                    AdEndReason::Stopped => {
                        self.media("Error with adSession : AdEndEvent", "complete", |m| {
                            m.complete()
                        })
                    }
                    AdEndReason::Skipped => {
                        self.media("Error with adSession : AdEndEvent", "skipped", |m| {
                            m.skipped()
                        })
                    }
                    AdEndReason::Error => self.on_ad_error(error.as_deref()),
                    AdEndReason::Unknown => {
                        debug!("Ad ended for an unknown reason");
                        Ok(())
                    }
                };
                // Report while the session is still open so it can be flagged
                if let Err(failure) = outcome {
                    self.report(failure);
                }
                self.end_session();
                Ok(())
            }
            PlayerEvent::AdPause => {
                self.is_ad_paused = true;
                self.media("Error with adSession : AdPauseEvent", "pause", |m| m.pause())
            }
            PlayerEvent::AdPlay => {
                if !self.is_ad_paused {
                    return Ok(());
                }
                self.is_ad_paused = false;
                self.media("Error with adSession : AdPlayEvent", "resume", |m| m.resume())
            }
            PlayerEvent::AdBufferStart => {
                self.media("Error with adSession : AdBufferStartEvent", "bufferStart", |m| {
                    m.buffer_start()
                })
            }
            PlayerEvent::AdBufferEnd => {
                self.media("Error with adSession : AdBufferEndEvent", "bufferFinish", |m| {
                    m.buffer_finish()
                })
            }
            PlayerEvent::AdClick => self.media(
                "Error with adSession : AdClickEvent",
                "adUserInteraction Click",
                |m| m.ad_user_interaction(InteractionType::Click),
            ),
            PlayerEvent::VolumeChange { is_muted } => {
                self.volume = if *is_muted { 0.0 } else { 1.0 };
                self.send_volume()
            }
            PlayerEvent::FullScreenChange { fullscreen } => {
                if self.player_state.is_some() {
                    return Ok(());
                }
                self.notify_player_state(PlayerState::from_fullscreen(*fullscreen))
            }
            PlayerEvent::AdTimeUpdate { time } => {
                let progress = quartile::progress(time.as_deref(), self.ad_duration);
                let Some(active) = self.session.as_mut() else {
                    return Ok(());
                };
                match active.quartile.advance(progress) {
                    Some(milestone) => self.emit_milestone(milestone),
                    None => Ok(()),
                }
            }
        }
    }

    fn on_ad_loaded(
        &mut self,
        view: &dyn HostView,
        payload: Option<&str>,
        position: Option<&str>,
        skip_offset: f32,
        auto_play: bool,
    ) -> std::result::Result<(), EventFailure> {
        if self.session.is_some() {
            self.end_session();
        }
        // Without a session the remaining steps are no-ops, but a bad
        // position is still reported
        if let Err(failure) = self.create_session(view, payload) {
            self.report(failure);
        }

        if let Err(failure) = self.ad("Error with adSession : Impression", "impressionOccurred", |a| {
            a.impression_occurred()
        }) {
            self.report(failure);
        }

        let position: Position = position
            .unwrap_or_default()
            .parse()
            .map_err(|e| EventFailure::new("Incorrect Position", e))?;

        let properties = if skip_offset > 0.0 {
            VastProperties::skippable(skip_offset, auto_play, position)
        } else {
            VastProperties::non_skippable(auto_play, position)
        };

        self.ad(
            "Error with adSession : Load Properties",
            &format!("loaded {}", properties),
            |a| a.loaded(properties),
        )
    }

    fn on_ad_error(&mut self, error: Option<&str>) -> std::result::Result<(), EventFailure> {
        let message = error.unwrap_or("AD_ERROR");
        if let Some(active) = self.session.as_mut() {
            active
                .session
                .error(ErrorType::Video, message)
                .map_err(|e| EventFailure::new("Error with adSession : AdEndEvent", e))?;
        }
        Err(EventFailure::new(
            "Error with adSession : AD_ERROR",
            crate::Error::AdError(message.to_string()),
        ))
    }

    /// Create and set up a session for the ad that was just loaded.
    ///
    /// Nothing is kept when any step fails.
    #[instrument(skip(self, view, payload), fields(view = view.view_id()))]
    fn create_session(
        &mut self,
        view: &dyn HostView,
        payload: Option<&str>,
    ) -> std::result::Result<(), EventFailure> {
        let resources = parse_verification_scripts(payload)
            .iter()
            .map(|script| {
                VerificationScriptResource::with_parameters(
                    &script.vendor_key,
                    &script.url,
                    &script.parameters,
                )
            })
            .collect::<Result<Vec<_>>>()
            .map_err(|e| {
                EventFailure::new(
                    "Error while creating verificationScriptResourceList with payload",
                    e,
                )
                .with_debug(payload)
            })?;

        let partner = Partner::new(&self.config.partner_name, &self.config.partner_version)
            .map_err(|e| EventFailure::new("Error while creating partner", e))?;

        let service_script = view
            .service_script()
            .map_err(|e| EventFailure::new("Error while loading OMID service script", e))?;

        let configuration = SessionConfiguration::native_video()
            .map_err(|e| EventFailure::new("Error while creating adSessionConfiguration", e))?;

        let resource_count = resources.len();
        let context = SessionContext {
            partner,
            service_script,
            resources,
            content_url: self.config.content_url.clone(),
            custom_reference_data: self.config.custom_reference_data.clone(),
        };

        let mut session = self
            .sdk
            .create_session(configuration, context)
            .map_err(|e| EventFailure::new("Error while creating adSession", e))?;

        let wiring = session.register_ad_view(view).and_then(|()| {
            let ad_events = session.ad_events()?;
            let media_events = session.media_events()?;
            Ok((ad_events, media_events))
        });
        let (ad_events, media_events) = match wiring {
            Ok(emitters) => emitters,
            Err(e) => {
                if let Err(finish_error) = session.finish() {
                    warn!(error = %finish_error, "Failed to finish half-built ad session");
                }
                return Err(EventFailure::new("Error while setting up adSession", e));
            }
        };

        let id = SessionId::new();
        info!(session_id = %id, resources = resource_count, "Ad session created");
        self.session = Some(ActiveSession {
            id,
            session,
            ad_events,
            media_events,
            quartile: QuartileTracker::new(),
        });
        Ok(())
    }

    /// Start the open session and push the host player state to it
    fn start_session(&mut self) -> std::result::Result<(), EventFailure> {
        let Some(active) = self.session.as_mut() else {
            return Ok(());
        };
        active
            .session
            .start()
            .map_err(|e| EventFailure::new("Error with adSession : Session Start", e))?;
        info!(session_id = %active.id, "Ad session started");

        if let Some(state) = self.player_state {
            self.notify_player_state(state)?;
        }
        Ok(())
    }

    /// Finish the open session, if any, and reset all session-scoped state
    pub fn end_session(&mut self) {
        if let Some(active) = self.session.as_mut() {
            let id = active.id;
            match active.session.finish() {
                Ok(()) => info!(session_id = %id, "Ad session ended"),
                // Still open here, so the failure flags it
                Err(e) => self.report(EventFailure::new("Error with adSession : Session End", e)),
            }
            self.session = None;
        }
        self.ad_duration = DEFAULT_AD_DURATION;
        self.is_ad_paused = false;
    }

    fn emit_milestone(&mut self, milestone: Milestone) -> std::result::Result<(), EventFailure> {
        let duration = self.ad_duration;
        let player_volume = self.config.player_volume;
        let action = match milestone {
            Milestone::Start => format!("start duration={}", duration),
            other => other.to_string(),
        };
        self.media("Error with adSession : AdTimeUpdateEvent", &action, move |m| {
            match milestone {
                Milestone::Start => m.start(duration, player_volume),
                Milestone::FirstQuartile => m.first_quartile(),
                Milestone::Midpoint => m.midpoint(),
                Milestone::ThirdQuartile => m.third_quartile(),
            }
        })
    }

    fn send_volume(&mut self) -> std::result::Result<(), EventFailure> {
        let volume = self.volume;
        self.media(
            "Error with adSession : VolumeChangeEvent",
            &format!("volumeChange {}", volume),
            move |m| m.volume_change(volume),
        )
    }

    fn notify_player_state(&mut self, state: PlayerState) -> std::result::Result<(), EventFailure> {
        self.media(
            "Error with adSession : PlayerState",
            &format!("PlayerState => {}", state),
            move |m| m.player_state_change(state),
        )
    }

    /// Forward a media event to the open session; no-op without one
    fn media<F>(&mut self, description: &str, action: &str, call: F) -> std::result::Result<(), EventFailure>
    where
        F: FnOnce(&mut dyn MediaEvents) -> Result<()>,
    {
        let Some(active) = self.session.as_mut() else {
            return Ok(());
        };
        call(active.media_events.as_mut()).map_err(|e| EventFailure::new(description, e))?;
        debug!(session_id = %active.id, action, "OMSDK action");
        Ok(())
    }

    /// Forward an ad event to the open session; no-op without one
    fn ad<F>(&mut self, description: &str, action: &str, call: F) -> std::result::Result<(), EventFailure>
    where
        F: FnOnce(&mut dyn AdEvents) -> Result<()>,
    {
        let Some(active) = self.session.as_mut() else {
            return Ok(());
        };
        call(active.ad_events.as_mut()).map_err(|e| EventFailure::new(description, e))?;
        debug!(session_id = %active.id, action, "OMSDK action");
        Ok(())
    }

    fn report(&mut self, failure: EventFailure) {
        let EventFailure {
            description,
            error: cause,
            debug: payload,
        } = failure;

        if cause.marks_session() {
            if let Some(active) = self.session.as_mut() {
                if let Err(e) = active.session.error(ErrorType::Generic, &cause.message()) {
                    warn!(session_id = %active.id, error = %e, "Failed to flag ad session error");
                }
            }
        }

        error!(
            code = cause.error_code(),
            error = %cause,
            debug = payload.as_deref(),
            "OMSDK: ERROR : {}",
            description
        );

        if let Some(listener) = &self.listener {
            listener.on_error(&description, &cause, payload.as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{RecordingSdk, StaticHostView};

    fn bridge() -> (OmBridge, RecordingSdk, StaticHostView) {
        let sdk = RecordingSdk::new();
        let mut bridge = OmBridge::new(sdk.clone(), BridgeConfig::default());
        bridge.ensure_initialized().unwrap();
        sdk.clear();
        (bridge, sdk, StaticHostView::new("player", "omid-js"))
    }

    fn loaded() -> PlayerEvent {
        PlayerEvent::AdLoaded {
            payload: None,
            position: Some("preroll".into()),
            skip_offset: 0.0,
            auto_play: true,
        }
    }

    #[test]
    fn test_ensure_initialized_activates_once() {
        let sdk = RecordingSdk::new();
        let mut bridge = OmBridge::new(sdk.clone(), BridgeConfig::default());
        bridge.ensure_initialized().unwrap();
        bridge.ensure_initialized().unwrap();
        assert_eq!(sdk.count("activate"), 1);
        assert!(bridge.sdk_version().ends_with("-recording"));
    }

    #[test]
    fn test_ad_loaded_creates_session() {
        let (mut bridge, sdk, view) = bridge();
        bridge.on_player_event(&view, &loaded());

        assert!(bridge.has_session());
        assert_eq!(bridge.quartile(), Some(Quartile::Init));
        assert_eq!(
            sdk.call_names(),
            vec!["create_session", "register_ad_view", "impression_occurred", "loaded"]
        );
    }

    #[test]
    fn test_events_without_session_are_ignored() {
        let (mut bridge, sdk, view) = bridge();
        bridge.on_player_event(&view, &PlayerEvent::AdPause);
        bridge.on_player_event(&view, &PlayerEvent::AdClick);
        bridge.on_player_event(&view, &PlayerEvent::AdTimeUpdate { time: Some("3".into()) });
        bridge.on_player_event(&view, &PlayerEvent::AdStart { ad_duration: 10.0 });
        assert!(sdk.calls().is_empty());
        assert!(!bridge.has_session());
    }

    #[test]
    fn test_resume_only_after_pause() {
        let (mut bridge, sdk, view) = bridge();
        bridge.on_player_event(&view, &loaded());
        bridge.on_player_event(&view, &PlayerEvent::AdPlay);
        assert_eq!(sdk.count("resume"), 0);

        bridge.on_player_event(&view, &PlayerEvent::AdPause);
        assert!(bridge.is_ad_paused());
        bridge.on_player_event(&view, &PlayerEvent::AdPlay);
        bridge.on_player_event(&view, &PlayerEvent::AdPlay);
        assert_eq!(sdk.count("pause"), 1);
        assert_eq!(sdk.count("resume"), 1);
        assert!(!bridge.is_ad_paused());
    }

    #[test]
    fn test_zero_duration_defaults_to_one() {
        let (mut bridge, _sdk, view) = bridge();
        bridge.on_player_event(&view, &loaded());
        bridge.on_player_event(&view, &PlayerEvent::AdStart { ad_duration: 0.0 });
        assert_eq!(bridge.ad_duration(), 1.0);
        bridge.on_player_event(&view, &PlayerEvent::AdStart { ad_duration: f32::NAN });
        assert_eq!(bridge.ad_duration(), 1.0);
        bridge.on_player_event(&view, &PlayerEvent::AdStart { ad_duration: 30.0 });
        assert_eq!(bridge.ad_duration(), 30.0);
    }

    #[test]
    fn test_end_session_resets_state() {
        let (mut bridge, _sdk, view) = bridge();
        bridge.on_player_event(&view, &loaded());
        bridge.on_player_event(&view, &PlayerEvent::AdStart { ad_duration: 30.0 });
        bridge.on_player_event(&view, &PlayerEvent::AdPause);

        bridge.end_session();
        assert!(!bridge.has_session());
        assert_eq!(bridge.quartile(), None);
        assert_eq!(bridge.ad_duration(), 1.0);
        assert!(!bridge.is_ad_paused());
    }

    #[test]
    fn test_start_milestone_uses_player_volume() {
        let sdk = RecordingSdk::new();
        let config = BridgeConfig {
            player_volume: 0.5,
            ..Default::default()
        };
        let mut bridge = OmBridge::new(sdk.clone(), config);
        bridge.ensure_initialized().unwrap();
        let view = StaticHostView::new("player", "omid-js");

        bridge.on_player_event(&view, &loaded());
        bridge.on_player_event(&view, &PlayerEvent::AdStart { ad_duration: 20.0 });
        bridge.on_player_event(&view, &PlayerEvent::AdTimeUpdate { time: Some("1".into()) });

        let start = sdk
            .calls()
            .into_iter()
            .find(|r| r.call.name() == "start")
            .unwrap();
        assert_eq!(
            start.call,
            crate::recording::SdkCall::Start {
                duration: 20.0,
                player_volume: 0.5
            }
        );
    }
}
