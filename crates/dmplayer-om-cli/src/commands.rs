//! CLI command implementations

use crate::output::{self, OutputFormat, ReplayReport, ReportedError};
use anyhow::Context;
use dmplayer_om::{
    parse_verification_scripts, BridgeConfig, Error, ErrorListener, EventDispatcher, HostView,
    OmBridge, PlayerEvent, PlayerState, RecordingSdk, StaticHostView,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Options of the `replay` command
pub struct ReplayOptions {
    pub events: PathBuf,
    pub config: Option<PathBuf>,
    pub player_state: Option<PlayerState>,
    pub fail_on: Vec<String>,
    pub view_id: String,
    pub service_script: Option<PathBuf>,
}

/// Parse an event log: either a JSON array or one JSON event per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_event_log(content: &str) -> anyhow::Result<Vec<PlayerEvent>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("invalid JSON event array");
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str::<PlayerEvent>(line).with_context(|| format!("invalid event on line {}", i + 1))
        })
        .collect()
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    match path {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Ok(BridgeConfig::from_json_str(&json)?)
        }
        None => Ok(BridgeConfig::default()),
    }
}

/// Replay an event log through the bridge and print the measurement calls
pub async fn replay(options: ReplayOptions, format: &str) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&options.events)
        .await
        .with_context(|| format!("failed to read {}", options.events.display()))?;
    let events = parse_event_log(&content)?;
    let config = load_config(options.config.as_deref()).await?;

    let service_script = match &options.service_script {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read service script {}", path.display()))?,
        None => "/* omid service script */".to_string(),
    };

    let sdk = RecordingSdk::new();
    for name in &options.fail_on {
        sdk.fail_on(name.as_str());
    }

    let mut bridge = OmBridge::new(sdk.clone(), config);
    bridge.ensure_initialized()?;
    info!(sdk_version = %bridge.sdk_version(), events = events.len(), "Replaying events");

    let errors = Arc::new(Mutex::new(Vec::<ReportedError>::new()));
    let sink = Arc::clone(&errors);
    let listener: Arc<dyn ErrorListener> =
        Arc::new(move |description: &str, error: &Error, debug: Option<&str>| {
            if let Ok(mut errors) = sink.lock() {
                errors.push(ReportedError {
                    description: description.to_string(),
                    code: error.error_code(),
                    message: error.to_string(),
                    debug: debug.map(str::to_string),
                });
            }
        });

    let view: Arc<dyn HostView> = Arc::new(StaticHostView::new(options.view_id, service_script));
    let dispatcher = EventDispatcher::spawn(bridge);
    dispatcher.set_error_listener(Some(listener))?;
    if options.player_state.is_some() {
        dispatcher.set_player_state(options.player_state)?;
    }

    let event_count = events.len();
    for event in events {
        dispatcher.dispatch(Arc::clone(&view), event)?;
    }

    let bridge = dispatcher.shutdown().await?;
    if bridge.has_session() {
        info!("Event log ended with an open ad session");
    }

    let errors = errors
        .lock()
        .map(|errors| errors.clone())
        .unwrap_or_default();
    let report = ReplayReport {
        events: event_count,
        calls: sdk.calls(),
        errors,
    };
    print!("{}", output::format_replay(&report, OutputFormat::from(format)));
    Ok(())
}

/// Parse an ad payload and print its verification scripts
pub fn parse_payload(payload: &str, format: &str) -> anyhow::Result<()> {
    let scripts = parse_verification_scripts(Some(payload));
    print!("{}", output::format_scripts(&scripts, OutputFormat::from(format)));
    Ok(())
}

/// Print bridge and partner versions
pub fn version() -> anyhow::Result<()> {
    let config = BridgeConfig::default();
    let bridge = OmBridge::new(RecordingSdk::new(), config.clone());
    println!("dmplayer-om {}", dmplayer_om::VERSION);
    println!("partner {} {}", config.partner_name, config.partner_version);
    println!("measurement sdk {}", bridge.sdk_version());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_lines() {
        let log = r#"
# ad break
{"event":"ad_loaded","position":"preroll"}
{"event":"ad_start","ad_duration":15.0}

{"event":"ad_end","reason":"AD_STOPPED"}
"#;
        let events = parse_event_log(log).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], PlayerEvent::AdStart { ad_duration: 15.0 });
    }

    #[test]
    fn test_parse_json_array() {
        let events = parse_event_log(r#"[{"event":"ad_click"},{"event":"ad_pause"}]"#).unwrap();
        assert_eq!(events, vec![PlayerEvent::AdClick, PlayerEvent::AdPause]);
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = parse_event_log("{\"event\":\"ad_click\"}\n{\"event\":\"nope\"}").unwrap_err();
        assert_eq!(err.to_string(), "invalid event on line 2");
    }
}
