//! Output formatting for CLI

use dmplayer_om::{SdkCall, SdkCallRecord, VerificationScriptData};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// A failure the bridge reported to its listener
#[derive(Debug, Clone, Serialize)]
pub struct ReportedError {
    pub description: String,
    pub code: &'static str,
    pub message: String,
    pub debug: Option<String>,
}

/// Everything a replay produced
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub events: usize,
    pub calls: Vec<SdkCallRecord>,
    pub errors: Vec<ReportedError>,
}

#[derive(Tabled)]
struct CallRow {
    #[tabled(rename = "#")]
    sequence: u64,
    session: String,
    call: &'static str,
    details: String,
}

#[derive(Tabled)]
struct ScriptRow {
    vendor: String,
    resource: String,
    parameters: String,
}

/// Arguments of a call, empty for calls without any
fn call_details(call: &SdkCall) -> String {
    match call {
        SdkCall::CreateSession {
            partner,
            version,
            vendors,
            content_url,
        } => {
            let mut details = format!("{} {} vendors=[{}]", partner, version, vendors.join(","));
            if let Some(url) = content_url {
                details.push_str(&format!(" content={}", url));
            }
            details
        }
        SdkCall::RegisterAdView { view_id } => view_id.clone(),
        SdkCall::SessionError {
            error_type,
            message,
        } => format!("{:?}: {}", error_type, message),
        SdkCall::Loaded { properties } => properties.to_string(),
        SdkCall::Start {
            duration,
            player_volume,
        } => format!("duration={} volume={}", duration, player_volume),
        SdkCall::AdUserInteraction { interaction } => format!("{:?}", interaction),
        SdkCall::VolumeChange { volume } => volume.to_string(),
        SdkCall::PlayerStateChange { state } => state.to_string(),
        _ => String::new(),
    }
}

fn short_session(record: &SdkCallRecord) -> String {
    record
        .session_id
        .map(|id| id.to_string().chars().take(8).collect::<String>())
        .unwrap_or_else(|| "-".to_string())
}

/// Render a replay report
pub fn format_replay(report: &ReplayReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let rows: Vec<CallRow> = report
                .calls
                .iter()
                .map(|r| CallRow {
                    sequence: r.sequence,
                    session: short_session(r),
                    call: r.call.name(),
                    details: call_details(&r.call),
                })
                .collect();
            let mut out = Table::new(rows).to_string();
            out.push_str(&format_errors(&report.errors));
            out
        }
        OutputFormat::Text => {
            let mut out = format!(
                "Replayed {} events, {} measurement calls\n",
                report.events,
                report.calls.len()
            );
            for r in &report.calls {
                let details = call_details(&r.call);
                if details.is_empty() {
                    out.push_str(&format!("  {:>3} [{}] {}\n", r.sequence, short_session(r), r.call.name()));
                } else {
                    out.push_str(&format!(
                        "  {:>3} [{}] {} {}\n",
                        r.sequence,
                        short_session(r),
                        r.call.name(),
                        details
                    ));
                }
            }
            out.push_str(&format_errors(&report.errors));
            out
        }
    }
}

fn format_errors(errors: &[ReportedError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = format!("\nReported errors: {}\n", errors.len());
    for e in errors {
        out.push_str(&format!("  {} [{}] {}\n", e.description, e.code, e.message));
        if let Some(debug) = &e.debug {
            out.push_str(&format!("    payload: {}\n", debug));
        }
    }
    out
}

/// Render parsed verification scripts
pub fn format_scripts(scripts: &[VerificationScriptData], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(scripts).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Table => {
            let rows: Vec<ScriptRow> = scripts
                .iter()
                .map(|s| ScriptRow {
                    vendor: s.vendor_key.clone(),
                    resource: s.url.clone(),
                    parameters: s.parameters.clone(),
                })
                .collect();
            Table::new(rows).to_string()
        }
        OutputFormat::Text => {
            let mut out = format!("Verification scripts: {}\n", scripts.len());
            for (i, s) in scripts.iter().enumerate() {
                out.push_str(&format!(
                    "  {}. vendor={} resource={} parameters={}\n",
                    i + 1,
                    s.vendor_key,
                    s.url,
                    s.parameters
                ));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmplayer_om::PlayerState;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_call_details() {
        assert_eq!(
            call_details(&SdkCall::PlayerStateChange {
                state: PlayerState::Fullscreen
            }),
            "FULLSCREEN"
        );
        assert_eq!(call_details(&SdkCall::Pause), "");
    }

    #[test]
    fn test_format_scripts_text() {
        let scripts = vec![VerificationScriptData {
            vendor_key: "v1".into(),
            url: "https://x".into(),
            parameters: "p1".into(),
        }];
        let out = format_scripts(&scripts, OutputFormat::Text);
        assert!(out.contains("Verification scripts: 1"));
        assert!(out.contains("vendor=v1 resource=https://x parameters=p1"));
    }
}
