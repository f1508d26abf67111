//! Core types for the Open Measurement bridge

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name reported to verification vendors
pub const PARTNER_NAME: &str = "Dailymotion";

/// Version of this integration that has been validated by IAB
pub const PARTNER_VERSION: &str = "0.2.8";

/// Unique identifier for a measured ad session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why an ad ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdEndReason {
    #[serde(rename = "AD_STOPPED")]
    Stopped,
    #[serde(rename = "AD_SKIPPED")]
    Skipped,
    #[serde(rename = "AD_ERROR")]
    Error,
    #[serde(other)]
    Unknown,
}

impl AdEndReason {
    pub fn parse(reason: &str) -> Self {
        match reason {
            "AD_STOPPED" => AdEndReason::Stopped,
            "AD_SKIPPED" => AdEndReason::Skipped,
            "AD_ERROR" => AdEndReason::Error,
            _ => AdEndReason::Unknown,
        }
    }
}

/// Player and ad events delivered by the player's JavaScript bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// An ad has been loaded and is about to play
    AdLoaded {
        /// Encoded verification scripts
        #[serde(default)]
        payload: Option<String>,
        /// preroll, midroll, postroll or standalone
        #[serde(default)]
        position: Option<String>,
        /// Seconds before the ad becomes skippable, 0 when it is not
        #[serde(default)]
        skip_offset: f32,
        #[serde(default)]
        auto_play: bool,
    },

    /// Ad playback started
    AdStart {
        #[serde(default)]
        ad_duration: f32,
    },

    /// Ad playback ended
    AdEnd {
        reason: AdEndReason,
        #[serde(default)]
        error: Option<String>,
    },

    AdPause,

    AdPlay,

    AdBufferStart,

    AdBufferEnd,

    AdClick,

    VolumeChange {
        is_muted: bool,
    },

    #[serde(rename = "fullscreen_change")]
    FullScreenChange {
        fullscreen: bool,
    },

    /// Playback position of the ad, in seconds
    AdTimeUpdate {
        #[serde(default)]
        time: Option<String>,
    },
}

impl PlayerEvent {
    /// Event name as sent by the player
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::AdLoaded { .. } => "ad_loaded",
            PlayerEvent::AdStart { .. } => "ad_start",
            PlayerEvent::AdEnd { .. } => "ad_end",
            PlayerEvent::AdPause => "ad_pause",
            PlayerEvent::AdPlay => "ad_play",
            PlayerEvent::AdBufferStart => "ad_buffer_start",
            PlayerEvent::AdBufferEnd => "ad_buffer_end",
            PlayerEvent::AdClick => "ad_click",
            PlayerEvent::VolumeChange { .. } => "volume_change",
            PlayerEvent::FullScreenChange { .. } => "fullscreen_change",
            PlayerEvent::AdTimeUpdate { .. } => "ad_time_update",
        }
    }
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Partner name reported to verification vendors
    pub partner_name: String,
    /// Partner integration version
    pub partner_version: String,
    /// Media player volume passed along with `start`
    pub player_volume: f32,
    /// Content URL attached to the session context
    pub content_url: Option<String>,
    /// Opaque reference data attached to the session context
    pub custom_reference_data: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            partner_name: PARTNER_NAME.to_string(),
            partner_version: PARTNER_VERSION.to_string(),
            player_volume: 1.0,
            content_url: None,
            custom_reference_data: None,
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON configuration, missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: BridgeConfig = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        if !(0.0..=1.0).contains(&config.player_volume) {
            return Err(Error::InvalidConfiguration(format!(
                "player_volume must be within [0, 1], got {}",
                config.player_volume
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_from_bridge_json() {
        let event: PlayerEvent = serde_json::from_str(
            r#"{"event":"ad_loaded","payload":"verificationScripts[0][vendor]=v","position":"preroll","skip_offset":5.0,"auto_play":true}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PlayerEvent::AdLoaded {
                payload: Some("verificationScripts[0][vendor]=v".into()),
                position: Some("preroll".into()),
                skip_offset: 5.0,
                auto_play: true,
            }
        );

        let event: PlayerEvent = serde_json::from_str(r#"{"event":"ad_pause"}"#).unwrap();
        assert_eq!(event, PlayerEvent::AdPause);
        assert_eq!(event.name(), "ad_pause");

        let event: PlayerEvent =
            serde_json::from_str(r#"{"event":"fullscreen_change","fullscreen":true}"#).unwrap();
        assert_eq!(event, PlayerEvent::FullScreenChange { fullscreen: true });
    }

    #[test]
    fn test_unknown_end_reason() {
        let event: PlayerEvent =
            serde_json::from_str(r#"{"event":"ad_end","reason":"AD_VANISHED"}"#).unwrap();
        assert_eq!(
            event,
            PlayerEvent::AdEnd {
                reason: AdEndReason::Unknown,
                error: None
            }
        );
        assert_eq!(AdEndReason::parse("AD_SKIPPED"), AdEndReason::Skipped);
    }

    #[test]
    fn test_config_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.partner_name, "Dailymotion");
        assert_eq!(config.partner_version, "0.2.8");
        assert_eq!(config.player_volume, 1.0);

        let config = BridgeConfig::from_json_str(r#"{"partner_version":"1.0.0"}"#).unwrap();
        assert_eq!(config.partner_name, "Dailymotion");
        assert_eq!(config.partner_version, "1.0.0");

        assert!(BridgeConfig::from_json_str(r#"{"player_volume":2.0}"#).is_err());
    }
}
