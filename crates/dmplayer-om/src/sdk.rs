//! Measurement SDK seam
//!
//! The IAB Open Measurement library is driven through the traits in this
//! module. A host application implements them on top of its native OMID
//! binding; [`crate::recording::RecordingSdk`] implements them in-process.
//!
//! The value types mirror what the library accepts and enforce the same
//! construction rules, so an invalid partner or configuration is rejected
//! before any session is created.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Integration partner identity reported to verification vendors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    name: String,
    version: String,
}

impl Partner {
    /// Create a partner; both fields must be non-blank
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let version = version.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidPartner("name is null or empty".into()));
        }
        if version.trim().is_empty() {
            return Err(Error::InvalidPartner("version is null or empty".into()));
        }
        Ok(Self { name, version })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// A third-party verification script loaded into the ad session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationScriptResource {
    vendor_key: String,
    resource_url: Url,
    parameters: String,
}

impl VerificationScriptResource {
    /// Create a resource with vendor parameters.
    ///
    /// The vendor key and the parameters must be non-blank and the resource
    /// must be an absolute URL.
    pub fn with_parameters(
        vendor_key: impl Into<String>,
        resource_url: &str,
        parameters: impl Into<String>,
    ) -> Result<Self> {
        let vendor_key = vendor_key.into();
        let parameters = parameters.into();
        let resource_url = Url::parse(resource_url)
            .map_err(|e| Error::resource(resource_url, e.to_string()))?;
        if vendor_key.trim().is_empty() {
            return Err(Error::resource(
                resource_url.as_str(),
                "vendor key is null or empty",
            ));
        }
        if parameters.trim().is_empty() {
            return Err(Error::resource(
                resource_url.as_str(),
                "verification parameters are null or empty",
            ));
        }
        Ok(Self {
            vendor_key,
            resource_url,
            parameters,
        })
    }

    pub fn vendor_key(&self) -> &str {
        &self.vendor_key
    }

    pub fn resource_url(&self) -> &Url {
        &self.resource_url
    }

    pub fn parameters(&self) -> &str {
        &self.parameters
    }
}

/// Kind of creative being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreativeType {
    DefinedByJavascript,
    HtmlDisplay,
    NativeDisplay,
    Video,
    Audio,
}

/// How the impression is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpressionType {
    DefinedByJavascript,
    Unspecified,
    Loaded,
    BeginToRender,
    OnePixel,
    ViewableMrc50,
    ViewableMrc100,
    ViewableVideo50,
    Audible,
    Other,
}

/// Layer responsible for emitting a class of events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Owner {
    Native,
    Javascript,
    None,
}

/// Immutable ad session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub creative_type: CreativeType,
    pub impression_type: ImpressionType,
    pub impression_owner: Owner,
    pub media_events_owner: Owner,
    pub native_video_events: bool,
}

impl SessionConfiguration {
    /// Create a configuration, rejecting combinations the library refuses
    pub fn new(
        creative_type: CreativeType,
        impression_type: ImpressionType,
        impression_owner: Owner,
        media_events_owner: Owner,
        native_video_events: bool,
    ) -> Result<Self> {
        if impression_owner == Owner::None {
            return Err(Error::InvalidConfiguration(
                "impression owner is none".into(),
            ));
        }
        if creative_type == CreativeType::DefinedByJavascript && impression_owner == Owner::Native {
            return Err(Error::InvalidConfiguration(
                "ImpressionType/CreativeType can only be defined as DEFINED_BY_JAVASCRIPT if impression owner is JavaScript".into(),
            ));
        }
        if impression_type == ImpressionType::DefinedByJavascript
            && impression_owner == Owner::Native
        {
            return Err(Error::InvalidConfiguration(
                "ImpressionType/CreativeType can only be defined as DEFINED_BY_JAVASCRIPT if impression owner is JavaScript".into(),
            ));
        }
        Ok(Self {
            creative_type,
            impression_type,
            impression_owner,
            media_events_owner,
            native_video_events,
        })
    }

    /// Natively rendered video with one-pixel impressions, owned by the app
    pub fn native_video() -> Result<Self> {
        Self::new(
            CreativeType::Video,
            ImpressionType::OnePixel,
            Owner::Native,
            Owner::Native,
            true,
        )
    }
}

/// Everything the library needs to create a native ad session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub partner: Partner,
    /// OMID service script content
    pub service_script: String,
    pub resources: Vec<VerificationScriptResource>,
    pub content_url: Option<String>,
    pub custom_reference_data: Option<String>,
}

/// Placement of the ad relative to the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Position {
    Preroll,
    Midroll,
    Postroll,
    Standalone,
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "PREROLL" => Ok(Position::Preroll),
            "MIDROLL" => Ok(Position::Midroll),
            "POSTROLL" => Ok(Position::Postroll),
            "STANDALONE" => Ok(Position::Standalone),
            _ => Err(Error::InvalidPosition(s.to_string())),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Preroll => write!(f, "preroll"),
            Position::Midroll => write!(f, "midroll"),
            Position::Postroll => write!(f, "postroll"),
            Position::Standalone => write!(f, "standalone"),
        }
    }
}

/// VAST properties sent with the `loaded` event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VastProperties {
    pub skippable: bool,
    /// Seconds before the skip button appears, skippable ads only
    pub skip_offset: Option<f32>,
    pub auto_play: bool,
    pub position: Position,
}

impl VastProperties {
    pub fn skippable(skip_offset: f32, auto_play: bool, position: Position) -> Self {
        Self {
            skippable: true,
            skip_offset: Some(skip_offset),
            auto_play,
            position,
        }
    }

    pub fn non_skippable(auto_play: bool, position: Position) -> Self {
        Self {
            skippable: false,
            skip_offset: None,
            auto_play,
            position,
        }
    }
}

impl fmt::Display for VastProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.auto_play, self.skippable, self.position)?;
        match self.skip_offset {
            Some(offset) => write!(f, "/{}", offset),
            None => write!(f, "/none"),
        }
    }
}

/// Presentation state of the player view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Minimized,
    Collapsed,
    Normal,
    Expanded,
    Fullscreen,
}

impl PlayerState {
    pub fn from_fullscreen(fullscreen: bool) -> Self {
        if fullscreen {
            PlayerState::Fullscreen
        } else {
            PlayerState::Normal
        }
    }
}

impl FromStr for PlayerState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MINIMIZED" => Ok(PlayerState::Minimized),
            "COLLAPSED" => Ok(PlayerState::Collapsed),
            "NORMAL" => Ok(PlayerState::Normal),
            "EXPANDED" => Ok(PlayerState::Expanded),
            "FULLSCREEN" => Ok(PlayerState::Fullscreen),
            other => Err(format!("unknown player state: {}", other)),
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerState::Minimized => write!(f, "MINIMIZED"),
            PlayerState::Collapsed => write!(f, "COLLAPSED"),
            PlayerState::Normal => write!(f, "NORMAL"),
            PlayerState::Expanded => write!(f, "EXPANDED"),
            PlayerState::Fullscreen => write!(f, "FULLSCREEN"),
        }
    }
}

/// User interaction with the ad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionType {
    Click,
    InvitationAccept,
}

/// Error classes accepted by `AdSession::error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    Generic,
    Video,
}

/// The view that renders the ad (the player web view)
pub trait HostView: Send + Sync {
    /// Stable identifier of the view, used for logging and registration
    fn view_id(&self) -> &str;

    /// Content of the OMID service script bundled with the host
    fn service_script(&self) -> Result<String>;
}

/// Entry point of the measurement library
pub trait MeasurementSdk: Send {
    /// Library version string
    fn version(&self) -> String;

    fn is_active(&self) -> bool;

    fn activate(&mut self) -> Result<()>;

    /// Create a native ad session
    fn create_session(
        &mut self,
        configuration: SessionConfiguration,
        context: SessionContext,
    ) -> Result<Box<dyn AdSession>>;
}

/// One measured ad's lifetime inside the library
pub trait AdSession: Send {
    fn register_ad_view(&mut self, view: &dyn HostView) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn finish(&mut self) -> Result<()>;

    fn error(&mut self, error_type: ErrorType, message: &str) -> Result<()>;

    /// Derive the ad-events emitter bound to this session
    fn ad_events(&mut self) -> Result<Box<dyn AdEvents>>;

    /// Derive the media-events emitter bound to this session
    fn media_events(&mut self) -> Result<Box<dyn MediaEvents>>;
}

/// Ad lifecycle events
pub trait AdEvents: Send {
    fn impression_occurred(&mut self) -> Result<()>;

    fn loaded(&mut self, properties: VastProperties) -> Result<()>;
}

/// Media playback events
pub trait MediaEvents: Send {
    fn start(&mut self, duration: f32, player_volume: f32) -> Result<()>;
    fn first_quartile(&mut self) -> Result<()>;
    fn midpoint(&mut self) -> Result<()>;
    fn third_quartile(&mut self) -> Result<()>;
    fn complete(&mut self) -> Result<()>;
    fn skipped(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
    fn buffer_start(&mut self) -> Result<()>;
    fn buffer_finish(&mut self) -> Result<()>;
    fn ad_user_interaction(&mut self, interaction: InteractionType) -> Result<()>;
    fn volume_change(&mut self, volume: f32) -> Result<()>;
    fn player_state_change(&mut self, state: PlayerState) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partner_rejects_blank_fields() {
        assert!(Partner::new("Dailymotion", "0.2.8").is_ok());
        assert!(matches!(Partner::new("", "0.2.8"), Err(Error::InvalidPartner(_))));
        assert!(matches!(Partner::new("Dailymotion", "  "), Err(Error::InvalidPartner(_))));
    }

    #[test]
    fn test_verification_resource_validation() {
        let resource = VerificationScriptResource::with_parameters(
            "vendor",
            "https://verify.example.com/omid.js",
            "p=1",
        )
        .unwrap();
        assert_eq!(resource.vendor_key(), "vendor");
        assert_eq!(resource.resource_url().host_str(), Some("verify.example.com"));

        let err = VerificationScriptResource::with_parameters("vendor", "omid.js", "p=1")
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_VERIFICATION_RESOURCE");

        assert!(VerificationScriptResource::with_parameters("", "https://x.example", "p").is_err());
        assert!(VerificationScriptResource::with_parameters("v", "https://x.example", "").is_err());
    }

    #[test]
    fn test_native_video_configuration() {
        let config = SessionConfiguration::native_video().unwrap();
        assert_eq!(config.creative_type, CreativeType::Video);
        assert_eq!(config.impression_type, ImpressionType::OnePixel);
        assert_eq!(config.impression_owner, Owner::Native);
        assert_eq!(config.media_events_owner, Owner::Native);
        assert!(config.native_video_events);
    }

    #[test]
    fn test_configuration_rules() {
        assert!(SessionConfiguration::new(
            CreativeType::Video,
            ImpressionType::OnePixel,
            Owner::None,
            Owner::Native,
            true
        )
        .is_err());
        assert!(SessionConfiguration::new(
            CreativeType::DefinedByJavascript,
            ImpressionType::OnePixel,
            Owner::Native,
            Owner::Native,
            true
        )
        .is_err());
        assert!(SessionConfiguration::new(
            CreativeType::DefinedByJavascript,
            ImpressionType::DefinedByJavascript,
            Owner::Javascript,
            Owner::Javascript,
            false
        )
        .is_ok());
    }

    #[test]
    fn test_position_parsing_is_case_insensitive() {
        assert_eq!("preroll".parse::<Position>().unwrap(), Position::Preroll);
        assert_eq!("MidRoll".parse::<Position>().unwrap(), Position::Midroll);
        assert_eq!(
            "".parse::<Position>(),
            Err(Error::InvalidPosition(String::new()))
        );
    }

    #[test]
    fn test_vast_properties() {
        let props = VastProperties::skippable(5.0, true, Position::Preroll);
        assert!(props.skippable);
        assert_eq!(props.skip_offset, Some(5.0));
        assert_eq!(props.to_string(), "true/true/preroll/5");

        let props = VastProperties::non_skippable(false, Position::Postroll);
        assert!(!props.skippable);
        assert_eq!(props.to_string(), "false/false/postroll/none");
    }
}
