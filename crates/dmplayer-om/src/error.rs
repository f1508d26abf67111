//! Error types for the Open Measurement bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Construction errors
    #[error("Invalid partner: {0}")]
    InvalidPartner(String),

    #[error("Invalid ad session configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid verification resource {url:?}: {reason}")]
    InvalidVerificationResource { url: String, reason: String },

    #[error("OMID service script unavailable: {0}")]
    ServiceScript(String),

    #[error("Measurement SDK is not active")]
    SdkInactive,

    // Runtime errors
    #[error("Measurement SDK call failed: {0}")]
    Sdk(String),

    #[error("Event dispatcher is closed")]
    DispatcherClosed,

    // Parse errors
    #[error("Incorrect position: {0:?}")]
    InvalidPosition(String),

    // Player reported errors
    #[error("Received an AD_ERROR: {0}")]
    AdError(String),
}

/// Coarse grouping used by the error reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Building a session or one of its parts failed; no session was created
    Construction,
    /// Forwarding an event to an open session failed
    Runtime,
    /// A field of an inbound event could not be understood
    Parse,
    /// The player itself reported an ad failure
    Player,
}

impl Error {
    /// Create a measurement SDK call error
    pub fn sdk(msg: impl Into<String>) -> Self {
        Error::Sdk(msg.into())
    }

    /// Create a verification resource error
    pub fn resource(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidVerificationResource {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns the category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidPartner(_)
            | Error::InvalidConfiguration(_)
            | Error::InvalidVerificationResource { .. }
            | Error::ServiceScript(_)
            | Error::SdkInactive => ErrorCategory::Construction,
            Error::Sdk(_) | Error::DispatcherClosed => ErrorCategory::Runtime,
            Error::InvalidPosition(_) => ErrorCategory::Parse,
            Error::AdError(_) => ErrorCategory::Player,
        }
    }

    /// Returns true if the open session should be flagged with a GENERIC error
    pub fn marks_session(&self) -> bool {
        matches!(self, Error::Sdk(_))
    }

    /// Message of the underlying failure, without the bridge's prefix
    pub fn message(&self) -> String {
        match self {
            Error::Sdk(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Returns the error code for logs and listeners
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidPartner(_) => "INVALID_PARTNER",
            Error::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            Error::InvalidVerificationResource { .. } => "INVALID_VERIFICATION_RESOURCE",
            Error::ServiceScript(_) => "SERVICE_SCRIPT",
            Error::SdkInactive => "SDK_INACTIVE",
            Error::Sdk(_) => "SDK_CALL",
            Error::DispatcherClosed => "DISPATCHER_CLOSED",
            Error::InvalidPosition(_) => "INVALID_POSITION",
            Error::AdError(_) => "AD_ERROR",
        }
    }
}
