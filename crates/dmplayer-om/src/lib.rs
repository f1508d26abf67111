//! dmplayer-om - Open Measurement bridge for the Dailymotion player
//!
//! This crate turns the player's ad event stream into the session/event
//! protocol of the IAB Open Measurement SDK:
//! - One ad session per loaded ad, torn down on ad end or replacement
//! - Quartile milestones derived from time updates
//! - Verification scripts parsed from the `ad_loaded` payload
//! - Failures isolated per event and reported to a host listener
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         dmplayer-om                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  PlayerEvent ──> ┌──────────────┐      ┌──────────────┐         │
//! │                  │   OmBridge   │─────>│ Measurement  │         │
//! │  (Event          │  dispatch +  │      │ SDK traits   │         │
//! │   Dispatcher)    │  session mgr │      └──────────────┘         │
//! │                  └──┬───────┬───┘                               │
//! │                     │       │                                   │
//! │          ┌──────────┴──┐  ┌─┴────────────┐  ┌──────────────┐    │
//! │          │  Payload    │  │   Quartile   │  │    Error     │    │
//! │          │  Parser     │  │   Tracker    │  │   Listener   │    │
//! │          └─────────────┘  └──────────────┘  └──────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod sdk;
pub mod payload;
pub mod quartile;
pub mod listener;
pub mod bridge;
pub mod dispatch;
pub mod recording;

pub use error::{Error, ErrorCategory, Result};
pub use types::*;
pub use sdk::{
    AdEvents, AdSession, HostView, MeasurementSdk, MediaEvents, PlayerState, Position,
    VastProperties,
};
pub use payload::{parse_verification_scripts, VerificationScriptData};
pub use quartile::{Milestone, Quartile, QuartileTracker};
pub use listener::{ErrorListener, EventFailure};
pub use bridge::OmBridge;
pub use dispatch::EventDispatcher;
pub use recording::{RecordingSdk, SdkCall, SdkCallRecord, StaticHostView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version
pub fn init() {
    tracing::info!(version = VERSION, "dmplayer-om initialized");
}
