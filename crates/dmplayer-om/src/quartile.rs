//! Quartile progress tracking
//!
//! ```text
//! Init ──> Start ──> FirstQuartile ──> Midpoint ──> ThirdQuartile
//!  0.0      0.0         0.25             0.50          0.75
//! ```
//!
//! A time update advances the tracker by at most one step, when playback
//! progress is strictly above the threshold of the next state. Entering a
//! state emits its milestone once. Sparse updates therefore need several
//! calls to catch up.

use serde::{Deserialize, Serialize};

/// Progress states of an ad
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quartile {
    Init,
    Start,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
}

/// Media event fired when a quartile state is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Milestone {
    Start,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Milestone::Start => write!(f, "start"),
            Milestone::FirstQuartile => write!(f, "firstQuartile"),
            Milestone::Midpoint => write!(f, "midpoint"),
            Milestone::ThirdQuartile => write!(f, "thirdQuartile"),
        }
    }
}

/// Row of the transition table: threshold, milestone, successor
struct Transition {
    threshold: f64,
    milestone: Option<Milestone>,
    next: Option<Quartile>,
}

impl Quartile {
    fn transition(self) -> Transition {
        match self {
            Quartile::Init => Transition {
                threshold: 0.0,
                milestone: None,
                next: Some(Quartile::Start),
            },
            Quartile::Start => Transition {
                threshold: 0.0,
                milestone: Some(Milestone::Start),
                next: Some(Quartile::FirstQuartile),
            },
            Quartile::FirstQuartile => Transition {
                threshold: 0.25,
                milestone: Some(Milestone::FirstQuartile),
                next: Some(Quartile::Midpoint),
            },
            Quartile::Midpoint => Transition {
                threshold: 0.50,
                milestone: Some(Milestone::Midpoint),
                next: Some(Quartile::ThirdQuartile),
            },
            Quartile::ThirdQuartile => Transition {
                threshold: 0.75,
                milestone: Some(Milestone::ThirdQuartile),
                next: None,
            },
        }
    }

    /// Progress that must be exceeded to enter this state
    pub fn threshold(self) -> f64 {
        self.transition().threshold
    }

    /// Milestone emitted when entering this state
    pub fn milestone(self) -> Option<Milestone> {
        self.transition().milestone
    }

    /// Successor state, `None` once the third quartile is reached
    pub fn next(self) -> Option<Quartile> {
        self.transition().next
    }
}

/// Forward-only quartile state machine for one ad session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuartileTracker {
    current: Quartile,
}

impl QuartileTracker {
    pub fn new() -> Self {
        Self {
            current: Quartile::Init,
        }
    }

    pub fn current(&self) -> Quartile {
        self.current
    }

    /// Back to `Init` for a new session
    pub fn reset(&mut self) {
        self.current = Quartile::Init;
    }

    /// Advance at most one step for the given progress ratio.
    ///
    /// Returns the milestone of the entered state, if any.
    pub fn advance(&mut self, progress: f64) -> Option<Milestone> {
        let next = self.current.next()?;
        if progress > next.threshold() {
            self.current = next;
            next.milestone()
        } else {
            None
        }
    }
}

impl Default for QuartileTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Playback progress ratio; an unparseable time counts as zero
pub fn progress(time: Option<&str>, ad_duration: f32) -> f64 {
    let elapsed = time
        .and_then(|t| t.trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    elapsed / ad_duration as f64
}
