use serde::{Deserialize, Serialize};

use super::errors::ManagerError;
use super::window::WindowHandle;

/// Store key of the tracked companion window.
pub const KEY_WINDOW_ID: &str = "companionWindowId";
/// Store key of the split ratio.
pub const KEY_SPLIT_RATIO: &str = "screenSplitRatio";
/// Store key of the auto-relay flag.
pub const KEY_AUTO_RELAY: &str = "autoRelay";

/// Fraction of the estimated screen width given to the companion window.
///
/// Always strictly inside `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SplitRatio(f64);

impl SplitRatio {
    pub const DEFAULT: SplitRatio = SplitRatio(0.5);

    /// Rejects NaN and anything outside the open interval `(0, 1)`.
    pub fn new(value: f64) -> Result<Self, ManagerError> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Ok(Self(value))
        } else {
            Err(ManagerError::InvalidRatio(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for SplitRatio {
    type Error = ManagerError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        SplitRatio::new(value)
    }
}

impl From<SplitRatio> for f64 {
    fn from(ratio: SplitRatio) -> f64 {
        ratio.0
    }
}

/// Persisted companion window state. The manager is its only writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompanionWindowState {
    pub window_id: Option<WindowHandle>,
    pub screen_split_ratio: SplitRatio,
    pub auto_relay: bool,
}

/// Lifecycle phase of the companion window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "windowId", rename_all = "camelCase")]
pub enum ManagerPhase {
    Idle,
    Creating,
    Active(WindowHandle),
}

impl ManagerPhase {
    pub fn active_window(self) -> Option<WindowHandle> {
        match self {
            ManagerPhase::Active(handle) => Some(handle),
            _ => None,
        }
    }
}
