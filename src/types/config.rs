use serde::{Deserialize, Serialize};

/// Top-level configuration container for the companion window manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManagerConfig {
    pub timing: TimingConfig,
    pub screen: ScreenConfig,
    pub split_presets: Vec<f64>,
    pub default_split_ratio: f64,
    pub default_auto_relay: bool,
    pub fallback_user_agent: Option<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            screen: ScreenConfig::default(),
            split_presets: vec![0.3, 0.5, 0.7],
            default_split_ratio: 0.5,
            default_auto_relay: true,
            fallback_user_agent: None,
        }
    }
}

/// Delays and timeouts, all in milliseconds unless stated otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after the companion tab reports load complete before relaying a jump.
    pub settle_delay_ms: u64,
    /// Upper bound on waiting for the companion tab to finish loading.
    pub load_timeout_ms: u64,
    /// Pause before creating a window on hosts that need it (Edge).
    pub creation_delay_ms: u64,
    /// Period of the background liveness probe, in seconds. 0 disables it.
    pub liveness_interval_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
            load_timeout_ms: 30_000,
            creation_delay_ms: 500,
            liveness_interval_secs: 10,
        }
    }
}

/// Parameters of the screen size estimate.
///
/// Used only because the host exposes no display geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreenConfig {
    pub fallback_width: u32,
    pub fallback_height: u32,
    pub min_plausible_width: u32,
    pub min_plausible_height: u32,
    pub margin: f64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            fallback_width: 1920,
            fallback_height: 1080,
            min_plausible_width: 800,
            min_plausible_height: 600,
            margin: 1.1,
        }
    }
}
