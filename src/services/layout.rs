//! Split-screen layout calculator.
//!
//! The host exposes no display geometry, so the screen is estimated from the
//! windows that are currently open. The estimate is approximate: a host that
//! reports real display bounds should feed those in as a [`ScreenEstimate`]
//! directly instead of going through [`estimate_screen`].

use serde::{Deserialize, Serialize};

use crate::types::config::ScreenConfig;
use crate::types::state::SplitRatio;
use crate::types::window::{Rect, WindowInfo};

/// Approximate screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenEstimate {
    pub width: u32,
    pub height: u32,
}

/// Target rectangles for the companion (left) and source (right) windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub companion: Rect,
    pub source: Rect,
}

/// Estimates the screen as the largest open window scaled by `config.margin`.
///
/// Falls back to the configured default when nothing is open or the largest
/// window is implausibly small, and never goes below that default.
pub fn estimate_screen(windows: &[WindowInfo], config: &ScreenConfig) -> ScreenEstimate {
    let fallback = ScreenEstimate {
        width: config.fallback_width,
        height: config.fallback_height,
    };

    let max_width = windows.iter().map(|w| w.bounds.width).max().unwrap_or(0);
    let max_height = windows.iter().map(|w| w.bounds.height).max().unwrap_or(0);

    if max_width < config.min_plausible_width || max_height < config.min_plausible_height {
        return fallback;
    }

    let scale = |value: u32| (f64::from(value) * config.margin).round() as u32;
    ScreenEstimate {
        width: scale(max_width).max(config.fallback_width),
        height: scale(max_height).max(config.fallback_height),
    }
}

/// Splits the screen: companion gets the left `ratio`, source the rest.
///
/// Both rectangles span the full height from the top edge and their widths
/// always add up to the screen width.
pub fn plan_layout(screen: ScreenEstimate, ratio: SplitRatio) -> LayoutPlan {
    let companion_width = (f64::from(screen.width) * ratio.value()).floor() as u32;
    let companion_width = companion_width.min(screen.width);
    let source_width = screen.width - companion_width;

    LayoutPlan {
        companion: Rect {
            left: 0,
            top: 0,
            width: companion_width,
            height: screen.height,
        },
        source: Rect {
            left: companion_width as i32,
            top: 0,
            width: source_width,
            height: screen.height,
        },
    }
}
