use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-assigned identifier of an application window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub i64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-assigned identifier of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Window position and size in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// Kind of window the host should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum WindowKind {
    #[default]
    Normal,
    Popup,
}

/// Snapshot of a live window as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowHandle,
    pub kind: WindowKind,
    pub bounds: Rect,
    pub focused: bool,
}

/// Options for creating a window. `bounds` of `None` lets the host pick geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowCreateOptions {
    pub url: String,
    pub kind: WindowKind,
    pub bounds: Option<Rect>,
}

/// Partial update applied to an existing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WindowUpdate {
    pub bounds: Option<Rect>,
    pub focused: Option<bool>,
}

impl WindowUpdate {
    pub fn focus() -> Self {
        Self {
            bounds: None,
            focused: Some(true),
        }
    }

    pub fn bounds(rect: Rect) -> Self {
        Self {
            bounds: Some(rect),
            focused: None,
        }
    }
}

/// Loading status of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// Snapshot of a tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowHandle,
    pub index: usize,
    pub url: String,
    pub active: bool,
    pub status: TabStatus,
}

/// Filter for tab queries. Unset fields match everything.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabQuery {
    pub window_id: Option<WindowHandle>,
    pub active: Option<bool>,
    pub current_window: bool,
}

impl TabQuery {
    /// All tabs of one window, in index order.
    pub fn in_window(window_id: WindowHandle) -> Self {
        Self {
            window_id: Some(window_id),
            ..Self::default()
        }
    }

    /// The active tab of the focused window.
    pub fn active_in_current_window() -> Self {
        Self {
            window_id: None,
            active: Some(true),
            current_window: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabUpdate {
    pub url: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabCreateOptions {
    pub window_id: Option<WindowHandle>,
    pub url: String,
    pub active: bool,
}

/// Lifecycle notifications pushed by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    WindowRemoved(WindowHandle),
    TabUpdated {
        tab_id: TabId,
        window_id: WindowHandle,
        status: TabStatus,
    },
}
