//! Host capability traits.
//!
//! The manager never talks to a browser directly. It drives these traits, which
//! a real extension backend or [`super::memory::MemoryBrowser`] implements.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::types::errors::HostError;
use crate::types::messages::{MessageResponse, TabMessage};
use crate::types::window::{
    HostEvent, TabCreateOptions, TabId, TabInfo, TabQuery, TabUpdate, WindowCreateOptions,
    WindowHandle, WindowInfo, WindowUpdate,
};

/// Window management.
#[async_trait]
pub trait WindowControl: Send + Sync {
    async fn create_window(&self, options: WindowCreateOptions) -> Result<WindowInfo, HostError>;
    async fn update_window(&self, id: WindowHandle, update: WindowUpdate) -> Result<(), HostError>;
    /// Fails with [`HostError::WindowNotFound`] when the window is gone; used as the liveness probe.
    async fn get_window(&self, id: WindowHandle) -> Result<WindowInfo, HostError>;
    async fn get_all_windows(&self) -> Result<Vec<WindowInfo>, HostError>;
    async fn remove_window(&self, id: WindowHandle) -> Result<(), HostError>;
    /// The window the user is currently working in.
    async fn current_window(&self) -> Result<WindowInfo, HostError>;
}

/// Tab management and content-script messaging.
#[async_trait]
pub trait TabControl: Send + Sync {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, HostError>;
    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<(), HostError>;
    async fn create_tab(&self, options: TabCreateOptions) -> Result<TabInfo, HostError>;
    async fn remove_tab(&self, id: TabId) -> Result<(), HostError>;
    /// Fails with [`HostError::NoReceiver`] when no content script listens in the tab.
    async fn send_message(&self, id: TabId, message: TabMessage)
        -> Result<MessageResponse, HostError>;
}

/// Functions run inside a tab's page context.
#[async_trait]
pub trait PageScripting: Send + Sync {
    /// Shows a text prompt. `None` means the user dismissed it.
    async fn prompt(&self, tab: TabId, message: &str, default: &str)
        -> Result<Option<String>, HostError>;
    async fn user_agent(&self, tab: TabId) -> Result<String, HostError>;
    /// Playback position of the first visible video, `None` if the page has none.
    async fn current_video_time(&self, tab: TabId) -> Result<Option<f64>, HostError>;
    /// Copies text to the clipboard from within the page.
    async fn copy_text(&self, tab: TabId, text: &str) -> Result<(), HostError>;
}

/// Direct clipboard access, where the background process has it.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), HostError>;
    async fn read_text(&self) -> Result<String, HostError>;
}

/// Window/tab lifecycle events. Dropping the receiver unsubscribes.
pub trait HostEvents: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;
}

/// Everything the companion window manager needs from its host.
pub trait BrowserHost: WindowControl + TabControl + PageScripting + Clipboard + HostEvents {}

impl<T> BrowserHost for T where T: WindowControl + TabControl + PageScripting + Clipboard + HostEvents {}
