//! Clipboard writes with page-context delegation.
//!
//! A background process often lacks clipboard access, so the write is first
//! handed to the content script of the active tab, then to a page script in
//! that tab, and only then to the host clipboard.

use std::sync::Arc;

use log::{debug, warn};

use crate::platform::host::{BrowserHost, Clipboard, PageScripting, TabControl};
use crate::types::errors::HostError;
use crate::types::messages::TabMessage;
use crate::types::window::TabQuery;

/// Which route ended up writing the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardRoute {
    ContentScript,
    PageScript,
    Host,
}

pub struct ClipboardRelay {
    host: Arc<dyn BrowserHost>,
}

impl ClipboardRelay {
    pub fn new(host: Arc<dyn BrowserHost>) -> Self {
        Self { host }
    }

    /// Writes `text`, trying each route in turn. Fails only if every route fails.
    pub async fn write(&self, text: &str) -> Result<ClipboardRoute, HostError> {
        let active = self
            .host
            .query_tabs(TabQuery::active_in_current_window())
            .await
            .ok()
            .and_then(|tabs| tabs.into_iter().next());

        if let Some(tab) = &active {
            let message = TabMessage::CopyToClipboard {
                text: text.to_string(),
            };
            match self.host.send_message(tab.id, message).await {
                Ok(response) if response.success => return Ok(ClipboardRoute::ContentScript),
                Ok(response) => debug!("content script copy declined: {:?}", response.error),
                Err(e) => debug!("content script copy unavailable: {}", e),
            }

            match self.host.copy_text(tab.id, text).await {
                Ok(()) => return Ok(ClipboardRoute::PageScript),
                Err(e) => debug!("page script copy failed: {}", e),
            }
        }

        match self.host.write_text(text).await {
            Ok(()) => Ok(ClipboardRoute::Host),
            Err(e) => {
                warn!("clipboard write failed on every route: {}", e);
                Err(e)
            }
        }
    }

    pub async fn read(&self) -> Result<String, HostError> {
        self.host.read_text().await
    }
}
