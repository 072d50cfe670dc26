//! Command surface: runtime messages, keyboard shortcuts, the toolbar icon
//! and the context menu, all dispatching into the companion window manager.
//!
//! User-facing problems (no companion window, no video) become notifications
//! in the active tab. Everything else is logged only.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::managers::companion_window::CompanionWindowManager;
use crate::platform::host::{BrowserHost, PageScripting, TabControl};
use crate::services::clipboard_relay::ClipboardRelay;
use crate::services::timestamp_link;
use crate::types::errors::ManagerError;
use crate::types::messages::{MessageResponse, RuntimeMessage, TabMessage};
use crate::types::state::CompanionWindowState;
use crate::types::window::{TabInfo, TabQuery, TabUpdate, WindowHandle};

pub const SHORTCUT_COPY_LINK: &str = "copy-tsnotes-link";
pub const SHORTCUT_OPEN_WINDOW: &str = "open-tsnotes-window";
pub const SHORTCUT_CHANGE_LINK: &str = "change-tsnotes-link";
pub const SHORTCUT_OPEN_PAGE: &str = "open-page-in-tsnotes";

const MENU_AUTO_PASTE: &str = "auto-paste";
const MENU_GET_LINK: &str = "get-tsnotes-link";
const MENU_SPLIT_RATIO: &str = "split-ratio";
const PAGE_SUFFIX: &str = "-page";
const RATIO_PREFIX: &str = "ratio-";

const BLANK_URL: &str = "about:blank";

const PROMPT_OPEN: &str = "Enter a link to open in the companion window (leave empty for a blank window):";
const PROMPT_CHANGE: &str = "Enter a new link to replace the one in the companion window:";

pub const NOTICE_NO_WINDOW: &str = "No active companion window";
pub const NOTICE_NO_TABS: &str = "The companion window has no tabs";
pub const NOTICE_NO_VIDEO: &str = "Could not read the video time, make sure the page shows a visible video";
pub const NOTICE_NO_ACTIVE_TAB: &str = "Could not read the active tab";
pub const NOTICE_COPIED: &str = "Companion link copied to clipboard";
pub const NOTICE_COPIED_AND_PASTED: &str = "Companion link copied and pasted";
pub const NOTICE_LINK_CHANGED: &str = "Companion window link updated";

/// What a user command ended up doing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CommandOutcome {
    #[serde(rename_all = "camelCase")]
    Opened { window_id: WindowHandle },
    #[serde(rename_all = "camelCase")]
    AlreadyOpen { window_id: WindowHandle },
    /// The user dismissed a prompt or left it empty where that means "never mind".
    Cancelled,
    Copied { link: String, pasted: bool },
    LinkChanged { url: String },
    /// A user-facing problem was reported through a notification.
    Notified { message: String },
}

/// Context a menu item appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuContext {
    /// The toolbar icon's menu.
    Action,
    /// The page's right-click menu.
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuItemKind {
    Normal,
    Checkbox,
    Radio,
}

/// One context menu entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub kind: MenuItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub context: MenuContext,
}

fn ratio_title(preset: f64) -> String {
    let left = (preset * 100.0).round() as u32;
    format!("{}% : {}%", left, 100u32.saturating_sub(left))
}

/// Builds the full menu for both contexts from the current state.
///
/// Page-context ids carry a `-page` suffix. A ratio radio is checked when the
/// current ratio is within 0.01 of its preset.
pub fn context_menu(state: &CompanionWindowState, presets: &[f64]) -> Vec<MenuItem> {
    let ratio = state.screen_split_ratio.value();
    let mut items = Vec::new();

    for (context, suffix) in [(MenuContext::Action, ""), (MenuContext::Page, PAGE_SUFFIX)] {
        let item = |id: &str, title: &str, kind: MenuItemKind, checked: Option<bool>, parent: Option<&str>| MenuItem {
            id: format!("{}{}", id, suffix),
            title: title.to_string(),
            kind,
            checked,
            parent_id: parent.map(|p| format!("{}{}", p, suffix)),
            context,
        };

        items.push(item(
            MENU_AUTO_PASTE,
            "Auto-paste links",
            MenuItemKind::Checkbox,
            Some(state.auto_relay),
            None,
        ));
        items.push(item(MENU_GET_LINK, "Get companion link", MenuItemKind::Normal, None, None));
        items.push(item(SHORTCUT_OPEN_WINDOW, "Open companion window", MenuItemKind::Normal, None, None));
        items.push(item(SHORTCUT_CHANGE_LINK, "Change companion window link", MenuItemKind::Normal, None, None));
        items.push(item(SHORTCUT_OPEN_PAGE, "Open this page in companion window", MenuItemKind::Normal, None, None));
        items.push(item(MENU_SPLIT_RATIO, "Window split ratio", MenuItemKind::Normal, None, None));
        for preset in presets {
            items.push(item(
                &format!("{}{}", RATIO_PREFIX, preset),
                &ratio_title(*preset),
                MenuItemKind::Radio,
                Some((ratio - preset).abs() < 0.01),
                Some(MENU_SPLIT_RATIO),
            ));
        }
    }
    items
}

/// Entry points wired to the host's UI events.
#[derive(Clone)]
pub struct CommandSurface {
    host: Arc<dyn BrowserHost>,
    manager: CompanionWindowManager,
    clipboard: Arc<ClipboardRelay>,
}

impl CommandSurface {
    pub fn new(host: Arc<dyn BrowserHost>, manager: CompanionWindowManager) -> Self {
        let clipboard = Arc::new(ClipboardRelay::new(Arc::clone(&host)));
        Self {
            host,
            manager,
            clipboard,
        }
    }

    // ─── Dispatch ───

    /// Answers a message from a content script.
    pub async fn handle_runtime_message(&self, message: &Value) -> MessageResponse {
        let message: RuntimeMessage = match serde_json::from_value(message.clone()) {
            Ok(message) => message,
            Err(e) => {
                debug!("ignoring runtime message: {}", e);
                return MessageResponse::failed("unknown message type");
            }
        };

        match message {
            RuntimeMessage::OpenCompanionLink { url, timestamp } => {
                let timestamp = if timestamp > 0 {
                    timestamp
                } else {
                    timestamp_link::extract_timestamp(&url)
                };
                match self.manager.ensure_companion_window(&url, timestamp).await {
                    Ok(_) => MessageResponse::ok(),
                    Err(e) => MessageResponse::failed(e.to_string()),
                }
            }
        }
    }

    /// Runs a keyboard shortcut by its command name.
    pub async fn handle_shortcut(&self, command: &str) -> Result<Value, String> {
        let outcome = match command {
            SHORTCUT_COPY_LINK => self.copy_current_link(false).await,
            SHORTCUT_OPEN_WINDOW => self.open_blank_window_if_not_exist().await,
            SHORTCUT_CHANGE_LINK => self.change_companion_link().await,
            SHORTCUT_OPEN_PAGE => self.open_current_page_in_companion().await,
            other => return Err(format!("unknown command: {}", other)),
        };
        outcome_to_value(outcome)
    }

    /// The toolbar icon does what the open-window shortcut does.
    pub async fn handle_icon_click(&self) -> Result<CommandOutcome, ManagerError> {
        self.open_blank_window_if_not_exist().await
    }

    pub async fn build_context_menu(&self) -> Vec<MenuItem> {
        let state = self.manager.state().await;
        context_menu(&state, &self.manager.config().split_presets)
    }

    /// Handles a click on a menu item of either context.
    pub async fn handle_menu_click(&self, id: &str, checked: Option<bool>) -> Result<Value, String> {
        let base = id.strip_suffix(PAGE_SUFFIX).unwrap_or(id);

        if base == MENU_AUTO_PASTE {
            let enabled = checked.ok_or("missing checked state")?;
            self.manager
                .set_auto_relay(enabled)
                .await
                .map_err(|e| e.to_string())?;
            return Ok(json!({ "autoRelay": enabled }));
        }

        if let Some(raw) = base.strip_prefix(RATIO_PREFIX) {
            let ratio: f64 = raw
                .parse()
                .map_err(|_| format!("invalid ratio in menu item: {}", id))?;
            let applied = self
                .manager
                .apply_screen_split_ratio(ratio)
                .await
                .map_err(|e| e.to_string())?;
            return Ok(json!({ "screenSplitRatio": applied.value() }));
        }

        match base {
            MENU_GET_LINK => self.handle_shortcut(SHORTCUT_COPY_LINK).await,
            SHORTCUT_OPEN_WINDOW | SHORTCUT_CHANGE_LINK | SHORTCUT_OPEN_PAGE => {
                self.handle_shortcut(base).await
            }
            _ => Err(format!("unknown menu item: {}", id)),
        }
    }

    // ─── Commands ───

    /// Opens a companion window after asking the user for a link, unless one is live.
    ///
    /// A dismissed prompt does nothing. Empty input opens a blank window, and
    /// so does a prompt that cannot be shown.
    pub async fn open_blank_window_if_not_exist(&self) -> Result<CommandOutcome, ManagerError> {
        if let Some(id) = self.manager.live_window().await {
            debug!("companion window {} already open", id);
            return Ok(CommandOutcome::AlreadyOpen { window_id: id });
        }

        let url = match self.active_tab().await {
            None => BLANK_URL.to_string(),
            Some(tab) => match self.host.prompt(tab.id, PROMPT_OPEN, "").await {
                Ok(None) => {
                    info!("open companion window cancelled");
                    return Ok(CommandOutcome::Cancelled);
                }
                Ok(Some(input)) => timestamp_link::normalize_user_url(&input)
                    .unwrap_or_else(|| BLANK_URL.to_string()),
                Err(e) => {
                    warn!("could not prompt for a link: {}", e);
                    BLANK_URL.to_string()
                }
            },
        };

        let id = self.manager.ensure_companion_window(&url, 0).await?;
        Ok(CommandOutcome::Opened { window_id: id })
    }

    /// Copies a markdown link to the companion video's current position.
    ///
    /// The link is pasted into the active tab when auto-relay is on or
    /// `force_paste` is set.
    pub async fn copy_current_link(&self, force_paste: bool) -> Result<CommandOutcome, ManagerError> {
        let Some(window) = self.manager.live_window().await else {
            return Ok(self.notify_outcome(NOTICE_NO_WINDOW).await);
        };
        let tabs = self.host.query_tabs(TabQuery::in_window(window)).await?;
        let Some(tab) = tabs.first() else {
            return Ok(self.notify_outcome(NOTICE_NO_TABS).await);
        };

        let seconds = match self.host.current_video_time(tab.id).await {
            Ok(Some(time)) => time.max(0.0).floor() as u64,
            Ok(None) => {
                warn!("no playing video in companion tab {}", tab.id);
                return Ok(self.notify_outcome(NOTICE_NO_VIDEO).await);
            }
            Err(e) => {
                warn!("could not read video time in tab {}: {}", tab.id, e);
                return Ok(self.notify_outcome(NOTICE_NO_VIDEO).await);
            }
        };

        let link = timestamp_link::markdown_link(&tab.url, seconds);
        if let Err(e) = self.clipboard.write(&link).await {
            return Ok(self.notify_outcome(&format!("Could not copy the link: {}", e)).await);
        }
        info!("copied companion link at {}s", seconds);

        let pasted = force_paste || self.manager.state().await.auto_relay;
        if pasted {
            self.paste_into_active_tab().await;
            self.notify(NOTICE_COPIED_AND_PASTED).await;
        } else {
            self.notify(NOTICE_COPIED).await;
        }
        Ok(CommandOutcome::Copied { link, pasted })
    }

    /// Asks for a new link and loads it into the companion tab.
    pub async fn change_companion_link(&self) -> Result<CommandOutcome, ManagerError> {
        let Some(window) = self.manager.live_window().await else {
            return Ok(self.notify_outcome(NOTICE_NO_WINDOW).await);
        };
        let Some(active) = self.active_tab().await else {
            return Ok(CommandOutcome::Cancelled);
        };

        let tabs = self.host.query_tabs(TabQuery::in_window(window)).await?;
        let current = tabs
            .first()
            .map(|t| timestamp_link::clean_url(&t.url))
            .unwrap_or_else(|| BLANK_URL.to_string());

        let answer = match self.host.prompt(active.id, PROMPT_CHANGE, &current).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("could not prompt for a new link: {}", e);
                return Ok(self.notify_outcome(&format!("Could not read input: {}", e)).await);
            }
        };
        let Some(url) = answer.as_deref().and_then(timestamp_link::normalize_user_url) else {
            debug!("change companion link cancelled");
            return Ok(CommandOutcome::Cancelled);
        };
        let Some(tab) = tabs.first() else {
            return Ok(self.notify_outcome(NOTICE_NO_TABS).await);
        };

        self.host
            .update_tab(
                tab.id,
                TabUpdate {
                    url: Some(url.clone()),
                    active: None,
                },
            )
            .await?;
        info!("companion link changed to {}", url);
        self.notify(NOTICE_LINK_CHANGED).await;
        Ok(CommandOutcome::LinkChanged { url })
    }

    /// Moves the active page into the companion window and closes its tab.
    pub async fn open_current_page_in_companion(&self) -> Result<CommandOutcome, ManagerError> {
        let Some(active) = self.active_tab().await else {
            return Ok(self.notify_outcome(NOTICE_NO_ACTIVE_TAB).await);
        };
        if self.manager.live_window().await == Some(active.window_id) {
            debug!("active tab already lives in the companion window");
            return Ok(CommandOutcome::AlreadyOpen {
                window_id: active.window_id,
            });
        }

        let id = match self
            .manager
            .load_in_companion(&active.url, Some(active.window_id))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.notify(&format!("Operation failed: {}", e)).await;
                return Err(e);
            }
        };

        if let Err(e) = self.host.remove_tab(active.id).await {
            warn!("could not close source tab {}: {}", active.id, e);
        }
        Ok(CommandOutcome::Opened { window_id: id })
    }

    // ─── Helpers ───

    async fn active_tab(&self) -> Option<TabInfo> {
        match self.host.query_tabs(TabQuery::active_in_current_window()).await {
            Ok(tabs) => tabs.into_iter().next(),
            Err(e) => {
                debug!("active tab query failed: {}", e);
                None
            }
        }
    }

    async fn paste_into_active_tab(&self) {
        let Some(tab) = self.active_tab().await else {
            return;
        };
        if let Err(e) = self.host.send_message(tab.id, TabMessage::PasteFromClipboard).await {
            warn!("could not paste into tab {}: {}", tab.id, e);
        }
    }

    /// Shows `message` in the active tab. Delivery failures are logged only.
    pub async fn notify(&self, message: &str) {
        let Some(tab) = self.active_tab().await else {
            debug!("no active tab for notification: {}", message);
            return;
        };
        let notification = TabMessage::ShowNotification {
            message: message.to_string(),
        };
        if let Err(e) = self.host.send_message(tab.id, notification).await {
            warn!("notification not delivered to tab {}: {}", tab.id, e);
        }
    }

    async fn notify_outcome(&self, message: &str) -> CommandOutcome {
        self.notify(message).await;
        CommandOutcome::Notified {
            message: message.to_string(),
        }
    }
}

fn outcome_to_value(outcome: Result<CommandOutcome, ManagerError>) -> Result<Value, String> {
    let outcome = outcome.map_err(|e| e.to_string())?;
    serde_json::to_value(outcome).map_err(|e| e.to_string())
}
