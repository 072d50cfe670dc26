//! In-memory browser host.
//!
//! Implements every host capability over plain data structures so the manager
//! can run headless: under tests and behind the JSON-RPC harness. Knobs for
//! latency, failures, prompt answers and video positions let callers stage
//! the situations a real browser produces.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::sync::broadcast;

use super::host::{Clipboard, HostEvents, PageScripting, TabControl, WindowControl};
use crate::types::errors::HostError;
use crate::types::messages::{MessageResponse, TabMessage};
use crate::types::window::{
    HostEvent, Rect, TabCreateOptions, TabId, TabInfo, TabQuery, TabStatus, TabUpdate,
    WindowCreateOptions, WindowHandle, WindowInfo, WindowKind, WindowUpdate,
};

const DEFAULT_BOUNDS: Rect = Rect {
    left: 0,
    top: 0,
    width: 1280,
    height: 800,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Default)]
struct BrowserState {
    windows: BTreeMap<WindowHandle, WindowInfo>,
    tabs: Vec<TabInfo>,
    next_window_id: i64,
    next_tab_id: i64,
    focused: Option<WindowHandle>,
    create_latency: Duration,
    failing_creates: usize,
    reject_geometry: bool,
    rejected_updates: HashSet<WindowHandle>,
    auto_complete_loads: bool,
    create_calls: usize,
    created: Vec<WindowCreateOptions>,
    updates: Vec<(WindowHandle, WindowUpdate)>,
    deaf_tabs: HashSet<TabId>,
    messages: Vec<(TabId, TabMessage)>,
    prompt_answers: VecDeque<Option<String>>,
    prompts: Vec<(String, String)>,
    user_agent: Option<String>,
    video_times: HashMap<TabId, f64>,
    clipboard: String,
    clipboard_broken: bool,
}

/// A complete in-memory [`super::host::BrowserHost`].
pub struct MemoryBrowser {
    state: Mutex<BrowserState>,
    events: broadcast::Sender<HostEvent>,
}

impl MemoryBrowser {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(BrowserState {
                next_window_id: 1,
                next_tab_id: 100,
                auto_complete_loads: true,
                ..BrowserState::default()
            }),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: HostEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn insert_tab(state: &mut BrowserState, window_id: WindowHandle, url: &str, active: bool) -> TabInfo {
        let id = TabId(state.next_tab_id);
        state.next_tab_id += 1;
        let index = state.tabs.iter().filter(|t| t.window_id == window_id).count();
        if active {
            for tab in state.tabs.iter_mut().filter(|t| t.window_id == window_id) {
                tab.active = false;
            }
        }
        let tab = TabInfo {
            id,
            window_id,
            index,
            url: url.to_string(),
            active: active || index == 0,
            status: TabStatus::Loading,
        };
        state.tabs.push(tab.clone());
        tab
    }

    fn insert_window(state: &mut BrowserState, kind: WindowKind, bounds: Rect, url: &str) -> (WindowInfo, TabInfo) {
        let id = WindowHandle(state.next_window_id);
        state.next_window_id += 1;
        for window in state.windows.values_mut() {
            window.focused = false;
        }
        let info = WindowInfo {
            id,
            kind,
            bounds,
            focused: true,
        };
        state.windows.insert(id, info.clone());
        state.focused = Some(id);
        let tab = Self::insert_tab(state, id, url, true);
        (info, tab)
    }

    /// Drops a window and its tabs. Returns false if it did not exist.
    fn drop_window(state: &mut BrowserState, id: WindowHandle) -> bool {
        if state.windows.remove(&id).is_none() {
            return false;
        }
        state.tabs.retain(|t| t.window_id != id);
        if state.focused == Some(id) {
            state.focused = state.windows.keys().next_back().copied();
            if let Some(next) = state.focused {
                if let Some(window) = state.windows.get_mut(&next) {
                    window.focused = true;
                }
            }
        }
        true
    }

    fn finish_load(&self, tab: &TabInfo) {
        let complete = {
            let mut state = self.state();
            if !state.auto_complete_loads {
                return;
            }
            match state.tabs.iter_mut().find(|t| t.id == tab.id) {
                Some(t) => {
                    t.status = TabStatus::Complete;
                    true
                }
                None => false,
            }
        };
        if complete {
            self.emit(HostEvent::TabUpdated {
                tab_id: tab.id,
                window_id: tab.window_id,
                status: TabStatus::Complete,
            });
        }
    }

    // ─── Staging helpers ───

    /// Opens a normal window with one tab, as if the user had done it.
    pub fn open_window(&self, url: &str, bounds: Rect) -> (WindowHandle, TabId) {
        let mut state = self.state();
        let (info, tab) = Self::insert_window(&mut state, WindowKind::Normal, bounds, url);
        if let Some(t) = state.tabs.iter_mut().find(|t| t.id == tab.id) {
            t.status = TabStatus::Complete;
        }
        (info.id, tab.id)
    }

    /// Closes a window outside of any manager call.
    pub fn close_window_externally(&self, id: WindowHandle) {
        let removed = Self::drop_window(&mut self.state(), id);
        if removed {
            self.emit(HostEvent::WindowRemoved(id));
        }
    }

    /// Drops a window without telling subscribers, like a close that happened
    /// while the background process was suspended.
    pub fn vanish_window(&self, id: WindowHandle) {
        Self::drop_window(&mut self.state(), id);
    }

    /// Marks a tab loaded and broadcasts the event.
    pub fn complete_load(&self, tab_id: TabId) {
        let window_id = {
            let mut state = self.state();
            match state.tabs.iter_mut().find(|t| t.id == tab_id) {
                Some(t) => {
                    t.status = TabStatus::Complete;
                    t.window_id
                }
                None => return,
            }
        };
        self.emit(HostEvent::TabUpdated {
            tab_id,
            window_id,
            status: TabStatus::Complete,
        });
    }

    pub fn focus(&self, id: WindowHandle) {
        let mut state = self.state();
        if !state.windows.contains_key(&id) {
            return;
        }
        for (handle, window) in state.windows.iter_mut() {
            window.focused = *handle == id;
        }
        state.focused = Some(id);
    }

    pub fn set_create_latency(&self, latency: Duration) {
        self.state().create_latency = latency;
    }

    /// The next `count` create calls fail.
    pub fn fail_next_creates(&self, count: usize) {
        self.state().failing_creates = count;
    }

    /// Reject any create or update that carries explicit geometry.
    pub fn set_reject_geometry(&self, reject: bool) {
        self.state().reject_geometry = reject;
    }

    pub fn reject_updates_for(&self, id: WindowHandle) {
        self.state().rejected_updates.insert(id);
    }

    /// When false, new tabs stay `Loading` until [`Self::complete_load`].
    pub fn set_auto_complete_loads(&self, auto: bool) {
        self.state().auto_complete_loads = auto;
    }

    pub fn set_receiver(&self, tab: TabId, listening: bool) {
        let mut state = self.state();
        if listening {
            state.deaf_tabs.remove(&tab);
        } else {
            state.deaf_tabs.insert(tab);
        }
    }

    pub fn push_prompt_answer(&self, answer: Option<&str>) {
        self.state().prompt_answers.push_back(answer.map(str::to_string));
    }

    pub fn set_user_agent(&self, user_agent: Option<&str>) {
        self.state().user_agent = user_agent.map(str::to_string);
    }

    pub fn set_video_time(&self, tab: TabId, seconds: f64) {
        self.state().video_times.insert(tab, seconds);
    }

    pub fn set_clipboard_broken(&self, broken: bool) {
        self.state().clipboard_broken = broken;
    }

    // ─── Inspection ───

    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    pub fn created_options(&self) -> Vec<WindowCreateOptions> {
        self.state().created.clone()
    }

    pub fn window_updates(&self) -> Vec<(WindowHandle, WindowUpdate)> {
        self.state().updates.clone()
    }

    pub fn window(&self, id: WindowHandle) -> Option<WindowInfo> {
        self.state().windows.get(&id).cloned()
    }

    pub fn window_count(&self) -> usize {
        self.state().windows.len()
    }

    pub fn tabs_in(&self, id: WindowHandle) -> Vec<TabInfo> {
        let mut tabs: Vec<TabInfo> = self
            .state()
            .tabs
            .iter()
            .filter(|t| t.window_id == id)
            .cloned()
            .collect();
        tabs.sort_by_key(|t| t.index);
        tabs
    }

    pub fn messages_to(&self, tab: TabId) -> Vec<TabMessage> {
        self.state()
            .messages
            .iter()
            .filter(|(id, _)| *id == tab)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn prompts_shown(&self) -> Vec<(String, String)> {
        self.state().prompts.clone()
    }

    pub fn clipboard_contents(&self) -> String {
        self.state().clipboard.clone()
    }
}

impl Default for MemoryBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowControl for MemoryBrowser {
    async fn create_window(&self, options: WindowCreateOptions) -> Result<WindowInfo, HostError> {
        let latency = {
            let mut state = self.state();
            state.create_calls += 1;
            state.create_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let (info, tab) = {
            let mut state = self.state();
            if state.failing_creates > 0 {
                state.failing_creates -= 1;
                return Err(HostError::Rejected("window creation refused".to_string()));
            }
            if state.reject_geometry && options.bounds.is_some() {
                return Err(HostError::Rejected("explicit geometry not supported".to_string()));
            }
            state.created.push(options.clone());
            let bounds = options.bounds.unwrap_or(DEFAULT_BOUNDS);
            Self::insert_window(&mut state, options.kind, bounds, &options.url)
        };
        debug!("memory host: created window {} ({})", info.id, options.url);
        self.finish_load(&tab);
        Ok(info)
    }

    async fn update_window(&self, id: WindowHandle, update: WindowUpdate) -> Result<(), HostError> {
        let mut state = self.state();
        if !state.windows.contains_key(&id) {
            return Err(HostError::WindowNotFound(id));
        }
        if update.bounds.is_some() && (state.reject_geometry || state.rejected_updates.contains(&id)) {
            return Err(HostError::Rejected(format!("resize of window {} refused", id)));
        }
        if update.focused == Some(true) {
            for (handle, window) in state.windows.iter_mut() {
                window.focused = *handle == id;
            }
            state.focused = Some(id);
        }
        if let (Some(bounds), Some(window)) = (update.bounds, state.windows.get_mut(&id)) {
            window.bounds = bounds;
        }
        state.updates.push((id, update));
        Ok(())
    }

    async fn get_window(&self, id: WindowHandle) -> Result<WindowInfo, HostError> {
        self.state()
            .windows
            .get(&id)
            .cloned()
            .ok_or(HostError::WindowNotFound(id))
    }

    async fn get_all_windows(&self) -> Result<Vec<WindowInfo>, HostError> {
        Ok(self.state().windows.values().cloned().collect())
    }

    async fn remove_window(&self, id: WindowHandle) -> Result<(), HostError> {
        let removed = Self::drop_window(&mut self.state(), id);
        if !removed {
            return Err(HostError::WindowNotFound(id));
        }
        self.emit(HostEvent::WindowRemoved(id));
        Ok(())
    }

    async fn current_window(&self) -> Result<WindowInfo, HostError> {
        let state = self.state();
        state
            .focused
            .and_then(|id| state.windows.get(&id).cloned())
            .ok_or_else(|| HostError::Rejected("no current window".to_string()))
    }
}

#[async_trait]
impl TabControl for MemoryBrowser {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, HostError> {
        let state = self.state();
        let mut tabs: Vec<TabInfo> = state
            .tabs
            .iter()
            .filter(|t| query.window_id.map_or(true, |w| t.window_id == w))
            .filter(|t| query.active.map_or(true, |a| t.active == a))
            .filter(|t| !query.current_window || state.focused == Some(t.window_id))
            .cloned()
            .collect();
        tabs.sort_by_key(|t| (t.window_id, t.index));
        Ok(tabs)
    }

    async fn update_tab(&self, id: TabId, update: TabUpdate) -> Result<(), HostError> {
        let loaded = {
            let mut state = self.state();
            let tab = state
                .tabs
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(HostError::TabNotFound(id))?;
            let mut reloaded = None;
            if let Some(url) = update.url {
                tab.url = url;
                tab.status = TabStatus::Loading;
                reloaded = Some(tab.clone());
            }
            if let Some(active) = update.active {
                tab.active = active;
            }
            reloaded
        };
        if let Some(tab) = loaded {
            self.finish_load(&tab);
        }
        Ok(())
    }

    async fn create_tab(&self, options: TabCreateOptions) -> Result<TabInfo, HostError> {
        let tab = {
            let mut state = self.state();
            let window_id = match options.window_id.or(state.focused) {
                Some(id) if state.windows.contains_key(&id) => id,
                Some(id) => return Err(HostError::WindowNotFound(id)),
                None => return Err(HostError::Rejected("no window for new tab".to_string())),
            };
            Self::insert_tab(&mut state, window_id, &options.url, options.active)
        };
        self.finish_load(&tab);
        Ok(tab)
    }

    async fn remove_tab(&self, id: TabId) -> Result<(), HostError> {
        let emptied = {
            let mut state = self.state();
            let pos = state
                .tabs
                .iter()
                .position(|t| t.id == id)
                .ok_or(HostError::TabNotFound(id))?;
            let tab = state.tabs.remove(pos);
            for other in state.tabs.iter_mut().filter(|t| t.window_id == tab.window_id) {
                if other.index > tab.index {
                    other.index -= 1;
                }
            }
            let window_empty = !state.tabs.iter().any(|t| t.window_id == tab.window_id);
            if window_empty && Self::drop_window(&mut state, tab.window_id) {
                Some(tab.window_id)
            } else {
                None
            }
        };
        if let Some(window_id) = emptied {
            self.emit(HostEvent::WindowRemoved(window_id));
        }
        Ok(())
    }

    async fn send_message(&self, id: TabId, message: TabMessage) -> Result<MessageResponse, HostError> {
        let mut state = self.state();
        if !state.tabs.iter().any(|t| t.id == id) {
            return Err(HostError::TabNotFound(id));
        }
        if state.deaf_tabs.contains(&id) {
            return Err(HostError::NoReceiver(id));
        }
        let response = match &message {
            TabMessage::JumpToTimestamp { .. } if !state.video_times.contains_key(&id) => {
                MessageResponse::failed("no video element found")
            }
            TabMessage::JumpToTimestamp { timestamp } => {
                state.video_times.insert(id, *timestamp as f64);
                MessageResponse::ok()
            }
            TabMessage::CopyToClipboard { text } => {
                state.clipboard = text.clone();
                MessageResponse::ok()
            }
            _ => MessageResponse::ok(),
        };
        state.messages.push((id, message));
        Ok(response)
    }
}

#[async_trait]
impl PageScripting for MemoryBrowser {
    async fn prompt(&self, tab: TabId, message: &str, default: &str) -> Result<Option<String>, HostError> {
        let mut state = self.state();
        if !state.tabs.iter().any(|t| t.id == tab) {
            return Err(HostError::TabNotFound(tab));
        }
        state.prompts.push((message.to_string(), default.to_string()));
        Ok(state.prompt_answers.pop_front().flatten())
    }

    async fn user_agent(&self, tab: TabId) -> Result<String, HostError> {
        let state = self.state();
        if !state.tabs.iter().any(|t| t.id == tab) {
            return Err(HostError::TabNotFound(tab));
        }
        state
            .user_agent
            .clone()
            .ok_or_else(|| HostError::ScriptFailed("page scripting unavailable".to_string()))
    }

    async fn current_video_time(&self, tab: TabId) -> Result<Option<f64>, HostError> {
        let state = self.state();
        if !state.tabs.iter().any(|t| t.id == tab) {
            return Err(HostError::TabNotFound(tab));
        }
        Ok(state.video_times.get(&tab).copied())
    }

    async fn copy_text(&self, tab: TabId, text: &str) -> Result<(), HostError> {
        let mut state = self.state();
        if !state.tabs.iter().any(|t| t.id == tab) {
            return Err(HostError::TabNotFound(tab));
        }
        state.clipboard = text.to_string();
        Ok(())
    }
}

#[async_trait]
impl Clipboard for MemoryBrowser {
    async fn write_text(&self, text: &str) -> Result<(), HostError> {
        let mut state = self.state();
        if state.clipboard_broken {
            return Err(HostError::Rejected("clipboard unavailable".to_string()));
        }
        state.clipboard = text.to_string();
        Ok(())
    }

    async fn read_text(&self) -> Result<String, HostError> {
        let state = self.state();
        if state.clipboard_broken {
            return Err(HostError::Rejected("clipboard unavailable".to_string()));
        }
        Ok(state.clipboard.clone())
    }
}

impl HostEvents for MemoryBrowser {
    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }
}
