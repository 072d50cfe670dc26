//! Companion window manager.
//!
//! Owns the single companion window: creates it through the serialization
//! queue, lays it out next to the window the request came from, relays jump
//! commands into it and falls back to `Idle` whenever the window turns out to
//! be gone. Persisted state is advisory and re-probed before it is trusted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use super::request_queue::SerialQueue;
use crate::platform::host::{BrowserHost, HostEvents, TabControl, WindowControl};
use crate::services::host_detector::HostDetector;
use crate::services::kv_store::KeyValueStore;
use crate::services::layout::{estimate_screen, plan_layout, LayoutPlan};
use crate::services::timestamp_link;
use crate::types::config::ManagerConfig;
use crate::types::errors::{HostError, ManagerError};
use crate::types::messages::TabMessage;
use crate::types::state::{
    CompanionWindowState, ManagerPhase, SplitRatio, KEY_AUTO_RELAY, KEY_SPLIT_RATIO, KEY_WINDOW_ID,
};
use crate::types::window::{
    HostEvent, TabCreateOptions, TabInfo, TabQuery, TabStatus, TabUpdate, WindowCreateOptions,
    WindowHandle, WindowKind, WindowUpdate,
};

/// Result of relaying a jump command into a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The content script accepted the jump.
    Delivered,
    /// The window has no tabs; nothing to jump.
    NoTabs,
    /// No receiver or no video in the tab. Logged, not retried.
    Undelivered,
}

struct Tracked {
    phase: ManagerPhase,
    state: CompanionWindowState,
    /// Window whose close events are already being watched.
    watching: Option<WindowHandle>,
}

struct Inner {
    host: Arc<dyn BrowserHost>,
    store: Arc<dyn KeyValueStore>,
    detector: Arc<dyn HostDetector>,
    config: ManagerConfig,
    tracked: Mutex<Tracked>,
    queue: SerialQueue,
}

/// Handle to the companion window manager. Clones share one manager.
#[derive(Clone)]
pub struct CompanionWindowManager {
    inner: Arc<Inner>,
}

impl CompanionWindowManager {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        store: Arc<dyn KeyValueStore>,
        detector: Arc<dyn HostDetector>,
        config: ManagerConfig,
    ) -> Self {
        let state = CompanionWindowState {
            window_id: None,
            screen_split_ratio: SplitRatio::new(config.default_split_ratio).unwrap_or_default(),
            auto_relay: config.default_auto_relay,
        };
        Self {
            inner: Arc::new(Inner {
                host,
                store,
                detector,
                config,
                tracked: Mutex::new(Tracked {
                    phase: ManagerPhase::Idle,
                    state,
                    watching: None,
                }),
                queue: SerialQueue::new(),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    pub fn queue(&self) -> &SerialQueue {
        &self.inner.queue
    }

    pub async fn phase(&self) -> ManagerPhase {
        self.inner.tracked.lock().await.phase
    }

    /// Snapshot of the persisted state as the manager currently sees it.
    pub async fn state(&self) -> CompanionWindowState {
        self.inner.tracked.lock().await.state.clone()
    }

    // ─── Startup ───

    /// Rebuilds state from the store, trusting the stored window only if it is live.
    ///
    /// Safe to call repeatedly; runs in turn with creation requests.
    ///
    /// # Errors
    /// Returns `ManagerError::Store` if the stored state cannot be read or the
    /// dead window id cannot be cleared.
    pub async fn reconcile_on_startup(&self) -> Result<ManagerPhase, ManagerError> {
        let _permit = self.inner.queue.acquire().await?;

        let stored = self
            .inner
            .store
            .get(&[KEY_WINDOW_ID, KEY_SPLIT_RATIO, KEY_AUTO_RELAY])
            .await?;

        let mut tracked = self.inner.tracked.lock().await;
        if let Some(ratio) = stored
            .get(KEY_SPLIT_RATIO)
            .and_then(Value::as_f64)
            .and_then(|r| SplitRatio::new(r).ok())
        {
            tracked.state.screen_split_ratio = ratio;
        }
        if let Some(auto_relay) = stored.get(KEY_AUTO_RELAY).and_then(Value::as_bool) {
            tracked.state.auto_relay = auto_relay;
        }

        let stored_window = stored.get(KEY_WINDOW_ID).and_then(Value::as_i64).map(WindowHandle);
        let live = match stored_window {
            Some(id) if self.is_live(id).await => Some(id),
            Some(id) => {
                info!("stored companion window {} is gone, clearing it", id);
                self.inner.store.remove(&[KEY_WINDOW_ID]).await?;
                None
            }
            None => None,
        };

        tracked.state.window_id = live;
        tracked.phase = match live {
            Some(id) => ManagerPhase::Active(id),
            None => ManagerPhase::Idle,
        };
        if let Some(id) = live {
            if tracked.watching != Some(id) {
                tracked.watching = Some(id);
                self.spawn_close_watcher(self.inner.host.subscribe(), id);
            }
        }

        info!("reconciled companion window state: {:?}", tracked.phase);
        Ok(tracked.phase)
    }

    // ─── Requests ───

    /// Focuses the companion window and jumps it to `timestamp`, creating the
    /// window first if none is live.
    ///
    /// Calls are serviced one at a time in arrival order, so concurrent calls
    /// never create more than one window. A live window is always sent the
    /// jump, including a jump back to 0. A new window only gets one for a
    /// nonzero `timestamp`.
    ///
    /// # Errors
    /// Returns `ManagerError::CreationFailed` if the host refuses the new window,
    /// or `ManagerError::Host` if the live window's tabs cannot be listed.
    pub async fn ensure_companion_window(
        &self,
        url: &str,
        timestamp: u64,
    ) -> Result<WindowHandle, ManagerError> {
        let _permit = self.inner.queue.acquire().await?;

        if let Some(id) = self.live_window().await {
            debug!("companion window {} is live, focusing", id);
            if let Err(e) = self.inner.host.update_window(id, WindowUpdate::focus()).await {
                warn!("could not focus companion window {}: {}", id, e);
            }
            self.relay_jump_command(id, timestamp).await?;
            return Ok(id);
        }

        let source = match self.inner.host.current_window().await {
            Ok(window) => Some(window.id),
            Err(e) => {
                debug!("no source window: {}", e);
                None
            }
        };
        let url = timestamp_link::strip_marker(url);
        self.create_companion_window(&url, timestamp, source).await
    }

    /// Loads `url` into the companion window, creating the window if none is live.
    ///
    /// Reuses the first tab, or opens one if the window has none, then focuses
    /// the window. `source` receives the other half of the layout on creation.
    ///
    /// # Errors
    /// Returns `ManagerError::CreationFailed` if a new window is refused, or
    /// `ManagerError::Host` if the companion tab cannot be found or navigated.
    pub async fn load_in_companion(
        &self,
        url: &str,
        source: Option<WindowHandle>,
    ) -> Result<WindowHandle, ManagerError> {
        let _permit = self.inner.queue.acquire().await?;
        let host = &self.inner.host;

        let Some(id) = self.live_window().await else {
            return self.create_companion_window(url, 0, source).await;
        };

        let tabs = host.query_tabs(TabQuery::in_window(id)).await?;
        match tabs.first() {
            Some(tab) => {
                host.update_tab(
                    tab.id,
                    TabUpdate {
                        url: Some(url.to_string()),
                        active: None,
                    },
                )
                .await?;
            }
            None => {
                host.create_tab(TabCreateOptions {
                    window_id: Some(id),
                    url: url.to_string(),
                    active: true,
                })
                .await?;
            }
        }
        if let Err(e) = host.update_window(id, WindowUpdate::focus()).await {
            warn!("could not focus companion window {}: {}", id, e);
        }
        info!("loaded {} into companion window {}", url, id);
        Ok(id)
    }

    /// Creates the companion window and lays it out against `source`.
    ///
    /// Callers outside this manager should go through
    /// [`Self::ensure_companion_window`], which serializes creation.
    ///
    /// # Errors
    /// Returns `ManagerError::CreationFailed` if the host refuses the window. The
    /// manager is back in `Idle` when this happens.
    pub async fn create_companion_window(
        &self,
        url: &str,
        timestamp: u64,
        source: Option<WindowHandle>,
    ) -> Result<WindowHandle, ManagerError> {
        self.inner.tracked.lock().await.phase = ManagerPhase::Creating;

        match self.create_and_arrange(url, timestamp, source).await {
            Ok(id) => Ok(id),
            Err(e) => {
                error!("companion window creation failed: {}", e);
                let mut tracked = self.inner.tracked.lock().await;
                tracked.phase = ManagerPhase::Idle;
                tracked.state.window_id = None;
                Err(e)
            }
        }
    }

    async fn create_and_arrange(
        &self,
        url: &str,
        timestamp: u64,
        source: Option<WindowHandle>,
    ) -> Result<WindowHandle, ManagerError> {
        let host = &self.inner.host;

        self.close_stale_windows(source).await;

        let profile = self.inner.detector.detect().await;
        let ratio = self.inner.tracked.lock().await.state.screen_split_ratio;
        let plan = self.plan(ratio).await;

        let options = WindowCreateOptions {
            url: url.to_string(),
            kind: WindowKind::Popup,
            bounds: profile.supports_geometry().then_some(plan.companion),
        };

        if let Some(delay) = profile.creation_delay {
            debug!("waiting {:?} before creating window on {:?}", delay, profile.kind);
            tokio::time::sleep(delay).await;
        }

        // Subscribe before creating so no early event is missed.
        let close_events = host.subscribe();
        let load_events = host.subscribe();

        let window = host
            .create_window(options)
            .await
            .map_err(|e| ManagerError::CreationFailed(e.to_string()))?;
        let id = window.id;
        info!("created companion window {} for {}", id, url);

        {
            let mut tracked = self.inner.tracked.lock().await;
            tracked.state.window_id = Some(id);
            tracked.phase = ManagerPhase::Active(id);
            tracked.watching = Some(id);
        }
        if let Err(e) = self
            .inner
            .store
            .set(HashMap::from([(KEY_WINDOW_ID.to_string(), Value::from(id.0))]))
            .await
        {
            warn!("could not persist companion window {}: {}", id, e);
        }

        let resizable_source = source.filter(|s| *s != id && profile.supports_geometry());
        if let Some(source) = resizable_source {
            if let Err(e) = host.update_window(source, WindowUpdate::bounds(plan.source)).await {
                warn!("could not resize source window {}: {}", source, e);
            }
        }

        self.spawn_close_watcher(close_events, id);
        if timestamp > 0 {
            self.spawn_jump_watcher(load_events, id, timestamp);
        }

        Ok(id)
    }

    /// Closes leftover companion windows from earlier sessions, never `keep`.
    async fn close_stale_windows(&self, keep: Option<WindowHandle>) {
        let host = &self.inner.host;
        let tracked_window = self.inner.tracked.lock().await.state.window_id;

        let windows = match host.get_all_windows().await {
            Ok(windows) => windows,
            Err(e) => {
                warn!("could not list windows for cleanup: {}", e);
                return;
            }
        };

        for window in windows {
            if Some(window.id) == keep {
                continue;
            }
            let tagged = match host.query_tabs(TabQuery::in_window(window.id)).await {
                Ok(tabs) => tabs.iter().any(|t| timestamp_link::is_companion_link(&t.url)),
                Err(_) => false,
            };
            if tagged || Some(window.id) == tracked_window {
                info!("closing stale companion window {}", window.id);
                if let Err(e) = host.remove_window(window.id).await {
                    debug!("stale window {} already gone: {}", window.id, e);
                }
            }
        }
    }

    /// Sends a jump command to the first tab of `window`.
    ///
    /// A receiver that is missing or rejects the jump is reported as
    /// [`RelayOutcome::Undelivered`], not as an error.
    ///
    /// # Errors
    /// Returns `ManagerError::Host` if the window's tabs cannot be listed.
    pub async fn relay_jump_command(
        &self,
        window: WindowHandle,
        timestamp: u64,
    ) -> Result<RelayOutcome, ManagerError> {
        let tabs = self.inner.host.query_tabs(TabQuery::in_window(window)).await?;
        let Some(tab) = tabs.first() else {
            debug!("companion window {} has no tabs, nothing to jump", window);
            return Ok(RelayOutcome::NoTabs);
        };

        let outcome = match self
            .inner
            .host
            .send_message(tab.id, TabMessage::JumpToTimestamp { timestamp })
            .await
        {
            Ok(response) if response.success => RelayOutcome::Delivered,
            Ok(response) => {
                warn!(
                    "jump to {}s not applied in tab {}: {}",
                    timestamp,
                    tab.id,
                    response.error.unwrap_or_default()
                );
                RelayOutcome::Undelivered
            }
            Err(e) => {
                warn!("jump to {}s not delivered to tab {}: {}", timestamp, tab.id, e);
                RelayOutcome::Undelivered
            }
        };
        Ok(outcome)
    }

    // ─── Settings ───

    /// Persists a new split ratio and re-applies the layout if a window is active.
    ///
    /// Ratios outside `(0, 1)` are rejected and nothing changes.
    ///
    /// # Errors
    /// Returns `ManagerError::InvalidRatio` for a ratio outside `(0, 1)` or NaN,
    /// and `ManagerError::Store` if it cannot be persisted. Resize failures are
    /// only logged.
    pub async fn apply_screen_split_ratio(&self, ratio: f64) -> Result<SplitRatio, ManagerError> {
        let ratio = SplitRatio::new(ratio)?;

        self.inner
            .store
            .set(HashMap::from([(KEY_SPLIT_RATIO.to_string(), Value::from(ratio.value()))]))
            .await?;
        let active = {
            let mut tracked = self.inner.tracked.lock().await;
            tracked.state.screen_split_ratio = ratio;
            tracked.phase.active_window()
        };
        info!("split ratio set to {}", ratio.value());

        if let Some(id) = active {
            self.relayout(id, ratio).await;
        }
        Ok(ratio)
    }

    /// Persists whether copied links are pasted into the page automatically.
    ///
    /// # Errors
    /// Returns `ManagerError::Store` if the flag cannot be persisted.
    pub async fn set_auto_relay(&self, enabled: bool) -> Result<(), ManagerError> {
        self.inner
            .store
            .set(HashMap::from([(KEY_AUTO_RELAY.to_string(), Value::from(enabled))]))
            .await?;
        self.inner.tracked.lock().await.state.auto_relay = enabled;
        debug!("auto relay {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    async fn plan(&self, ratio: SplitRatio) -> LayoutPlan {
        let windows = match self.inner.host.get_all_windows().await {
            Ok(windows) => windows,
            Err(e) => {
                warn!("could not list windows for screen estimate: {}", e);
                Vec::new()
            }
        };
        plan_layout(estimate_screen(&windows, &self.inner.config.screen), ratio)
    }

    /// Best effort: failures are logged and the window stays usable.
    async fn relayout(&self, companion: WindowHandle, ratio: SplitRatio) {
        let host = &self.inner.host;
        if !self.inner.detector.detect().await.supports_geometry() {
            debug!("host restricts window geometry, skipping relayout");
            return;
        }

        let plan = self.plan(ratio).await;
        if let Err(e) = host.update_window(companion, WindowUpdate::bounds(plan.companion)).await {
            warn!("could not resize companion window {}: {}", companion, e);
        }

        match host.current_window().await {
            Ok(current) if current.id != companion => {
                if let Err(e) = host.update_window(current.id, WindowUpdate::bounds(plan.source)).await {
                    warn!("could not resize window {}: {}", current.id, e);
                }
            }
            Ok(_) => {}
            Err(e) => debug!("no current window to resize: {}", e),
        }
    }

    // ─── Lifecycle ───

    /// The live companion window, if any. A stale one is cleared on the way.
    pub async fn live_window(&self) -> Option<WindowHandle> {
        let known = self.inner.tracked.lock().await.state.window_id?;
        if self.is_live(known).await {
            return Some(known);
        }
        self.handle_window_removed(known).await;
        None
    }

    /// The first tab of the live companion window.
    ///
    /// # Errors
    /// Returns `ManagerError::NoCompanionWindow` when no window is live.
    pub async fn companion_tab(&self) -> Result<Option<TabInfo>, ManagerError> {
        let id = self.live_window().await.ok_or(ManagerError::NoCompanionWindow)?;
        let tabs = self.inner.host.query_tabs(TabQuery::in_window(id)).await?;
        Ok(tabs.into_iter().next())
    }

    /// Forgets `window` if it is the tracked companion window.
    pub async fn handle_window_removed(&self, window: WindowHandle) {
        let mut tracked = self.inner.tracked.lock().await;
        if tracked.state.window_id != Some(window) {
            return;
        }
        info!("companion window {} closed", window);
        tracked.state.window_id = None;
        if tracked.phase == ManagerPhase::Active(window) {
            tracked.phase = ManagerPhase::Idle;
        }
        if tracked.watching == Some(window) {
            tracked.watching = None;
        }
        if let Err(e) = self.inner.store.remove(&[KEY_WINDOW_ID]).await {
            warn!("could not clear stored companion window: {}", e);
        }
    }

    /// Closes the companion window if it is open and returns to `Idle`.
    ///
    /// Waits behind any queued request, so a window still being created is
    /// closed once it exists.
    ///
    /// # Errors
    /// Returns `ManagerError::Host` if the host fails to close the window for a
    /// reason other than it being gone already.
    pub async fn close_all(&self) -> Result<(), ManagerError> {
        let _permit = self.inner.queue.acquire().await?;

        let known = self.inner.tracked.lock().await.state.window_id;
        if let Some(id) = known {
            match self.inner.host.remove_window(id).await {
                Ok(()) | Err(HostError::WindowNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
            self.handle_window_removed(id).await;
        }
        let mut tracked = self.inner.tracked.lock().await;
        tracked.phase = ManagerPhase::Idle;
        tracked.state.window_id = None;
        info!("closed companion windows");
        Ok(())
    }

    /// Periodically probes the companion window and drops it once it is gone.
    pub fn start_liveness_monitor(&self) -> Option<JoinHandle<()>> {
        let secs = self.inner.config.timing.liveness_interval_secs;
        if secs == 0 {
            return None;
        }
        let manager = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let known = manager.inner.tracked.lock().await.state.window_id;
                if let Some(id) = known {
                    if !manager.is_live(id).await {
                        debug!("liveness probe lost companion window {}", id);
                        manager.handle_window_removed(id).await;
                    }
                }
            }
        }))
    }

    async fn is_live(&self, window: WindowHandle) -> bool {
        match self.inner.host.get_window(window).await {
            Ok(_) => true,
            Err(HostError::WindowNotFound(_)) => false,
            Err(e) => {
                debug!("liveness probe of window {} failed: {}", window, e);
                false
            }
        }
    }

    fn spawn_close_watcher(&self, mut events: broadcast::Receiver<HostEvent>, window: WindowHandle) {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(HostEvent::WindowRemoved(id)) if id == window => {
                        manager.handle_window_removed(id).await;
                        break;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        debug!("close watcher for {} missed {} events", window, missed);
                        if !manager.is_live(window).await {
                            manager.handle_window_removed(window).await;
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Relays the jump once the new window's page has loaded and settled.
    fn spawn_jump_watcher(
        &self,
        mut events: broadcast::Receiver<HostEvent>,
        window: WindowHandle,
        timestamp: u64,
    ) {
        let manager = self.clone();
        let timing = self.inner.config.timing.clone();
        tokio::spawn(async move {
            let loaded = tokio::time::timeout(Duration::from_millis(timing.load_timeout_ms), async {
                loop {
                    match events.recv().await {
                        Ok(HostEvent::TabUpdated {
                            window_id,
                            status: TabStatus::Complete,
                            ..
                        }) if window_id == window => return true,
                        Ok(HostEvent::WindowRemoved(id)) if id == window => return false,
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => return false,
                    }
                }
            })
            .await;
            drop(events);

            match loaded {
                Ok(true) => {}
                Ok(false) => {
                    debug!("companion window {} went away before loading", window);
                    return;
                }
                Err(_) => {
                    warn!(
                        "companion window {} did not finish loading within {} ms, skipping jump",
                        window, timing.load_timeout_ms
                    );
                    return;
                }
            }

            tokio::time::sleep(Duration::from_millis(timing.settle_delay_ms)).await;
            match manager.relay_jump_command(window, timestamp).await {
                Ok(outcome) => debug!("jump relay to window {}: {:?}", window, outcome),
                Err(e) => warn!("jump relay to window {} failed: {}", window, e),
            }
        });
    }
}
