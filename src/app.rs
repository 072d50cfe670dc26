//! App Core for TSNotes.
//!
//! Central struct wiring the host, store, config, manager and command surface,
//! managing the application lifecycle.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::commands::CommandSurface;
use crate::managers::companion_window::CompanionWindowManager;
use crate::platform::host::BrowserHost;
use crate::platform::memory::MemoryBrowser;
use crate::services::config_engine::{ConfigEngine, ConfigEngineTrait};
use crate::services::host_detector::{HostDetector, UserAgentDetector};
use crate::services::kv_store::{KeyValueStore, SqliteStore};
use crate::types::errors::ManagerError;
use crate::types::state::ManagerPhase;

/// Central application struct holding the manager and its collaborators.
pub struct App {
    /// Fresh per process, so clients can tell a restarted server apart.
    pub instance_id: Uuid,
    pub host: Arc<dyn BrowserHost>,
    pub store: Arc<dyn KeyValueStore>,
    pub config_engine: ConfigEngine,
    pub manager: CompanionWindowManager,
    pub commands: CommandSurface,
    liveness: Option<JoinHandle<()>>,
}

impl App {
    /// Creates an App whose host variant is detected from the user agent.
    pub fn new(
        host: Arc<dyn BrowserHost>,
        store: Arc<dyn KeyValueStore>,
        config_engine: ConfigEngine,
    ) -> Self {
        let config = config_engine.get_config();
        let detector = Arc::new(UserAgentDetector::new(
            Arc::clone(&host),
            config.fallback_user_agent.clone(),
            Duration::from_millis(config.timing.creation_delay_ms),
        ));
        Self::with_detector(host, store, detector, config_engine)
    }

    pub fn with_detector(
        host: Arc<dyn BrowserHost>,
        store: Arc<dyn KeyValueStore>,
        detector: Arc<dyn HostDetector>,
        config_engine: ConfigEngine,
    ) -> Self {
        let manager = CompanionWindowManager::new(
            Arc::clone(&host),
            Arc::clone(&store),
            detector,
            config_engine.get_config().clone(),
        );
        let commands = CommandSurface::new(Arc::clone(&host), manager.clone());

        Self {
            instance_id: Uuid::new_v4(),
            host,
            store,
            config_engine,
            manager,
            commands,
            liveness: None,
        }
    }

    /// Creates a headless App: in-memory host, SQLite state at `db_path`.
    ///
    /// A config file that fails to load is reported and replaced by defaults.
    pub fn headless<P: AsRef<Path>>(
        db_path: P,
        config_path: Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Arc::new(SqliteStore::open(db_path)?);

        let mut config_engine = ConfigEngine::new(config_path);
        if let Err(e) = config_engine.load() {
            warn!("{}; using default config", e);
        }

        Ok(Self::new(Arc::new(MemoryBrowser::new()), store, config_engine))
    }

    /// Startup sequence: reconcile persisted state, start the liveness probe.
    pub async fn startup(&mut self) -> Result<ManagerPhase, ManagerError> {
        let phase = self.manager.reconcile_on_startup().await?;
        if self.liveness.is_none() {
            self.liveness = self.manager.start_liveness_monitor();
        }
        info!("startup complete, companion window {:?}", phase);
        Ok(phase)
    }

    /// Shutdown sequence: stop background probing.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.liveness.take() {
            handle.abort();
        }
        self.manager.queue().close();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
