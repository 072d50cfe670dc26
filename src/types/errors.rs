use std::fmt;

use super::window::{TabId, WindowHandle};

// === HostError ===

/// Errors reported by the host window/tab/page capabilities.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The window no longer exists (or never did).
    WindowNotFound(WindowHandle),
    /// The tab no longer exists (or never did).
    TabNotFound(TabId),
    /// No content script is listening in the tab.
    NoReceiver(TabId),
    /// The host refused the operation.
    Rejected(String),
    /// Running a function inside the page failed.
    ScriptFailed(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::WindowNotFound(id) => write!(f, "Window not found: {}", id),
            HostError::TabNotFound(id) => write!(f, "Tab not found: {}", id),
            HostError::NoReceiver(id) => write!(f, "No message receiver in tab: {}", id),
            HostError::Rejected(msg) => write!(f, "Host rejected operation: {}", msg),
            HostError::ScriptFailed(msg) => write!(f, "Page script failed: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

// === StoreError ===

/// Errors related to the persistent key-value store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Database operation failed.
    DatabaseError(String),
    /// A stored value could not be encoded or decoded.
    SerializationError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DatabaseError(msg) => write!(f, "Store database error: {}", msg),
            StoreError::SerializationError(msg) => {
                write!(f, "Store serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}

// === ConfigError ===

/// Errors related to loading and editing the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// File system I/O error.
    IoError(String),
    /// JSON serialization/deserialization error.
    SerializationError(String),
    /// The provided config key is invalid.
    InvalidKey(String),
    /// The provided value is invalid for the given key.
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
            ConfigError::InvalidKey(key) => write!(f, "Invalid config key: {}", key),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// === QueueError ===

/// Errors from the request serialization queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueError {
    /// The queue was shut down before this request's turn came.
    Closed,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Closed => write!(f, "Request queue is closed"),
        }
    }
}

impl std::error::Error for QueueError {}

// === ManagerError ===

/// Errors surfaced by the companion window manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerError {
    /// The host refused to create the companion window.
    CreationFailed(String),
    /// Split ratio outside the open interval (0, 1).
    InvalidRatio(f64),
    /// An operation needed a live companion window and there is none.
    NoCompanionWindow,
    /// A host call failed outside window creation.
    Host(HostError),
    /// Persisting state failed.
    Store(StoreError),
    /// The serialization queue dropped the request.
    Queue(QueueError),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::CreationFailed(msg) => {
                write!(f, "Companion window creation failed: {}", msg)
            }
            ManagerError::InvalidRatio(ratio) => {
                write!(f, "Split ratio must be between 0 and 1 (exclusive): {}", ratio)
            }
            ManagerError::NoCompanionWindow => write!(f, "No active companion window"),
            ManagerError::Host(e) => write!(f, "{}", e),
            ManagerError::Store(e) => write!(f, "{}", e),
            ManagerError::Queue(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ManagerError::Host(e) => Some(e),
            ManagerError::Store(e) => Some(e),
            ManagerError::Queue(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HostError> for ManagerError {
    fn from(e: HostError) -> Self {
        ManagerError::Host(e)
    }
}

impl From<StoreError> for ManagerError {
    fn from(e: StoreError) -> Self {
        ManagerError::Store(e)
    }
}

impl From<QueueError> for ManagerError {
    fn from(e: QueueError) -> Self {
        ManagerError::Queue(e)
    }
}
