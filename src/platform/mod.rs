// TSNotes platform layer
// Per-OS config/data paths plus the host capability traits the manager drives.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific path implementation at compile time.

use std::path::PathBuf;

pub mod host;
pub mod memory;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory for TSNotes.
///
/// - **Linux**: `~/.config/tsnotes` (or `$XDG_CONFIG_HOME/tsnotes`)
/// - **macOS**: `~/Library/Application Support/TSNotes`
/// - **Windows**: `%APPDATA%/TSNotes`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific data directory for TSNotes.
///
/// - **Linux**: `~/.local/share/tsnotes` (or `$XDG_DATA_HOME/tsnotes`)
/// - **macOS**: `~/Library/Application Support/TSNotes`
/// - **Windows**: `%LOCALAPPDATA%/TSNotes`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}

/// Default location of the JSON config file.
pub fn default_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Default location of the persisted state database.
pub fn default_state_db_path() -> PathBuf {
    get_data_dir().join("state.db")
}
