// TSNotes platform paths for Linux
// Config: ~/.config/tsnotes
// Data:   ~/.local/share/tsnotes

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the configuration directory for TSNotes on Linux.
/// Uses `$XDG_CONFIG_HOME/tsnotes` if set, otherwise `~/.config/tsnotes`.
pub fn get_config_dir() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("tsnotes"),
        _ => home_dir().join(".config").join("tsnotes"),
    }
}

/// Returns the data directory for TSNotes on Linux.
/// Uses `$XDG_DATA_HOME/tsnotes` if set, otherwise `~/.local/share/tsnotes`.
pub fn get_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join("tsnotes"),
        _ => home_dir().join(".local").join("share").join("tsnotes"),
    }
}
