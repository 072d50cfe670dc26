// TSNotes services
// Services provide self-contained functionality: layout, host detection,
// link codec, storage adapters, clipboard relay and configuration.

pub mod clipboard_relay;
pub mod config_engine;
pub mod host_detector;
pub mod kv_store;
pub mod layout;
pub mod timestamp_link;
