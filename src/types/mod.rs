// TSNotes shared type definitions
// Each submodule defines types used across the crate.

pub mod config;
pub mod errors;
pub mod messages;
pub mod state;
pub mod window;
