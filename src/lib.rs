//! TSNotes: keeps a single companion window next to the browsing window and
//! relays video timestamp jumps into it.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod commands;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
