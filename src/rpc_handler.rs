//! RPC method handler for the TSNotes JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! manager and command surface via the `App` struct.

use std::time::Duration;

use log::warn;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::app::App;

/// Requests the server accepts per one-second window.
pub const MAX_REQUESTS_PER_SECOND: u32 = 200;

/// Fixed-window request budget for the RPC loop.
pub struct RateLimiter {
    window_start: Instant,
    used: u32,
    max_per_second: u32,
}

impl RateLimiter {
    pub fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), used: 0, max_per_second }
    }

    /// Returns `Err` with the response message once this second's budget is spent.
    pub fn check(&mut self) -> Result<(), String> {
        let now = Instant::now();
        if now.duration_since(self.window_start) >= Duration::from_secs(1) {
            self.window_start = now;
            self.used = 0;
        }
        if self.used >= self.max_per_second {
            if self.used == self.max_per_second {
                warn!("more than {} requests this second, rejecting", self.max_per_second);
                self.used += 1;
            }
            return Err("rate limit exceeded".to_string());
        }
        self.used += 1;
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(MAX_REQUESTS_PER_SECOND)
    }
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),
        "app.info" => Ok(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "instanceId": app.instance_id,
        })),

        // ─── Companion window ───
        "link.open" => {
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            if url.trim().is_empty() {
                return Err("invalid url: must not be empty".to_string());
            }
            let timestamp = params.get("timestamp").and_then(|v| v.as_u64()).unwrap_or(0);
            let id = app
                .manager
                .ensure_companion_window(url, timestamp)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"windowId": id}))
        }
        "window.closeAll" => {
            app.manager.close_all().await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "state.get" => {
            let phase = app.manager.phase().await;
            let state = app.manager.state().await;
            Ok(json!({"phase": phase, "state": state}))
        }

        // ─── Settings ───
        "ratio.set" => {
            let ratio = params.get("ratio").and_then(|v| v.as_f64()).ok_or("missing ratio")?;
            let applied = app
                .manager
                .apply_screen_split_ratio(ratio)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"screenSplitRatio": applied.value()}))
        }
        "autoRelay.set" => {
            let enabled = params.get("enabled").and_then(|v| v.as_bool()).ok_or("missing enabled")?;
            app.manager.set_auto_relay(enabled).await.map_err(|e| e.to_string())?;
            Ok(json!({"autoRelay": enabled}))
        }

        // ─── Command surface ───
        "command.run" => {
            let command = params.get("command").and_then(|v| v.as_str()).ok_or("missing command")?;
            app.commands.handle_shortcut(command).await
        }
        "menu.list" => {
            let items = app.commands.build_context_menu().await;
            serde_json::to_value(items).map_err(|e| e.to_string())
        }
        "menu.click" => {
            let id = params.get("id").and_then(|v| v.as_str()).ok_or("missing id")?;
            let checked = params.get("checked").and_then(|v| v.as_bool());
            app.commands.handle_menu_click(id, checked).await
        }
        "message.send" => {
            let message = params.get("message").ok_or("missing message")?;
            let response = app.commands.handle_runtime_message(message).await;
            serde_json::to_value(response).map_err(|e| e.to_string())
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
