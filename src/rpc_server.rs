//! TSNotes RPC server: JSON-RPC over stdin/stdout driving a headless manager.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"link.open", "params":{"url":"...","timestamp":30}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}

use std::io::{self, Write};
use std::path::PathBuf;

use log::{error, info};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use tsnotes::app::App;
use tsnotes::platform;
use tsnotes::rpc_handler::{handle_method, RateLimiter};

fn emit(value: &Value) {
    let mut stdout = io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", value).and_then(|_| stdout.flush()) {
        error!("failed to write response: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    // TSNOTES_DATA_DIR overrides the platform data directory.
    let db_path = match std::env::var("TSNOTES_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir).join("state.db"),
        Err(_) => platform::default_state_db_path(),
    };
    let config_path = std::env::var("TSNOTES_CONFIG").ok();

    let mut app = App::headless(&db_path, config_path)?;
    app.startup().await?;
    info!("serving JSON-RPC, state at {}", db_path.display());

    emit(&json!({
        "event": "ready",
        "version": env!("CARGO_PKG_VERSION"),
        "instanceId": app.instance_id,
    }));

    let mut rate_limiter = RateLimiter::default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id":null,"error":format!("parse error: {}",e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if let Err(err) = rate_limiter.check() {
            emit(&json!({"id": id, "error": err}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&response);
    }

    app.shutdown();
    Ok(())
}
