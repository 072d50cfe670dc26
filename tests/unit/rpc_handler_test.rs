//! Unit tests for the RPC handler, covering every method dispatched by `handle_method`.
//!
//! These go through the same code path as the `tsnotes-rpc` binary: a headless
//! app over the in-memory browser, with state in a temporary SQLite database.

use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use tsnotes::app::App;
use tsnotes::rpc_handler::{handle_method, RateLimiter, MAX_REQUESTS_PER_SECOND};

/// Create a fresh App backed by a temp directory DB and a config path that does not exist.
fn setup() -> (App, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let app = headless_in(&tmp);
    (app, tmp)
}

fn headless_in(tmp: &TempDir) -> App {
    let db_path = tmp.path().join("state.db");
    let config_path = tmp.path().join("config.json").to_string_lossy().to_string();
    App::headless(&db_path, Some(config_path)).expect("Failed to init App")
}

// ─── Ping and info ───

#[tokio::test]
async fn test_ping() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "ping", &json!({})).await.unwrap();
    assert_eq!(res, json!({"pong": true}));
}

#[tokio::test]
async fn test_app_info_reports_instance() {
    let (app, tmp) = setup();
    let res = handle_method(&app, "app.info", &json!({})).await.unwrap();
    assert_eq!(res["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(res["instanceId"], json!(app.instance_id.to_string()));

    let other = headless_in(&tmp);
    assert_ne!(other.instance_id, app.instance_id);
}

// ─── Unknown method ───

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({})).await;
    assert_eq!(res.unwrap_err(), "unknown method: nonexistent.method");
}

// ─── Companion window ───

#[tokio::test]
async fn test_link_open_and_state() {
    let (app, _tmp) = setup();

    let res = handle_method(&app, "link.open", &json!({"url": "https://example.com/watch?v=1"}))
        .await
        .unwrap();
    let window_id = res["windowId"].as_i64().unwrap();

    let state = handle_method(&app, "state.get", &json!({})).await.unwrap();
    assert_eq!(state["phase"], json!({"phase": "active", "windowId": window_id}));
    assert_eq!(state["state"]["windowId"], json!(window_id));
    assert_eq!(state["state"]["screenSplitRatio"], json!(0.5));
    assert_eq!(state["state"]["autoRelay"], json!(true));
}

#[tokio::test]
async fn test_link_open_twice_reuses_window() {
    let (app, _tmp) = setup();
    let params = json!({"url": "https://example.com/watch?v=1&type=TSNotes"});

    let first = handle_method(&app, "link.open", &params).await.unwrap();
    let second = handle_method(&app, "link.open", &params).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_link_open_invalid_params() {
    let (app, _tmp) = setup();
    let empty = handle_method(&app, "link.open", &json!({"url": "  "})).await;
    assert!(empty.unwrap_err().contains("invalid url"));
    let missing = handle_method(&app, "link.open", &json!({})).await;
    assert_eq!(missing.unwrap_err(), "missing url");
}

#[tokio::test]
async fn test_close_all_returns_to_idle() {
    let (app, _tmp) = setup();
    handle_method(&app, "link.open", &json!({"url": "https://example.com/v"}))
        .await
        .unwrap();

    let res = handle_method(&app, "window.closeAll", &json!({})).await.unwrap();
    assert_eq!(res, json!({"ok": true}));

    let state = handle_method(&app, "state.get", &json!({})).await.unwrap();
    assert_eq!(state["phase"], json!({"phase": "idle"}));
    assert!(state["state"]["windowId"].is_null());
}

// ─── Settings ───

#[tokio::test]
async fn test_ratio_set() {
    let (app, _tmp) = setup();

    let res = handle_method(&app, "ratio.set", &json!({"ratio": 0.7})).await.unwrap();
    assert_eq!(res, json!({"screenSplitRatio": 0.7}));

    let bad = handle_method(&app, "ratio.set", &json!({"ratio": 1.2})).await;
    assert!(bad.unwrap_err().contains("between 0 and 1"));
    let missing = handle_method(&app, "ratio.set", &json!({})).await;
    assert_eq!(missing.unwrap_err(), "missing ratio");
}

#[tokio::test]
async fn test_auto_relay_set() {
    let (app, _tmp) = setup();

    let res = handle_method(&app, "autoRelay.set", &json!({"enabled": false}))
        .await
        .unwrap();
    assert_eq!(res, json!({"autoRelay": false}));

    let state = handle_method(&app, "state.get", &json!({})).await.unwrap();
    assert_eq!(state["state"]["autoRelay"], json!(false));
}

#[tokio::test]
async fn test_settings_survive_restart_and_dead_window_is_dropped() {
    let tmp = TempDir::new().unwrap();
    {
        let app = headless_in(&tmp);
        handle_method(&app, "link.open", &json!({"url": "https://example.com/v"}))
            .await
            .unwrap();
        handle_method(&app, "ratio.set", &json!({"ratio": 0.3})).await.unwrap();
        handle_method(&app, "autoRelay.set", &json!({"enabled": false}))
            .await
            .unwrap();
    }

    // A fresh in-memory browser has none of the old windows.
    let mut app = headless_in(&tmp);
    app.startup().await.unwrap();

    let state = handle_method(&app, "state.get", &json!({})).await.unwrap();
    assert_eq!(state["phase"], json!({"phase": "idle"}));
    assert!(state["state"]["windowId"].is_null());
    assert_eq!(state["state"]["screenSplitRatio"], json!(0.3));
    assert_eq!(state["state"]["autoRelay"], json!(false));
}

// ─── Command surface ───

#[tokio::test]
async fn test_command_run() {
    let (app, _tmp) = setup();

    // No windows at all: opens a blank companion window without prompting.
    let opened = handle_method(&app, "command.run", &json!({"command": "open-tsnotes-window"}))
        .await
        .unwrap();
    assert_eq!(opened["outcome"], "opened");

    let again = handle_method(&app, "command.run", &json!({"command": "open-tsnotes-window"}))
        .await
        .unwrap();
    assert_eq!(again["outcome"], "alreadyOpen");
    assert_eq!(again["windowId"], opened["windowId"]);

    let unknown = handle_method(&app, "command.run", &json!({"command": "nope"})).await;
    assert_eq!(unknown.unwrap_err(), "unknown command: nope");
}

#[tokio::test]
async fn test_menu_list_and_click() {
    let (app, _tmp) = setup();

    let list = handle_method(&app, "menu.list", &json!({})).await.unwrap();
    let items = list.as_array().unwrap();
    assert_eq!(items.len(), 18);
    assert!(items
        .iter()
        .any(|i| i["id"] == "ratio-0.5" && i["checked"] == json!(true)));

    let res = handle_method(&app, "menu.click", &json!({"id": "ratio-0.7"})).await.unwrap();
    assert_eq!(res, json!({"screenSplitRatio": 0.7}));

    let res = handle_method(&app, "menu.click", &json!({"id": "auto-paste-page", "checked": false}))
        .await
        .unwrap();
    assert_eq!(res, json!({"autoRelay": false}));

    let missing = handle_method(&app, "menu.click", &json!({})).await;
    assert_eq!(missing.unwrap_err(), "missing id");
}

#[tokio::test]
async fn test_message_send() {
    let (app, _tmp) = setup();

    let res = handle_method(
        &app,
        "message.send",
        &json!({"message": {"type": "openTSNotesLink", "url": "https://example.com/v"}}),
    )
    .await
    .unwrap();
    assert_eq!(res, json!({"success": true}));

    let unknown = handle_method(&app, "message.send", &json!({"message": {"type": "x"}}))
        .await
        .unwrap();
    assert_eq!(unknown, json!({"success": false, "error": "unknown message type"}));
}

// ─── Rate limiting ───

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_allows_budget_per_second() {
    let mut limiter = RateLimiter::default();
    for _ in 0..MAX_REQUESTS_PER_SECOND {
        assert!(limiter.check().is_ok());
    }
    assert_eq!(limiter.check().unwrap_err(), "rate limit exceeded");
    assert!(limiter.check().is_err());

    tokio::time::advance(Duration::from_millis(999)).await;
    assert!(limiter.check().is_err());

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(limiter.check().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_custom_budget() {
    let mut limiter = RateLimiter::new(2);
    assert!(limiter.check().is_ok());
    assert!(limiter.check().is_ok());
    assert!(limiter.check().is_err());

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(limiter.check().is_ok());
}
