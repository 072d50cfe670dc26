//! Unit tests for the command surface: runtime messages, shortcuts and menus.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tsnotes::commands::{
    CommandOutcome, CommandSurface, MenuItemKind, NOTICE_COPIED, NOTICE_COPIED_AND_PASTED,
    NOTICE_LINK_CHANGED, NOTICE_NO_ACTIVE_TAB, NOTICE_NO_VIDEO, NOTICE_NO_WINDOW,
    SHORTCUT_OPEN_WINDOW,
};
use tsnotes::managers::companion_window::CompanionWindowManager;
use tsnotes::platform::memory::MemoryBrowser;
use tsnotes::services::host_detector::{FixedDetector, HostProfile};
use tsnotes::services::kv_store::MemoryStore;
use tsnotes::types::config::ManagerConfig;
use tsnotes::types::messages::TabMessage;
use tsnotes::types::state::{KEY_AUTO_RELAY, KEY_SPLIT_RATIO};
use tsnotes::types::window::{Rect, TabId, WindowHandle};

const VIDEO_URL: &str = "https://example.com/watch?v=1";

struct Harness {
    browser: Arc<MemoryBrowser>,
    store: Arc<MemoryStore>,
    manager: CompanionWindowManager,
    commands: CommandSurface,
}

fn harness() -> Harness {
    let browser = Arc::new(MemoryBrowser::new());
    let store = Arc::new(MemoryStore::new());
    let manager = CompanionWindowManager::new(
        browser.clone(),
        store.clone(),
        Arc::new(FixedDetector(HostProfile::standard())),
        ManagerConfig::default(),
    );
    let commands = CommandSurface::new(browser.clone(), manager.clone());
    Harness {
        browser,
        store,
        manager,
        commands,
    }
}

fn notes_window(h: &Harness) -> (WindowHandle, TabId) {
    h.browser.open_window(
        "https://notes.example/page",
        Rect {
            left: 0,
            top: 0,
            width: 1000,
            height: 700,
        },
    )
}

fn notification(message: &str) -> TabMessage {
    TabMessage::ShowNotification {
        message: message.to_string(),
    }
}

// ─── Runtime messages ───

#[tokio::test(start_paused = true)]
async fn test_open_link_message_uses_timestamp_from_url() {
    let h = harness();
    notes_window(&h);
    let message = json!({
        "type": "openTSNotesLink",
        "url": "https://example.com/watch?v=1&t=90s&type=TSNotes",
    });

    let response = h.commands.handle_runtime_message(&message).await;

    assert!(response.success);
    assert_eq!(h.browser.create_calls(), 1);
    assert_eq!(
        h.browser.created_options()[0].url,
        "https://example.com/watch?v=1&t=90s"
    );

    let id = h.manager.live_window().await.unwrap();
    let tab = h.browser.tabs_in(id)[0].id;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(
        h.browser.messages_to(tab),
        vec![TabMessage::JumpToTimestamp { timestamp: 90 }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_explicit_timestamp_wins_over_url() {
    let h = harness();
    let message = json!({
        "type": "openTSNotesLink",
        "url": "https://example.com/watch?v=1&t=90s&type=TSNotes",
        "timestamp": 12,
    });

    assert!(h.commands.handle_runtime_message(&message).await.success);

    let id = h.manager.live_window().await.unwrap();
    let tab = h.browser.tabs_in(id)[0].id;
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(
        h.browser.messages_to(tab),
        vec![TabMessage::JumpToTimestamp { timestamp: 12 }]
    );
}

#[tokio::test]
async fn test_unknown_runtime_message_is_answered() {
    let h = harness();

    let response = h
        .commands
        .handle_runtime_message(&json!({"type": "somethingElse"}))
        .await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("unknown message type"));
    assert_eq!(h.browser.create_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_runtime_message_reports_creation_failure() {
    let h = harness();
    h.browser.fail_next_creates(1);

    let response = h
        .commands
        .handle_runtime_message(&json!({"type": "openTSNotesLink", "url": VIDEO_URL}))
        .await;

    assert!(!response.success);
    assert!(response.error.unwrap().contains("creation failed"));
}

// ─── Open window ───

#[tokio::test(start_paused = true)]
async fn test_open_window_prompt_dismissed() {
    let h = harness();
    notes_window(&h);
    h.browser.push_prompt_answer(None);

    let outcome = h.commands.open_blank_window_if_not_exist().await.unwrap();

    assert_eq!(outcome, CommandOutcome::Cancelled);
    assert_eq!(h.browser.create_calls(), 0);
    assert_eq!(h.browser.prompts_shown().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_window_with_empty_answer_is_blank() {
    let h = harness();
    notes_window(&h);
    h.browser.push_prompt_answer(Some("   "));

    let outcome = h.commands.open_blank_window_if_not_exist().await.unwrap();

    assert!(matches!(outcome, CommandOutcome::Opened { .. }));
    assert_eq!(h.browser.created_options()[0].url, "about:blank");
}

#[tokio::test(start_paused = true)]
async fn test_open_window_normalizes_typed_url() {
    let h = harness();
    notes_window(&h);
    h.browser.push_prompt_answer(Some("example.org"));

    h.commands.open_blank_window_if_not_exist().await.unwrap();

    assert_eq!(h.browser.created_options()[0].url, "https://example.org");
}

#[tokio::test(start_paused = true)]
async fn test_open_window_when_already_open() {
    let h = harness();
    notes_window(&h);
    h.browser.push_prompt_answer(Some("example.org"));
    let first = h.commands.open_blank_window_if_not_exist().await.unwrap();
    let CommandOutcome::Opened { window_id } = first else {
        panic!("expected a new window, got {:?}", first);
    };

    let second = h.commands.handle_icon_click().await.unwrap();

    assert_eq!(second, CommandOutcome::AlreadyOpen { window_id });
    assert_eq!(h.browser.prompts_shown().len(), 1);
    assert_eq!(h.browser.create_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_window_without_active_tab_skips_prompt() {
    let h = harness();

    let outcome = h.commands.open_blank_window_if_not_exist().await.unwrap();

    assert!(matches!(outcome, CommandOutcome::Opened { .. }));
    assert!(h.browser.prompts_shown().is_empty());
    assert_eq!(h.browser.created_options()[0].url, "about:blank");
}

#[tokio::test(start_paused = true)]
async fn test_open_window_shortcut_returns_outcome_json() {
    let h = harness();
    notes_window(&h);
    h.browser.push_prompt_answer(Some(""));

    let value = h.commands.handle_shortcut(SHORTCUT_OPEN_WINDOW).await.unwrap();

    assert_eq!(value["outcome"], "opened");
    assert!(value["windowId"].is_i64());
}

// ─── Copy link ───

#[tokio::test(start_paused = true)]
async fn test_copy_without_window_notifies() {
    let h = harness();
    let (_, tab) = notes_window(&h);

    let outcome = h.commands.copy_current_link(false).await.unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::Notified {
            message: NOTICE_NO_WINDOW.to_string()
        }
    );
    assert_eq!(h.browser.messages_to(tab), vec![notification(NOTICE_NO_WINDOW)]);
}

#[tokio::test(start_paused = true)]
async fn test_copy_without_video_notifies() {
    let h = harness();
    let (source, _) = notes_window(&h);
    h.manager.ensure_companion_window(VIDEO_URL, 0).await.unwrap();
    h.browser.focus(source);

    let outcome = h.commands.copy_current_link(false).await.unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::Notified {
            message: NOTICE_NO_VIDEO.to_string()
        }
    );
    assert_eq!(h.browser.clipboard_contents(), "");
}

#[tokio::test(start_paused = true)]
async fn test_copy_and_auto_paste() {
    let h = harness();
    let (source, source_tab) = notes_window(&h);
    let id = h.manager.ensure_companion_window(VIDEO_URL, 0).await.unwrap();
    h.browser.set_video_time(h.browser.tabs_in(id)[0].id, 75.6);
    h.browser.focus(source);

    let outcome = h.commands.copy_current_link(false).await.unwrap();

    let link = "[01:15](https://example.com/watch?v=1&t=75s&type=TSNotes) ".to_string();
    assert_eq!(
        outcome,
        CommandOutcome::Copied {
            link: link.clone(),
            pasted: true
        }
    );
    assert_eq!(h.browser.clipboard_contents(), link);
    assert_eq!(
        h.browser.messages_to(source_tab),
        vec![
            TabMessage::CopyToClipboard { text: link },
            TabMessage::PasteFromClipboard,
            notification(NOTICE_COPIED_AND_PASTED),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_copy_without_auto_relay_only_copies() {
    let h = harness();
    let (source, source_tab) = notes_window(&h);
    let id = h.manager.ensure_companion_window(VIDEO_URL, 0).await.unwrap();
    h.browser.set_video_time(h.browser.tabs_in(id)[0].id, 5.0);
    h.manager.set_auto_relay(false).await.unwrap();
    h.browser.focus(source);

    let outcome = h.commands.copy_current_link(false).await.unwrap();

    assert!(matches!(outcome, CommandOutcome::Copied { pasted: false, .. }));
    let messages = h.browser.messages_to(source_tab);
    assert!(!messages.contains(&TabMessage::PasteFromClipboard));
    assert_eq!(messages.last(), Some(&notification(NOTICE_COPIED)));
}

#[tokio::test(start_paused = true)]
async fn test_copy_falls_back_to_page_script() {
    let h = harness();
    let (source, source_tab) = notes_window(&h);
    let id = h.manager.ensure_companion_window(VIDEO_URL, 0).await.unwrap();
    h.browser.set_video_time(h.browser.tabs_in(id)[0].id, 5.0);
    h.browser.set_receiver(source_tab, false);
    h.browser.focus(source);

    let outcome = h.commands.copy_current_link(true).await.unwrap();

    assert!(matches!(outcome, CommandOutcome::Copied { pasted: true, .. }));
    assert_eq!(
        h.browser.clipboard_contents(),
        "[00:05](https://example.com/watch?v=1&t=5s&type=TSNotes) "
    );
}

// ─── Change link ───

#[tokio::test(start_paused = true)]
async fn test_change_link_updates_companion_tab() {
    let h = harness();
    let (source, source_tab) = notes_window(&h);
    let id = h
        .manager
        .ensure_companion_window("https://example.com/watch?v=1&t=30s", 0)
        .await
        .unwrap();
    h.browser.focus(source);
    h.browser.push_prompt_answer(Some("example.org/next"));

    let outcome = h.commands.change_companion_link().await.unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::LinkChanged {
            url: "https://example.org/next".to_string()
        }
    );
    assert_eq!(h.browser.tabs_in(id)[0].url, "https://example.org/next");
    let (_, default) = h.browser.prompts_shown().pop().unwrap();
    assert_eq!(default, VIDEO_URL);
    assert_eq!(
        h.browser.messages_to(source_tab),
        vec![notification(NOTICE_LINK_CHANGED)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_change_link_dismissed_keeps_url() {
    let h = harness();
    let (source, _) = notes_window(&h);
    let id = h.manager.ensure_companion_window(VIDEO_URL, 0).await.unwrap();
    h.browser.focus(source);
    h.browser.push_prompt_answer(None);

    let outcome = h.commands.change_companion_link().await.unwrap();

    assert_eq!(outcome, CommandOutcome::Cancelled);
    assert_eq!(h.browser.tabs_in(id)[0].url, VIDEO_URL);
}

#[tokio::test(start_paused = true)]
async fn test_change_link_without_window_notifies() {
    let h = harness();
    notes_window(&h);

    let outcome = h.commands.change_companion_link().await.unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::Notified {
            message: NOTICE_NO_WINDOW.to_string()
        }
    );
    assert!(h.browser.prompts_shown().is_empty());
}

// ─── Open page ───

#[tokio::test(start_paused = true)]
async fn test_open_page_moves_tab_into_companion() {
    let h = harness();
    let (source, _) = h.browser.open_window(
        "https://example.org/article",
        Rect {
            left: 0,
            top: 0,
            width: 1000,
            height: 700,
        },
    );

    let outcome = h.commands.open_current_page_in_companion().await.unwrap();

    let CommandOutcome::Opened { window_id } = outcome else {
        panic!("expected the page to open, got {:?}", outcome);
    };
    assert_eq!(h.browser.tabs_in(window_id)[0].url, "https://example.org/article");
    // The source tab was its window's only tab.
    assert!(h.browser.window(source).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_open_page_from_companion_is_noop() {
    let h = harness();
    let id = h.manager.ensure_companion_window(VIDEO_URL, 0).await.unwrap();

    let outcome = h.commands.open_current_page_in_companion().await.unwrap();

    assert_eq!(outcome, CommandOutcome::AlreadyOpen { window_id: id });
    assert_eq!(h.browser.tabs_in(id).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_open_page_without_tabs_notifies() {
    let h = harness();

    let outcome = h.commands.open_current_page_in_companion().await.unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::Notified {
            message: NOTICE_NO_ACTIVE_TAB.to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_open_page_failure_notifies_and_keeps_tab() {
    let h = harness();
    let (_, tab) = notes_window(&h);
    h.browser.fail_next_creates(1);

    let result = h.commands.open_current_page_in_companion().await;

    assert!(result.is_err());
    let messages = h.browser.messages_to(tab);
    assert_eq!(messages.len(), 1);
    assert!(matches!(
        &messages[0],
        TabMessage::ShowNotification { message } if message.starts_with("Operation failed")
    ));
}

// ─── Menus and shortcuts ───

#[tokio::test(start_paused = true)]
async fn test_menu_ratio_click_applies_ratio() {
    let h = harness();

    let value = h.commands.handle_menu_click("ratio-0.3-page", None).await.unwrap();

    assert_eq!(value, json!({"screenSplitRatio": 0.3}));
    assert_eq!(h.store.peek(KEY_SPLIT_RATIO), Some(json!(0.3)));

    let menu = h.commands.build_context_menu().await;
    let checked: Vec<&str> = menu
        .iter()
        .filter(|i| i.kind == MenuItemKind::Radio && i.checked == Some(true))
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(checked, vec!["ratio-0.3", "ratio-0.3-page"]);
}

#[tokio::test]
async fn test_menu_auto_paste_toggle() {
    let h = harness();

    let value = h.commands.handle_menu_click("auto-paste", Some(false)).await.unwrap();
    assert_eq!(value, json!({"autoRelay": false}));
    assert_eq!(h.store.peek(KEY_AUTO_RELAY), Some(json!(false)));

    let err = h.commands.handle_menu_click("auto-paste-page", None).await.unwrap_err();
    assert_eq!(err, "missing checked state");
}

#[tokio::test]
async fn test_menu_rejects_bad_items() {
    let h = harness();
    assert_eq!(
        h.commands.handle_menu_click("bogus", None).await.unwrap_err(),
        "unknown menu item: bogus"
    );
    assert!(h.commands.handle_menu_click("ratio-abc", None).await.is_err());
    assert!(h.commands.handle_menu_click("ratio-1.5", None).await.is_err());
}

#[tokio::test]
async fn test_unknown_shortcut() {
    let h = harness();
    assert_eq!(
        h.commands.handle_shortcut("do-a-barrel-roll").await.unwrap_err(),
        "unknown command: do-a-barrel-roll"
    );
}

#[tokio::test]
async fn test_menu_get_link_runs_copy() {
    let h = harness();
    notes_window(&h);

    let value = h.commands.handle_menu_click("get-tsnotes-link-page", None).await.unwrap();

    assert_eq!(value, json!({"outcome": "notified", "message": NOTICE_NO_WINDOW}));
}
