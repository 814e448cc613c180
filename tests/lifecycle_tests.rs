//! Lifecycle tests
//!
//! Drives the watcher against a scripted host page: listener binding per
//! generation, rebinding after re-renders, trigger timing, and the full
//! reinitialize on navigation and page errors.

mod support;

use pretty_assertions::assert_eq;
use reader_paste::config::AgentConfig;
use reader_paste::host::{PageEventKind, ScriptedHost};
use reader_paste::pipeline::RunOutcome;
use reader_paste::watcher::Lifecycle;
use std::sync::Arc;
use std::time::Duration;
use support::{host_with_composer, pipeline, FakeDns, FakeReader, Reply, COMPOSER};
use tokio::time::Instant;

struct Harness {
    host: Arc<ScriptedHost>,
    dns: Arc<FakeDns>,
    reader: Arc<FakeReader>,
    lifecycle: Lifecycle,
}

fn harness(text: &str) -> (Harness, reader_paste::host::ElementToken) {
    let (host, composer, _) = host_with_composer(text);
    let dns = Arc::new(FakeDns::new().with_host("example.com").with_host("other.org"));
    let reader = Arc::new(FakeReader::new(Reply::Text("Example Domain".to_string())));
    let config = AgentConfig::default();
    let pipeline = pipeline(&host, &dns, &reader, &config);
    let lifecycle = Lifecycle::new(host.clone(), pipeline, config);
    (
        Harness {
            host,
            dns,
            reader,
            lifecycle,
        },
        composer,
    )
}

#[tokio::test(start_paused = true)]
async fn test_start_binds_composer_once() {
    let (mut h, composer) = harness("");
    h.lifecycle.start().await;

    assert!(h.host.is_installed());
    assert!(h.host.is_bound(composer));

    h.lifecycle.ensure_bound().await;
    h.lifecycle.tick().await;
    assert_eq!(h.host.bind_calls(), vec![composer]);
    assert_eq!(h.lifecycle.session().bindings().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rerendered_composer_is_rebound_on_mutation() {
    let (mut h, old) = harness("");
    h.lifecycle.start().await;

    h.host.detach(old);
    let new = h.host.add_element(COMPOSER, "");
    h.host.push_event(PageEventKind::Mutation);
    h.lifecycle.tick().await;

    assert_eq!(h.host.bind_calls(), vec![old, new]);
    assert!(h.lifecycle.session().bindings().is_bound(new));
}

#[tokio::test(start_paused = true)]
async fn test_space_key_runs_immediately() {
    let (mut h, composer) = harness("https://example.com");
    h.lifecycle.start().await;

    h.host.push_event(PageEventKind::KeyUp {
        token: composer,
        key: " ".to_string(),
    });
    h.lifecycle.tick().await;
    let outcomes = h.lifecycle.drain_runs().await;

    assert_eq!(
        outcomes,
        vec![RunOutcome::Completed {
            attached: 1,
            skipped: 0
        }]
    );
    assert!(h
        .lifecycle
        .session()
        .ledger()
        .lock()
        .contains("https://example.com/"));
}

#[tokio::test(start_paused = true)]
async fn test_other_keys_do_nothing() {
    let (mut h, composer) = harness("https://example.com");
    h.lifecycle.start().await;

    h.host.push_event(PageEventKind::KeyUp {
        token: composer,
        key: "a".to_string(),
    });
    h.lifecycle.tick().await;

    assert!(h.lifecycle.drain_runs().await.is_empty());
    assert_eq!(h.dns.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_typing_is_debounced() {
    let (mut h, composer) = harness("https://example.com");
    h.lifecycle.start().await;

    h.host.push_event(PageEventKind::Input { token: composer });
    h.lifecycle.tick().await;
    let first = Instant::now();

    tokio::time::advance(Duration::from_millis(300)).await;
    h.host.push_event(PageEventKind::Input { token: composer });
    h.lifecycle.tick().await;

    h.lifecycle.fire_due(first + Duration::from_millis(600));
    assert!(h.lifecycle.drain_runs().await.is_empty());

    assert_eq!(
        h.lifecycle.session().triggers().next_deadline(),
        Some(first + Duration::from_millis(800))
    );
    h.lifecycle.fire_due(first + Duration::from_millis(800));
    assert_eq!(h.lifecycle.drain_runs().await.len(), 1);
    assert_eq!(h.reader.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_paste_runs_after_settle_and_suppresses_typing() {
    let (mut h, composer) = harness("https://example.com");
    h.lifecycle.start().await;

    h.host.push_event(PageEventKind::Paste { token: composer });
    h.host.push_event(PageEventKind::Input { token: composer });
    h.lifecycle.tick().await;
    let pasted = Instant::now();

    assert_eq!(
        h.lifecycle.session().triggers().next_deadline(),
        Some(pasted + Duration::from_millis(100))
    );
    h.lifecycle.fire_due(pasted + Duration::from_millis(100));
    assert_eq!(h.lifecycle.drain_runs().await.len(), 1);
    assert!(!h.lifecycle.session().triggers().has_pending());
}

#[tokio::test(start_paused = true)]
async fn test_navigation_reinitializes_and_lifts_suppression() {
    let (mut h, composer) = harness("https://example.com");
    h.lifecycle.start().await;
    h.lifecycle.tick().await;

    h.host.push_event(PageEventKind::KeyUp {
        token: composer,
        key: "Enter".to_string(),
    });
    h.lifecycle.tick().await;
    h.lifecycle.drain_runs().await;
    assert_eq!(h.reader.call_count(), 1);

    h.host.set_address("https://claude.ai/chat/abc");
    h.lifecycle.tick().await;

    assert_eq!(h.lifecycle.session().generation(), 1);
    assert!(h.lifecycle.session().ledger().lock().is_empty());
    assert_eq!(h.host.install_count(), 2);
    assert_eq!(h.host.generation(), 1);
    assert_eq!(h.host.bind_calls(), vec![composer, composer]);
    assert_eq!(h.lifecycle.stats().snapshot().reinitializations, 1);

    // the same URL is eligible again
    h.host.push_event(PageEventKind::KeyUp {
        token: composer,
        key: "Enter".to_string(),
    });
    h.lifecycle.tick().await;
    h.lifecycle.drain_runs().await;
    assert_eq!(h.reader.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_page_error_reinitializes() {
    let (mut h, composer) = harness("https://example.com");
    h.lifecycle.start().await;

    h.host.push_event(PageEventKind::Input { token: composer });
    h.host.push_event(PageEventKind::Error {
        message: "TypeError: x is undefined".to_string(),
    });
    h.host.push_event(PageEventKind::KeyUp {
        token: composer,
        key: " ".to_string(),
    });
    h.lifecycle.tick().await;

    assert_eq!(h.lifecycle.session().generation(), 1);
    // timers of the old generation are gone and the rest of the batch is dropped
    assert!(!h.lifecycle.session().triggers().has_pending());
    assert!(h.lifecycle.drain_runs().await.is_empty());
    assert!(h.host.is_bound(composer));
}

#[tokio::test(start_paused = true)]
async fn test_unhandled_rejection_reinitializes() {
    let (mut h, _) = harness("");
    h.lifecycle.start().await;

    h.host.push_event(PageEventKind::Rejection {
        message: "network down".to_string(),
    });
    h.lifecycle.tick().await;

    assert_eq!(h.lifecycle.session().generation(), 1);
    assert_eq!(h.host.teardown_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lost_agent_script_is_reinstalled() {
    let (mut h, composer) = harness("");
    h.lifecycle.start().await;

    h.host.unload();
    h.lifecycle.tick().await;

    assert!(h.host.is_installed());
    assert_eq!(h.lifecycle.session().generation(), 1);
    assert!(h.host.is_bound(composer));
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_until_shutdown() {
    let (h, composer) = harness("https://example.com and https://other.org");
    let host = h.host.clone();
    let reader = h.reader.clone();

    let driver = async {
        tokio::time::sleep(Duration::from_millis(250)).await;
        host.push_event(PageEventKind::Input { token: composer });
        tokio::time::sleep(Duration::from_secs(2)).await;
    };

    let stats = h.lifecycle.run(driver).await;

    assert_eq!(reader.call_count(), 2);
    assert_eq!(stats.attachments, 2);
    assert_eq!(stats.runs, 1);
    assert!(!host.is_bound(composer));
    assert_eq!(host.teardown_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_recheck_binds_late_composer() {
    let host = Arc::new(ScriptedHost::new("https://claude.ai/new"));
    let dns = Arc::new(FakeDns::new());
    let reader = Arc::new(FakeReader::new(Reply::Text("unused".to_string())));
    let config = AgentConfig::default();
    let lifecycle = Lifecycle::new(host.clone(), pipeline(&host, &dns, &reader, &config), config);

    let added = parking_lot::Mutex::new(None);
    let driver = async {
        // rendered after start, and no mutation is ever reported
        tokio::time::sleep(Duration::from_millis(300)).await;
        *added.lock() = Some(host.add_element(COMPOSER, ""));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(host.bind_calls().is_empty());

        tokio::time::sleep(Duration::from_secs(1)).await;
    };
    lifecycle.run(driver).await;

    let composer = added.lock().expect("composer added");
    assert_eq!(host.bind_calls(), vec![composer]);
}
