//! Link scanner tests
//!
//! Detection, normalization, per-scan origin dedup, ledger suppression and
//! the domain existence check.

mod support;

use pretty_assertions::assert_eq;
use reader_paste::extraction::{find_url_matches, LinkScanner, SkipResolution};
use reader_paste::ledger::Ledger;
use std::sync::Arc;
use support::FakeDns;

fn offline() -> LinkScanner {
    LinkScanner::new(Arc::new(SkipResolution))
}

fn normalized(candidates: &[reader_paste::extraction::CandidateUrl]) -> Vec<&str> {
    candidates.iter().map(|c| c.normalized.as_str()).collect()
}

#[tokio::test]
async fn test_one_candidate_per_origin() {
    let found = offline()
        .scan(
            "Check out https://example.com and also EXAMPLE.com/foo",
            &Ledger::new(),
        )
        .await;

    assert_eq!(normalized(&found), vec!["https://example.com/"]);
    assert_eq!(found[0].origin, "https://example.com");
}

#[test]
fn test_url_next_to_non_ascii_text() {
    assert_eq!(find_url_matches("看example.com网站"), vec!["example.com"]);
    assert_eq!(find_url_matches("voir example.comé"), vec!["example.com"]);
    assert_eq!(find_url_matches("see example.com!"), vec!["example.com"]);
}

#[tokio::test]
async fn test_url_inside_cjk_sentence_is_scanned() {
    let found = offline()
        .scan("请看https://example.com/docs网站", &Ledger::new())
        .await;
    assert_eq!(normalized(&found), vec!["https://example.com/docs"]);
}

#[tokio::test]
async fn test_bare_domains_get_https() {
    let found = offline()
        .scan("see www.rust-lang.org/learn and docs.rs", &Ledger::new())
        .await;

    assert_eq!(
        normalized(&found),
        vec!["https://www.rust-lang.org/learn", "https://docs.rs/"]
    );
}

#[tokio::test]
async fn test_http_scheme_kept() {
    let found = offline()
        .scan("HTTP://Example.org/Path?q=1", &Ledger::new())
        .await;

    assert_eq!(normalized(&found), vec!["http://example.org/Path?q=1"]);
}

#[tokio::test]
async fn test_plain_text_has_no_candidates() {
    let found = offline()
        .scan("nothing to see here, just words.", &Ledger::new())
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_ledger_suppresses_known_url_and_prefixes() {
    let mut ledger = Ledger::new();
    ledger.record("https://example.com/articles", "https://example.com");

    let scanner = offline();
    assert!(scanner
        .scan("https://example.com/articles", &ledger)
        .await
        .is_empty());
    // still being typed: extends a handled URL
    assert!(scanner
        .scan("https://example.com/articles/42", &ledger)
        .await
        .is_empty());
    // another path on a handled origin
    assert!(scanner
        .scan("example.com/other", &ledger)
        .await
        .is_empty());

    let found = scanner.scan("https://other.org/x", &ledger).await;
    assert_eq!(normalized(&found), vec!["https://other.org/x"]);
}

#[tokio::test]
async fn test_nxdomain_rejected() {
    let dns = Arc::new(
        FakeDns::new()
            .with_host("example.com")
            .with_body("nope.test", r#"{"Status":3}"#),
    );
    let scanner = LinkScanner::new(dns.clone());

    let found = scanner
        .scan("https://nope.test/page and https://example.com", &Ledger::new())
        .await;

    assert_eq!(normalized(&found), vec!["https://example.com/"]);
    assert_eq!(dns.calls(), 2);
}

#[tokio::test]
async fn test_noerror_without_records_rejected() {
    let dns = Arc::new(FakeDns::new().with_body("empty.dev", r#"{"Status":0,"Answer":[]}"#));
    let found = LinkScanner::new(dns)
        .scan("empty.dev", &Ledger::new())
        .await;
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_authority_only_accepted() {
    let dns = Arc::new(FakeDns::new().with_body(
        "zone.dev",
        r#"{"Status":0,"Authority":[{"name":"zone.dev","type":6}]}"#,
    ));
    let found = LinkScanner::new(dns).scan("zone.dev", &Ledger::new()).await;
    assert_eq!(normalized(&found), vec!["https://zone.dev/"]);
}

#[tokio::test]
async fn test_ledger_check_precedes_resolution() {
    let dns = Arc::new(FakeDns::new().with_host("example.com"));
    let mut ledger = Ledger::new();
    ledger.record("https://example.com/", "https://example.com");

    let found = LinkScanner::new(dns.clone())
        .scan("https://example.com", &ledger)
        .await;

    assert!(found.is_empty());
    assert_eq!(dns.calls(), 0);
}
