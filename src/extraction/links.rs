//! URL scanning
//!
//! This module pulls URL-shaped substrings out of free text, normalizes them,
//! and filters them down to new, structurally valid, resolvable URLs.

use crate::extraction::resolver::DomainResolver;
use crate::ledger::Ledger;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument};
use url::Url;

/// Permissive URL-shaped pattern; the scheme and `www.` prefix are optional.
const URL_PATTERN: &str = r"(?i)(?:https?://)?(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}(?-u:\b)(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)";

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL_PATTERN).expect("URL pattern is valid"))
}

/// All URL-shaped substrings in order of appearance
pub fn find_url_matches(text: &str) -> Vec<&str> {
    url_regex().find_iter(text).map(|m| m.as_str()).collect()
}

/// Trim, default the scheme to https, and re-serialize canonically.
///
/// Falls back to the trimmed, scheme-qualified string when parsing fails.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let qualified = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&qualified) {
        Ok(url) => url.to_string(),
        Err(_) => qualified,
    }
}

/// `scheme://hostname` of a URL, or the input itself if it cannot be parsed
pub fn base_origin(raw: &str) -> String {
    let normalized = normalize_url(raw);
    match Url::parse(&normalized) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}://{}", url.scheme(), host),
            None => raw.to_string(),
        },
        Err(_) => raw.to_string(),
    }
}

/// Structural checks that need no network: http(s) scheme and a dotted
/// hostname made of non-empty labels. Returns the hostname when valid.
pub fn well_formed_host(normalized: &str) -> Option<String> {
    let url = Url::parse(normalized).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let host = url.host_str()?;
    if !host.contains('.') || host.ends_with('.') {
        return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return None;
    }

    Some(host.to_string())
}

/// A URL found in the input text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateUrl {
    /// The substring as matched
    pub raw: String,
    /// Scheme-qualified, canonically serialized form
    pub normalized: String,
    /// `scheme://hostname`
    pub origin: String,
}

impl CandidateUrl {
    /// Build a candidate from a raw match
    pub fn from_match(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            normalized: normalize_url(raw),
            origin: base_origin(raw),
        }
    }
}

/// Scanner that turns text into new, validated URLs
#[derive(Clone)]
pub struct LinkScanner {
    resolver: Arc<dyn DomainResolver>,
}

impl LinkScanner {
    /// Create a scanner using the given resolver for existence checks
    pub fn new(resolver: Arc<dyn DomainResolver>) -> Self {
        Self { resolver }
    }

    /// Scan `text` for URLs not yet covered by `ledger`.
    ///
    /// At most one candidate per origin is returned, in first-seen order.
    #[instrument(skip(self, text, ledger), fields(text_len = text.len()))]
    pub async fn scan(&self, text: &str, ledger: &Ledger) -> Vec<CandidateUrl> {
        let mut accepted = Vec::new();
        let mut seen_origins: HashSet<String> = HashSet::new();

        for raw in find_url_matches(text) {
            let candidate = CandidateUrl::from_match(raw);

            if seen_origins.contains(&candidate.origin) {
                continue;
            }
            if ledger.contains(&candidate.normalized) {
                continue;
            }
            if ledger.overlaps(&candidate.normalized) {
                debug!("Skipping {}: overlaps a handled URL", candidate.normalized);
                continue;
            }

            let Some(host) = well_formed_host(&candidate.normalized) else {
                debug!("Skipping {}: malformed", candidate.normalized);
                continue;
            };

            if !self.resolver.resolves(&host).await {
                debug!("Skipping {}: domain does not resolve", candidate.normalized);
                continue;
            }

            seen_origins.insert(candidate.origin.clone());
            accepted.push(candidate);
        }

        accepted
    }
}

/// Resolver that accepts every well-formed host; used for offline scans
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipResolution;

#[async_trait::async_trait]
impl DomainResolver for SkipResolution {
    async fn resolves(&self, _hostname: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_matches_in_order() {
        let text = "see example.com, then https://docs.rs/regex and www.rust-lang.org/learn";
        assert_eq!(
            find_url_matches(text),
            vec!["example.com", "https://docs.rs/regex", "www.rust-lang.org/learn"]
        );
    }

    #[test]
    fn test_no_matches_in_plain_text() {
        assert!(find_url_matches("nothing to see here").is_empty());
    }

    #[test]
    fn test_normalize_adds_scheme_and_slash() {
        assert_eq!(normalize_url("  example.com "), "https://example.com/");
        assert_eq!(normalize_url("http://Example.COM/Path"), "http://example.com/Path");
    }

    #[test]
    fn test_normalize_keeps_explicit_scheme_any_case() {
        assert_eq!(normalize_url("HTTPS://example.com"), "https://example.com/");
    }

    #[test]
    fn test_base_origin() {
        assert_eq!(base_origin("EXAMPLE.com/foo?x=1"), "https://example.com");
        assert_eq!(base_origin("http://a.b.io:8080/x"), "http://a.b.io");
    }

    #[test]
    fn test_well_formed_host() {
        assert_eq!(
            well_formed_host("https://docs.rs/"),
            Some("docs.rs".to_string())
        );
        assert_eq!(well_formed_host("https://localhost/"), None);
        assert_eq!(well_formed_host("ftp://example.com/"), None);
        assert_eq!(well_formed_host("https://example..com/"), None);
    }

    #[test]
    fn test_scan_one_candidate_per_origin() {
        let scanner = LinkScanner::new(Arc::new(SkipResolution));
        let found = tokio_test::block_on(scanner.scan(
            "Check out https://example.com and also EXAMPLE.com/foo",
            &Ledger::new(),
        ));

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].normalized, "https://example.com/");
        assert_eq!(found[0].origin, "https://example.com");
    }
}
