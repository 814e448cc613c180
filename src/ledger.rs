//! Session-scoped record of handled URLs and origins.

use std::collections::HashSet;

/// Normalized URLs and bare base-origins already processed in this session.
///
/// Only ever grows. The lifecycle manager drops it wholesale on reinitialize.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: HashSet<String>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact membership test
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }

    /// Record an entry; returns false if it was already present
    pub fn insert(&mut self, entry: impl Into<String>) -> bool {
        self.entries.insert(entry.into())
    }

    /// Record a URL together with its base-origin
    pub fn record(&mut self, url: &str, origin: &str) {
        self.insert(url);
        self.insert(origin);
    }

    /// True if `url` extends an entry or an entry extends `url`.
    ///
    /// A URL still being typed keeps growing past the already handled prefix,
    /// and a stored base-origin covers every path under it.
    pub fn overlaps(&self, url: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| url.starts_with(entry.as_str()) || entry.starts_with(url))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
