//! URL discovery and content retrieval
//!
//! This module finds new URLs in composer text, checks that their domains
//! exist, and fetches their reader-service extraction.

pub mod content;
pub mod links;
pub mod resolver;

pub use content::{
    classify, ContentRetriever, HttpReader, ReaderResponse, ReaderTransport, RetrievalOutcome,
    RetrievalReport,
};
pub use links::{
    base_origin, find_url_matches, normalize_url, well_formed_host, CandidateUrl, LinkScanner,
    SkipResolution,
};
pub use resolver::{DnsJsonResponse, DohResolver, DomainResolver};
