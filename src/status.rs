//! Companion status report.
//!
//! Informational only: tells the user whether the agent considers a page
//! address to be the host application. Nothing in the pipeline depends on it.
//!
//! # Example Report
//!
//! ```json
//! {
//!   "name": "reader-paste",
//!   "version": "0.1.0",
//!   "active": true,
//!   "message": "Active and ready to extract website content",
//!   "address": "https://claude.ai/new",
//!   "host_marker": "claude.ai",
//!   "timestamp": "2026-01-01T12:00:00+00:00"
//! }
//! ```

use crate::browser::is_host_page;
use crate::metrics::StatsSnapshot;
use serde::{Deserialize, Serialize};

/// Agent version from Cargo.toml
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Agent name from Cargo.toml
pub const AGENT_NAME: &str = env!("CARGO_PKG_NAME");

const ACTIVE_MESSAGE: &str = "Active and ready to extract website content";

/// Status of the agent for one page address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Agent name
    pub name: String,
    /// Agent version
    pub version: String,
    /// Whether the address belongs to the host application
    pub active: bool,
    /// Human-readable status line
    pub message: String,
    /// Address the report is about
    pub address: String,
    /// Marker the address was checked against
    pub host_marker: String,
    /// Counters of the running agent, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
    /// RFC 3339 time the report was generated
    pub timestamp: String,
}

impl AgentStatus {
    /// Report for `address`
    pub fn for_address(address: &str, host_marker: &str) -> Self {
        let active = is_host_page(address, host_marker);
        let message = if active {
            ACTIVE_MESSAGE.to_string()
        } else {
            format!("Please navigate to {} to use the agent", host_marker)
        };

        Self {
            name: AGENT_NAME.to_string(),
            version: AGENT_VERSION.to_string(),
            active,
            message,
            address: address.to_string(),
            host_marker: host_marker.to_string(),
            stats: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Attach run statistics
    pub fn with_stats(mut self, stats: StatsSnapshot) -> Self {
        self.stats = Some(stats);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_on_host() {
        let status = AgentStatus::for_address("https://claude.ai/chat/42", "claude.ai");
        assert!(status.active);
        assert_eq!(status.message, ACTIVE_MESSAGE);
    }

    #[test]
    fn test_inactive_elsewhere() {
        let status = AgentStatus::for_address("https://example.com/", "claude.ai");
        assert!(!status.active);
        assert!(status.message.contains("claude.ai"));
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(AgentStatus::for_address("https://claude.ai", "claude.ai"))
            .unwrap();
        assert_eq!(json["active"], true);
        assert_eq!(json["name"], "reader-paste");
        assert!(json.get("stats").is_none());

        let with_stats = AgentStatus::for_address("https://claude.ai", "claude.ai")
            .with_stats(StatsSnapshot::default());
        let json = serde_json::to_value(with_stats).unwrap();
        assert_eq!(json["stats"]["attachments"], 0);
    }
}
