//! Domain existence checks
//!
//! A candidate host only counts as real if a DNS-over-HTTPS JSON endpoint
//! resolves it. Every failure mode answers "does not exist".

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Answers whether a hostname exists
#[async_trait]
pub trait DomainResolver: Send + Sync {
    /// True only when the domain is known to resolve
    async fn resolves(&self, hostname: &str) -> bool;
}

/// DNS JSON response (`application/dns-json` shape)
#[derive(Debug, Clone, Deserialize)]
pub struct DnsJsonResponse {
    /// DNS RCODE, 0 = NOERROR
    #[serde(rename = "Status")]
    pub status: i64,
    /// Answer records
    #[serde(rename = "Answer", default)]
    pub answer: Option<Vec<serde_json::Value>>,
    /// Authority records
    #[serde(rename = "Authority", default)]
    pub authority: Option<Vec<serde_json::Value>>,
}

impl DnsJsonResponse {
    /// NOERROR with at least one answer or authority record
    pub fn is_resolvable(&self) -> bool {
        let has = |records: &Option<Vec<serde_json::Value>>| {
            records.as_ref().is_some_and(|r| !r.is_empty())
        };
        self.status == 0 && (has(&self.answer) || has(&self.authority))
    }
}

/// Resolver backed by a DNS-over-HTTPS JSON API
#[derive(Debug, Clone)]
pub struct DohResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl DohResolver {
    /// Create a resolver for the given endpoint
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn query(&self, hostname: &str) -> Result<bool, reqwest::Error> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", hostname)])
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Resolver returned non-success status");
            return Ok(false);
        }

        let data: DnsJsonResponse = response.json().await?;
        Ok(data.is_resolvable())
    }
}

#[async_trait]
impl DomainResolver for DohResolver {
    #[instrument(skip(self))]
    async fn resolves(&self, hostname: &str) -> bool {
        match self.query(hostname).await {
            Ok(valid) => valid,
            Err(e) => {
                debug!("Domain check failed for {}: {}", hostname, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> DnsJsonResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_noerror_with_answer_resolves() {
        let resp = parse(r#"{"Status":0,"Answer":[{"name":"example.com.","type":1,"data":"93.184.215.14"}]}"#);
        assert!(resp.is_resolvable());
    }

    #[test]
    fn test_noerror_with_authority_only_resolves() {
        let resp = parse(r#"{"Status":0,"Authority":[{"name":"example.com.","type":6}]}"#);
        assert!(resp.is_resolvable());
    }

    #[test]
    fn test_nxdomain_rejected() {
        let resp = parse(r#"{"Status":3,"Authority":[{"name":"com.","type":6}]}"#);
        assert!(!resp.is_resolvable());
    }

    #[test]
    fn test_noerror_without_records_rejected() {
        assert!(!parse(r#"{"Status":0}"#).is_resolvable());
        assert!(!parse(r#"{"Status":0,"Answer":[]}"#).is_resolvable());
    }
}
