//! Reader service retrieval
//!
//! Fetches the reader service's text extraction of a URL under a per-attempt
//! timeout and a fixed-delay retry budget. Exhausting the budget is a soft
//! failure: the caller just gets no content.

use crate::config::RetryPolicy;
use crate::error::RetrievalError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Raw reader response, before classification
#[derive(Debug, Clone)]
pub struct ReaderResponse {
    /// HTTP status code
    pub status: u16,
    /// Declared content type, if any
    pub content_type: Option<String>,
    /// Response body
    pub body: String,
}

/// JSON body shape of the reader service
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderPayload {
    /// Extracted text
    pub content: Option<String>,
    /// Service-side error
    pub error: Option<String>,
    /// Request metadata
    pub meta: Option<ReaderMeta>,
}

/// Metadata echoed by the reader service
#[derive(Debug, Clone, Deserialize)]
pub struct ReaderMeta {
    /// URL that was read
    pub url: String,
    /// Service timestamp
    pub timestamp: String,
}

/// One GET against the reader service
#[async_trait]
pub trait ReaderTransport: Send + Sync {
    /// Fetch the extraction of `target`
    async fn get(&self, target: &str) -> Result<ReaderResponse, RetrievalError>;
}

/// Reader transport over HTTP
#[derive(Debug, Clone)]
pub struct HttpReader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReader {
    /// Create a transport for the reader at `endpoint`
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// Reader URL for a target, with the target percent-encoded into the path
    pub fn reader_url(&self, target: &str) -> String {
        format!("{}/{}", self.endpoint, urlencoding::encode(target))
    }
}

#[async_trait]
impl ReaderTransport for HttpReader {
    async fn get(&self, target: &str) -> Result<ReaderResponse, RetrievalError> {
        let response = self
            .client
            .get(self.reader_url(target))
            .header(reqwest::header::ACCEPT, "text/plain, application/json")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(ReaderResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Turn a raw response into content, no content, or a retryable failure
pub fn classify(response: ReaderResponse) -> Result<Option<String>, RetrievalError> {
    if !(200..300).contains(&response.status) {
        return Err(RetrievalError::Status(response.status));
    }

    let is_json = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.contains("application/json"));

    let content = if is_json {
        let payload: ReaderPayload = serde_json::from_str(&response.body)
            .map_err(|e| RetrievalError::Malformed(e.to_string()))?;
        if let Some(err) = payload.error.filter(|e| !e.is_empty()) {
            return Err(RetrievalError::Service(err));
        }
        if let Some(meta) = &payload.meta {
            debug!(url = %meta.url, timestamp = %meta.timestamp, "Reader metadata");
        }
        payload.content
    } else {
        Some(response.body)
    };

    Ok(content.filter(|c| !c.is_empty()))
}

/// How a retrieval ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// Extracted text
    Content(String),
    /// The service answered successfully but had nothing to return
    NoContent,
    /// An attempt hit the timeout; retrieval stops there
    TimedOut,
    /// Every attempt failed
    Exhausted {
        /// Last failure message
        last_error: String,
    },
}

/// Outcome plus the bookkeeping of the retry loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalReport {
    /// How it ended
    pub outcome: RetrievalOutcome,
    /// Network attempts made
    pub attempts: u32,
    /// Time spent waiting between attempts
    pub backoff: Duration,
}

impl RetrievalReport {
    /// Extracted text, if any
    pub fn content(&self) -> Option<&str> {
        match &self.outcome {
            RetrievalOutcome::Content(c) => Some(c),
            _ => None,
        }
    }

    /// Consume the report, keeping only the text
    pub fn into_content(self) -> Option<String> {
        match self.outcome {
            RetrievalOutcome::Content(c) => Some(c),
            _ => None,
        }
    }
}

/// Retrieval with timeout and fixed-delay retries
#[derive(Clone)]
pub struct ContentRetriever {
    transport: Arc<dyn ReaderTransport>,
    policy: RetryPolicy,
}

impl ContentRetriever {
    /// Create a retriever
    pub fn new(transport: Arc<dyn ReaderTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Retrieve the reader extraction of `url`
    #[instrument(skip(self))]
    pub async fn retrieve(&self, url: &str) -> RetrievalReport {
        let timeout_ms = self.policy.timeout.as_millis() as u64;
        let mut attempts = 0;
        let mut backoff = Duration::ZERO;

        loop {
            attempts += 1;
            info!("Fetching from reader (attempt {}): {}", attempts, url);

            // Dropping the request future on timeout aborts the in-flight call.
            let result = match tokio::time::timeout(self.policy.timeout, self.transport.get(url))
                .await
            {
                Ok(response) => response.and_then(classify),
                Err(_) => Err(RetrievalError::Timeout(timeout_ms)),
            };

            let outcome = match result {
                Ok(Some(content)) => RetrievalOutcome::Content(content),
                Ok(None) => {
                    debug!("Reader returned no content for {}", url);
                    RetrievalOutcome::NoContent
                }
                Err(e) if e.is_timeout() => {
                    error!("Attempt {} failed: {}", attempts, e);
                    RetrievalOutcome::TimedOut
                }
                Err(e) => {
                    error!("Attempt {} failed: {}", attempts, e);
                    if attempts >= self.policy.max_attempts() {
                        warn!("All attempts failed for {}", url);
                        RetrievalOutcome::Exhausted {
                            last_error: e.to_string(),
                        }
                    } else {
                        info!("Retrying in {}ms...", self.policy.retry_delay.as_millis());
                        tokio::time::sleep(self.policy.retry_delay).await;
                        backoff += self.policy.retry_delay;
                        continue;
                    }
                }
            };

            return RetrievalReport {
                outcome,
                attempts,
                backoff,
            };
        }
    }
}
