//! Shared fakes for integration tests
//!
//! In-memory resolver and reader service that count every call, plus a
//! helper assembling a pipeline on top of a scripted host page.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reader_paste::config::{AgentConfig, DEFAULT_SUBMIT_SELECTOR};
use reader_paste::error::RetrievalError;
use reader_paste::extraction::{DnsJsonResponse, DomainResolver, ReaderResponse, ReaderTransport};
use reader_paste::host::{ElementToken, ScriptedHost};
use reader_paste::metrics::PipelineStats;
use reader_paste::pipeline::Pipeline;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const COMPOSER: &str = ".ProseMirror";

/// DNS JSON answers keyed by hostname; unknown hosts get `{"Status": 3}`
#[derive(Default)]
pub struct FakeDns {
    answers: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl FakeDns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `host` with one A record
    pub fn with_host(self, host: &str) -> Self {
        self.answers.lock().insert(
            host.to_string(),
            r#"{"Status":0,"Answer":[{"name":"x","type":1,"data":"93.184.216.34"}]}"#.to_string(),
        );
        self
    }

    /// Answer `host` with a raw DNS JSON body
    pub fn with_body(self, host: &str, body: &str) -> Self {
        self.answers
            .lock()
            .insert(host.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DomainResolver for FakeDns {
    async fn resolves(&self, hostname: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self
            .answers
            .lock()
            .get(hostname)
            .cloned()
            .unwrap_or_else(|| r#"{"Status":3}"#.to_string());
        serde_json::from_str::<DnsJsonResponse>(&body)
            .map(|r| r.is_resolvable())
            .unwrap_or(false)
    }
}

/// How the fake reader answers
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Json(String),
    Status(u16),
    Network,
    /// Answer with text after sleeping this long
    Slow(Duration, String),
}

/// Reader service fake with a fixed reply per target URL
pub struct FakeReader {
    replies: Mutex<HashMap<String, Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<String>>,
}

impl FakeReader {
    /// Every URL gets `fallback` unless configured otherwise
    pub fn new(fallback: Reply) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(self, url: &str, reply: Reply) -> Self {
        self.replies.lock().insert(url.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ReaderTransport for FakeReader {
    async fn get(&self, target: &str) -> Result<ReaderResponse, RetrievalError> {
        self.calls.lock().push(target.to_string());
        let reply = self
            .replies
            .lock()
            .get(target)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(body) => Ok(ReaderResponse {
                status: 200,
                content_type: Some("text/plain; charset=utf-8".to_string()),
                body,
            }),
            Reply::Json(body) => Ok(ReaderResponse {
                status: 200,
                content_type: Some("application/json".to_string()),
                body,
            }),
            Reply::Status(status) => Ok(ReaderResponse {
                status,
                content_type: None,
                body: String::new(),
            }),
            Reply::Network => Err(RetrievalError::Network("connection reset".to_string())),
            Reply::Slow(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(ReaderResponse {
                    status: 200,
                    content_type: Some("text/plain".to_string()),
                    body,
                })
            }
        }
    }
}

/// A scripted page with a composer and a submit button
pub fn host_with_composer(text: &str) -> (Arc<ScriptedHost>, ElementToken, ElementToken) {
    let host = Arc::new(ScriptedHost::new("https://claude.ai/new"));
    let composer = host.add_element(COMPOSER, text);
    let submit = host.add_element(DEFAULT_SUBMIT_SELECTOR, "<svg>send</svg>");
    (host, composer, submit)
}

/// Pipeline over the scripted host and the fakes
pub fn pipeline(
    host: &Arc<ScriptedHost>,
    dns: &Arc<FakeDns>,
    reader: &Arc<FakeReader>,
    config: &AgentConfig,
) -> Arc<Pipeline> {
    Arc::new(Pipeline::from_config(
        host.clone(),
        dns.clone(),
        reader.clone(),
        config,
        Arc::new(PipelineStats::new()),
    ))
}
