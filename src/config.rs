//! Agent configuration
//!
//! Endpoints, timings and the host document contract. Defaults reproduce the
//! behavior the agent was tuned against; every field can be overridden through
//! the builder or the CLI.

use std::time::Duration;

/// Default DNS-over-HTTPS JSON endpoint used for domain existence checks
pub const DEFAULT_RESOLVER_ENDPOINT: &str = "https://dns.google/resolve";

/// Default reader service base URL
pub const DEFAULT_READER_ENDPOINT: &str = "https://r.jina.ai";

/// Default host page address
pub const DEFAULT_HOST_URL: &str = "https://claude.ai/new";

/// Address fragment that marks a page as the host application
pub const DEFAULT_HOST_MARKER: &str = "claude.ai";

/// Editable surface selectors, highest priority first
pub const DEFAULT_EDITABLE_SELECTORS: [&str; 3] =
    [".ProseMirror", "[role=\"textbox\"]", "textarea"];

/// Submit control selector
pub const DEFAULT_SUBMIT_SELECTOR: &str = "button[aria-label=\"Send Message\"]";

/// Timings used by the trigger state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerTimings {
    /// Trailing debounce for typed input (default: 500ms)
    pub typing_debounce: Duration,
    /// Paste cooldown, also suppresses input/keyup right after a paste (default: 1000ms)
    pub paste_cooldown: Duration,
    /// Delay between a paste and the pipeline run (default: 100ms)
    pub paste_settle: Duration,
}

impl Default for TriggerTimings {
    fn default() -> Self {
        Self {
            typing_debounce: Duration::from_millis(500),
            paste_cooldown: Duration::from_millis(1000),
            paste_settle: Duration::from_millis(100),
        }
    }
}

/// Retry contract for the reader service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt timeout (default: 10s)
    pub timeout: Duration,
    /// Retries after the first attempt (default: 2)
    pub max_retries: u32,
    /// Fixed delay between attempts (default: 1s)
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Full agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Domain resolution endpoint
    pub resolver_endpoint: String,
    /// Reader service base URL
    pub reader_endpoint: String,
    /// Address fragment identifying the host application
    pub host_marker: String,
    /// Editable surface selectors in priority order
    pub editable_selectors: Vec<String>,
    /// Submit control selector
    pub submit_selector: String,
    /// Minimum attachment length; shorter content is space padded
    pub min_attachment_len: usize,
    /// Trigger timings
    pub triggers: TriggerTimings,
    /// Reader retry contract
    pub retry: RetryPolicy,
    /// How often page events are drained (default: 100ms)
    pub poll_interval: Duration,
    /// Self-healing rebind interval (default: 5s)
    pub recheck_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            resolver_endpoint: DEFAULT_RESOLVER_ENDPOINT.to_string(),
            reader_endpoint: DEFAULT_READER_ENDPOINT.to_string(),
            host_marker: DEFAULT_HOST_MARKER.to_string(),
            editable_selectors: DEFAULT_EDITABLE_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            submit_selector: DEFAULT_SUBMIT_SELECTOR.to_string(),
            min_attachment_len: 4000,
            triggers: TriggerTimings::default(),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_millis(100),
            recheck_interval: Duration::from_secs(5),
        }
    }
}

impl AgentConfig {
    /// Create a new config builder
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }
}

/// Builder for AgentConfig
#[derive(Default)]
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    /// Set the domain resolution endpoint
    pub fn resolver_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.resolver_endpoint = endpoint.into();
        self
    }

    /// Set the reader service base URL
    pub fn reader_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.reader_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the host marker
    pub fn host_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.config.host_marker = marker.into();
        self
    }

    /// Replace the editable selector list
    pub fn editable_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.editable_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the submit control selector
    pub fn submit_selector<S: Into<String>>(mut self, selector: S) -> Self {
        self.config.submit_selector = selector.into();
        self
    }

    /// Set the minimum attachment length
    pub fn min_attachment_len(mut self, len: usize) -> Self {
        self.config.min_attachment_len = len;
        self
    }

    /// Set trigger timings
    pub fn triggers(mut self, triggers: TriggerTimings) -> Self {
        self.config.triggers = triggers;
        self
    }

    /// Set the reader retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the page event poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the periodic recheck interval
    pub fn recheck_interval(mut self, interval: Duration) -> Self {
        self.config.recheck_interval = interval;
        self
    }

    /// Build the config
    pub fn build(self) -> AgentConfig {
        self.config
    }
}
