//! Host document adapter
//!
//! The host application exposes no API, so everything the agent knows about
//! it comes from observing its document. [`HostPage`] is that observation and
//! manipulation surface: the CDP implementation drives a real page through an
//! installed agent script, the scripted implementation keeps a fake document
//! in memory.
//!
//! ```text
//! Lifecycle ──poll()──▶ HostPage ──▶ page agent script (listeners, observer, hooks)
//!     │                    ▲
//!     ▼                    │ read_text / dispatch_sequence / override_control
//! Pipeline ────────────────┘
//! ```

pub mod cdp;
pub mod scripted;

pub use cdp::CdpHost;
pub use scripted::ScriptedHost;

use crate::error::HostError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Stable identity of a host element, issued by the host on first sight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementToken(pub u64);

impl fmt::Display for ElementToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something observed in the page since the last poll
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageEventKind {
    /// Text changed in a bound element
    Input {
        /// Element the listener is bound to
        token: ElementToken,
    },
    /// Paste into a bound element
    Paste {
        /// Element the listener is bound to
        token: ElementToken,
    },
    /// Key released in a bound element
    KeyUp {
        /// Element the listener is bound to
        token: ElementToken,
        /// `KeyboardEvent.key`
        key: String,
    },
    /// The document changed somewhere (coalesced between polls)
    Mutation,
    /// Uncaught page error
    Error {
        /// Error message as reported by the page
        #[serde(default)]
        message: String,
    },
    /// Unhandled promise rejection
    Rejection {
        /// Rejection reason as reported by the page
        #[serde(default)]
        message: String,
    },
}

/// A page event with how long ago it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEvent {
    /// What happened
    pub kind: PageEventKind,
    /// Time between the event and the poll that delivered it
    pub age: Duration,
}

impl PageEvent {
    /// An event that just happened
    pub fn now(kind: PageEventKind) -> Self {
        Self {
            kind,
            age: Duration::ZERO,
        }
    }
}

/// Result of draining the page
#[derive(Debug, Clone, Default)]
pub struct PollSnapshot {
    /// Whether the agent script is present in the page
    pub installed: bool,
    /// Current page address
    pub address: String,
    /// Events in the order they happened
    pub events: Vec<PageEvent>,
}

/// One entry of a synthetic data transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferItem {
    /// Format key, e.g. `text/plain`
    pub mime: String,
    /// Payload
    pub data: String,
}

/// File carried by a synthetic data transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFile {
    /// File name
    pub name: String,
    /// MIME type
    pub mime: String,
    /// File body
    pub content: String,
}

/// Synthetic clipboard contents for a paste event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferPayload {
    /// String items, set in order
    pub items: Vec<TransferItem>,
    /// Attached file
    pub file: Option<TransferFile>,
}

impl TransferPayload {
    /// Data stored under `mime`, if any
    pub fn data(&self, mime: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.mime == mime)
            .map(|item| item.data.as_str())
    }
}

/// A UI event manufactured by the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticEvent {
    /// `focus`
    Focus,
    /// `beforeinput` with `insertFromPaste`
    BeforeInput {
        /// Inserted text
        data: String,
    },
    /// `paste` carrying a data transfer
    Paste {
        /// Clipboard contents
        transfer: TransferPayload,
    },
    /// `input` with `insertFromPaste`
    Input {
        /// Inserted text
        data: String,
    },
    /// `change`
    Change,
}

impl SyntheticEvent {
    /// DOM event type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::BeforeInput { .. } => "beforeinput",
            Self::Paste { .. } => "paste",
            Self::Input { .. } => "input",
            Self::Change => "change",
        }
    }

    /// Whether listeners may cancel it
    pub fn cancelable(&self) -> bool {
        matches!(self, Self::BeforeInput { .. } | Self::Paste { .. })
    }

    /// Wire form consumed by the page agent script
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Focus | Self::Change => json!({
                "type": self.name(),
                "cancelable": self.cancelable(),
            }),
            Self::BeforeInput { data } | Self::Input { data } => json!({
                "type": self.name(),
                "cancelable": self.cancelable(),
                "inputType": "insertFromPaste",
                "data": data,
            }),
            Self::Paste { transfer } => json!({
                "type": self.name(),
                "cancelable": self.cancelable(),
                "transfer": transfer,
            }),
        }
    }
}

/// Observation and manipulation surface of the host document.
///
/// Every method is best-effort: a missing element is `Ok(None)` or a
/// [`HostError`], never a panic.
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Install the observers and error hooks for a lifecycle generation
    async fn install(&self, generation: u64) -> Result<(), HostError>;

    /// Disconnect observers and remove every listener; safe to repeat
    async fn teardown(&self) -> Result<(), HostError>;

    /// Drain queued events and report the current address
    async fn poll(&self) -> Result<PollSnapshot, HostError>;

    /// First element matching the selectors, in priority order
    async fn locate(&self, selectors: &[String]) -> Result<Option<ElementToken>, HostError>;

    /// Attach text-changed, paste and key-release listeners
    async fn bind_listeners(&self, element: ElementToken) -> Result<(), HostError>;

    /// Current text of an editable element
    async fn read_text(&self, element: ElementToken) -> Result<String, HostError>;

    /// Give an element focus
    async fn focus(&self, element: ElementToken) -> Result<(), HostError>;

    /// Dispatch events in order; returns `dispatchEvent` results (false = cancelled)
    async fn dispatch_sequence(
        &self,
        element: ElementToken,
        events: &[SyntheticEvent],
    ) -> Result<Vec<bool>, HostError>;

    /// Add a style sheet once per id; returns whether it was added now
    async fn install_style(&self, id: &str, css: &str) -> Result<bool, HostError>;

    /// Disable a control and swap its markup; returns the previous markup
    async fn override_control(&self, element: ElementToken, markup: &str)
        -> Result<String, HostError>;

    /// Re-enable a control and put its markup back
    async fn restore_control(&self, element: ElementToken, markup: &str) -> Result<(), HostError>;
}
