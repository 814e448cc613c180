//! Error types for Reader Paste
//!
//! This module provides the error hierarchy used across the agent, built on
//! `thiserror`. Only browser setup errors ever reach the binary; everything
//! raised inside the pipeline is caught, logged and turned into a skip.

use thiserror::Error;

/// The main error type for Reader Paste operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Host document errors
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Reader service retrieval errors
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Synthetic paste errors
    #[error("Injection error: {0}")]
    Injection(#[from] InjectionError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Failed to attach to an already running browser
    #[error("Failed to connect to browser at {url}: {message}")]
    ConnectFailed {
        /// DevTools websocket URL
        url: String,
        /// Underlying error message
        message: String,
    },

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),
}

/// Errors talking to the host document
#[derive(Error, Debug)]
pub enum HostError {
    /// The page-side agent script is not present (page reloaded or replaced)
    #[error("Page agent script is not installed")]
    ScriptMissing,

    /// An element token no longer refers to a live element
    #[error("Element {0} is no longer attached to the document")]
    StaleElement(u64),

    /// Script evaluation failed inside the page
    #[error("Page script failed: {0}")]
    ScriptFailed(String),

    /// The page returned something the agent could not decode
    #[error("Unexpected page response: {0}")]
    Decode(String),
}

/// Reader service errors, classified per attempt
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// The attempt exceeded the retrieval timeout and was cancelled
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Transport-level failure (DNS, TLS, connection reset, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// Body declared as JSON but could not be parsed
    #[error("Malformed reader payload: {0}")]
    Malformed(String),

    /// The reader service reported an error in its payload
    #[error("Reader service error: {0}")]
    Service(String),
}

impl RetrievalError {
    /// Whether this failure is the timeout outcome
    pub fn is_timeout(&self) -> bool {
        matches!(self, RetrievalError::Timeout(_))
    }
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        RetrievalError::Network(err.to_string())
    }
}

/// Synthetic paste sequence errors
#[derive(Error, Debug)]
pub enum InjectionError {
    /// Nothing to attach
    #[error("Invalid element or content provided")]
    EmptyContent,

    /// The descriptor could not be serialized
    #[error("Failed to build attachment descriptor: {0}")]
    Descriptor(String),

    /// The dispatch itself failed inside the host
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] HostError),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),
}

/// Result type alias for Reader Paste operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for HostError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        HostError::ScriptFailed(err.to_string())
    }
}
