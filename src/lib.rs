//! Reader Paste - Website Content Attachments for a Chat Composer
//!
//! This crate embeds into a chat web application's tab through the Chrome
//! DevTools Protocol, watches the message composer for URLs, fetches a
//! clean-text extraction of each page from a reader service, and attaches
//! that text to the draft message by replaying the host's own file paste
//! interaction.
//!
//! # Features
//!
//! - **Link Scanning**: URL detection, normalization, dedup and DNS existence checks
//! - **Content Retrieval**: Reader service client with bounded retry and timeout
//! - **Attachment Injection**: Synthetic paste sequence carrying a text file
//! - **Lifecycle Management**: Self-healing listener binding and full reinitialize
//!
//! # Architecture
//!
//! ```text
//! Composer events ──▶ Lifecycle (triggers, bindings) ──▶ Pipeline
//!                          │                                 │
//!                          ▼                                 ▼
//!                 ┌──────────────────┐    ┌──────────┐  ┌───────────┐  ┌──────────┐
//!                 │ HostPage (CDP)   │◀───│ Injector │◀─│ Retriever │◀─│ Scanner  │
//!                 └──────────────────┘    └──────────┘  └───────────┘  └──────────┘
//!                          ▲                                              │
//!                          └──── BusyIndicator            Ledger ◀───────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use reader_paste::browser::{BrowserConfig, BrowserController};
//! use reader_paste::config::{AgentConfig, DEFAULT_HOST_URL};
//! use reader_paste::extraction::{DohResolver, HttpReader};
//! use reader_paste::host::CdpHost;
//! use reader_paste::metrics::PipelineStats;
//! use reader_paste::pipeline::Pipeline;
//! use reader_paste::watcher::Lifecycle;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::default();
//!     let mut controller = BrowserController::with_config(BrowserConfig::default()).await?;
//!     let page = controller.open_host(DEFAULT_HOST_URL, &config.host_marker).await?;
//!
//!     let client = reqwest::Client::new();
//!     let host = Arc::new(CdpHost::new(page));
//!     let pipeline = Pipeline::from_config(
//!         host.clone(),
//!         Arc::new(DohResolver::new(client.clone(), config.resolver_endpoint.clone())),
//!         Arc::new(HttpReader::new(client, config.reader_endpoint.clone())),
//!         &config,
//!         Arc::new(PipelineStats::new()),
//!     );
//!
//!     let lifecycle = Lifecycle::new(host, Arc::new(pipeline), config);
//!     let stats = lifecycle
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!     println!("Attached {} page(s)", stats.attachments);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attachment;
pub mod browser;
pub mod config;
pub mod error;
pub mod extraction;
pub mod host;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod status;
pub mod watcher;

// Re-exports for convenience
pub use browser::BrowserController;
pub use config::AgentConfig;
pub use error::{Error, Result};
pub use extraction::{ContentRetriever, LinkScanner};
pub use host::{CdpHost, HostPage, ScriptedHost};
pub use ledger::Ledger;
pub use pipeline::Pipeline;
pub use watcher::Lifecycle;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
