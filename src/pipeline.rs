//! URL-to-attachment pipeline
//!
//! One run reads the composer text, scans it for new URLs, and for each one,
//! strictly in order, retrieves the reader extraction and pastes it back as
//! an attachment. Runs never overlap: a trigger that finds a run in flight is
//! dropped, not queued.
//!
//! ```text
//! read_text ──▶ LinkScanner ──▶ Ledger filter ──▶ ContentRetriever ──▶ AttachmentInjector
//!                                                      (one URL at a time)
//!                      BusyIndicator shown for the whole loop
//! ```

use crate::attachment::{AttachmentInjector, BusyIndicator};
use crate::config::AgentConfig;
use crate::extraction::{
    CandidateUrl, ContentRetriever, DomainResolver, LinkScanner, ReaderTransport,
    RetrievalOutcome,
};
use crate::host::{ElementToken, HostPage};
use crate::ledger::Ledger;
use crate::metrics::PipelineStats;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// At-most-one in-flight run
#[derive(Debug, Default)]
pub struct ProcessingMutex {
    busy: AtomicBool,
}

/// Releases the [`ProcessingMutex`] on drop
#[derive(Debug)]
pub struct ProcessingGuard<'a> {
    mutex: &'a ProcessingMutex,
}

impl ProcessingMutex {
    /// Take the mutex if it is free
    pub fn try_lock(&self) -> Option<ProcessingGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingGuard { mutex: self })
    }

    /// Whether a run holds the mutex
    pub fn is_locked(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.mutex.busy.store(false, Ordering::Release);
    }
}

/// Session state a run works against
#[derive(Clone)]
pub struct RunContext {
    /// Handled URLs and origins of the current session
    pub ledger: Arc<Mutex<Ledger>>,
    /// Busy indicator of the current session
    pub indicator: Arc<BusyIndicator>,
    /// Lifecycle generation the run was started in
    pub generation: u64,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run was in flight
    Busy,
    /// The composer could not be read
    Unreadable,
    /// Nothing new in the text
    NoCandidates,
    /// Candidates were processed
    Completed {
        /// Attachments dispatched
        attached: usize,
        /// Candidates with no content or a failed paste
        skipped: usize,
    },
}

/// The URL-to-attachment pipeline
pub struct Pipeline {
    host: Arc<dyn HostPage>,
    scanner: LinkScanner,
    retriever: ContentRetriever,
    injector: AttachmentInjector,
    mutex: ProcessingMutex,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    /// Assemble a pipeline
    pub fn new(
        host: Arc<dyn HostPage>,
        scanner: LinkScanner,
        retriever: ContentRetriever,
        injector: AttachmentInjector,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            host,
            scanner,
            retriever,
            injector,
            mutex: ProcessingMutex::default(),
            stats,
        }
    }

    /// Assemble a pipeline from its outer services and the agent config
    pub fn from_config(
        host: Arc<dyn HostPage>,
        resolver: Arc<dyn DomainResolver>,
        transport: Arc<dyn ReaderTransport>,
        config: &AgentConfig,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self::new(
            Arc::clone(&host),
            LinkScanner::new(resolver),
            ContentRetriever::new(transport, config.retry),
            AttachmentInjector::new(host, config.min_attachment_len),
            stats,
        )
    }

    /// Whether a run is in flight
    pub fn is_processing(&self) -> bool {
        self.mutex.is_locked()
    }

    /// Shared statistics
    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Run the pipeline for the text currently in `element`
    #[instrument(skip(self, ctx), fields(generation = ctx.generation))]
    pub async fn trigger(&self, ctx: &RunContext, element: ElementToken) -> RunOutcome {
        let Some(_guard) = self.mutex.try_lock() else {
            debug!("Run already in flight, dropping trigger");
            self.stats.record_rejected_run();
            return RunOutcome::Busy;
        };
        self.stats.record_run();

        let text = match self.host.read_text(element).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read composer {}: {}", element, e);
                return RunOutcome::Unreadable;
            }
        };

        let ledger = ctx.ledger.lock().clone();
        let candidates = self.scanner.scan(&text, &ledger).await;
        if candidates.is_empty() {
            return RunOutcome::NoCandidates;
        }
        self.stats.record_candidates(candidates.len());

        ctx.indicator.show().await;
        let outcome = self.process(ctx, element, candidates).await;
        ctx.indicator.hide().await;
        outcome
    }

    async fn process(
        &self,
        ctx: &RunContext,
        element: ElementToken,
        candidates: Vec<CandidateUrl>,
    ) -> RunOutcome {
        let mut attached = 0;
        let mut skipped = 0;

        for candidate in candidates {
            let handled = ctx.ledger.lock().contains(&candidate.normalized);
            if handled {
                continue;
            }

            info!("Processing URL: {}", candidate.normalized);
            let report = self.retriever.retrieve(&candidate.normalized).await;
            let timed_out = report.outcome == RetrievalOutcome::TimedOut;
            let content = report.content().map(str::to_string);
            self.stats
                .record_retrieval(report.attempts, timed_out, content.is_none());

            let Some(content) = content else {
                skipped += 1;
                continue;
            };

            if self.injector.inject(Some(element), &content).await {
                ctx.ledger
                    .lock()
                    .record(&candidate.normalized, &candidate.origin);
                self.stats.record_attachment();
                attached += 1;
            } else {
                self.stats.record_injection_failure();
                skipped += 1;
            }
        }

        RunOutcome::Completed { attached, skipped }
    }
}
