//! Input watcher and lifecycle manager
//!
//! Owns the per-generation [`Session`], polls the host page for events,
//! keeps the composer bound across re-renders, schedules pipeline runs, and
//! rebuilds everything from scratch when the page navigates or reports an
//! error.

use super::bindings::BindingRegistry;
use super::triggers::{Trigger, TriggerState};
use crate::attachment::BusyIndicator;
use crate::config::AgentConfig;
use crate::host::{ElementToken, HostPage, PageEvent, PageEventKind, PollSnapshot};
use crate::ledger::Ledger;
use crate::metrics::{PipelineStats, StatsSnapshot};
use crate::pipeline::{Pipeline, RunContext, RunOutcome};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Why a reinitialize happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReinitReason {
    /// The page address changed
    Navigation {
        /// Address before
        from: String,
        /// Address after
        to: String,
    },
    /// Uncaught page error
    PageError(String),
    /// Unhandled promise rejection
    UnhandledRejection(String),
    /// The page agent script vanished (reload, replaced document)
    AgentLost,
}

/// Everything that lives for one lifecycle generation
pub struct Session {
    generation: u64,
    ledger: Arc<Mutex<Ledger>>,
    bindings: BindingRegistry,
    triggers: TriggerState,
    indicator: Arc<BusyIndicator>,
    last_address: Option<String>,
}

impl Session {
    fn new(generation: u64, host: Arc<dyn HostPage>, config: &AgentConfig) -> Self {
        Self {
            generation,
            ledger: Arc::new(Mutex::new(Ledger::new())),
            bindings: BindingRegistry::new(),
            triggers: TriggerState::new(config.triggers),
            indicator: Arc::new(BusyIndicator::new(host, config.submit_selector.clone())),
            last_address: None,
        }
    }

    /// Lifecycle generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Shared ledger of this generation
    pub fn ledger(&self) -> &Arc<Mutex<Ledger>> {
        &self.ledger
    }

    /// Listener bindings of this generation
    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    /// Pending timers of this generation
    pub fn triggers(&self) -> &TriggerState {
        &self.triggers
    }

    /// Context handed to pipeline runs started in this generation
    pub fn run_context(&self) -> RunContext {
        RunContext {
            ledger: Arc::clone(&self.ledger),
            indicator: Arc::clone(&self.indicator),
            generation: self.generation,
        }
    }
}

/// Drives the agent against one host page
pub struct Lifecycle {
    host: Arc<dyn HostPage>,
    pipeline: Arc<Pipeline>,
    config: AgentConfig,
    session: Session,
    runs: JoinSet<RunOutcome>,
}

impl Lifecycle {
    /// Create a lifecycle at generation 0; call [`Lifecycle::start`] next
    pub fn new(host: Arc<dyn HostPage>, pipeline: Arc<Pipeline>, config: AgentConfig) -> Self {
        let session = Session::new(0, Arc::clone(&host), &config);
        Self {
            host,
            pipeline,
            config,
            session,
            runs: JoinSet::new(),
        }
    }

    /// Current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Shared statistics
    pub fn stats(&self) -> &Arc<PipelineStats> {
        self.pipeline.stats()
    }

    /// Install the page agent and bind the composer
    #[instrument(skip(self), fields(generation = self.session.generation))]
    pub async fn start(&mut self) {
        if let Err(e) = self.host.install(self.session.generation).await {
            error!("Failed to install page agent: {}", e);
            return;
        }
        self.ensure_bound().await;
    }

    /// Tear everything down and start a fresh generation
    #[instrument(skip(self))]
    pub async fn reinitialize(&mut self, reason: ReinitReason) {
        info!("Re-initializing: {:?}", reason);
        self.pipeline.stats().record_reinitialization();
        let address = self.teardown().await;

        let generation = self.session.generation + 1;
        self.session = Session::new(generation, Arc::clone(&self.host), &self.config);
        self.session.last_address = address;
        self.start().await;
    }

    /// Stop timers, retire the indicator, disconnect page observers.
    /// Returns the last seen address. Idempotent.
    async fn teardown(&mut self) -> Option<String> {
        self.session.triggers.clear();
        let unbound = self.session.bindings.clear();
        debug!("Released {} binding(s)", unbound);
        self.session.indicator.cleanup().await;
        if let Err(e) = self.host.teardown().await {
            warn!("Page teardown failed: {}", e);
        }
        self.session.last_address.take()
    }

    /// Bind listeners to the composer if it is not bound in this generation
    pub async fn ensure_bound(&mut self) {
        let element = match self.host.locate(&self.config.editable_selectors).await {
            Ok(Some(element)) => element,
            Ok(None) => return,
            Err(e) => {
                debug!("Composer lookup failed: {}", e);
                return;
            }
        };

        if self.session.bindings.is_bound(element) {
            return;
        }

        info!("Attaching event listeners to {}", element);
        match self.host.bind_listeners(element).await {
            Ok(()) => {
                self.session.bindings.mark_bound(element);
            }
            Err(e) => warn!("Failed to bind listeners to {}: {}", element, e),
        }
    }

    /// Drain the page once and react to what happened
    pub async fn tick(&mut self) {
        match self.host.poll().await {
            Ok(snapshot) => self.handle_snapshot(snapshot, Instant::now()).await,
            Err(e) => warn!("Page poll failed: {}", e),
        }
    }

    /// React to a poll result observed at `received`
    pub async fn handle_snapshot(&mut self, snapshot: PollSnapshot, received: Instant) {
        if !snapshot.installed {
            self.reinitialize(ReinitReason::AgentLost).await;
            self.session.last_address = Some(snapshot.address);
            return;
        }

        match self.session.last_address.as_deref() {
            Some(previous) if previous != snapshot.address => {
                let from = previous.to_string();
                self.reinitialize(ReinitReason::Navigation {
                    from,
                    to: snapshot.address.clone(),
                })
                .await;
                self.session.last_address = Some(snapshot.address);
                return;
            }
            Some(_) => {}
            None => self.session.last_address = Some(snapshot.address),
        }

        let mut rebind = false;
        for event in snapshot.events {
            let at = received.checked_sub(event.age).unwrap_or(received);
            match self.handle_event(event, at) {
                EventEffect::None => {}
                EventEffect::Rebind => rebind = true,
                EventEffect::Reinitialize(reason) => {
                    self.reinitialize(reason).await;
                    return;
                }
            }
        }

        if rebind {
            self.ensure_bound().await;
        }
    }

    fn handle_event(&mut self, event: PageEvent, at: Instant) -> EventEffect {
        match event.kind {
            PageEventKind::Input { token } => {
                let trigger = self.session.triggers.on_text_changed(token, at);
                debug!("Input on {}: {:?}", token, trigger);
            }
            PageEventKind::Paste { token } => {
                let trigger = self.session.triggers.on_paste(token, at);
                debug!("Paste on {}: {:?}", token, trigger);
            }
            PageEventKind::KeyUp { token, key } => {
                if self.session.triggers.on_key_release(token, &key, at) == Trigger::RunNow {
                    self.spawn_run(token);
                }
            }
            PageEventKind::Mutation => {
                return EventEffect::Rebind;
            }
            PageEventKind::Error { message } => {
                error!("Global error caught: {}", message);
                return EventEffect::Reinitialize(ReinitReason::PageError(message));
            }
            PageEventKind::Rejection { message } => {
                error!("Unhandled promise rejection: {}", message);
                return EventEffect::Reinitialize(ReinitReason::UnhandledRejection(message));
            }
        }
        EventEffect::None
    }

    /// Start every run whose timer has expired by `now`
    pub fn fire_due(&mut self, now: Instant) {
        for element in self.session.triggers.take_due(now) {
            self.spawn_run(element);
        }
    }

    fn spawn_run(&mut self, element: ElementToken) {
        let ctx = self.session.run_context();
        let pipeline = Arc::clone(&self.pipeline);
        self.runs
            .spawn(async move { pipeline.trigger(&ctx, element).await });
    }

    /// Wait for every spawned run to finish
    pub async fn drain_runs(&mut self) -> Vec<RunOutcome> {
        let mut outcomes = Vec::new();
        while let Some(joined) = self.runs.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Pipeline run failed: {}", e),
            }
        }
        outcomes
    }

    /// Run until `shutdown` resolves, then tear down
    pub async fn run<F>(mut self, shutdown: F) -> StatsSnapshot
    where
        F: Future<Output = ()>,
    {
        self.start().await;

        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut recheck = tokio::time::interval(self.config.recheck_interval);
        recheck.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            let deadline = self.session.triggers.next_deadline();
            let wake = deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                _ = &mut shutdown => break,
                _ = poll.tick() => self.tick().await,
                _ = recheck.tick() => {
                    debug!("Periodic check");
                    self.ensure_bound().await;
                }
                _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                    self.fire_due(Instant::now());
                }
                Some(joined) = self.runs.join_next(), if !self.runs.is_empty() => {
                    match joined {
                        Ok(outcome) => debug!("Run finished: {:?}", outcome),
                        Err(e) => error!("Pipeline run failed: {}", e),
                    }
                }
            }
        }

        info!("Shutting down");
        self.runs.abort_all();
        self.teardown().await;
        self.pipeline.stats().snapshot()
    }
}

enum EventEffect {
    None,
    Rebind,
    Reinitialize(ReinitReason),
}
