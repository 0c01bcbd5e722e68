//! Generation-tagged run context shared by discovery and enrichment.
//!
//! One [`RunContext`] owns the active run: its phase, request, lead store and
//! event log. Every reset bumps the generation counter; work that started
//! under an older generation must re-check it after each suspension point and
//! drop its result if the run has moved on.

use std::sync::Arc;

use leadscout_shared::{
    Enrichment, LeadId, LeadRecord, LogEvent, Result, RunPhase, SearchRequest, Severity,
};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::log::EventLog;
use crate::observer::{PipelineObserver, PipelineUpdate, SilentObserver};
use crate::progress::Progress;
use crate::store::LeadStore;

/// Mutable state of the active run.
#[derive(Debug, Default)]
struct RunState {
    generation: u64,
    phase: RunPhase,
    request: Option<SearchRequest>,
    target_count: u32,
    error: Option<String>,
    store: LeadStore,
    log: EventLog,
}

/// Point-in-time copy of the run, for readers.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub generation: u64,
    pub phase: RunPhase,
    pub request: Option<SearchRequest>,
    pub target_count: u32,
    pub error: Option<String>,
    pub leads: Vec<LeadRecord>,
    pub events: Vec<LogEvent>,
}

impl RunSnapshot {
    /// Metrics over this snapshot's leads.
    pub fn progress(&self) -> Progress {
        Progress::from_records(&self.leads, self.target_count)
    }

    pub fn lead(&self, id: &LeadId) -> Option<&LeadRecord> {
        self.leads.iter().find(|l| &l.id == id)
    }
}

/// Shared handle to the active run. Cheap to clone.
#[derive(Clone)]
pub struct RunContext {
    state: Arc<Mutex<RunState>>,
    observer: Arc<dyn PipelineObserver>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Arc::new(SilentObserver))
    }
}

impl RunContext {
    pub fn new(observer: Arc<dyn PipelineObserver>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::default())),
            observer,
        }
    }

    /// Lock the run for a batch of mutations that observers see atomically.
    pub(crate) async fn lock(&self) -> RunGuard<'_> {
        RunGuard {
            state: self.state.lock().await,
            observer: self.observer.as_ref(),
        }
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        let state = self.state.lock().await;
        RunSnapshot {
            generation: state.generation,
            phase: state.phase,
            request: state.request.clone(),
            target_count: state.target_count,
            error: state.error.clone(),
            leads: state.store.all().to_vec(),
            events: state.log.all().to_vec(),
        }
    }

    pub async fn progress(&self) -> Progress {
        let state = self.state.lock().await;
        Progress::compute(&state.store, state.target_count)
    }

    pub async fn phase(&self) -> RunPhase {
        self.state.lock().await.phase
    }

    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    /// Return to `Idle`, clearing leads and events. In-flight work from the
    /// previous generation will find its results discarded.
    pub async fn reset(&self) -> u64 {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.phase = RunPhase::Idle;
        state.request = None;
        state.target_count = 0;
        state.error = None;
        state.store.clear();
        state.log.clear();

        debug!(generation = state.generation, "run reset");
        self.observer.notify(PipelineUpdate::Reset {
            generation: state.generation,
        });
        state.generation
    }
}

/// Exclusive access to the run state. Mutations go through here so that
/// each one reaches the observer in order.
pub(crate) struct RunGuard<'a> {
    state: MutexGuard<'a, RunState>,
    observer: &'a dyn PipelineObserver,
}

impl RunGuard<'_> {
    pub(crate) fn generation(&self) -> u64 {
        self.state.generation
    }

    /// Whether work tagged with `generation` still belongs to this run.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.state.generation == generation
    }

    pub(crate) fn phase(&self) -> RunPhase {
        self.state.phase
    }

    pub(crate) fn request(&self) -> Option<&SearchRequest> {
        self.state.request.as_ref()
    }

    pub(crate) fn lead(&self, id: &LeadId) -> Option<&LeadRecord> {
        self.state.store.by_id(id)
    }

    pub(crate) fn lead_count(&self) -> usize {
        self.state.store.len()
    }

    /// Install the request of a new run and enter `Initializing`.
    pub(crate) fn begin(&mut self, request: SearchRequest) {
        self.state.target_count = request.count;
        self.state.request = Some(request);
        self.state.error = None;
        self.set_phase(RunPhase::Initializing);
    }

    pub(crate) fn set_phase(&mut self, phase: RunPhase) {
        self.state.phase = phase;
        self.observer.notify(PipelineUpdate::Phase(phase));
    }

    /// Record a run-level failure and enter `Failed`.
    pub(crate) fn fail(&mut self, error: String) {
        self.state.error = Some(error);
        self.set_phase(RunPhase::Failed);
    }

    pub(crate) fn log(&mut self, message: impl Into<String>, severity: Severity) {
        let event = self.state.log.append(message, severity).clone();
        self.observer.notify(PipelineUpdate::Log(event));
    }

    pub(crate) fn add_lead(&mut self, record: LeadRecord) -> Result<()> {
        let update = PipelineUpdate::LeadAdded(record.clone());
        self.state.store.add(record)?;
        self.observer.notify(update);
        Ok(())
    }

    /// Replace the enrichment state of one lead. No-op for unknown ids.
    pub(crate) fn set_enrichment(&mut self, id: &LeadId, enrichment: Enrichment) -> bool {
        match self.state.store.update(id, |e| *e = enrichment) {
            Some(record) => {
                self.observer
                    .notify(PipelineUpdate::LeadUpdated(record.clone()));
                true
            }
            None => false,
        }
    }

    pub(crate) fn emit(&self, update: PipelineUpdate) {
        self.observer.notify(update);
    }
}
