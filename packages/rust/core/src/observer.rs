//! Observation stream for presentation layers.
//!
//! Every state change made through the run context is pushed to a
//! [`PipelineObserver`] in the order it happened. [`ChannelObserver`] turns
//! that into a `tokio` channel so a UI can consume it as a stream.

use leadscout_shared::{LeadRecord, LogEvent, RunPhase};
use tokio::sync::mpsc;

use crate::pipeline::RunOutcome;

/// One observable change of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineUpdate {
    /// The run moved to a new phase.
    Phase(RunPhase),
    /// Discovery committed a new lead.
    LeadAdded(LeadRecord),
    /// Enrichment changed an existing lead.
    LeadUpdated(LeadRecord),
    /// An event was appended to the log.
    Log(LogEvent),
    /// A discovery run reached its terminal state.
    Finished(RunOutcome),
    /// Everything was cleared; `generation` is the new run generation.
    Reset { generation: u64 },
}

/// Receives pipeline updates. Called while the run state is locked, so
/// implementations must not block.
pub trait PipelineObserver: Send + Sync {
    fn notify(&self, update: PipelineUpdate);
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl PipelineObserver for SilentObserver {
    fn notify(&self, _update: PipelineUpdate) {}
}

/// Forwards updates into an unbounded channel.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<PipelineUpdate>,
}

impl ChannelObserver {
    /// Create the observer together with the receiving end of its stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PipelineObserver for ChannelObserver {
    fn notify(&self, update: PipelineUpdate) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.tx.send(update);
    }
}
