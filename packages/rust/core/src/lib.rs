//! Core pipeline orchestration and domain logic for LeadScout.
//!
//! This crate ties the discovery service, per-lead enrichment and the live
//! run state together: [`PipelineOrchestrator`] runs discovery and commits
//! leads incrementally, [`EnrichmentCoordinator`] deepens individual leads,
//! and [`Session`] bundles both over one generation-tagged [`RunContext`].

pub mod context;
pub mod enrichment;
pub mod export;
pub mod log;
pub mod observer;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod store;
mod timeout;

pub use context::{RunContext, RunSnapshot};
pub use enrichment::{EnrichOutcome, EnrichmentCoordinator, EnrichmentService, HttpEnrichmentClient};
pub use log::EventLog;
pub use observer::{ChannelObserver, PipelineObserver, PipelineUpdate, SilentObserver};
pub use pipeline::{PipelineOrchestrator, RunOutcome};
pub use progress::Progress;
pub use session::Session;
pub use store::LeadStore;
