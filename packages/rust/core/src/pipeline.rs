//! Discovery run: request → discovery service → ordered incremental commit.

use std::sync::Arc;

use leadscout_discovery::DiscoveryService;
use leadscout_shared::{
    Campaign, CampaignMode, Credential, LeadCandidate, LeadScoutError, PipelineSettings, Result,
    RunPhase, SearchRequest, Severity,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::context::{RunContext, RunGuard};
use crate::observer::PipelineUpdate;
use crate::timeout::with_timeout;

/// Terminal result of one discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// All candidates were committed.
    Completed { leads: usize },
    /// The run failed; leads committed before the failure are kept.
    Failed { error: String, leads: usize },
    /// A reset happened while the run was in flight; its result was dropped.
    Superseded,
}

/// Drives a single discovery run end-to-end.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    ctx: RunContext,
    discovery: Arc<dyn DiscoveryService>,
    credential: Option<Credential>,
    settings: PipelineSettings,
}

impl PipelineOrchestrator {
    pub fn new(
        ctx: RunContext,
        discovery: Arc<dyn DiscoveryService>,
        credential: Option<Credential>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            ctx,
            discovery,
            credential,
            settings,
        }
    }

    /// Run discovery for `request`.
    ///
    /// Configuration, validation and phase errors are returned before the run
    /// starts. Once started, failures end the run in [`RunPhase::Failed`] and
    /// come back as [`RunOutcome::Failed`].
    #[instrument(skip_all, fields(mode = %request.mode(), subject = %request.subject, location = %request.location))]
    pub async fn start(&self, request: SearchRequest) -> Result<RunOutcome> {
        let credential = self.credential.as_ref().ok_or_else(|| {
            LeadScoutError::config("no API credential configured; discovery cannot run")
        })?;
        request.validate()?;

        // --- Initializing / Discovering ---
        let generation = {
            let mut run = self.ctx.lock().await;
            if run.phase() != RunPhase::Idle {
                return Err(LeadScoutError::InvalidState(format!(
                    "a run is already {}; reset before starting another",
                    run.phase()
                )));
            }

            run.begin(request.clone());
            log_configuration(&mut run, &request);

            run.set_phase(RunPhase::Discovering);
            run.log("Executing discovery flow...", Severity::Info);
            run.log(
                format!(
                    "Querying discovery service for up to {} candidates...",
                    request.count
                ),
                Severity::Info,
            );
            run.generation()
        };

        info!(generation, count = request.count, "starting discovery run");

        let result = with_timeout(
            "discovery",
            self.settings.discovery_timeout,
            self.discovery.discover(&request, credential),
        )
        .await;

        // --- Streaming ---
        let mut candidates = {
            let mut run = self.ctx.lock().await;
            if !run.is_current(generation) {
                debug!(generation, "discarding discovery result from a reset run");
                return Ok(RunOutcome::Superseded);
            }

            let candidates = match result {
                Ok(candidates) if candidates.is_empty() => {
                    return Ok(fail(
                        &mut run,
                        LeadScoutError::Discovery("discovery returned no candidates".into()),
                    ));
                }
                Ok(candidates) => candidates,
                Err(e) => return Ok(fail(&mut run, e)),
            };

            run.set_phase(RunPhase::Streaming);
            run.log(
                format!(
                    "Found {} potential candidates. Committing results...",
                    candidates.len()
                ),
                Severity::Success,
            );
            candidates
        };

        let target = request.count as usize;
        if candidates.len() > target {
            let mut run = self.ctx.lock().await;
            if !run.is_current(generation) {
                return Ok(RunOutcome::Superseded);
            }
            run.log(
                format!(
                    "Discovery returned {} candidates; keeping the first {target}.",
                    candidates.len()
                ),
                Severity::Warning,
            );
            candidates.truncate(target);
        }

        let mode = request.mode();
        for (i, candidate) in candidates.into_iter().enumerate() {
            if i > 0 && !self.settings.stream_delay.is_zero() {
                tokio::time::sleep(self.settings.stream_delay).await;
            }

            let mut run = self.ctx.lock().await;
            if !run.is_current(generation) {
                debug!(generation, committed = i, "run reset while streaming, stopping");
                return Ok(RunOutcome::Superseded);
            }
            if let Err(e) = commit_candidate(&mut run, candidate, mode) {
                return Ok(fail(&mut run, e));
            }
        }

        // --- Completed ---
        let mut run = self.ctx.lock().await;
        if !run.is_current(generation) {
            return Ok(RunOutcome::Superseded);
        }
        let leads = run.lead_count();
        run.log(
            format!("Pipeline completed successfully. {leads} leads committed."),
            Severity::Success,
        );
        run.set_phase(RunPhase::Completed);

        let outcome = RunOutcome::Completed { leads };
        run.emit(PipelineUpdate::Finished(outcome.clone()));
        info!(generation, leads, "discovery run complete");

        Ok(outcome)
    }
}

/// Milestone events describing the configured query.
fn log_configuration(run: &mut RunGuard<'_>, request: &SearchRequest) {
    run.log(
        format!(
            "Initializing discovery pipeline for a {}-targeted campaign...",
            request.mode()
        ),
        Severity::Info,
    );
    run.log(
        format!(
            "Loading search configuration for \"{}\" in \"{}\" ({} leads, {}).",
            request.subject.trim(),
            request.location.trim(),
            request.count,
            request.language
        ),
        Severity::Info,
    );

    match &request.campaign {
        Campaign::Organization { .. } => {
            if let Some(product) = request.product_context() {
                run.log(
                    format!("Contextualizing for product: \"{product}\""),
                    Severity::Info,
                );
            }
        }
        Campaign::Individual {
            target_role,
            keywords,
        } => {
            if let Some(role) = target_role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
                run.log(
                    format!("Targeting decision maker role: \"{role}\""),
                    Severity::Info,
                );
            }
            if let Some(keywords) = keywords.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
                run.log(
                    format!("Applying specific criteria: \"{keywords}\""),
                    Severity::Info,
                );
            }
        }
    }
}

/// Convert, append and announce one candidate.
fn commit_candidate(
    run: &mut RunGuard<'_>,
    candidate: LeadCandidate,
    mode: CampaignMode,
) -> Result<()> {
    let record = candidate.into_record(mode)?;
    let name = record.name.clone();
    let source = if record.source_url.is_empty() {
        "unknown source".to_string()
    } else {
        record.source_url.clone()
    };

    run.log(
        format!("[{name}] Fetching metadata from {source}..."),
        Severity::Info,
    );
    run.add_lead(record)?;
    run.log(format!("[{name}] Contact identified."), Severity::Success);
    Ok(())
}

/// Terminate the run as `Failed`, keeping whatever was committed.
fn fail(run: &mut RunGuard<'_>, error: LeadScoutError) -> RunOutcome {
    let message = error.to_string();
    let leads = run.lead_count();
    warn!(error = %message, leads, "discovery run failed");

    run.log(format!("Pipeline failed: {message}"), Severity::Error);
    run.fail(message.clone());

    let outcome = RunOutcome::Failed {
        error: message,
        leads,
    };
    run.emit(PipelineUpdate::Finished(outcome.clone()));
    outcome
}
