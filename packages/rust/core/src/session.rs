//! One user session: a run context plus the components that drive it.

use std::sync::Arc;

use leadscout_discovery::{DiscoveryOptions, DiscoveryService, HttpDiscoveryClient};
use leadscout_shared::{
    AppConfig, Credential, EnrichmentStatus, LeadId, LeadScoutError, PipelineSettings, Result,
    RunPhase, SearchRequest, resolve_credential,
};
use tracing::{debug, warn};
use url::Url;

use crate::context::{RunContext, RunSnapshot};
use crate::enrichment::{
    EnrichOutcome, EnrichmentCoordinator, EnrichmentService, HttpEnrichmentClient,
};
use crate::observer::{PipelineObserver, SilentObserver};
use crate::pipeline::{PipelineOrchestrator, RunOutcome};
use crate::progress::Progress;

/// Facade over discovery and enrichment sharing one [`RunContext`].
#[derive(Clone)]
pub struct Session {
    ctx: RunContext,
    pipeline: PipelineOrchestrator,
    enrichment: EnrichmentCoordinator,
}

impl Session {
    pub fn new(
        discovery: Arc<dyn DiscoveryService>,
        enrichment: Arc<dyn EnrichmentService>,
        credential: Option<Credential>,
        settings: PipelineSettings,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        let ctx = RunContext::new(observer);
        let coordinator =
            EnrichmentCoordinator::new(ctx.clone(), enrichment, credential.clone(), &settings);
        let pipeline = PipelineOrchestrator::new(ctx.clone(), discovery, credential, settings);
        Self {
            ctx,
            pipeline,
            enrichment: coordinator,
        }
    }

    /// Build a session talking HTTP to the configured provider.
    ///
    /// A missing credential is not an error here: the session is created and
    /// `start`/`enrich` report the configuration error when called.
    pub fn from_config(
        config: &AppConfig,
        settings: PipelineSettings,
        observer: Option<Arc<dyn PipelineObserver>>,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.provider.base_url).map_err(|e| {
            LeadScoutError::config(format!(
                "invalid provider base_url {:?}: {e}",
                config.provider.base_url
            ))
        })?;

        let mut options = DiscoveryOptions::new(base_url.clone(), &config.provider.model);
        options.timeout_secs = settings.discovery_timeout.as_secs().max(1);
        let discovery = HttpDiscoveryClient::new(&options)?;
        let enrichment = HttpEnrichmentClient::new(
            &base_url,
            &config.provider.model,
            settings.enrichment_timeout.as_secs().max(1),
        )?;

        let credential = match resolve_credential(config) {
            Ok(credential) => Some(credential),
            Err(e) => {
                warn!(error = %e, "no provider credential");
                None
            }
        };

        Ok(Self::new(
            Arc::new(discovery),
            Arc::new(enrichment),
            credential,
            settings,
            observer.unwrap_or_else(|| Arc::new(SilentObserver)),
        ))
    }

    pub async fn start(&self, request: SearchRequest) -> Result<RunOutcome> {
        self.pipeline.start(request).await
    }

    pub async fn enrich(
        &self,
        id: &LeadId,
        product_context: Option<String>,
    ) -> Result<EnrichOutcome> {
        self.enrichment.enrich(id, product_context).await
    }

    /// Enrich every lead that is `new` or `failed`, concurrently.
    pub async fn enrich_pending(
        &self,
        product_context: Option<String>,
    ) -> Vec<(LeadId, Result<EnrichOutcome>)> {
        let pending: Vec<LeadId> = self
            .ctx
            .snapshot()
            .await
            .leads
            .into_iter()
            .filter(|l| matches!(l.status(), EnrichmentStatus::New | EnrichmentStatus::Failed))
            .map(|l| l.id)
            .collect();

        debug!(pending = pending.len(), "enriching pending leads");
        self.enrichment.enrich_all(pending, product_context).await
    }

    /// Return to `Idle`. Late results from the previous run are dropped.
    pub async fn reset(&self) -> u64 {
        self.ctx.reset().await
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        self.ctx.snapshot().await
    }

    pub async fn progress(&self) -> Progress {
        self.ctx.progress().await
    }

    pub async fn phase(&self) -> RunPhase {
        self.ctx.phase().await
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }
}
