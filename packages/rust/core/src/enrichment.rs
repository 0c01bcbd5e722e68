//! Per-lead deep enrichment.
//!
//! Enrichment is user-triggered, one lead at a time, and may run for several
//! leads concurrently. Each request is guarded so that a lead is never sent
//! to the service twice while a request is in flight or after it completed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leadscout_discovery::{build_client, endpoint, extract_json, post_json};
use leadscout_shared::{
    Credential, EnrichedProfile, Enrichment, EnrichmentStatus, LeadId, LeadRecord,
    LeadScoutError, PipelineSettings, Result, Severity,
};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, instrument, warn};
use url::Url;

use crate::context::RunContext;
use crate::timeout::with_timeout;

// ---------------------------------------------------------------------------
// Service contract
// ---------------------------------------------------------------------------

/// External service that deep-profiles a single lead.
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    /// `Ok(None)` means the service answered but had nothing to say.
    async fn enrich(
        &self,
        lead: &LeadRecord,
        product_context: Option<&str>,
        credential: &Credential,
    ) -> Result<Option<EnrichedProfile>>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EnrichBody<'a> {
    model: &'a str,
    lead: &'a LeadRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_context: Option<&'a str>,
}

/// Calls a generative enrichment endpoint at `<base_url>/enrich`.
#[derive(Debug, Clone)]
pub struct HttpEnrichmentClient {
    client: Client,
    endpoint: Url,
    model: String,
}

impl HttpEnrichmentClient {
    pub fn new(base_url: &Url, model: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: endpoint(base_url, "enrich")?,
            model: model.into(),
        })
    }
}

#[async_trait]
impl EnrichmentService for HttpEnrichmentClient {
    #[instrument(skip_all, fields(lead = %lead.id, name = %lead.name))]
    async fn enrich(
        &self,
        lead: &LeadRecord,
        product_context: Option<&str>,
        credential: &Credential,
    ) -> Result<Option<EnrichedProfile>> {
        let body = EnrichBody {
            model: &self.model,
            lead,
            product_context,
        };
        let text = post_json(&self.client, &self.endpoint, credential, &body).await?;
        parse_profile(&text)
    }
}

/// Parse an enrichment response: a bare profile, `{"profile": ...}`, or null.
fn parse_profile(body: &str) -> Result<Option<EnrichedProfile>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }

    let json = extract_json(trimmed)
        .ok_or_else(|| LeadScoutError::parse("enrichment response contains no JSON payload"))?;
    let mut value: Value = serde_json::from_str(json)
        .map_err(|e| LeadScoutError::parse(format!("invalid enrichment JSON: {e}")))?;

    if let Some(inner) = value.as_object_mut().and_then(|map| map.remove("profile")) {
        value = inner;
    }
    if value.is_null() {
        return Ok(None);
    }

    let profile: EnrichedProfile = serde_json::from_value(value)
        .map_err(|e| LeadScoutError::parse(format!("invalid enrichment profile: {e}")))?;
    Ok((!profile.is_empty()).then_some(profile))
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// What a single enrichment request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum EnrichOutcome {
    /// A profile was attached.
    Enriched,
    /// The service produced nothing usable. The lead is `Complete` with no profile.
    Empty,
    /// The call failed. The lead is `Failed` and may be retried.
    Failed(String),
    /// The lead was already complete; nothing was sent.
    AlreadyEnriched,
    /// A request for this lead is still running; nothing was sent.
    InFlight,
    /// The run was reset while the call was running; the result was dropped.
    Discarded,
}

/// Drives enrichment requests against the active run.
#[derive(Clone)]
pub struct EnrichmentCoordinator {
    ctx: RunContext,
    service: Arc<dyn EnrichmentService>,
    credential: Option<Credential>,
    timeout: Duration,
    limiter: Option<Arc<Semaphore>>,
}

impl EnrichmentCoordinator {
    pub fn new(
        ctx: RunContext,
        service: Arc<dyn EnrichmentService>,
        credential: Option<Credential>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            ctx,
            service,
            credential,
            timeout: settings.enrichment_timeout,
            limiter: settings
                .max_concurrent_enrichments
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    /// Enrich one lead.
    ///
    /// `product_context` overrides the one carried by the run request. A
    /// missing credential or unknown id is returned as an error without
    /// touching any state; everything else is reported as an [`EnrichOutcome`].
    #[instrument(skip_all, fields(lead = %id))]
    pub async fn enrich(
        &self,
        id: &LeadId,
        product_context: Option<String>,
    ) -> Result<EnrichOutcome> {
        let credential = self.credential.as_ref().ok_or_else(|| {
            LeadScoutError::config("no API credential configured; enrichment cannot run")
        })?;

        let (generation, lead, product_context) = {
            let mut run = self.ctx.lock().await;
            let lead = run
                .lead(id)
                .cloned()
                .ok_or_else(|| LeadScoutError::LeadNotFound(id.to_string()))?;

            match lead.status() {
                EnrichmentStatus::Complete => {
                    run.log(
                        format!("[{}] Data is already enriched.", lead.name),
                        Severity::Warning,
                    );
                    return Ok(EnrichOutcome::AlreadyEnriched);
                }
                EnrichmentStatus::Enriching => {
                    run.log(
                        format!("[{}] Enrichment already in progress.", lead.name),
                        Severity::Warning,
                    );
                    return Ok(EnrichOutcome::InFlight);
                }
                EnrichmentStatus::New | EnrichmentStatus::Failed => {}
            }

            let product_context = product_context
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .or_else(|| {
                    run.request()
                        .and_then(|r| r.product_context())
                        .map(str::to_string)
                });

            run.set_enrichment(id, Enrichment::Enriching);
            run.log(
                format!("Initiating deep enrichment for {}...", lead.name),
                Severity::Info,
            );
            (run.generation(), lead, product_context)
        };

        // Detached: dropping this future must not leave the lead `Enriching`.
        let task = tokio::spawn(
            self.clone()
                .settle(
                    generation,
                    id.clone(),
                    lead.clone(),
                    product_context,
                    credential.clone(),
                )
                .in_current_span(),
        );

        match task.await {
            Ok(outcome) => Ok(outcome),
            Err(e) => Ok(self
                .abandon(generation, id, &lead.name, format!("enrichment task failed: {e}"))
                .await),
        }
    }

    /// Call the service and write the result back, unless the run was reset.
    async fn settle(
        self,
        generation: u64,
        id: LeadId,
        lead: LeadRecord,
        product_context: Option<String>,
        credential: Credential,
    ) -> EnrichOutcome {
        let permit = match &self.limiter {
            Some(limiter) => limiter.acquire().await.map(Some),
            None => Ok(None),
        };
        let result = match permit {
            Ok(_permit) => {
                debug!(generation, "calling enrichment service");
                with_timeout(
                    "enrichment",
                    self.timeout,
                    self.service
                        .enrich(&lead, product_context.as_deref(), &credential),
                )
                .await
            }
            Err(e) => Err(LeadScoutError::Enrichment(format!(
                "enrichment limiter closed: {e}"
            ))),
        };

        let mut run = self.ctx.lock().await;
        if !run.is_current(generation) {
            debug!(generation, "discarding enrichment result from a reset run");
            return EnrichOutcome::Discarded;
        }

        match result {
            Ok(Some(profile)) => {
                run.set_enrichment(&id, Enrichment::Complete(Some(profile)));
                run.log(
                    format!("[{}] Strategic analysis complete. Pitch generated.", lead.name),
                    Severity::Success,
                );
                info!("lead enriched");
                EnrichOutcome::Enriched
            }
            Ok(None) => {
                run.set_enrichment(&id, Enrichment::Complete(None));
                run.log(
                    format!("[{}] Failed to generate deep insights.", lead.name),
                    Severity::Error,
                );
                warn!("enrichment produced no profile");
                EnrichOutcome::Empty
            }
            Err(e) => {
                let message = e.to_string();
                run.set_enrichment(&id, Enrichment::Failed);
                run.log(
                    format!("[{}] Enrichment error: {message}", lead.name),
                    Severity::Error,
                );
                warn!(error = %message, "enrichment failed");
                EnrichOutcome::Failed(message)
            }
        }
    }

    /// Mark a lead `Failed` when its enrichment task died without settling.
    async fn abandon(
        &self,
        generation: u64,
        id: &LeadId,
        name: &str,
        message: String,
    ) -> EnrichOutcome {
        let mut run = self.ctx.lock().await;
        if !run.is_current(generation) {
            return EnrichOutcome::Discarded;
        }

        run.set_enrichment(id, Enrichment::Failed);
        run.log(
            format!("[{name}] Enrichment error: {message}"),
            Severity::Error,
        );
        warn!(error = %message, "enrichment task lost");
        EnrichOutcome::Failed(message)
    }

    /// Enrich several leads concurrently. Results come back in input order.
    pub async fn enrich_all(
        &self,
        ids: Vec<LeadId>,
        product_context: Option<String>,
    ) -> Vec<(LeadId, Result<EnrichOutcome>)> {
        let mut tasks = JoinSet::new();
        for (index, id) in ids.into_iter().enumerate() {
            let coordinator = self.clone();
            let product_context = product_context.clone();
            tasks.spawn(async move {
                let outcome = coordinator.enrich(&id, product_context).await;
                (index, id, outcome)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "enrichment task panicked"),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);
        results
            .into_iter()
            .map(|(_, id, outcome)| (id, outcome))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_shared::{Campaign, CampaignMode, LeadCandidate, SearchRequest};
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Barrier, Notify};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Clone, Copy)]
    enum Script {
        Profile,
        Empty,
        Error,
        Panic,
    }

    /// Scripted enrichment service that records what it was asked.
    #[derive(Default)]
    struct FakeEnrichment {
        scripts: StdMutex<HashMap<String, Vec<Script>>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        contexts: StdMutex<Vec<Option<String>>>,
        barrier: Option<Arc<Barrier>>,
        gate: Option<Arc<Notify>>,
        delay: Option<Duration>,
    }

    impl FakeEnrichment {
        fn script(self, name: &str, steps: &[Script]) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(name.to_string(), steps.to_vec());
            self
        }
    }

    #[async_trait]
    impl EnrichmentService for FakeEnrichment {
        async fn enrich(
            &self,
            lead: &LeadRecord,
            product_context: Option<&str>,
            _credential: &Credential,
        ) -> Result<Option<EnrichedProfile>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts
                .lock()
                .unwrap()
                .push(product_context.map(str::to_string));
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let step = {
                let mut scripts = self.scripts.lock().unwrap();
                match scripts.get_mut(&lead.name) {
                    Some(steps) if !steps.is_empty() => steps.remove(0),
                    _ => Script::Profile,
                }
            };
            match step {
                Script::Profile => Ok(Some(profile_for(&lead.name))),
                Script::Empty => Ok(None),
                Script::Error => Err(LeadScoutError::Network("connection reset".into())),
                Script::Panic => panic!("enrichment backend crashed"),
            }
        }
    }

    fn profile_for(name: &str) -> EnrichedProfile {
        EnrichedProfile {
            pitch_strategy: format!("Pitch for {name}"),
            key_insights: vec!["Growing fast".into()],
            ..Default::default()
        }
    }

    fn settings(max_concurrent: Option<usize>) -> PipelineSettings {
        PipelineSettings {
            stream_delay: Duration::ZERO,
            discovery_timeout: Duration::from_secs(5),
            enrichment_timeout: Duration::from_secs(5),
            max_concurrent_enrichments: max_concurrent,
        }
    }

    /// A run context holding one committed lead per name.
    async fn seeded(names: &[&str], product: Option<&str>) -> (RunContext, Vec<LeadId>) {
        let ctx = RunContext::default();
        let mut ids = Vec::new();
        let mut run = ctx.lock().await;
        run.begin(SearchRequest::new(
            Campaign::Organization {
                product_context: product.map(str::to_string),
            },
            "Fintech",
            "Austin",
            names.len() as u32,
        ));
        for name in names {
            let record = LeadCandidate {
                name: name.to_string(),
                ..Default::default()
            }
            .into_record(CampaignMode::Organization)
            .unwrap();
            ids.push(record.id.clone());
            run.add_lead(record).unwrap();
        }
        drop(run);
        (ctx, ids)
    }

    fn coordinator(
        ctx: &RunContext,
        service: Arc<FakeEnrichment>,
        max_concurrent: Option<usize>,
    ) -> EnrichmentCoordinator {
        EnrichmentCoordinator::new(
            ctx.clone(),
            service,
            Some(Credential::new("test-key").unwrap()),
            &settings(max_concurrent),
        )
    }

    fn count(events: &[leadscout_shared::LogEvent], severity: Severity) -> usize {
        events.iter().filter(|e| e.severity == severity).count()
    }

    #[tokio::test]
    async fn enriches_a_new_lead() {
        let (ctx, ids) = seeded(&["Acme"], Some("Payroll API")).await;
        let service = Arc::new(FakeEnrichment::default());

        let outcome = coordinator(&ctx, service.clone(), None)
            .enrich(&ids[0], None)
            .await
            .unwrap();

        assert_eq!(outcome, EnrichOutcome::Enriched);
        let snapshot = ctx.snapshot().await;
        let lead = snapshot.lead(&ids[0]).unwrap();
        assert_eq!(lead.status(), EnrichmentStatus::Complete);
        assert_eq!(lead.enriched_profile(), Some(&profile_for("Acme")));
        assert_eq!(
            service.contexts.lock().unwrap().as_slice(),
            [Some("Payroll API".to_string())]
        );
        assert_eq!(
            snapshot.events.last().unwrap().message,
            "[Acme] Strategic analysis complete. Pitch generated."
        );
    }

    #[tokio::test]
    async fn explicit_product_context_wins() {
        let (ctx, ids) = seeded(&["Acme"], Some("Payroll API")).await;
        let service = Arc::new(FakeEnrichment::default());

        coordinator(&ctx, service.clone(), None)
            .enrich(&ids[0], Some("Expense cards".into()))
            .await
            .unwrap();

        assert_eq!(
            service.contexts.lock().unwrap().as_slice(),
            [Some("Expense cards".to_string())]
        );
    }

    #[tokio::test]
    async fn second_request_is_a_warning_only() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let service = Arc::new(FakeEnrichment::default());
        let coordinator = coordinator(&ctx, service.clone(), None);

        coordinator.enrich(&ids[0], None).await.unwrap();
        let before = ctx.snapshot().await;

        let outcome = coordinator.enrich(&ids[0], None).await.unwrap();
        assert_eq!(outcome, EnrichOutcome::AlreadyEnriched);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);

        let after = ctx.snapshot().await;
        assert_eq!(after.leads, before.leads);
        assert_eq!(after.events.len(), before.events.len() + 1);
        let last = after.events.last().unwrap();
        assert_eq!(last.severity, Severity::Warning);
        assert_eq!(last.message, "[Acme] Data is already enriched.");
    }

    #[tokio::test]
    async fn empty_answer_completes_without_profile() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let service = Arc::new(FakeEnrichment::default().script("Acme", &[Script::Empty]));
        let coordinator = coordinator(&ctx, service.clone(), None);

        assert_eq!(
            coordinator.enrich(&ids[0], None).await.unwrap(),
            EnrichOutcome::Empty
        );
        let snapshot = ctx.snapshot().await;
        let lead = snapshot.lead(&ids[0]).unwrap();
        assert_eq!(lead.status(), EnrichmentStatus::Complete);
        assert!(lead.enriched_profile().is_none());
        assert_eq!(count(&snapshot.events, Severity::Error), 1);

        // Complete without a profile is still complete.
        assert_eq!(
            coordinator.enrich(&ids[0], None).await.unwrap(),
            EnrichOutcome::AlreadyEnriched
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hard_failure_can_be_retried() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let service = Arc::new(
            FakeEnrichment::default().script("Acme", &[Script::Error, Script::Profile]),
        );
        let coordinator = coordinator(&ctx, service.clone(), None);

        match coordinator.enrich(&ids[0], None).await.unwrap() {
            EnrichOutcome::Failed(error) => assert!(error.contains("connection reset")),
            other => panic!("expected failure, got {other:?}"),
        }
        let snapshot = ctx.snapshot().await;
        assert_eq!(snapshot.lead(&ids[0]).unwrap().status(), EnrichmentStatus::Failed);
        assert!(snapshot
            .events
            .last()
            .unwrap()
            .message
            .starts_with("[Acme] Enrichment error:"));

        assert_eq!(
            coordinator.enrich(&ids[0], None).await.unwrap(),
            EnrichOutcome::Enriched
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn enrichment_timeout_marks_failed() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let service = Arc::new(FakeEnrichment {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        let mut settings = settings(None);
        settings.enrichment_timeout = Duration::from_millis(20);
        let coordinator = EnrichmentCoordinator::new(
            ctx.clone(),
            service,
            Some(Credential::new("test-key").unwrap()),
            &settings,
        );

        match coordinator.enrich(&ids[0], None).await.unwrap() {
            EnrichOutcome::Failed(error) => assert!(error.contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(
            ctx.snapshot().await.lead(&ids[0]).unwrap().status(),
            EnrichmentStatus::Failed
        );
    }

    #[tokio::test]
    async fn duplicate_request_while_in_flight_is_rejected() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let gate = Arc::new(Notify::new());
        let service = Arc::new(FakeEnrichment {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let coordinator = coordinator(&ctx, service.clone(), None);

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            let id = ids[0].clone();
            async move { coordinator.enrich(&id, None).await }
        });
        while service.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(
            coordinator.enrich(&ids[0], None).await.unwrap(),
            EnrichOutcome::InFlight
        );
        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), EnrichOutcome::Enriched);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_run_independently() {
        let (ctx, ids) = seeded(&["Acme", "Ledgerly", "Nimbus"], None).await;
        let service = Arc::new(
            FakeEnrichment {
                barrier: Some(Arc::new(Barrier::new(3))),
                ..Default::default()
            }
            .script("Ledgerly", &[Script::Error]),
        );

        let results = coordinator(&ctx, service.clone(), None)
            .enrich_all(ids.clone(), None)
            .await;

        // The barrier only opens once all three calls are in flight together.
        assert_eq!(service.max_in_flight.load(Ordering::SeqCst), 3);

        let outcomes: Vec<_> = results.into_iter().map(|(_, r)| r.unwrap()).collect();
        assert_eq!(outcomes[0], EnrichOutcome::Enriched);
        assert!(matches!(outcomes[1], EnrichOutcome::Failed(_)));
        assert_eq!(outcomes[2], EnrichOutcome::Enriched);

        let snapshot = ctx.snapshot().await;
        let statuses: Vec<_> = ids
            .iter()
            .map(|id| snapshot.lead(id).unwrap().status())
            .collect();
        assert_eq!(
            statuses,
            [
                EnrichmentStatus::Complete,
                EnrichmentStatus::Failed,
                EnrichmentStatus::Complete
            ]
        );
        assert_eq!(
            snapshot.lead(&ids[2]).unwrap().enriched_profile(),
            Some(&profile_for("Nimbus"))
        );
    }

    #[tokio::test]
    async fn limiter_caps_concurrent_calls() {
        let (ctx, ids) = seeded(&["A", "B", "C", "D"], None).await;
        let service = Arc::new(FakeEnrichment {
            delay: Some(Duration::from_millis(10)),
            ..Default::default()
        });

        let results = coordinator(&ctx, service.clone(), Some(2))
            .enrich_all(ids, None)
            .await;

        assert_eq!(results.len(), 4);
        assert!(results
            .iter()
            .all(|(_, r)| matches!(r, Ok(EnrichOutcome::Enriched))));
        assert!(service.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn reset_discards_in_flight_result() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let gate = Arc::new(Notify::new());
        let service = Arc::new(FakeEnrichment {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let coordinator = coordinator(&ctx, service.clone(), None);

        let pending = tokio::spawn({
            let coordinator = coordinator.clone();
            let id = ids[0].clone();
            async move { coordinator.enrich(&id, None).await }
        });
        while service.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        ctx.reset().await;
        gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), EnrichOutcome::Discarded);
        let snapshot = ctx.snapshot().await;
        assert!(snapshot.leads.is_empty());
        assert!(snapshot.events.is_empty());
    }

    #[tokio::test]
    async fn unknown_lead_and_missing_credential_are_errors() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let service = Arc::new(FakeEnrichment::default());

        let err = coordinator(&ctx, service.clone(), None)
            .enrich(&LeadId::from("nope"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadScoutError::LeadNotFound(_)));

        let without_key =
            EnrichmentCoordinator::new(ctx.clone(), service.clone(), None, &settings(None));
        let err = without_key.enrich(&ids[0], None).await.unwrap_err();
        assert!(err.is_config());

        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            ctx.snapshot().await.lead(&ids[0]).unwrap().status(),
            EnrichmentStatus::New
        );
    }

    #[test]
    fn parse_profile_shapes() {
        assert_eq!(parse_profile("").unwrap(), None);
        assert_eq!(parse_profile("null").unwrap(), None);
        assert_eq!(parse_profile(r#"{"profile": null}"#).unwrap(), None);
        assert_eq!(parse_profile("{}").unwrap(), None);

        let profile = parse_profile(r#"{"pitchStrategy": "Lead with ROI"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(profile.pitch_strategy, "Lead with ROI");

        let wrapped = parse_profile(
            "```json\n{\"profile\": {\"keyInsights\": [\"Hiring\"], \"outreachEmail\": \"Hi\"}}\n```",
        )
        .unwrap()
        .unwrap();
        assert_eq!(wrapped.key_insights, ["Hiring"]);
        assert_eq!(wrapped.outreach_message, "Hi");

        assert!(parse_profile("no json here").is_err());
    }

    #[tokio::test]
    async fn http_client_posts_lead_and_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enrich"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "product_context": "Payroll API",
                "lead": {"name": "Acme"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "profile": {
                    "keyInsights": ["Series B"],
                    "competitiveAdvantage": "Speed",
                    "socialLinks": {"linkedin": "https://linkedin.com/company/acme"}
                }
            })))
            .mount(&server)
            .await;

        let client =
            HttpEnrichmentClient::new(&Url::parse(&server.uri()).unwrap(), "test-model", 5)
                .unwrap();
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let lead = ctx.snapshot().await.lead(&ids[0]).cloned().unwrap();

        let profile = client
            .enrich(&lead, Some("Payroll API"), &Credential::new("k").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.key_insights, ["Series B"]);
        assert_eq!(profile.competitive_advantage, "Speed");
        assert!(profile.social_links.is_some());
    }

    #[tokio::test]
    async fn http_client_surfaces_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enrich"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client =
            HttpEnrichmentClient::new(&Url::parse(&server.uri()).unwrap(), "test-model", 5)
                .unwrap();
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let lead = ctx.snapshot().await.lead(&ids[0]).cloned().unwrap();

        let err = client
            .enrich(&lead, None, &Credential::new("k").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LeadScoutError::Network(_)));
    }

    #[tokio::test]
    async fn abandoned_caller_does_not_strand_the_lead() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let service = Arc::new(
            FakeEnrichment {
                delay: Some(Duration::from_millis(100)),
                ..Default::default()
            }
            .script("Acme", &[Script::Error]),
        );
        let coordinator = coordinator(&ctx, service.clone(), None);

        let gave_up =
            tokio::time::timeout(Duration::from_millis(10), coordinator.enrich(&ids[0], None))
                .await;
        assert!(gave_up.is_err());

        // The service call keeps going and settles the lead on its own.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            ctx.snapshot().await.lead(&ids[0]).unwrap().status(),
            EnrichmentStatus::Failed
        );

        assert_eq!(
            coordinator.enrich(&ids[0], None).await.unwrap(),
            EnrichOutcome::Enriched
        );
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn crashed_service_call_marks_lead_failed() {
        let (ctx, ids) = seeded(&["Acme"], None).await;
        let service = Arc::new(FakeEnrichment::default().script("Acme", &[Script::Panic]));
        let coordinator = coordinator(&ctx, service.clone(), None);

        match coordinator.enrich(&ids[0], None).await.unwrap() {
            EnrichOutcome::Failed(error) => assert!(error.contains("enrichment task failed")),
            other => panic!("expected failure, got {other:?}"),
        }
        let snapshot = ctx.snapshot().await;
        assert_eq!(snapshot.lead(&ids[0]).unwrap().status(), EnrichmentStatus::Failed);
        assert_eq!(snapshot.events.last().unwrap().severity, Severity::Error);

        assert_eq!(
            coordinator.enrich(&ids[0], None).await.unwrap(),
            EnrichOutcome::Enriched
        );
    }
}
