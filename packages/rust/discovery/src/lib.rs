//! Discovery-service contract and HTTP client.
//!
//! The discovery service turns a [`SearchRequest`] into an ordered batch of
//! [`LeadCandidate`]s. It is called exactly once per run; the pipeline then
//! commits the batch incrementally.

mod parser;

use std::time::Duration;

use async_trait::async_trait;
use leadscout_shared::{Credential, LeadCandidate, LeadScoutError, Result, SearchRequest};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

pub use parser::{extract_json, parse_candidates};

/// Default timeout in seconds for the discovery request.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Longest slice of an error body quoted back in error messages.
const ERROR_SNIPPET_LEN: usize = 200;

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Service contract
// ---------------------------------------------------------------------------

/// External service that produces candidate leads for a query.
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    /// Return the candidates for `request`, in the order they should be shown.
    async fn discover(
        &self,
        request: &SearchRequest,
        credential: &Credential,
    ) -> Result<Vec<LeadCandidate>>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Configuration for [`HttpDiscoveryClient`].
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Provider base URL; requests go to `<base_url>/discover`.
    pub base_url: Url,
    /// Model requested from the provider.
    pub model: String,
    /// Timeout for the HTTP request in seconds.
    pub timeout_secs: u64,
}

impl DiscoveryOptions {
    pub fn new(base_url: Url, model: impl Into<String>) -> Self {
        Self {
            base_url,
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Wire body of a discovery request.
#[derive(Debug, serde::Serialize)]
struct DiscoverBody<'a> {
    model: &'a str,
    request: &'a SearchRequest,
}

/// Calls a generative discovery endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDiscoveryClient {
    client: Client,
    endpoint: Url,
    model: String,
}

impl HttpDiscoveryClient {
    pub fn new(opts: &DiscoveryOptions) -> Result<Self> {
        let client = build_client(opts.timeout_secs)?;
        let endpoint = endpoint(&opts.base_url, "discover")?;
        Ok(Self {
            client,
            endpoint,
            model: opts.model.clone(),
        })
    }
}

#[async_trait]
impl DiscoveryService for HttpDiscoveryClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, mode = %request.mode()))]
    async fn discover(
        &self,
        request: &SearchRequest,
        credential: &Credential,
    ) -> Result<Vec<LeadCandidate>> {
        let body = DiscoverBody {
            model: &self.model,
            request,
        };

        info!(subject = %request.subject, location = %request.location, count = request.count, "requesting candidates");

        let text = post_json(&self.client, &self.endpoint, credential, &body).await?;
        let candidates = parse_candidates(&text)?;

        debug!(candidates = candidates.len(), "discovery response parsed");
        Ok(candidates)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))
}

/// Join `path` onto the provider base URL.
pub fn endpoint(base_url: &Url, path: &str) -> Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| LeadScoutError::config(format!("invalid provider URL {base_url}: {e}")))
}

/// POST a JSON body with the bearer credential and return the response text.
pub async fn post_json<T: serde::Serialize + ?Sized>(
    client: &Client,
    url: &Url,
    credential: &Credential,
    body: &T,
) -> Result<String> {
    let response = client
        .post(url.as_str())
        .bearer_auth(credential.expose())
        .json(body)
        .send()
        .await
        .map_err(|e| LeadScoutError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| LeadScoutError::Network(format!("{url}: failed to read body: {e}")))?;

    if !status.is_success() {
        let snippet: String = text.chars().take(ERROR_SNIPPET_LEN).collect();
        return Err(LeadScoutError::Network(format!(
            "{url}: HTTP {status}: {snippet}"
        )));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_shared::Campaign;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> SearchRequest {
        SearchRequest::new(
            Campaign::Organization {
                product_context: Some("Payroll API".into()),
            },
            "Fintech",
            "Austin",
            10,
        )
    }

    fn credential() -> Credential {
        Credential::new("test-key").unwrap()
    }

    async fn client_for(server: &MockServer) -> HttpDiscoveryClient {
        let opts = DiscoveryOptions::new(Url::parse(&server.uri()).unwrap(), "test-model");
        HttpDiscoveryClient::new(&opts).unwrap()
    }

    #[test]
    fn endpoint_joins_with_and_without_trailing_slash() {
        let base = Url::parse("https://api.example.com/v1").unwrap();
        assert_eq!(
            endpoint(&base, "discover").unwrap().as_str(),
            "https://api.example.com/v1/discover"
        );
        let base = Url::parse("https://api.example.com/v1/").unwrap();
        assert_eq!(
            endpoint(&base, "discover").unwrap().as_str(),
            "https://api.example.com/v1/discover"
        );
    }

    #[tokio::test]
    async fn test_discover_with_mock_server() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/discover"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "request": {"subject": "Fintech", "campaign": {"mode": "organization"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"leads": [{"companyName": "Acme Pay"}, {"companyName": "Ledgerly"}]}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let candidates = client.discover(&request(), &credential()).await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Acme Pay");
        assert_eq!(candidates[1].name, "Ledgerly");
    }

    #[tokio::test]
    async fn test_discover_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/discover"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.discover(&request(), &credential()).await.unwrap_err();

        assert!(matches!(err, LeadScoutError::Network(_)));
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_discover_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/discover"))
            .respond_with(ResponseTemplate::new(200).set_body_string("I cannot help with that."))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.discover(&request(), &credential()).await.unwrap_err();

        assert!(matches!(err, LeadScoutError::Parse { .. }));
    }
}
