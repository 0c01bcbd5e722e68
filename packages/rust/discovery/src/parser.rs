//! Discovery response parser.
//!
//! Generative services answer either with plain JSON or with model text that
//! wraps the JSON in a Markdown code fence. Accepted payload shapes:
//! - a bare array of candidates
//! - an object with a `leads` or `candidates` array
//!
//! Website URLs without a scheme are normalized to `https://`.

use std::sync::LazyLock;

use leadscout_shared::{LeadCandidate, LeadScoutError, Result};
use regex::Regex;
use serde_json::Value;
use url::Url;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches a fenced code block, optionally tagged `json`.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("fence regex")
});

/// Matches a leading URL scheme such as `https:`.
static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:").expect("scheme regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a discovery response body into ordered candidates.
///
/// Order is preserved exactly as the service returned it.
pub fn parse_candidates(body: &str) -> Result<Vec<LeadCandidate>> {
    let json = extract_json(body)
        .ok_or_else(|| LeadScoutError::parse("discovery response contains no JSON payload"))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| LeadScoutError::parse(format!("invalid discovery JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("leads").or_else(|| map.remove("candidates")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(LeadScoutError::parse(
                    "discovery response object has no `leads` array",
                ));
            }
        },
        other => {
            return Err(LeadScoutError::parse(format!(
                "unexpected discovery payload: {}",
                json_kind(&other)
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut candidate: LeadCandidate = serde_json::from_value(item)
                .map_err(|e| LeadScoutError::parse(format!("candidate #{i}: {e}")))?;
            candidate.source_url = normalize_url(&candidate.source_url);
            Ok(candidate)
        })
        .collect()
}

/// Locate the JSON payload inside a response body.
///
/// Tries, in order: the whole body, the first fenced block, and the
/// outermost bracketed span of prose.
pub fn extract_json(body: &str) -> Option<&str> {
    let trimmed = body.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return Some(trimmed);
    }

    if let Some(caps) = FENCE_RE.captures(trimmed) {
        let inner = caps.get(1)?.as_str().trim();
        if !inner.is_empty() {
            return Some(inner);
        }
    }

    let (open, close) = match (trimmed.find('['), trimmed.find('{')) {
        (Some(a), Some(o)) if o < a => ('{', '}'),
        (Some(_), _) => ('[', ']'),
        (None, Some(_)) => ('{', '}'),
        (None, None) => return None,
    };
    let start = trimmed.find(open)?;
    let end = trimmed.rfind(close)?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Add a scheme to bare hostnames; leave anything unparseable untouched.
fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let candidate = if SCHEME_RE.is_match(raw) {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    match Url::parse(&candidate) {
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
