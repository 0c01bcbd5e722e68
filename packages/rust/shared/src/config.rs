//! Application configuration for LeadScout.
//!
//! User config lives at `~/.leadscout/leadscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscout";

// ---------------------------------------------------------------------------
// Config structs (matching leadscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Campaign defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// External discovery/enrichment provider.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Enrichment scheduling.
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default target lead count.
    #[serde(default = "default_count")]
    pub count: u32,

    /// Default output language.
    #[serde(default = "default_language")]
    pub language: String,

    /// Pause between committed candidates while streaming.
    #[serde(default = "default_stream_delay")]
    pub stream_delay_ms: u64,

    /// Default directory for exports.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            language: default_language(),
            stream_delay_ms: default_stream_delay(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_count() -> u32 {
    20
}
fn default_language() -> String {
    crate::types::DEFAULT_LANGUAGE.into()
}
fn default_stream_delay() -> u64 {
    300
}
fn default_output_dir() -> String {
    "~/leadscout-exports".into()
}

/// `[provider]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the discovery/enrichment endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model requested from the provider.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upper bound for the single discovery call.
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,

    /// Upper bound for each enrichment call.
    #[serde(default = "default_enrichment_timeout")]
    pub enrichment_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            discovery_timeout_secs: default_discovery_timeout(),
            enrichment_timeout_secs: default_enrichment_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "LEADSCOUT_API_KEY".into()
}
fn default_base_url() -> String {
    "http://localhost:8787".into()
}
fn default_model() -> String {
    "gemini-2.5-pro".into()
}
fn default_discovery_timeout() -> u64 {
    120
}
fn default_enrichment_timeout() -> u64 {
    60
}

/// `[enrichment]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Maximum enrichment calls in flight at once. `0` means no cap.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Pipeline settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Pause between committed candidates while streaming.
    pub stream_delay: Duration,
    /// Bound on the discovery call.
    pub discovery_timeout: Duration,
    /// Bound on each enrichment call.
    pub enrichment_timeout: Duration,
    /// Concurrent enrichment cap; `None` leaves it unbounded.
    pub max_concurrent_enrichments: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            stream_delay: Duration::from_millis(config.defaults.stream_delay_ms),
            discovery_timeout: Duration::from_secs(config.provider.discovery_timeout_secs),
            enrichment_timeout: Duration::from_secs(config.provider.enrichment_timeout_secs),
            max_concurrent_enrichments: match config.enrichment.max_concurrent {
                0 => None,
                n => Some(n),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Opaque process-wide credential for the external services.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw key. Blank keys are rejected as a configuration error.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(LeadScoutError::config("credential must not be empty"));
        }
        Ok(Self(key))
    }

    /// The raw secret, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscout/leadscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the provider credential from the configured environment variable.
pub fn resolve_credential(config: &AppConfig) -> Result<Credential> {
    let var_name = &config.provider.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Credential::new(val),
        _ => Err(LeadScoutError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("stream_delay_ms"));
        assert!(toml_str.contains("LEADSCOUT_API_KEY"));
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let toml_str = r#"
[defaults]
count = 50

[enrichment]
max_concurrent = 0
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.count, 50);
        assert_eq!(config.defaults.language, "English");
        assert_eq!(config.provider.discovery_timeout_secs, 120);

        let settings = PipelineSettings::from(&config);
        assert_eq!(settings.max_concurrent_enrichments, None);
        assert_eq!(settings.stream_delay, Duration::from_millis(300));
    }

    #[test]
    fn settings_from_app_config() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.discovery_timeout, Duration::from_secs(120));
        assert_eq!(settings.enrichment_timeout, Duration::from_secs(60));
        assert_eq!(settings.max_concurrent_enrichments, Some(4));
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[provider]\nmodel = \"test-model\"\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.provider.model, "test-model");

        std::fs::write(&path, "[provider\n").expect("write");
        let err = load_config_from(&path).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn missing_credential_is_config_error() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.provider.api_key_env = "LS_TEST_NONEXISTENT_KEY_12345".into();
        let err = resolve_credential(&config).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("API key not found"));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("sk-secret").expect("credential");
        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
        assert_eq!(credential.expose(), "sk-secret");
        assert!(Credential::new("  ").is_err());
    }
}
