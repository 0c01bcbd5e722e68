//! Shared types, error model, and configuration for LeadScout.
//!
//! This crate is the foundation depended on by all other LeadScout crates.
//! It provides:
//! - [`LeadScoutError`]: the unified error type
//! - Domain types ([`SearchRequest`], [`LeadRecord`], [`LogEvent`], [`RunPhase`])
//! - Configuration ([`AppConfig`], [`PipelineSettings`], credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, Credential, DefaultsConfig, EnrichmentConfig, PipelineSettings, ProviderConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_credential,
};
pub use error::{LeadScoutError, Result};
pub use types::{
    Campaign, CampaignMode, Contact, DEFAULT_LANGUAGE, EnrichedProfile, Enrichment,
    EnrichmentStatus, LeadCandidate, LeadDetails, LeadId, LeadRecord, LogEvent, RunPhase,
    SYNTHETIC_CONTACT_TITLE, SearchRequest, Severity, SocialLinks,
};
