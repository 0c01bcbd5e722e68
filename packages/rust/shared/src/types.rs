//! Core domain types for LeadScout campaigns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LeadScoutError, Result};

/// Output language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Title given to the synthetic contact of an individual-targeted lead.
pub const SYNTHETIC_CONTACT_TITLE: &str = "Prospect";

// ---------------------------------------------------------------------------
// LeadId
// ---------------------------------------------------------------------------

/// Stable identifier of a lead record.
///
/// Discovery services may supply their own ids; otherwise a time-sortable
/// UUID v7 is generated when the candidate is committed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    /// Generate a new time-sortable lead identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Campaign / SearchRequest
// ---------------------------------------------------------------------------

/// Discriminant of a campaign: who the run is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignMode {
    /// Companies, scored against a product/offer.
    Organization,
    /// People, found through social listening.
    Individual,
}

impl CampaignMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Individual => "individual",
        }
    }
}

impl std::fmt::Display for CampaignMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign variant with its mode-specific refinements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Campaign {
    Organization {
        /// Description of the product or offer being sold.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_context: Option<String>,
    },
    Individual {
        /// Role filter, e.g. "Head of Marketing".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_role: Option<String>,
        /// Keyword filter applied to posts.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keywords: Option<String>,
    },
}

impl Campaign {
    pub fn mode(&self) -> CampaignMode {
        match self {
            Self::Organization { .. } => CampaignMode::Organization,
            Self::Individual { .. } => CampaignMode::Individual,
        }
    }
}

/// A query descriptor. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Campaign variant and its refinements.
    pub campaign: Campaign,
    /// Industry (organization) or business/product (individual).
    pub subject: String,
    /// Locale or location to search in.
    pub location: String,
    /// Target number of leads.
    pub count: u32,
    /// Output language for generated text.
    pub language: String,
}

impl SearchRequest {
    /// Build a request with the default output language.
    pub fn new(
        campaign: Campaign,
        subject: impl Into<String>,
        location: impl Into<String>,
        count: u32,
    ) -> Self {
        Self {
            campaign,
            subject: subject.into(),
            location: location.into(),
            count,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn mode(&self) -> CampaignMode {
        self.campaign.mode()
    }

    /// Product description of an organization-targeted campaign, if set.
    pub fn product_context(&self) -> Option<&str> {
        match &self.campaign {
            Campaign::Organization { product_context } => non_blank(product_context.as_deref()),
            Campaign::Individual { .. } => None,
        }
    }

    /// Reject requests that must never reach the discovery service.
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() {
            return Err(LeadScoutError::validation("subject must not be empty"));
        }
        if self.location.trim().is_empty() {
            return Err(LeadScoutError::validation("location must not be empty"));
        }
        if self.count == 0 {
            return Err(LeadScoutError::validation("count must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Contacts and enrichment
// ---------------------------------------------------------------------------

/// A person attached to a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Contact {
    pub fn has_email(&self) -> bool {
        non_blank(self.email.as_deref()).is_some()
    }
}

/// Social profile links found during enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
}

impl SocialLinks {
    pub fn is_empty(&self) -> bool {
        [&self.linkedin, &self.twitter, &self.facebook, &self.instagram]
            .iter()
            .all(|link| non_blank(link.as_deref()).is_none())
    }
}

/// Deep profile produced by the enrichment service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedProfile {
    #[serde(default, alias = "keyInsights")]
    pub key_insights: Vec<String>,
    #[serde(default, alias = "productsServices")]
    pub products_services: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, alias = "competitiveAdvantage")]
    pub competitive_advantage: String,
    #[serde(default, alias = "targetMarket")]
    pub target_market: String,
    #[serde(default, alias = "pitchStrategy")]
    pub pitch_strategy: String,
    #[serde(default, alias = "outreachEmail", alias = "outreachMessage")]
    pub outreach_message: String,
    #[serde(default, alias = "socialLinks", skip_serializing_if = "Option::is_none")]
    pub social_links: Option<SocialLinks>,
}

impl EnrichedProfile {
    /// A profile with no insight at all counts as "no profile".
    pub fn is_empty(&self) -> bool {
        self.key_insights.is_empty()
            && self.products_services.is_empty()
            && self.technologies.is_empty()
            && self.competitive_advantage.trim().is_empty()
            && self.target_market.trim().is_empty()
            && self.pitch_strategy.trim().is_empty()
            && self.outreach_message.trim().is_empty()
            && self.social_links.as_ref().is_none_or(SocialLinks::is_empty)
    }
}

/// Four-valued enrichment status, as shown to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    New,
    Enriching,
    Complete,
    Failed,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Enriching => "enriching",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrichment lifecycle of one record.
///
/// A profile can only exist in the `Complete` state. `Complete(None)` is the
/// soft-failure outcome: the service answered but produced nothing usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "profile", rename_all = "snake_case")]
pub enum Enrichment {
    #[default]
    New,
    Enriching,
    Complete(Option<EnrichedProfile>),
    Failed,
}

impl Enrichment {
    pub fn status(&self) -> EnrichmentStatus {
        match self {
            Self::New => EnrichmentStatus::New,
            Self::Enriching => EnrichmentStatus::Enriching,
            Self::Complete(_) => EnrichmentStatus::Complete,
            Self::Failed => EnrichmentStatus::Failed,
        }
    }

    pub fn profile(&self) -> Option<&EnrichedProfile> {
        match self {
            Self::Complete(profile) => profile.as_ref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// LeadRecord
// ---------------------------------------------------------------------------

/// Mode-specific display fields of a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LeadDetails {
    Organization {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        general_email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phone: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        employee_count: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        linkedin_url: Option<String>,
    },
    Individual {
        /// General contact information published alongside the post.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        general_info: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        posted_at: Option<String>,
    },
}

impl LeadDetails {
    pub fn mode(&self) -> CampaignMode {
        match self {
            Self::Organization { .. } => CampaignMode::Organization,
            Self::Individual { .. } => CampaignMode::Individual,
        }
    }

    /// The general (non-personal) contact channel, if any.
    pub fn general_contact(&self) -> Option<&str> {
        match self {
            Self::Organization { general_email, .. } => non_blank(general_email.as_deref()),
            Self::Individual { general_info, .. } => non_blank(general_info.as_deref()),
        }
    }
}

/// One discovered candidate.
///
/// Everything except `enrichment` is written once at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: LeadId,
    /// Company name, or platform for individual-targeted leads.
    pub name: String,
    /// Website, or post link for individual-targeted leads.
    pub source_url: String,
    pub location: String,
    /// Industry, or sentiment for individual-targeted leads.
    pub classification: String,
    pub summary: String,
    /// 0–100.
    pub quality_score: u8,
    pub contacts: Vec<Contact>,
    pub details: LeadDetails,
    #[serde(default)]
    pub enrichment: Enrichment,
}

impl LeadRecord {
    pub fn mode(&self) -> CampaignMode {
        self.details.mode()
    }

    pub fn status(&self) -> EnrichmentStatus {
        self.enrichment.status()
    }

    pub fn enriched_profile(&self) -> Option<&EnrichedProfile> {
        self.enrichment.profile()
    }

    /// Whether any contact has an email or the general contact field is set.
    pub fn has_contact_channel(&self) -> bool {
        self.contacts.iter().any(Contact::has_email) || self.details.general_contact().is_some()
    }
}

// ---------------------------------------------------------------------------
// LeadCandidate (discovery wire shape)
// ---------------------------------------------------------------------------

/// A candidate as returned by the discovery service, before it is committed.
///
/// Field aliases accept the camelCase names generative services tend to emit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadCandidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "companyName", alias = "platform")]
    pub name: String,
    #[serde(default, alias = "websiteUrl", alias = "postLink")]
    pub source_url: String,
    #[serde(default, alias = "country")]
    pub location: String,
    #[serde(default, alias = "industry")]
    pub classification: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "qualityScore")]
    pub quality_score: Option<f64>,
    #[serde(default, alias = "decisionMakers")]
    pub contacts: Vec<Contact>,
    #[serde(default, alias = "generalEmail")]
    pub general_email: Option<String>,
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    #[serde(default, alias = "size")]
    pub employee_count: Option<String>,
    #[serde(default, alias = "linkedinUrl")]
    pub linkedin_url: Option<String>,
    #[serde(default, alias = "generalInfo")]
    pub general_info: Option<String>,
    #[serde(default, alias = "postedAt", alias = "datePosted")]
    pub posted_at: Option<String>,
    /// User handle of an individual-targeted lead.
    #[serde(default, alias = "userHandle")]
    pub handle: Option<String>,
    #[serde(default, alias = "profileUrl")]
    pub profile_url: Option<String>,
}

impl LeadCandidate {
    /// Convert into a committed record tagged with the run's campaign mode.
    ///
    /// Fails on candidates without a name. Individual-targeted candidates
    /// without contacts get one synthetic contact built from their handle.
    pub fn into_record(self, mode: CampaignMode) -> Result<LeadRecord> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(LeadScoutError::parse("candidate has no name"));
        }

        let id = match non_blank(self.id.as_deref()) {
            Some(id) => LeadId::from(id),
            None => LeadId::new(),
        };

        let quality_score = self
            .quality_score
            .filter(|s| s.is_finite())
            .map(|s| s.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);

        let mut contacts: Vec<Contact> = self
            .contacts
            .into_iter()
            .filter(|c| !c.name.trim().is_empty())
            .collect();

        let details = match mode {
            CampaignMode::Organization => LeadDetails::Organization {
                general_email: self.general_email,
                phone: self.phone,
                employee_count: self.employee_count,
                linkedin_url: self.linkedin_url,
            },
            CampaignMode::Individual => {
                if contacts.is_empty() {
                    if let Some(handle) = non_blank(self.handle.as_deref()) {
                        contacts.push(Contact {
                            name: handle.to_string(),
                            title: SYNTHETIC_CONTACT_TITLE.to_string(),
                            email: self.profile_url.clone(),
                        });
                    }
                }
                LeadDetails::Individual {
                    general_info: self.general_info.or(self.general_email),
                    posted_at: self.posted_at,
                }
            }
        };

        Ok(LeadRecord {
            id,
            name,
            source_url: self.source_url,
            location: self.location,
            classification: self.classification,
            summary: self.summary,
            quality_score,
            contacts,
            details,
            enrichment: Enrichment::New,
        })
    }
}

// ---------------------------------------------------------------------------
// Run phase and log events
// ---------------------------------------------------------------------------

/// Run-level state of the discovery pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Initializing,
    Discovering,
    Streaming,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Discovering => "discovering",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a discovery run is between start and its terminal state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::Discovering | Self::Streaming
        )
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One entry of the pipeline narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

impl LogEvent {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
