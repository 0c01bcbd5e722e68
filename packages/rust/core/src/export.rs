//! Tabular export of committed leads.
//!
//! Rows are built from a read-only slice of records and written as a JSON
//! array of objects whose keys are the column headings. The campaign mode of
//! the first record picks the column set.

use std::path::Path;

use chrono::NaiveDate;
use leadscout_shared::{CampaignMode, Contact, LeadDetails, LeadRecord, LeadScoutError, Result};
use serde::Serialize;
use tracing::info;

/// One organization-targeted lead as an export row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationRow {
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Industry")]
    pub industry: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Summary")]
    pub summary: String,
    #[serde(rename = "General Email")]
    pub general_email: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Employee Size")]
    pub employee_size: String,
    #[serde(rename = "LinkedIn")]
    pub linkedin: String,
    #[serde(rename = "Quality Score")]
    pub quality_score: u8,
    #[serde(rename = "Decision Maker Name")]
    pub decision_maker_name: String,
    #[serde(rename = "Decision Maker Title")]
    pub decision_maker_title: String,
    #[serde(rename = "Decision Maker Email")]
    pub decision_maker_email: String,
}

/// One individual-targeted lead as an export row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndividualRow {
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Post Link")]
    pub post_link: String,
    #[serde(rename = "Sentiment / Industry")]
    pub sentiment: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Post Content")]
    pub post_content: String,
    #[serde(rename = "General Info")]
    pub general_info: String,
    #[serde(rename = "Date Posted")]
    pub date_posted: String,
    #[serde(rename = "Quality Score")]
    pub quality_score: u8,
    #[serde(rename = "User Handle")]
    pub user_handle: String,
    #[serde(rename = "User Profile / Inbox Link")]
    pub user_profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExportRows {
    Organization(Vec<OrganizationRow>),
    Individual(Vec<IndividualRow>),
}

impl ExportRows {
    pub fn len(&self) -> usize {
        match self {
            Self::Organization(rows) => rows.len(),
            Self::Individual(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build export rows. An empty slice yields empty organization rows.
pub fn build_rows(leads: &[LeadRecord]) -> ExportRows {
    match leads.first().map(LeadRecord::mode) {
        Some(CampaignMode::Individual) => {
            ExportRows::Individual(leads.iter().map(individual_row).collect())
        }
        _ => ExportRows::Organization(leads.iter().map(organization_row).collect()),
    }
}

fn organization_row(lead: &LeadRecord) -> OrganizationRow {
    let (general_email, phone, employee_size, linkedin) = match &lead.details {
        LeadDetails::Organization {
            general_email,
            phone,
            employee_count,
            linkedin_url,
        } => (
            text(general_email),
            text(phone),
            text(employee_count),
            text(linkedin_url),
        ),
        LeadDetails::Individual { general_info, .. } => {
            (text(general_info), String::new(), String::new(), String::new())
        }
    };
    let contact = lead.contacts.first();

    OrganizationRow {
        company_name: lead.name.clone(),
        website: lead.source_url.clone(),
        industry: lead.classification.clone(),
        country: lead.location.clone(),
        summary: lead.summary.clone(),
        general_email,
        phone,
        employee_size,
        linkedin,
        quality_score: lead.quality_score,
        decision_maker_name: contact.map(|c| c.name.clone()).unwrap_or_default(),
        decision_maker_title: contact.map(|c| c.title.clone()).unwrap_or_default(),
        decision_maker_email: contact.map(contact_email).unwrap_or_default(),
    }
}

fn individual_row(lead: &LeadRecord) -> IndividualRow {
    let (general_info, date_posted) = match &lead.details {
        LeadDetails::Individual {
            general_info,
            posted_at,
        } => (text(general_info), text(posted_at)),
        LeadDetails::Organization { general_email, .. } => (text(general_email), String::new()),
    };
    let contact = lead.contacts.first();

    IndividualRow {
        platform: lead.name.clone(),
        post_link: lead.source_url.clone(),
        sentiment: lead.classification.clone(),
        location: lead.location.clone(),
        post_content: lead.summary.clone(),
        general_info,
        date_posted,
        quality_score: lead.quality_score,
        user_handle: contact.map(|c| c.name.clone()).unwrap_or_default(),
        user_profile: contact.map(contact_email).unwrap_or_default(),
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn contact_email(contact: &Contact) -> String {
    text(&contact.email)
}

/// Serialize the rows for `leads` as a pretty-printed JSON array.
pub fn to_json(leads: &[LeadRecord]) -> Result<String> {
    serde_json::to_string_pretty(&build_rows(leads))
        .map_err(|e| LeadScoutError::parse(format!("failed to serialize export: {e}")))
}

/// Write the export to `path`, creating parent directories. Returns the row count.
pub fn write_export(leads: &[LeadRecord], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LeadScoutError::io(parent, e))?;
    }

    let json = to_json(leads)?;
    std::fs::write(path, json).map_err(|e| LeadScoutError::io(path, e))?;

    info!(path = %path.display(), rows = leads.len(), "export written");
    Ok(leads.len())
}

/// `leads_export_YYYY-MM-DD.json`
pub fn default_file_name(date: NaiveDate) -> String {
    format!("leads_export_{}.json", date.format("%Y-%m-%d"))
}
