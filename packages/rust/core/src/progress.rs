//! Derived run metrics.

use leadscout_shared::LeadRecord;
use serde::Serialize;

use crate::store::LeadStore;

/// Live metrics computed from a lead store and the run's target count.
///
/// Never stored; recompute after any store change you care about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Committed leads as a share of the target, capped at 100.
    pub progress_percent: u8,
    /// Leads with an email on any contact or a general contact field.
    pub records_with_contact: usize,
    /// `records_with_contact` as a share of committed leads.
    pub enrichment_rate: u8,
    /// Committed leads.
    pub total: usize,
    pub target: u32,
}

impl Progress {
    pub fn compute(store: &LeadStore, target: u32) -> Self {
        Self::from_records(store.all(), target)
    }

    /// Metrics over an ordered slice of committed records.
    pub fn from_records(records: &[LeadRecord], target: u32) -> Self {
        let total = records.len();
        let records_with_contact = records.iter().filter(|r| r.has_contact_channel()).count();

        let progress_percent = if target == 0 {
            0
        } else {
            percent(total, target as usize).min(100)
        };

        let enrichment_rate = if total == 0 {
            0
        } else {
            percent(records_with_contact, total)
        };

        Self {
            progress_percent,
            records_with_contact,
            enrichment_rate,
            total,
            target,
        }
    }
}

/// `round(100 * part / whole)`, halves rounding up. Saturates at 255.
fn percent(part: usize, whole: usize) -> u8 {
    let rounded = (200 * part + whole) / (2 * whole);
    u8::try_from(rounded).unwrap_or(u8::MAX)
}
