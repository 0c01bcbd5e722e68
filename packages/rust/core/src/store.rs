//! Ordered, id-keyed collection of lead records.

use std::collections::HashMap;

use leadscout_shared::{Enrichment, LeadId, LeadRecord, LeadScoutError, Result};

/// Leads in arrival order, addressable by id.
///
/// Only the enrichment state of a record can change after it is added; the
/// mutation API hands out nothing else.
#[derive(Debug, Clone, Default)]
pub struct LeadStore {
    records: Vec<LeadRecord>,
    index: HashMap<LeadId, usize>,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Duplicate ids are rejected and leave the store untouched.
    pub fn add(&mut self, record: LeadRecord) -> Result<()> {
        if self.index.contains_key(&record.id) {
            return Err(LeadScoutError::parse(format!(
                "duplicate lead id {}",
                record.id
            )));
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Mutate the enrichment state of one record.
    ///
    /// Returns the updated record, or `None` (and does nothing) if the id is absent.
    pub fn update(
        &mut self,
        id: &LeadId,
        mutate: impl FnOnce(&mut Enrichment),
    ) -> Option<&LeadRecord> {
        let pos = *self.index.get(id)?;
        let record = &mut self.records[pos];
        mutate(&mut record.enrichment);
        Some(record)
    }

    pub fn all(&self) -> &[LeadRecord] {
        &self.records
    }

    pub fn by_id(&self, id: &LeadId) -> Option<&LeadRecord> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}
