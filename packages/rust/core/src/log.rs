//! Append-only pipeline narrative.

use leadscout_shared::{LogEvent, Severity};

/// Timestamped, severity-tagged record of pipeline activity.
///
/// Insertion order is the only order. Entries are never mutated; the log is
/// emptied only by a full run reset.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LogEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with the current time.
    pub fn append(&mut self, message: impl Into<String>, severity: Severity) -> &LogEvent {
        self.events.push(LogEvent::new(message, severity));
        &self.events[self.events.len() - 1]
    }

    pub fn all(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&LogEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.events.iter().filter(|e| e.severity == severity).count()
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }
}
