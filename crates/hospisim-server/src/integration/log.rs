//! Bounded audit log of routing decisions.

use std::collections::VecDeque;

use hospisim_core::FhirDateTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Processing,
    Completed,
    Error,
}

/// One consumed event and what the engine did with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterLogEntry {
    pub timestamp: FhirDateTime,
    pub routing_key: String,
    pub message_type: Option<String>,
    pub source: Option<String>,
    pub event_id: Option<String>,
    pub destinations: Vec<String>,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Most recent entries in arrival order. Once full, each push evicts the oldest entry.
#[derive(Debug)]
pub struct MessageLog {
    entries: Mutex<VecDeque<RouterLogEntry>>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, entry: RouterLogEntry) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Replaces the contents with `entries` (oldest first), keeping the newest that fit.
    pub fn restore(&self, entries: Vec<RouterLogEntry>) {
        let skip = entries.len().saturating_sub(self.capacity);
        let mut current = self.entries.lock();
        current.clear();
        current.extend(entries.into_iter().skip(skip));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// The newest `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<RouterLogEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// The oldest retained entry for the given event id.
    pub fn find(&self, event_id: &str) -> Option<RouterLogEntry> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.event_id.as_deref() == Some(event_id))
            .cloned()
    }
}
