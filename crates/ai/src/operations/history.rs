//! Bounded history of finished operations.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use super::models::OperationSnapshot;

/// Default number of finished operations retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Ordering key: completion time, then completion sequence.
type CompletionKey = (DateTime<Utc>, u64);

/// Finished operations, evicting the earliest completion when full.
#[derive(Debug)]
pub struct OperationHistory {
    capacity: usize,
    next_seq: u64,
    by_completion: BTreeMap<CompletionKey, String>,
    entries: HashMap<String, (CompletionKey, OperationSnapshot)>,
}

impl OperationHistory {
    /// History retaining at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_seq: 0,
            by_completion: BTreeMap::new(),
            entries: HashMap::new(),
        }
    }

    /// Add a finished operation, returning any evicted entries.
    pub fn insert(&mut self, snapshot: OperationSnapshot) -> Vec<OperationSnapshot> {
        let key = (snapshot.end_time.unwrap_or_else(Utc::now), self.next_seq);
        self.next_seq += 1;

        if let Some((old_key, _)) = self.entries.remove(&snapshot.id) {
            self.by_completion.remove(&old_key);
        }
        self.by_completion.insert(key, snapshot.id.clone());
        self.entries.insert(snapshot.id.clone(), (key, snapshot));

        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let Some((_, id)) = self.by_completion.pop_first() else {
                break;
            };
            if let Some((_, snapshot)) = self.entries.remove(&id) {
                evicted.push(snapshot);
            }
        }
        evicted
    }

    /// Look up a retained operation.
    pub fn get(&self, id: &str) -> Option<&OperationSnapshot> {
        self.entries.get(id).map(|(_, snapshot)| snapshot)
    }

    /// Number of retained operations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum retained operations.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for OperationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
