use crate::state::record::{DedupeKey, Record};
use std::collections::HashSet;

/// Tracks which titles have already produced a record
///
/// The index has two layers:
/// - a global set covering the whole run (including records restored from a
///   checkpoint)
/// - a per-task set scoped to one task's pagination
///
/// A title is accepted only when its key is absent from both layers. The
/// first task to accept a key owns it for the rest of the run.
#[derive(Debug, Default)]
pub struct DedupeIndex {
    global: HashSet<DedupeKey>,
    task: HashSet<DedupeKey>,
}

impl DedupeIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the global layer from existing records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        Self {
            global: records.into_iter().map(Record::dedupe_key).collect(),
            task: HashSet::new(),
        }
    }

    /// Starts a new per-task scope
    pub fn begin_task(&mut self) {
        self.task.clear();
    }

    /// Offers a title for acceptance
    ///
    /// # Returns
    ///
    /// * `true` - The title is new; both layers now contain it
    /// * `false` - The title was already seen in this task or in the run
    pub fn accept(&mut self, year: i32, title: &str) -> bool {
        let key = DedupeKey::new(year, title);
        if self.task.contains(&key) || self.global.contains(&key) {
            return false;
        }
        self.task.insert(key.clone());
        self.global.insert(key);
        true
    }

    /// Ends the current task scope, keeping its keys in the global layer
    pub fn commit_task(&mut self) {
        self.task.clear();
    }

    /// Ends the current task scope and forgets the keys it accepted
    ///
    /// Used when a task fails: its staged records are discarded, so a later
    /// retry must be able to accept the same titles again.
    pub fn rollback_task(&mut self) {
        for key in self.task.drain() {
            self.global.remove(&key);
        }
    }

    /// Registers a key outside of any task (manual record import)
    pub fn insert(&mut self, key: DedupeKey) {
        self.global.insert(key);
    }

    /// Returns true if the run already holds a record for this title
    pub fn contains(&self, year: i32, title: &str) -> bool {
        self.global.contains(&DedupeKey::new(year, title))
    }

    /// Number of keys in the global layer
    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}
