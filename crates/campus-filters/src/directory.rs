//! Reference directories: read-only lookup lists used to label id filters.
//!
//! # Design
//! - A directory is either still loading or fully loaded; partial pages never
//!   count as loaded.
//! - Reconciliation is gated on an explicit "all required loaded" predicate.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Identifier of a reference directory (for example `users` or `schools`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryId(String);

impl DirectoryId {
    /// Wrap a directory name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the directory name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DirectoryId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for DirectoryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Display pair for one directory row: `key` is the id, `value` the label.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Identifier carried in the URL and sent to the list API.
    pub key: String,
    /// Human-readable label shown by the filter input.
    pub value: String,
}

impl DirectoryEntry {
    /// Build an entry from an id and its label.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Entry whose label is unknown; the id stands in for it.
    #[must_use]
    pub fn unlabelled(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            value: key.clone(),
            key,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum DirectoryState {
    Loading,
    Loaded(BTreeMap<String, DirectoryEntry>),
}

/// Load state and contents of every directory known to the session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directories {
    states: BTreeMap<DirectoryId, DirectoryState>,
}

impl Directories {
    /// Empty registry; every directory counts as not loaded.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            states: BTreeMap::new(),
        }
    }

    /// Record that a directory fetch has started, discarding older contents.
    pub fn mark_loading(&mut self, id: DirectoryId) {
        self.states.insert(id, DirectoryState::Loading);
    }

    /// Store the complete contents of a directory and mark it loaded.
    pub fn load(&mut self, id: DirectoryId, entries: impl IntoIterator<Item = DirectoryEntry>) {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect();
        self.states.insert(id, DirectoryState::Loaded(entries));
    }

    /// Builder-style variant of [`Directories::load`].
    #[must_use]
    pub fn with(mut self, id: &str, entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        self.load(DirectoryId::new(id), entries);
        self
    }

    /// Whether `id` has finished loading.
    #[must_use]
    pub fn is_loaded(&self, id: &DirectoryId) -> bool {
        matches!(self.states.get(id), Some(DirectoryState::Loaded(_)))
    }

    /// Whether every directory in `required` has finished loading.
    #[must_use]
    pub fn all_loaded(&self, required: &BTreeSet<DirectoryId>) -> bool {
        required.iter().all(|id| self.is_loaded(id))
    }

    /// Directories in `required` that are not loaded yet.
    #[must_use]
    pub fn missing(&self, required: &BTreeSet<DirectoryId>) -> BTreeSet<DirectoryId> {
        required
            .iter()
            .filter(|id| !self.is_loaded(id))
            .cloned()
            .collect()
    }

    /// Look up an id in a loaded directory.
    #[must_use]
    pub fn resolve(&self, id: &DirectoryId, key: &str) -> Option<&DirectoryEntry> {
        match self.states.get(id) {
            Some(DirectoryState::Loaded(entries)) => entries.get(key),
            _ => None,
        }
    }

    /// Loaded entries of a directory, ordered by id.
    #[must_use]
    pub fn entries(&self, id: &DirectoryId) -> Vec<&DirectoryEntry> {
        match self.states.get(id) {
            Some(DirectoryState::Loaded(entries)) => entries.values().collect(),
            _ => Vec::new(),
        }
    }
}
