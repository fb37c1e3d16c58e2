use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ResourceId, UserId};

/// Per-resource learning status.
///
/// `NotStarted → Completed ⇄ InProgress`; `InProgress` is only reached by
/// un-completing a resource, and `NotStarted` only through a path reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStatus {
    #[default]
    #[serde(rename = "non commencé")]
    NotStarted,
    #[serde(rename = "en cours")]
    InProgress,
    #[serde(rename = "terminé")]
    Completed,
}

impl ProgressStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "non commencé",
            ProgressStatus::InProgress => "en cours",
            ProgressStatus::Completed => "terminé",
        }
    }

    /// Status after the user presses the completion toggle.
    #[must_use]
    pub fn toggled_completion(self) -> Self {
        match self {
            ProgressStatus::Completed => ProgressStatus::InProgress,
            ProgressStatus::NotStarted | ProgressStatus::InProgress => ProgressStatus::Completed,
        }
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        self == ProgressStatus::Completed
    }
}

/// A user's record for one resource, keyed by the resource id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgress {
    pub resource_id: ResourceId,
    pub status: ProgressStatus,
    pub is_favorite: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A progress record seen through the cross-user query, tagged with its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedProgress {
    pub user_id: UserId,
    pub progress: UserProgress,
}

/// The two fields every progress write carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressFields {
    pub status: ProgressStatus,
    pub is_favorite: bool,
}

/// Partial update requested by a mutation; unset fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressPatch {
    pub status: Option<ProgressStatus>,
    pub is_favorite: Option<bool>,
}

impl ProgressPatch {
    #[must_use]
    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            status: None,
            is_favorite: Some(is_favorite),
        }
    }

    #[must_use]
    pub fn status(status: ProgressStatus) -> Self {
        Self {
            status: Some(status),
            is_favorite: None,
        }
    }
}

/// Current fields of a resource's progress, with defaults when no record exists.
///
/// Every read and write path goes through here so the defaults
/// (`non commencé`, not favorite) are applied in one place.
#[must_use]
pub fn resolve_progress(existing: Option<&UserProgress>) -> ProgressFields {
    existing.map_or(
        ProgressFields {
            status: ProgressStatus::NotStarted,
            is_favorite: false,
        },
        |p| ProgressFields {
            status: p.status,
            is_favorite: p.is_favorite,
        },
    )
}

/// Merge a patch over the resolved fields of an existing record.
#[must_use]
pub fn merge_progress(existing: Option<&UserProgress>, patch: ProgressPatch) -> ProgressFields {
    let base = resolve_progress(existing);
    ProgressFields {
        status: patch.status.unwrap_or(base.status),
        is_favorite: patch.is_favorite.unwrap_or(base.is_favorite),
    }
}

/// One snapshot of a user's progress collection.
///
/// Keeps the store's iteration order and an index for lookups by resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    records: Vec<UserProgress>,
    index: HashMap<ResourceId, usize>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(records: Vec<UserProgress>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, p)| (p.resource_id.clone(), i))
            .collect();
        Self { records, index }
    }

    #[must_use]
    pub fn get(&self, resource_id: &ResourceId) -> Option<&UserProgress> {
        self.index.get(resource_id).map(|&i| &self.records[i])
    }

    #[must_use]
    pub fn contains(&self, resource_id: &ResourceId) -> bool {
        self.index.contains_key(resource_id)
    }

    #[must_use]
    pub fn fields(&self, resource_id: &ResourceId) -> ProgressFields {
        resolve_progress(self.get(resource_id))
    }

    #[must_use]
    pub fn is_favorite(&self, resource_id: &ResourceId) -> bool {
        self.fields(resource_id).is_favorite
    }

    #[must_use]
    pub fn is_completed(&self, resource_id: &ResourceId) -> bool {
        self.fields(resource_id).status.is_completed()
    }

    /// Replace the record for its resource, or append it if new.
    pub fn upsert(&mut self, record: UserProgress) {
        match self.index.get(&record.resource_id) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.resource_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserProgress> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
