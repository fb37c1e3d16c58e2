//! Cross-user statistics for the admin page.
//!
//! Everything here reads the `progress` collection group across all users
//! and never writes into anyone's subtree.

use std::collections::HashMap;
use std::sync::Arc;

use itetude_core::aggregate::{FavoriteCounts, favorite_counts, path_completion_counts};
use itetude_core::model::{LearningPath, OwnedProgress, PathId, Resource, UserProfile};
use storage::mapping::{
    LEARNING_PATHS, PROGRESS, RESOURCES, USERS, decode_owned_progress_list, decode_paths,
    decode_profiles, decode_resources,
};
use storage::repository::{DocumentStore, StorageError};
use storage::{CollectionPath, CollectionQuery, GroupQuery};

use crate::live_view::LiveCollection;
use crate::permission::PermissionErrorEmitter;

/// Admin dashboard numbers as of one refresh.
#[derive(Debug, Clone, Default)]
pub struct AdminStats {
    pub favorites: FavoriteCounts,
    pub path_completions: HashMap<PathId, usize>,
    pub resources: Vec<Resource>,
    pub paths: Vec<LearningPath>,
    pub users: Vec<UserProfile>,
    pub loading: bool,
}

impl AdminStats {
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn completions_for(&self, path_id: &PathId) -> usize {
        self.path_completions.get(path_id).copied().unwrap_or(0)
    }

    /// Resources ordered by favorite count, highest first; ties keep
    /// catalog order.
    #[must_use]
    pub fn resources_by_favorites(&self) -> Vec<(&Resource, usize)> {
        let mut ranked: Vec<(&Resource, usize)> = self
            .resources
            .iter()
            .map(|r| (r, self.favorites.for_resource(r.id())))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

pub struct AdminStatsFeed {
    progress: LiveCollection<GroupQuery, OwnedProgress>,
    resources: LiveCollection<CollectionQuery, Resource>,
    paths: LiveCollection<CollectionQuery, LearningPath>,
    users: LiveCollection<CollectionQuery, UserProfile>,
}

impl AdminStatsFeed {
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if a collection name is not a
    /// valid path.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        errors: PermissionErrorEmitter,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            progress: LiveCollection::new(
                Arc::clone(&store),
                GroupQuery(PROGRESS.to_owned()),
                decode_owned_progress_list,
                errors.clone(),
            ),
            resources: LiveCollection::new(
                Arc::clone(&store),
                CollectionQuery(CollectionPath::parse(RESOURCES)?),
                decode_resources,
                errors.clone(),
            ),
            paths: LiveCollection::new(
                Arc::clone(&store),
                CollectionQuery(CollectionPath::parse(LEARNING_PATHS)?),
                decode_paths,
                errors.clone(),
            ),
            users: LiveCollection::new(
                store,
                CollectionQuery(CollectionPath::parse(USERS)?),
                decode_profiles,
                errors,
            ),
        })
    }

    /// Apply queued changes and recompute the statistics.
    pub async fn refresh(&mut self) -> AdminStats {
        self.progress.refresh().await;
        self.resources.refresh().await;
        self.paths.refresh().await;
        self.users.refresh().await;

        let records = self.progress.items();
        let paths = self.paths.items();
        AdminStats {
            favorites: favorite_counts(records),
            path_completions: path_completion_counts(records, paths),
            resources: self.resources.items().to_vec(),
            paths: paths.to_vec(),
            users: self.users.items().to_vec(),
            loading: !(self.progress.is_loaded()
                && self.resources.is_loaded()
                && self.paths.is_loaded()
                && self.users.is_loaded()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itetude_core::model::{ProgressFields, ProgressStatus, ResourceId};
    use itetude_core::time::fixed_now;
    use storage::mapping::encode_progress;
    use storage::repository::InMemoryStore;
    use storage::DocPath;

    #[tokio::test]
    async fn stats_follow_progress_writes() {
        let store = InMemoryStore::new();
        let mut feed =
            AdminStatsFeed::new(Arc::new(store.clone()), PermissionErrorEmitter::new()).unwrap();
        let stats = feed.refresh().await;
        assert_eq!(stats.favorites.total, 0);
        assert!(!stats.loading);

        for user in ["a", "b"] {
            store
                .merge(
                    &DocPath::parse(&format!("users/{user}/progress/r1")).unwrap(),
                    encode_progress(
                        ProgressFields {
                            status: ProgressStatus::Completed,
                            is_favorite: true,
                        },
                        fixed_now(),
                    )
                    .unwrap(),
                )
                .await
                .unwrap();
        }

        let stats = feed.refresh().await;
        assert_eq!(stats.favorites.total, 2);
        assert_eq!(stats.favorites.for_resource(&ResourceId::new("r1")), 2);
        assert_eq!(stats.user_count(), 0);
    }

    #[tokio::test]
    async fn denied_group_read_degrades_to_empty() {
        let store = InMemoryStore::new();
        store
            .merge(&DocPath::parse("users/a/progress/r1").unwrap(), Default::default())
            .await
            .unwrap();
        store.deny_reads("users/a/progress");
        let errors = PermissionErrorEmitter::new();
        let mut events = errors.subscribe();

        let mut feed = AdminStatsFeed::new(Arc::new(store), errors).unwrap();
        let stats = feed.refresh().await;
        assert_eq!(stats.favorites.total, 0);
        assert!(stats.loading);
        assert_eq!(events.recv().await.unwrap().path, "progress");
    }
}
