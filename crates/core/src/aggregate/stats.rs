use std::collections::{HashMap, HashSet};

use crate::model::{LearningPath, OwnedProgress, PathId, ResourceId, UserId};

/// Favorite ("like") counts across every user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteCounts {
    pub per_resource: HashMap<ResourceId, usize>,
    pub total: usize,
}

impl FavoriteCounts {
    #[must_use]
    pub fn for_resource(&self, resource_id: &ResourceId) -> usize {
        self.per_resource.get(resource_id).copied().unwrap_or(0)
    }
}

#[must_use]
pub fn favorite_counts(records: &[OwnedProgress]) -> FavoriteCounts {
    let mut counts = FavoriteCounts::default();
    for record in records.iter().filter(|r| r.progress.is_favorite) {
        *counts
            .per_resource
            .entry(record.progress.resource_id.clone())
            .or_insert(0) += 1;
        counts.total += 1;
    }
    counts
}

/// Number of users who completed every resource of each path.
///
/// A path without steps always reports zero rather than counting every
/// user as having vacuously finished it.
#[must_use]
pub fn path_completion_counts(
    records: &[OwnedProgress],
    paths: &[LearningPath],
) -> HashMap<PathId, usize> {
    let mut completed_by_user: HashMap<&UserId, HashSet<&ResourceId>> = HashMap::new();
    for record in records.iter().filter(|r| r.progress.status.is_completed()) {
        completed_by_user
            .entry(&record.user_id)
            .or_default()
            .insert(&record.progress.resource_id);
    }

    paths
        .iter()
        .map(|path| {
            if path.step_count() == 0 {
                return (path.id().clone(), 0);
            }
            let required = path.required_resources();
            let finishers = completed_by_user
                .values()
                .filter(|done| required.is_subset(done))
                .count();
            (path.id().clone(), finishers)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryId, Difficulty, ProgressStatus, Step, UserProgress};

    fn owned(user: &str, resource: &str, status: ProgressStatus, fav: bool) -> OwnedProgress {
        OwnedProgress {
            user_id: UserId::new(user),
            progress: UserProgress {
                resource_id: ResourceId::new(resource),
                status,
                is_favorite: fav,
                updated_at: None,
            },
        }
    }

    fn path(id: &str, resources: &[&str]) -> LearningPath {
        let steps = resources
            .iter()
            .zip(1..)
            .map(|(r, order)| Step {
                order,
                resource_id: ResourceId::new(*r),
            })
            .collect();
        LearningPath::from_persisted(
            PathId::new(id),
            "Path",
            None,
            CategoryId::new(1),
            Difficulty::Beginner,
            steps,
        )
        .unwrap()
    }

    #[test]
    fn favorites_are_counted_per_resource_and_in_total() {
        let records = vec![
            owned("a", "r1", ProgressStatus::NotStarted, true),
            owned("b", "r1", ProgressStatus::Completed, true),
            owned("b", "r2", ProgressStatus::Completed, true),
            owned("c", "r2", ProgressStatus::Completed, false),
        ];
        let counts = favorite_counts(&records);
        assert_eq!(counts.for_resource(&ResourceId::new("r1")), 2);
        assert_eq!(counts.for_resource(&ResourceId::new("r2")), 1);
        assert_eq!(counts.for_resource(&ResourceId::new("r3")), 0);
        assert_eq!(counts.total, 3);
    }

    #[test]
    fn completion_counts_users_with_superset() {
        let records = vec![
            owned("a", "r1", ProgressStatus::Completed, false),
            owned("a", "r2", ProgressStatus::Completed, false),
            owned("b", "r1", ProgressStatus::Completed, false),
            owned("b", "r2", ProgressStatus::Completed, false),
            owned("b", "r3", ProgressStatus::Completed, false),
            owned("c", "r1", ProgressStatus::Completed, false),
            owned("c", "r2", ProgressStatus::InProgress, false),
        ];
        let counts = path_completion_counts(&records, &[path("p", &["r1", "r2"])]);
        assert_eq!(counts[&PathId::new("p")], 2);
    }

    #[test]
    fn empty_path_has_no_completions() {
        let records = vec![owned("a", "r1", ProgressStatus::Completed, false)];
        let counts = path_completion_counts(&records, &[path("empty", &[])]);
        assert_eq!(counts[&PathId::new("empty")], 0);
    }

    #[test]
    fn duplicate_steps_require_resource_once() {
        let records = vec![
            owned("a", "r1", ProgressStatus::Completed, false),
            owned("a", "r2", ProgressStatus::Completed, false),
        ];
        let counts = path_completion_counts(&records, &[path("p", &["r1", "r2", "r1"])]);
        assert_eq!(counts[&PathId::new("p")], 1);
    }

    #[test]
    fn no_progress_means_zero_everywhere() {
        let counts = path_completion_counts(&[], &[path("p", &["r1"])]);
        assert_eq!(counts[&PathId::new("p")], 0);
        assert_eq!(favorite_counts(&[]), FavoriteCounts::default());
    }
}
