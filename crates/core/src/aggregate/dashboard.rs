use std::collections::HashMap;

use crate::model::{LearningPath, ProgressSnapshot, Resource, ResourceId, UserProfile};

/// A learning path the user has touched, with completion figures.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedPath<'a> {
    pub path: &'a LearningPath,
    pub completed_steps: usize,
    pub total_steps: usize,
    /// Percentage in `0.0..=100.0`; `0.0` for a path without steps.
    pub progress: f64,
}

/// Resources the user marked as favorite, in progress-collection order.
///
/// Favorites pointing at deleted resources are skipped; their progress
/// records are left alone, so restoring the resource brings them back.
#[must_use]
pub fn favorite_resources<'a>(
    progress: &ProgressSnapshot,
    resources: &'a [Resource],
) -> Vec<&'a Resource> {
    let by_id: HashMap<&ResourceId, &Resource> = resources.iter().map(|r| (r.id(), r)).collect();
    progress
        .iter()
        .filter(|p| p.is_favorite)
        .filter_map(|p| by_id.get(&p.resource_id).copied())
        .collect()
}

/// Paths the user has started and not hidden.
///
/// A path counts as started once any of its steps has a progress record,
/// whatever that record holds (a favorite alone is enough). Without a
/// profile the view is empty.
#[must_use]
pub fn user_learning_paths<'a>(
    paths: &'a [LearningPath],
    progress: &ProgressSnapshot,
    profile: Option<&UserProfile>,
) -> Vec<StartedPath<'a>> {
    let Some(profile) = profile else {
        return Vec::new();
    };

    paths
        .iter()
        .filter(|path| !profile.hides(path.id()))
        .filter(|path| {
            path.steps()
                .iter()
                .any(|step| progress.contains(&step.resource_id))
        })
        .map(|path| {
            let total_steps = path.step_count();
            let completed_steps = path
                .steps()
                .iter()
                .filter(|step| progress.is_completed(&step.resource_id))
                .count();
            StartedPath {
                path,
                completed_steps,
                total_steps,
                progress: percentage(completed_steps, total_steps),
            }
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn percentage(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    done as f64 / total as f64 * 100.0
}

/// Matches of a dashboard search, resources and paths listed separately.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults<'a> {
    pub resources: Vec<&'a Resource>,
    pub paths: Vec<&'a LearningPath>,
}

impl SearchResults<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.paths.is_empty()
    }
}

/// Case-insensitive substring search over titles and descriptions.
///
/// An empty query returns `None`: the dashboard shows its regular sections
/// instead of a result list.
#[must_use]
pub fn search<'a>(
    query: &str,
    resources: &'a [Resource],
    paths: &'a [LearningPath],
) -> Option<SearchResults<'a>> {
    if query.is_empty() {
        return None;
    }
    let needle = query.to_lowercase();
    let matches = |title: &str, description: Option<&str>| {
        title.to_lowercase().contains(&needle)
            || description.is_some_and(|d| d.to_lowercase().contains(&needle))
    };

    Some(SearchResults {
        resources: resources
            .iter()
            .filter(|r| matches(r.title(), r.description()))
            .collect(),
        paths: paths
            .iter()
            .filter(|p| matches(p.title(), p.description()))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::{
        CategoryId, DataWeight, Difficulty, PathDraft, PathId, ProgressStatus, ResourceDraft,
        UserId, UserProgress,
    };

    fn resource(id: &str, title: &str, description: Option<&str>) -> Resource {
        Resource::from_persisted(
            ResourceId::new(id),
            ResourceDraft {
                title: title.into(),
                url: format!("https://example.org/{id}"),
                description: description.map(str::to_owned),
                language: "Français".into(),
                data_weight: DataWeight::Standard,
                difficulty: Difficulty::Beginner,
                category_id: CategoryId::new(1),
                author: None,
            },
        )
    }

    fn path(id: &str, title: &str, resources: &[&str]) -> LearningPath {
        let draft = PathDraft {
            title: title.into(),
            description: None,
            category_id: CategoryId::new(1),
            difficulty: Difficulty::Beginner,
            resource_ids: resources.iter().map(|r| ResourceId::new(*r)).collect(),
        };
        let steps = draft.steps();
        LearningPath::from_persisted(
            PathId::new(id),
            draft.title,
            None,
            draft.category_id,
            draft.difficulty,
            steps,
        )
        .unwrap()
    }

    fn record(id: &str, status: ProgressStatus, is_favorite: bool) -> UserProgress {
        UserProgress {
            resource_id: ResourceId::new(id),
            status,
            is_favorite,
            updated_at: None,
        }
    }

    fn profile(hidden: &[&str]) -> UserProfile {
        UserProfile {
            uid: UserId::new("u1"),
            email: None,
            display_name: "User".into(),
            photo_url: None,
            hidden_paths: hidden.iter().map(|p| PathId::new(*p)).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn favorites_follow_progress_order_and_skip_deleted() {
        let resources = vec![resource("r1", "One", None), resource("r2", "Two", None)];
        let progress = ProgressSnapshot::new(vec![
            record("r2", ProgressStatus::NotStarted, true),
            record("gone", ProgressStatus::NotStarted, true),
            record("r1", ProgressStatus::Completed, false),
        ]);
        let favs = favorite_resources(&progress, &resources);
        let ids: Vec<&str> = favs.iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["r2"]);
    }

    #[test]
    fn deleted_favorite_reappears_when_restored() {
        let progress = ProgressSnapshot::new(vec![record("r1", ProgressStatus::NotStarted, true)]);
        assert!(favorite_resources(&progress, &[]).is_empty());

        let restored = vec![resource("r1", "Back again", None)];
        assert_eq!(favorite_resources(&progress, &restored).len(), 1);
    }

    #[test]
    fn started_path_reports_partial_completion() {
        let paths = vec![path("p1", "Rust", &["r1", "r2", "r3"])];
        let progress = ProgressSnapshot::new(vec![
            record("r1", ProgressStatus::Completed, false),
            record("r2", ProgressStatus::InProgress, false),
        ]);
        let started = user_learning_paths(&paths, &progress, Some(&profile(&[])));
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].completed_steps, 1);
        assert_eq!(started[0].total_steps, 3);
        assert!((started[0].progress - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn favorite_alone_starts_a_path() {
        let paths = vec![path("p1", "Rust", &["r1", "r2"])];
        let progress = ProgressSnapshot::new(vec![record("r2", ProgressStatus::NotStarted, true)]);
        let started = user_learning_paths(&paths, &progress, Some(&profile(&[])));
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].completed_steps, 0);
        assert!(started[0].progress.abs() < f64::EPSILON);
    }

    #[test]
    fn hidden_and_untouched_paths_are_excluded() {
        let paths = vec![
            path("p1", "Hidden", &["r1"]),
            path("p2", "Untouched", &["r9"]),
            path("p3", "Visible", &["r1"]),
        ];
        let progress = ProgressSnapshot::new(vec![record("r1", ProgressStatus::Completed, false)]);
        let started = user_learning_paths(&paths, &progress, Some(&profile(&["p1"])));
        let ids: Vec<&str> = started.iter().map(|s| s.path.id().as_str()).collect();
        assert_eq!(ids, vec!["p3"]);
        assert!((started[0].progress - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_profile_yields_no_paths() {
        let paths = vec![path("p1", "Rust", &["r1"])];
        let progress = ProgressSnapshot::new(vec![record("r1", ProgressStatus::Completed, false)]);
        assert!(user_learning_paths(&paths, &progress, None).is_empty());
    }

    #[test]
    fn empty_query_is_not_a_search() {
        let resources = vec![resource("r1", "Rust", None)];
        assert!(search("", &resources, &[]).is_none());
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let resources = vec![
            resource("r1", "Intro to RUST", None),
            resource("r2", "Networking", Some("Learn rust-based tooling")),
            resource("r3", "Python", None),
        ];
        let paths = vec![path("p1", "Rustacean path", &["r1"]), path("p2", "Cloud", &[])];
        let results = search("rust", &resources, &paths).unwrap();
        let ids: Vec<&str> = results.resources.iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
        assert_eq!(results.paths.len(), 1);

        let none = search("haskell", &resources, &paths).unwrap();
        assert!(none.is_empty());
    }
}
