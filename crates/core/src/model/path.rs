use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CategoryId, PathId, ResourceId};
use crate::model::resource::{MIN_TITLE_CHARS, normalize_optional};
use crate::model::tiers::Difficulty;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
    #[error("learning path title must be at least {MIN_TITLE_CHARS} characters")]
    TitleTooShort,

    #[error("a learning path needs at least one resource")]
    NoSteps,

    #[error("step order must be a positive integer")]
    ZeroStepOrder,

    #[error("step order {0} appears more than once")]
    DuplicateStepOrder(u32),
}

/// One position in a learning path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub order: u32,
    pub resource_id: ResourceId,
}

/// Editable fields of a learning path, as submitted by the admin form.
///
/// Steps are given as an ordered list of resources; orders are assigned
/// `1..=n` following that list.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDraft {
    pub title: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub difficulty: Difficulty,
    pub resource_ids: Vec<ResourceId>,
}

impl PathDraft {
    /// Number the selected resources into steps.
    #[must_use]
    pub fn steps(&self) -> Vec<Step> {
        self.resource_ids
            .iter()
            .zip(1..)
            .map(|(resource_id, order)| Step {
                order,
                resource_id: resource_id.clone(),
            })
            .collect()
    }
}

/// An ordered curriculum of catalog resources.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningPath {
    id: PathId,
    title: String,
    description: Option<String>,
    category_id: CategoryId,
    difficulty: Difficulty,
    steps: Vec<Step>,
}

impl LearningPath {
    /// Creates a validated learning path from an admin draft.
    ///
    /// # Errors
    ///
    /// Returns `PathError::TitleTooShort` or `PathError::NoSteps`.
    pub fn new(id: PathId, draft: PathDraft) -> Result<Self, PathError> {
        if draft.title.trim().chars().count() < MIN_TITLE_CHARS {
            return Err(PathError::TitleTooShort);
        }
        if draft.resource_ids.is_empty() {
            return Err(PathError::NoSteps);
        }
        let steps = draft.steps();
        Self::from_persisted(
            id,
            draft.title,
            draft.description,
            draft.category_id,
            draft.difficulty,
            steps,
        )
    }

    /// Rebuilds a path read back from the store.
    ///
    /// Empty step lists are accepted here: they exist in stored data and the
    /// aggregation rules give them a defined meaning.
    ///
    /// # Errors
    ///
    /// Returns `PathError` when a step order is zero or repeated.
    pub fn from_persisted(
        id: PathId,
        title: impl Into<String>,
        description: Option<String>,
        category_id: CategoryId,
        difficulty: Difficulty,
        steps: Vec<Step>,
    ) -> Result<Self, PathError> {
        let mut seen = HashSet::with_capacity(steps.len());
        for step in &steps {
            if step.order == 0 {
                return Err(PathError::ZeroStepOrder);
            }
            if !seen.insert(step.order) {
                return Err(PathError::DuplicateStepOrder(step.order));
            }
        }

        Ok(Self {
            id,
            title: title.into().trim().to_owned(),
            description: normalize_optional(description),
            category_id,
            difficulty,
            steps,
        })
    }

    #[must_use]
    pub fn id(&self) -> &PathId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Steps in stored order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Steps sorted by their `order` value.
    #[must_use]
    pub fn ordered_steps(&self) -> Vec<&Step> {
        let mut steps: Vec<&Step> = self.steps.iter().collect();
        steps.sort_by_key(|step| step.order);
        steps
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Distinct resources a user must complete to finish the path.
    #[must_use]
    pub fn required_resources(&self) -> HashSet<&ResourceId> {
        self.steps.iter().map(|step| &step.resource_id).collect()
    }

    /// Editable fields of this path, with resources in step order.
    #[must_use]
    pub fn to_draft(&self) -> PathDraft {
        PathDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            category_id: self.category_id,
            difficulty: self.difficulty,
            resource_ids: self
                .ordered_steps()
                .into_iter()
                .map(|step| step.resource_id.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(resources: &[&str]) -> PathDraft {
        PathDraft {
            title: "Rust from scratch".into(),
            description: None,
            category_id: CategoryId::new(1),
            difficulty: Difficulty::Beginner,
            resource_ids: resources.iter().map(|r| ResourceId::new(*r)).collect(),
        }
    }

    #[test]
    fn new_numbers_steps_from_one() {
        let path = LearningPath::new(PathId::new("p1"), draft(&["a", "b", "c"])).unwrap();
        let orders: Vec<u32> = path.steps().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(path.steps()[2].resource_id, ResourceId::new("c"));
    }

    #[test]
    fn new_requires_a_resource() {
        assert_eq!(
            LearningPath::new(PathId::new("p1"), draft(&[])).unwrap_err(),
            PathError::NoSteps
        );
    }

    #[test]
    fn from_persisted_rejects_duplicate_orders() {
        let steps = vec![
            Step {
                order: 1,
                resource_id: ResourceId::new("a"),
            },
            Step {
                order: 1,
                resource_id: ResourceId::new("b"),
            },
        ];
        let err = LearningPath::from_persisted(
            PathId::new("p"),
            "Dup",
            None,
            CategoryId::new(1),
            Difficulty::Advanced,
            steps,
        )
        .unwrap_err();
        assert_eq!(err, PathError::DuplicateStepOrder(1));
    }

    #[test]
    fn ordered_steps_sorts_by_order() {
        let steps = vec![
            Step {
                order: 2,
                resource_id: ResourceId::new("b"),
            },
            Step {
                order: 1,
                resource_id: ResourceId::new("a"),
            },
        ];
        let path = LearningPath::from_persisted(
            PathId::new("p"),
            "Sorted",
            None,
            CategoryId::new(1),
            Difficulty::Beginner,
            steps,
        )
        .unwrap();
        let ids: Vec<&str> = path
            .ordered_steps()
            .iter()
            .map(|s| s.resource_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(path.to_draft().resource_ids[0], ResourceId::new("a"));
    }

    #[test]
    fn required_resources_collapses_duplicates() {
        let path = LearningPath::new(PathId::new("p1"), draft(&["a", "b", "a"])).unwrap();
        assert_eq!(path.step_count(), 3);
        assert_eq!(path.required_resources().len(), 2);
    }
}
