use std::collections::HashMap;

use crate::model::{LearningPath, ProgressSnapshot, Resource, ResourceId};

#[derive(Debug, Clone, PartialEq)]
pub struct PathDetailStep<'a> {
    pub order: u32,
    pub resource: &'a Resource,
    pub completed: bool,
}

/// One path as shown on its own page: resolved steps in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDetail<'a> {
    pub path: &'a LearningPath,
    pub steps: Vec<PathDetailStep<'a>>,
    pub completed_steps: usize,
    pub total_steps: usize,
    /// Rounded percentage over the resolved steps.
    pub progress_percent: u8,
}

impl PathDetail<'_> {
    /// Every resolved step is done (and there is at least one).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_steps > 0 && self.completed_steps == self.total_steps
    }

    /// Resources a "reset progress" action on this page applies to.
    #[must_use]
    pub fn reset_targets(&self) -> Vec<ResourceId> {
        self.steps
            .iter()
            .map(|step| step.resource.id().clone())
            .collect()
    }
}

/// Resolve a path's steps against the catalog and the user's progress.
///
/// Steps whose resource no longer exists are dropped and do not count
/// towards the total.
#[must_use]
pub fn path_detail<'a>(
    path: &'a LearningPath,
    resources: &'a [Resource],
    progress: &ProgressSnapshot,
) -> PathDetail<'a> {
    let by_id: HashMap<&ResourceId, &Resource> = resources.iter().map(|r| (r.id(), r)).collect();
    let steps: Vec<PathDetailStep<'a>> = path
        .ordered_steps()
        .into_iter()
        .filter_map(|step| {
            by_id.get(&step.resource_id).map(|resource| PathDetailStep {
                order: step.order,
                resource,
                completed: progress.is_completed(&step.resource_id),
            })
        })
        .collect();

    let total_steps = steps.len();
    let completed_steps = steps.iter().filter(|s| s.completed).count();

    PathDetail {
        path,
        steps,
        completed_steps,
        total_steps,
        progress_percent: rounded_percent(completed_steps, total_steps),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn rounded_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (done as f64 / total as f64 * 100.0).round() as u8
}
