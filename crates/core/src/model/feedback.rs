use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{FeedbackId, ResourceId, UserId};

/// Minimum message length accepted by the feedback form.
pub const MIN_MESSAGE_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackType {
    #[serde(rename = "Problème Technique")]
    TechnicalIssue,
    #[serde(rename = "Suggestion")]
    Suggestion,
    #[serde(rename = "Problème de ressource")]
    ResourceProblem,
    #[serde(rename = "Autre")]
    Other,
}

impl FeedbackType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FeedbackType::TechnicalIssue => "Problème Technique",
            FeedbackType::Suggestion => "Suggestion",
            FeedbackType::ResourceProblem => "Problème de ressource",
            FeedbackType::Other => "Autre",
        }
    }
}

/// Review state of a report. Only administrators move it forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackStatus {
    #[default]
    #[serde(rename = "Nouveau")]
    New,
    #[serde(rename = "En cours")]
    InProgress,
    #[serde(rename = "Résolu")]
    Resolved,
}

impl FeedbackStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FeedbackStatus::New => "Nouveau",
            FeedbackStatus::InProgress => "En cours",
            FeedbackStatus::Resolved => "Résolu",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FeedbackError {
    #[error("feedback message must be at least {MIN_MESSAGE_CHARS} characters")]
    MessageTooShort,
}

/// Who sent a report, copied onto the document at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Form input for a new report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackDraft {
    pub kind: FeedbackType,
    pub message: String,
    pub resource_id: Option<ResourceId>,
}

/// A report ready to be written, before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub kind: FeedbackType,
    pub message: String,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
    pub submitter: Submitter,
    pub resource_id: Option<ResourceId>,
    pub resource_title: Option<String>,
}

impl NewFeedback {
    /// Validate a draft and attach submission metadata.
    ///
    /// A resource reference is kept only for `ResourceProblem` reports; its
    /// title is captured now and never refreshed afterwards.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackError::MessageTooShort` for messages under
    /// [`MIN_MESSAGE_CHARS`] characters.
    pub fn from_draft(
        draft: FeedbackDraft,
        submitter: Submitter,
        resource_title: impl FnOnce(&ResourceId) -> Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, FeedbackError> {
        let message = draft.message.trim().to_owned();
        if message.chars().count() < MIN_MESSAGE_CHARS {
            return Err(FeedbackError::MessageTooShort);
        }

        let resource_id = draft
            .resource_id
            .filter(|_| draft.kind == FeedbackType::ResourceProblem);
        let resource_title = resource_id.as_ref().and_then(resource_title);

        Ok(Self {
            kind: draft.kind,
            message,
            status: FeedbackStatus::New,
            created_at,
            submitter,
            resource_id,
            resource_title,
        })
    }
}

/// A stored report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub id: FeedbackId,
    pub kind: FeedbackType,
    pub message: String,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
    pub submitter: Submitter,
    pub resource_id: Option<ResourceId>,
    pub resource_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn submitter() -> Submitter {
        Submitter {
            user_id: UserId::new("u1"),
            email: Some("u1@example.org".into()),
            name: Some("User One".into()),
        }
    }

    #[test]
    fn short_messages_are_rejected() {
        let draft = FeedbackDraft {
            kind: FeedbackType::Suggestion,
            message: "  too short ".into(),
            resource_id: None,
        };
        let err = NewFeedback::from_draft(draft, submitter(), |_| None, fixed_now()).unwrap_err();
        assert_eq!(err, FeedbackError::MessageTooShort);
    }

    #[test]
    fn resource_problem_snapshots_title() {
        let draft = FeedbackDraft {
            kind: FeedbackType::ResourceProblem,
            message: "The link returns a 404 page".into(),
            resource_id: Some(ResourceId::new("r1")),
        };
        let feedback = NewFeedback::from_draft(
            draft,
            submitter(),
            |id| (id.as_str() == "r1").then(|| "Rust Book".to_owned()),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(feedback.status, FeedbackStatus::New);
        assert_eq!(feedback.resource_id, Some(ResourceId::new("r1")));
        assert_eq!(feedback.resource_title.as_deref(), Some("Rust Book"));
    }

    #[test]
    fn other_types_drop_resource_reference() {
        let draft = FeedbackDraft {
            kind: FeedbackType::Suggestion,
            message: "Please add more Go content".into(),
            resource_id: Some(ResourceId::new("r1")),
        };
        let feedback =
            NewFeedback::from_draft(draft, submitter(), |_| Some("x".into()), fixed_now()).unwrap();
        assert_eq!(feedback.resource_id, None);
        assert_eq!(feedback.resource_title, None);
    }

    #[test]
    fn unresolved_resource_keeps_id_without_title() {
        let draft = FeedbackDraft {
            kind: FeedbackType::ResourceProblem,
            message: "This resource is gone now".into(),
            resource_id: Some(ResourceId::new("deleted")),
        };
        let feedback = NewFeedback::from_draft(draft, submitter(), |_| None, fixed_now()).unwrap();
        assert_eq!(feedback.resource_id, Some(ResourceId::new("deleted")));
        assert_eq!(feedback.resource_title, None);
    }
}
