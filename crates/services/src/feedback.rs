use std::sync::Arc;

use itetude_core::model::{
    Feedback, FeedbackDraft, FeedbackId, FeedbackStatus, FeedbackType, NewFeedback, Submitter,
};
use storage::mapping::{
    FEEDBACK, RESOURCES, decode_feedback_list, decode_resource, encode_feedback_status,
    encode_new_feedback,
};
use storage::repository::DocumentStore;
use storage::CollectionPath;

use crate::Clock;
use crate::access::AdminGate;
use crate::error::FeedbackServiceError;

/// Feedback form submissions and their review by administrators.
#[derive(Clone)]
pub struct FeedbackService {
    clock: Clock,
    store: Arc<dyn DocumentStore>,
    admin: AdminGate,
}

impl FeedbackService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn DocumentStore>, admin: AdminGate) -> Self {
        Self { clock, store, admin }
    }

    /// Validate and store a report with status `Nouveau`.
    ///
    /// For resource problems the resource's current title is copied into
    /// the report.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackServiceError::Feedback` for a too-short message and
    /// `FeedbackServiceError::Storage` if a read or the write fails.
    pub async fn submit(
        &self,
        draft: FeedbackDraft,
        submitter: Submitter,
    ) -> Result<FeedbackId, FeedbackServiceError> {
        let resource_title = match draft.resource_id.as_ref() {
            Some(id) if draft.kind == FeedbackType::ResourceProblem => {
                let path = CollectionPath::parse(RESOURCES)?.doc(id.as_str())?;
                self.store
                    .get(&path)
                    .await?
                    .as_ref()
                    .and_then(decode_resource)
                    .map(|r| r.title().to_owned())
            }
            _ => None,
        };

        let feedback = NewFeedback::from_draft(
            draft,
            submitter,
            |_| resource_title,
            self.clock.now(),
        )?;
        let created = self
            .store
            .add(&CollectionPath::parse(FEEDBACK)?, encode_new_feedback(&feedback)?)
            .await?;
        tracing::info!(feedback = %created.id(), kind = ?feedback.kind, "feedback submitted");
        Ok(FeedbackId::new(created.id()))
    }

    /// All reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackServiceError::Access` unless an administrator is
    /// signed in, and `FeedbackServiceError::Storage` if the listing fails.
    pub async fn list(&self) -> Result<Vec<Feedback>, FeedbackServiceError> {
        self.admin.require().await?;
        let docs = self.store.list(&CollectionPath::parse(FEEDBACK)?).await?;
        let mut reports = decode_feedback_list(&docs);
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    /// # Errors
    ///
    /// Returns `FeedbackServiceError::Access` unless an administrator is
    /// signed in, and `FeedbackServiceError::Storage` if the report is
    /// missing or the write fails.
    pub async fn set_status(
        &self,
        id: &FeedbackId,
        status: FeedbackStatus,
    ) -> Result<(), FeedbackServiceError> {
        self.admin.require().await?;
        let path = CollectionPath::parse(FEEDBACK)?.doc(id.as_str())?;
        self.store
            .update(&path, encode_feedback_status(status)?)
            .await?;
        tracing::info!(feedback = %id, ?status, "feedback status changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use itetude_core::model::{
        CategoryId, DataWeight, Difficulty, FeedbackError, ResourceDraft,
        ResourceId, UserId,
    };
    use itetude_core::time::fixed_now;
    use storage::mapping::encode_resource;
    use storage::repository::InMemoryStore;
    use storage::{DocPath, StorageError};

    use crate::auth::SessionAuth;
    use crate::error::AccessError;

    fn submitter() -> Submitter {
        Submitter {
            user_id: UserId::new("u1"),
            email: Some("u1@example.org".into()),
            name: Some("Ada".into()),
        }
    }

    // `u1` both submits and reviews.
    async fn admin_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .merge(&DocPath::parse("admins/u1").unwrap(), Default::default())
            .await
            .unwrap();
        store
    }

    fn service(clock: Clock, store: &InMemoryStore) -> FeedbackService {
        let store: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let admin = AdminGate::new(
            Arc::clone(&store),
            Arc::new(SessionAuth::signed_in(UserId::new("u1"))),
        );
        FeedbackService::new(clock, store, admin)
    }

    async fn store_with_resource() -> InMemoryStore {
        let store = admin_store().await;
        let draft = ResourceDraft {
            title: "Cours Docker".into(),
            url: "https://docs.docker.com/".into(),
            description: None,
            language: "Anglais".into(),
            data_weight: DataWeight::Standard,
            difficulty: Difficulty::Beginner,
            category_id: CategoryId::new(6),
            author: None,
        };
        store
            .merge(
                &DocPath::parse("resources/docker").unwrap(),
                encode_resource(&draft, None).unwrap(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn resource_problem_snapshots_title() {
        let store = store_with_resource().await;
        let service = service(Clock::fixed(fixed_now()), &store);
        service
            .submit(
                FeedbackDraft {
                    kind: FeedbackType::ResourceProblem,
                    message: "Le lien renvoie une erreur 404".into(),
                    resource_id: Some(ResourceId::new("docker")),
                },
                submitter(),
            )
            .await
            .unwrap();

        let reports = service.list().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, FeedbackStatus::New);
        assert_eq!(reports[0].resource_title.as_deref(), Some("Cours Docker"));
    }

    #[tokio::test]
    async fn other_types_drop_resource_reference() {
        let store = store_with_resource().await;
        let service = service(Clock::fixed(fixed_now()), &store);
        service
            .submit(
                FeedbackDraft {
                    kind: FeedbackType::Suggestion,
                    message: "Ajoutez des parcours sur Kubernetes".into(),
                    resource_id: Some(ResourceId::new("docker")),
                },
                submitter(),
            )
            .await
            .unwrap();

        let reports = service.list().await.unwrap();
        assert!(reports[0].resource_id.is_none());
        assert!(reports[0].resource_title.is_none());
    }

    #[tokio::test]
    async fn suggestion_skips_resource_lookup() {
        let store = store_with_resource().await;
        store.deny_reads("resources");
        let service = service(Clock::fixed(fixed_now()), &store);
        service
            .submit(
                FeedbackDraft {
                    kind: FeedbackType::Suggestion,
                    message: "Un mode hors ligne serait utile".into(),
                    resource_id: Some(ResourceId::new("docker")),
                },
                submitter(),
            )
            .await
            .unwrap();

        assert!(matches!(
            service
                .submit(
                    FeedbackDraft {
                        kind: FeedbackType::ResourceProblem,
                        message: "Le lien renvoie une erreur 404".into(),
                        resource_id: Some(ResourceId::new("docker")),
                    },
                    submitter(),
                )
                .await,
            Err(FeedbackServiceError::Storage(StorageError::PermissionDenied { .. }))
        ));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn short_messages_are_rejected() {
        let service = service(Clock::fixed(fixed_now()), &admin_store().await);
        let err = service
            .submit(
                FeedbackDraft {
                    kind: FeedbackType::Other,
                    message: "trop court".chars().take(5).collect(),
                    resource_id: None,
                },
                submitter(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeedbackServiceError::Feedback(FeedbackError::MessageTooShort)
        ));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_status_updates() {
        let store = admin_store().await;
        let mut clock = Clock::fixed(fixed_now());
        let draft = |message: &str| FeedbackDraft {
            kind: FeedbackType::TechnicalIssue,
            message: message.into(),
            resource_id: None,
        };

        let older = service(clock, &store)
            .submit(draft("La page profil ne charge pas"), submitter())
            .await
            .unwrap();
        clock.advance(Duration::hours(1));
        let service = service(clock, &store);
        service
            .submit(draft("Le tableau de bord est lent"), submitter())
            .await
            .unwrap();

        let reports = service.list().await.unwrap();
        assert_eq!(reports[0].message, "Le tableau de bord est lent");
        assert_eq!(reports[1].id, older);

        service.set_status(&older, FeedbackStatus::Resolved).await.unwrap();
        let reports = service.list().await.unwrap();
        assert_eq!(reports[1].status, FeedbackStatus::Resolved);

        assert!(matches!(
            service
                .set_status(&FeedbackId::new("missing"), FeedbackStatus::InProgress)
                .await,
            Err(FeedbackServiceError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn non_admins_cannot_review() {
        let store = InMemoryStore::new();
        let service = service(Clock::fixed(fixed_now()), &store);
        let id = service
            .submit(
                FeedbackDraft {
                    kind: FeedbackType::Other,
                    message: "Merci pour ces ressources".into(),
                    resource_id: None,
                },
                submitter(),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.list().await,
            Err(FeedbackServiceError::Access(AccessError::NotAdmin(_)))
        ));
        assert!(matches!(
            service.set_status(&id, FeedbackStatus::Resolved).await,
            Err(FeedbackServiceError::Access(AccessError::NotAdmin(_)))
        ));
        let stored = store
            .get(&DocPath::parse(&format!("feedback/{}", id.as_str())).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.fields["status"], "Nouveau");
    }
}
