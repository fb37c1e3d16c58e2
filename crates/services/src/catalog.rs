use std::sync::Arc;

use itetude_core::aggregate::{CatalogFilter, PathDetail, path_detail, resources_in_category};
use itetude_core::model::{
    Certification, CertificationDraft, CertificationId, LearningPath, PathDraft, PathId,
    ProgressSnapshot, Resource, ResourceDraft, ResourceId, category_by_slug,
};
use storage::mapping::{
    CERTIFICATIONS, LEARNING_PATHS, RESOURCES, decode_certification, decode_certifications,
    decode_path, decode_paths, decode_resource, decode_resources, encode_certification,
    encode_path, encode_resource,
};
use storage::repository::{DocumentStore, StorageError};
use storage::{CollectionPath, DocPath};

use crate::Clock;
use crate::access::AdminGate;
use crate::error::CatalogServiceError;

/// A certification with its expiry evaluated against the clock.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificationListing {
    pub certification: Certification,
    pub expired: bool,
}

fn collection(name: &str) -> Result<CollectionPath, StorageError> {
    CollectionPath::parse(name)
}

fn doc(name: &str, id: &str) -> Result<DocPath, StorageError> {
    collection(name)?.doc(id)
}

/// Catalog reads for the public pages and CRUD for the admin page.
///
/// Reads are open to everyone; every write first checks `admin`.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    store: Arc<dyn DocumentStore>,
    admin: AdminGate,
}

impl CatalogService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn DocumentStore>, admin: AdminGate) -> Self {
        Self { clock, store, admin }
    }

    // -----------------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the listing fails.
    pub async fn list_resources(&self) -> Result<Vec<Resource>, CatalogServiceError> {
        let docs = self.store.list(&collection(RESOURCES)?).await?;
        Ok(decode_resources(&docs))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the read fails.
    pub async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>, CatalogServiceError> {
        let found = self.store.get(&doc(RESOURCES, id.as_str())?).await?;
        Ok(found.as_ref().and_then(decode_resource))
    }

    /// Resources of the category page with `slug`, filtered. An unknown slug
    /// yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the listing fails.
    pub async fn category_resources(
        &self,
        slug: &str,
        filter: &CatalogFilter,
    ) -> Result<Option<Vec<Resource>>, CatalogServiceError> {
        let Some(category) = category_by_slug(slug) else {
            return Ok(None);
        };
        let resources = self.list_resources().await?;
        Ok(Some(
            resources_in_category(&resources, category.category_id(), filter)
                .into_iter()
                .cloned()
                .collect(),
        ))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Resource` for invalid drafts and
    /// `CatalogServiceError::Storage` if the write fails.
    pub async fn create_resource(&self, draft: ResourceDraft) -> Result<ResourceId, CatalogServiceError> {
        self.admin.require().await?;
        let draft = draft.validate()?;
        let fields = encode_resource(&draft, Some(self.clock.now()))?;
        let path = self.store.add(&collection(RESOURCES)?, fields).await?;
        tracing::info!(resource = %path.id(), "resource created");
        Ok(ResourceId::new(path.id()))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Resource` for invalid drafts and
    /// `CatalogServiceError::Storage` if the resource is missing or the
    /// write fails.
    pub async fn update_resource(
        &self,
        id: &ResourceId,
        draft: ResourceDraft,
    ) -> Result<(), CatalogServiceError> {
        self.admin.require().await?;
        let draft = draft.validate()?;
        self.store
            .update(&doc(RESOURCES, id.as_str())?, encode_resource(&draft, None)?)
            .await?;
        Ok(())
    }

    /// Delete a resource. Progress records pointing at it are left alone.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Storage` if the delete fails.
    pub async fn delete_resource(&self, id: &ResourceId) -> Result<(), CatalogServiceError> {
        self.admin.require().await?;
        self.store.delete(&doc(RESOURCES, id.as_str())?).await?;
        tracing::info!(resource = %id, "resource deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Learning paths
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the listing fails.
    pub async fn list_paths(&self) -> Result<Vec<LearningPath>, CatalogServiceError> {
        let docs = self.store.list(&collection(LEARNING_PATHS)?).await?;
        Ok(decode_paths(&docs))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the read fails.
    pub async fn get_path(&self, id: &PathId) -> Result<Option<LearningPath>, CatalogServiceError> {
        let found = self.store.get(&doc(LEARNING_PATHS, id.as_str())?).await?;
        Ok(found.as_ref().and_then(decode_path))
    }

    /// A path page: steps resolved against the catalog and `progress`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if a read fails.
    pub async fn path_page(
        &self,
        id: &PathId,
        progress: &ProgressSnapshot,
    ) -> Result<Option<PathPage>, CatalogServiceError> {
        let Some(path) = self.get_path(id).await? else {
            return Ok(None);
        };
        let resources = self.list_resources().await?;
        Ok(Some(PathPage::build(path, resources, progress)))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Path` for invalid drafts and
    /// `CatalogServiceError::Storage` if the write fails.
    pub async fn create_path(&self, draft: PathDraft) -> Result<PathId, CatalogServiceError> {
        self.admin.require().await?;
        let path = LearningPath::new(PathId::new("draft"), draft)?;
        let fields = encode_path(&path.to_draft(), Some(self.clock.now()))?;
        let created = self.store.add(&collection(LEARNING_PATHS)?, fields).await?;
        tracing::info!(path = %created.id(), steps = path.step_count(), "learning path created");
        Ok(PathId::new(created.id()))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Path` for invalid drafts and
    /// `CatalogServiceError::Storage` if the path is missing or the write
    /// fails.
    pub async fn update_path(&self, id: &PathId, draft: PathDraft) -> Result<(), CatalogServiceError> {
        self.admin.require().await?;
        let path = LearningPath::new(id.clone(), draft)?;
        self.store
            .update(
                &doc(LEARNING_PATHS, id.as_str())?,
                encode_path(&path.to_draft(), None)?,
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Storage` if the delete fails.
    pub async fn delete_path(&self, id: &PathId) -> Result<(), CatalogServiceError> {
        self.admin.require().await?;
        self.store.delete(&doc(LEARNING_PATHS, id.as_str())?).await?;
        tracing::info!(path = %id, "learning path deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Certifications
    // -----------------------------------------------------------------------

    /// Certifications with their expired flag as of now.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the listing fails.
    pub async fn list_certifications(&self) -> Result<Vec<CertificationListing>, CatalogServiceError> {
        let docs = self.store.list(&collection(CERTIFICATIONS)?).await?;
        let now = self.clock.now();
        Ok(decode_certifications(&docs)
            .into_iter()
            .map(|certification| CertificationListing {
                expired: certification.is_expired(now),
                certification,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if the read fails.
    pub async fn get_certification(
        &self,
        id: &CertificationId,
    ) -> Result<Option<Certification>, CatalogServiceError> {
        let found = self.store.get(&doc(CERTIFICATIONS, id.as_str())?).await?;
        Ok(found.as_ref().and_then(decode_certification))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Certification` for invalid drafts and
    /// `CatalogServiceError::Storage` if the write fails.
    pub async fn create_certification(
        &self,
        draft: CertificationDraft,
    ) -> Result<CertificationId, CatalogServiceError> {
        self.admin.require().await?;
        let draft = draft.validate()?;
        let fields = encode_certification(&draft, Some(self.clock.now()))?;
        let created = self.store.add(&collection(CERTIFICATIONS)?, fields).await?;
        tracing::info!(certification = %created.id(), "certification created");
        Ok(CertificationId::new(created.id()))
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Certification` for invalid drafts and
    /// `CatalogServiceError::Storage` if the certification is missing or
    /// the write fails.
    pub async fn update_certification(
        &self,
        id: &CertificationId,
        draft: CertificationDraft,
    ) -> Result<(), CatalogServiceError> {
        self.admin.require().await?;
        let draft = draft.validate()?;
        self.store
            .update(
                &doc(CERTIFICATIONS, id.as_str())?,
                encode_certification(&draft, None)?,
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Access` unless an administrator is
    /// signed in.
    ///
    /// Returns `CatalogServiceError::Storage` if the delete fails.
    pub async fn delete_certification(&self, id: &CertificationId) -> Result<(), CatalogServiceError> {
        self.admin.require().await?;
        self.store.delete(&doc(CERTIFICATIONS, id.as_str())?).await?;
        Ok(())
    }
}

/// Owned inputs of a path page; [`PathPage::detail`] borrows from them.
#[derive(Debug, Clone)]
pub struct PathPage {
    path: LearningPath,
    resources: Vec<Resource>,
    progress: ProgressSnapshot,
}

impl PathPage {
    fn build(path: LearningPath, resources: Vec<Resource>, progress: &ProgressSnapshot) -> Self {
        Self {
            path,
            resources,
            progress: progress.clone(),
        }
    }

    #[must_use]
    pub fn detail(&self) -> PathDetail<'_> {
        path_detail(&self.path, &self.resources, &self.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use itetude_core::aggregate::Choice;
    use itetude_core::model::{
        CategoryId, CertificationStatus, DataWeight, Difficulty, PathError, ResourceError, UserId,
    };
    use itetude_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryStore;

    use crate::auth::SessionAuth;
    use crate::error::AccessError;

    fn service_as(store: &InMemoryStore, auth: SessionAuth) -> CatalogService {
        let store: Arc<dyn DocumentStore> = Arc::new(store.clone());
        let admin = AdminGate::new(Arc::clone(&store), Arc::new(auth));
        CatalogService::new(fixed_clock(), store, admin)
    }

    async fn service() -> CatalogService {
        let store = InMemoryStore::new();
        store
            .merge(&DocPath::parse("admins/editor").unwrap(), Default::default())
            .await
            .unwrap();
        service_as(&store, SessionAuth::signed_in(UserId::new("editor")))
    }

    fn draft(title: &str, category: u32, difficulty: Difficulty) -> ResourceDraft {
        ResourceDraft {
            title: title.into(),
            url: "https://example.org/page".into(),
            description: None,
            language: "Français".into(),
            data_weight: DataWeight::Plume,
            difficulty,
            category_id: CategoryId::new(category),
            author: None,
        }
    }

    #[tokio::test]
    async fn resource_crud_roundtrip() {
        let catalog = service().await;
        let id = catalog
            .create_resource(draft("Linux pour tous", 5, Difficulty::Beginner))
            .await
            .unwrap();
        catalog
            .update_resource(&id, draft("Linux pour débutants", 5, Difficulty::Beginner))
            .await
            .unwrap();
        let stored = catalog.get_resource(&id).await.unwrap().unwrap();
        assert_eq!(stored.title(), "Linux pour débutants");

        catalog.delete_resource(&id).await.unwrap();
        assert!(catalog.get_resource(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_admins_edit_the_catalog() {
        let store = InMemoryStore::new();
        store
            .merge(
                &DocPath::parse("resources/r1").unwrap(),
                encode_resource(&draft("Git au quotidien", 1, Difficulty::Beginner), None).unwrap(),
            )
            .await
            .unwrap();

        let learner = service_as(&store, SessionAuth::signed_in(UserId::new("learner")));
        assert!(matches!(
            learner
                .create_resource(draft("Docker en pratique", 6, Difficulty::Intermediate))
                .await,
            Err(CatalogServiceError::Access(AccessError::NotAdmin(_)))
        ));
        assert!(matches!(
            learner.delete_resource(&ResourceId::new("r1")).await,
            Err(CatalogServiceError::Access(AccessError::NotAdmin(_)))
        ));
        assert_eq!(learner.list_resources().await.unwrap().len(), 1);

        let visitor = service_as(&store, SessionAuth::new());
        assert!(matches!(
            visitor.delete_resource(&ResourceId::new("r1")).await,
            Err(CatalogServiceError::Access(AccessError::SignedOut))
        ));

        store
            .merge(&DocPath::parse("admins/learner").unwrap(), Default::default())
            .await
            .unwrap();
        learner.delete_resource(&ResourceId::new("r1")).await.unwrap();
        assert!(learner.list_resources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected_before_writing() {
        let catalog = service().await;
        let mut bad_url = draft("Valid title", 1, Difficulty::Beginner);
        bad_url.url = "ftp://example.org".into();
        assert!(matches!(
            catalog.create_resource(bad_url).await,
            Err(CatalogServiceError::Resource(ResourceError::InvalidUrl(_)))
        ));

        let empty_path = PathDraft {
            title: "Parcours vide".into(),
            description: None,
            category_id: CategoryId::new(1),
            difficulty: Difficulty::Beginner,
            resource_ids: Vec::new(),
        };
        assert!(matches!(
            catalog.create_path(empty_path).await,
            Err(CatalogServiceError::Path(PathError::NoSteps))
        ));
        assert!(catalog.list_resources().await.unwrap().is_empty());
        assert!(catalog.list_paths().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn created_path_numbers_steps_in_selection_order() {
        let catalog = service().await;
        let id = catalog
            .create_path(PathDraft {
                title: "Sécurité web".into(),
                description: None,
                category_id: CategoryId::new(2),
                difficulty: Difficulty::Intermediate,
                resource_ids: vec![ResourceId::new("b"), ResourceId::new("a")],
            })
            .await
            .unwrap();
        let path = catalog.get_path(&id).await.unwrap().unwrap();
        let steps: Vec<(u32, &str)> = path
            .steps()
            .iter()
            .map(|s| (s.order, s.resource_id.as_str()))
            .collect();
        assert_eq!(steps, vec![(1, "b"), (2, "a")]);
    }

    #[tokio::test]
    async fn category_page_resolves_slug_and_filters() {
        let catalog = service().await;
        catalog
            .create_resource(draft("Pare-feu avancé", 2, Difficulty::Advanced))
            .await
            .unwrap();
        catalog
            .create_resource(draft("Hygiène numérique", 2, Difficulty::Beginner))
            .await
            .unwrap();
        catalog
            .create_resource(draft("Flexbox en détail", 1, Difficulty::Advanced))
            .await
            .unwrap();

        let filter = CatalogFilter {
            difficulty: Choice::Only(Difficulty::Advanced),
            ..CatalogFilter::default()
        };
        let found = catalog
            .category_resources("cybersecurite", &filter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title(), "Pare-feu avancé");
        assert!(catalog
            .category_resources("inconnue", &filter)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn certifications_carry_expired_flag() {
        let catalog = service().await;
        let base = CertificationDraft {
            title: "Azure Fundamentals".into(),
            issuing_body: "Microsoft".into(),
            url: "https://learn.microsoft.com/".into(),
            logo_url: "https://learn.microsoft.com/logo.png".into(),
            description: None,
            category_id: CategoryId::new(6),
            difficulty: Difficulty::Beginner,
            issued_at: None,
            expires_at: Some(fixed_now() - Duration::days(1)),
            language: "Anglais".into(),
            status: CertificationStatus::Paid,
        };
        catalog.create_certification(base.clone()).await.unwrap();
        catalog
            .create_certification(CertificationDraft {
                title: "AWS Cloud Practitioner".into(),
                issuing_body: "AWS".into(),
                expires_at: None,
                ..base
            })
            .await
            .unwrap();

        let mut listed = catalog.list_certifications().await.unwrap();
        listed.sort_by(|a, b| a.certification.title().cmp(b.certification.title()));
        let flags: Vec<bool> = listed.iter().map(|l| l.expired).collect();
        assert_eq!(flags, vec![false, true]);
    }
}
