use std::sync::Arc;

use storage::repository::{DocumentStore, Storage, StorageError};

use crate::Clock;
use crate::access::AdminGate;
use crate::admin::AdminStatsFeed;
use crate::auth::AuthProvider;
use crate::catalog::CatalogService;
use crate::dashboard::DashboardFeed;
use crate::error::{AccessError, AppServicesError};
use crate::feedback::FeedbackService;
use crate::permission::PermissionErrorEmitter;
use crate::profile::ProfileService;
use crate::progress::ProgressTracker;

/// Assembles app-facing services over one document store.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    errors: PermissionErrorEmitter,
    admin: AdminGate,
    catalog: Arc<CatalogService>,
    feedback: Arc<FeedbackService>,
    profiles: Arc<ProfileService>,
    progress: Arc<ProgressTracker>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or
    /// migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, auth))
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock, auth: Arc<dyn AuthProvider>) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, auth)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, auth: Arc<dyn AuthProvider>) -> Self {
        let store = Arc::clone(&storage.documents);
        let errors = PermissionErrorEmitter::new();
        let admin = AdminGate::new(Arc::clone(&store), Arc::clone(&auth));

        let catalog = Arc::new(CatalogService::new(clock, Arc::clone(&store), admin.clone()));
        let feedback = Arc::new(FeedbackService::new(clock, Arc::clone(&store), admin.clone()));
        let profiles = Arc::new(ProfileService::new(Arc::clone(&store)));
        let progress = Arc::new(ProgressTracker::new(
            clock,
            Arc::clone(&store),
            Arc::clone(&auth),
            errors.clone(),
        ));

        Self {
            store,
            auth,
            errors,
            admin,
            catalog,
            feedback,
            profiles,
            progress,
        }
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn auth(&self) -> Arc<dyn AuthProvider> {
        Arc::clone(&self.auth)
    }

    /// Channel on which rejected reads and writes are published.
    #[must_use]
    pub fn permission_errors(&self) -> PermissionErrorEmitter {
        self.errors.clone()
    }

    #[must_use]
    pub fn admin(&self) -> AdminGate {
        self.admin.clone()
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn feedback(&self) -> Arc<FeedbackService> {
        Arc::clone(&self.feedback)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }

    /// Subscribe a new dashboard over the shared progress tracker.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if a collection name is invalid.
    pub fn dashboard_feed(&self) -> Result<DashboardFeed, StorageError> {
        DashboardFeed::new(
            Arc::clone(&self.store),
            Arc::clone(&self.auth),
            self.errors.clone(),
            Arc::clone(&self.progress),
        )
    }

    /// Cross-user statistics, for administrators only.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::SignedOut` or `AccessError::NotAdmin` when the
    /// signed-in user may not see them.
    pub async fn admin_feed(&self) -> Result<AdminStatsFeed, AccessError> {
        self.admin.require().await?;
        Ok(AdminStatsFeed::new(Arc::clone(&self.store), self.errors.clone())?)
    }
}
