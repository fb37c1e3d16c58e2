use std::sync::Arc;

use itetude_core::aggregate::{
    SearchResults, StartedPath, favorite_resources, search, user_learning_paths,
};
use itetude_core::model::{LearningPath, ProgressSnapshot, Resource, UserId, UserProfile};
use storage::mapping::{LEARNING_PATHS, RESOURCES, decode_paths, decode_profile, decode_resources};
use storage::repository::{DocumentStore, StorageError};
use storage::{CollectionPath, CollectionQuery, DocumentQuery};

use crate::auth::AuthProvider;
use crate::live_view::{LiveCollection, LiveDocument};
use crate::permission::PermissionErrorEmitter;
use crate::profile::profile_path;
use crate::progress::ProgressTracker;

/// Everything the dashboard derives its sections from, as of one refresh.
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub resources: Vec<Resource>,
    pub paths: Vec<LearningPath>,
    pub progress: ProgressSnapshot,
    pub profile: Option<UserProfile>,
    /// A source has not delivered its first snapshot yet.
    pub loading: bool,
}

/// Sections of the dashboard page.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView<'a> {
    pub favorites: Vec<&'a Resource>,
    pub paths: Vec<StartedPath<'a>>,
    /// `Some` only while a non-empty query is typed.
    pub search: Option<SearchResults<'a>>,
}

impl DashboardInputs {
    /// Derive the dashboard for the current search query.
    #[must_use]
    pub fn view(&self, query: &str) -> DashboardView<'_> {
        DashboardView {
            favorites: favorite_resources(&self.progress, &self.resources),
            paths: user_learning_paths(&self.paths, &self.progress, self.profile.as_ref()),
            search: search(query, &self.resources, &self.paths),
        }
    }
}

/// Keeps the dashboard's sources subscribed and hands out fresh inputs.
pub struct DashboardFeed {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    errors: PermissionErrorEmitter,
    progress: Arc<ProgressTracker>,
    resources: LiveCollection<CollectionQuery, Resource>,
    paths: LiveCollection<CollectionQuery, LearningPath>,
    profile: Option<(UserId, LiveDocument<UserProfile>)>,
}

impl DashboardFeed {
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if a catalog collection name is
    /// not a valid path.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        errors: PermissionErrorEmitter,
        progress: Arc<ProgressTracker>,
    ) -> Result<Self, StorageError> {
        let resources = LiveCollection::new(
            Arc::clone(&store),
            CollectionQuery(CollectionPath::parse(RESOURCES)?),
            decode_resources,
            errors.clone(),
        );
        let paths = LiveCollection::new(
            Arc::clone(&store),
            CollectionQuery(CollectionPath::parse(LEARNING_PATHS)?),
            decode_paths,
            errors.clone(),
        );
        Ok(Self {
            store,
            auth,
            errors,
            progress,
            resources,
            paths,
            profile: None,
        })
    }

    /// Apply every queued change and return the current inputs.
    pub async fn refresh(&mut self) -> DashboardInputs {
        self.resources.refresh().await;
        self.paths.refresh().await;
        let progress = self.progress.sync().await;
        self.follow_profile();
        let mut profile_loaded = true;
        if let Some((_, profile)) = self.profile.as_mut() {
            profile.refresh().await;
            profile_loaded = profile.is_loaded();
        }

        DashboardInputs {
            resources: self.resources.items().to_vec(),
            paths: self.paths.items().to_vec(),
            progress,
            profile: self
                .profile
                .as_ref()
                .and_then(|(_, p)| p.value().cloned()),
            loading: !(self.resources.is_loaded() && self.paths.is_loaded() && profile_loaded),
        }
    }

    fn follow_profile(&mut self) {
        let current = self.auth.current_user();
        if self.profile.as_ref().map(|(uid, _)| uid) == current.as_ref() {
            return;
        }
        self.profile = current.and_then(|uid| {
            let path = profile_path(&uid)
                .map_err(|e| tracing::warn!(user = %uid, error = %e, "cannot address profile"))
                .ok()?;
            Some((
                uid,
                LiveDocument::new(
                    Arc::clone(&self.store),
                    DocumentQuery(path),
                    decode_profile,
                    self.errors.clone(),
                ),
            ))
        });
    }
}
