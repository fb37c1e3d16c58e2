use std::sync::{Arc, RwLock};

use serde_json::{Value, json};
use tokio::sync::Mutex;

use itetude_core::model::{
    ProgressFields, ProgressPatch, ProgressSnapshot, ProgressStatus, ResourceId, UserId,
    UserProgress, merge_progress, resolve_progress,
};
use storage::mapping::{PROGRESS, USERS, decode_progress_list, encode_progress};
use storage::repository::{DocumentStore, StorageError, WriteBatch};
use storage::{CollectionPath, CollectionQuery, DocPath, Document, Subscription};

use crate::Clock;
use crate::auth::AuthProvider;
use crate::permission::{Operation, PermissionErrorEmitter};

/// Progress collection of one user.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` if the user id cannot be a path
/// segment.
pub fn progress_collection(user: &UserId) -> Result<CollectionPath, StorageError> {
    CollectionPath::parse(USERS)?
        .doc(user.as_str())?
        .collection(PROGRESS)
}

#[derive(Default)]
struct OwnedSnapshot {
    owner: Option<UserId>,
    progress: ProgressSnapshot,
}

#[derive(Default)]
struct LiveState {
    user: Option<UserId>,
    subscription: Option<Subscription<CollectionQuery>>,
}

/// The signed-in user's progress: a live snapshot plus the mutations on it.
///
/// Mutations never fail on the caller's side. With nobody signed in they do
/// nothing; when the store rejects a write the failure goes to the
/// [`PermissionErrorEmitter`] and the snapshot is left as it was.
pub struct ProgressTracker {
    clock: Clock,
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    errors: PermissionErrorEmitter,
    live: Mutex<LiveState>,
    snapshot: RwLock<OwnedSnapshot>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        errors: PermissionErrorEmitter,
    ) -> Self {
        Self {
            clock,
            store,
            auth,
            errors,
            live: Mutex::new(LiveState::default()),
            snapshot: RwLock::new(OwnedSnapshot::default()),
        }
    }

    /// Latest known progress of the signed-in user.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
            .read()
            .map(|s| s.progress.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_favorite(&self, resource_id: &ResourceId) -> bool {
        self.snapshot
            .read()
            .is_ok_and(|s| s.progress.is_favorite(resource_id))
    }

    #[must_use]
    pub fn is_completed(&self, resource_id: &ResourceId) -> bool {
        self.snapshot
            .read()
            .is_ok_and(|s| s.progress.is_completed(resource_id))
    }

    /// Follow sign-in changes and apply any store changes already queued.
    pub async fn sync(&self) -> ProgressSnapshot {
        let mut live = self.live.lock().await;
        self.follow_auth(&mut live);
        let state = &mut *live;
        if let (Some(user), Some(subscription)) = (&state.user, state.subscription.as_mut()) {
            if let Some(result) = subscription.poll_pending().await {
                self.apply(user, subscription.query(), result);
            }
        }
        self.snapshot()
    }

    /// Wait until the signed-in user's progress changes in the store.
    ///
    /// The first call after sign-in returns the initial snapshot, unless
    /// [`sync`](Self::sync) loaded it already. Returns `None` when nobody is
    /// signed in or the store went away. A wait interrupted by sign-out or a
    /// user switch returns the current snapshot.
    pub async fn next_change(&self) -> Option<ProgressSnapshot> {
        let (user, mut subscription) = {
            let mut live = self.live.lock().await;
            self.follow_auth(&mut live);
            (live.user.clone()?, live.subscription.take()?)
        };

        let result = subscription.next().await;

        let mut live = self.live.lock().await;
        if live.user.as_ref() != Some(&user) || live.subscription.is_some() {
            // Signed out or switched user while waiting; the result is stale.
            return Some(self.snapshot());
        }
        if let Some(result) = result {
            self.apply(&user, subscription.query(), result);
            live.subscription = Some(subscription);
            Some(self.snapshot())
        } else {
            None
        }
    }

    /// Flip the favorite flag of one resource, keeping its status.
    pub async fn toggle_favorite(&self, resource_id: &ResourceId) {
        let Some(user) = self.active_user().await else {
            return;
        };
        let Some(existing) = self.existing(&user, resource_id) else {
            return;
        };
        let current = resolve_progress(existing.as_ref());
        let next = merge_progress(
            existing.as_ref(),
            ProgressPatch::favorite(!current.is_favorite),
        );
        self.write(&user, resource_id, next).await;
    }

    /// `terminé` becomes `en cours`; anything else becomes `terminé`.
    /// The favorite flag is kept.
    pub async fn toggle_resource_completed(&self, resource_id: &ResourceId) {
        let Some(user) = self.active_user().await else {
            return;
        };
        let Some(existing) = self.existing(&user, resource_id) else {
            return;
        };
        let current = resolve_progress(existing.as_ref());
        let next = merge_progress(
            existing.as_ref(),
            ProgressPatch::status(current.status.toggled_completion()),
        );
        self.write(&user, resource_id, next).await;
    }

    /// Set every listed resource back to `non commencé` in one atomic batch,
    /// keeping each favorite flag.
    pub async fn reset_path_progress(&self, resource_ids: &[ResourceId]) {
        if resource_ids.is_empty() {
            return;
        }
        let Some(user) = self.active_user().await else {
            return;
        };
        let collection = match progress_collection(&user) {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!(user = %user, error = %e, "cannot address progress collection");
                return;
            }
        };

        let now = self.clock.now();
        let mut batch = WriteBatch::new();
        let mut applied = Vec::with_capacity(resource_ids.len());
        for resource_id in resource_ids {
            let Some(existing) = self.existing(&user, resource_id) else {
                return;
            };
            let fields =
                merge_progress(existing.as_ref(), ProgressPatch::status(ProgressStatus::NotStarted));
            let encoded = collection
                .doc(resource_id.as_str())
                .and_then(|path| Ok((path, encode_progress(fields, now)?)));
            match encoded {
                Ok((path, record)) => {
                    batch.merge(path, record);
                    applied.push(progress_record(resource_id, fields, now));
                }
                Err(e) => {
                    tracing::warn!(resource = %resource_id, error = %e, "reset aborted");
                    return;
                }
            }
        }

        match self.store.commit(batch).await {
            Ok(()) => {
                tracing::debug!(user = %user, resources = applied.len(), "path progress reset");
                self.apply_local(&user, applied);
            }
            Err(e) => self.errors.report(
                &e,
                Operation::Write,
                collection.as_string(),
                Some(json!({
                    "resourceIds": resource_ids.iter().map(ResourceId::as_str).collect::<Vec<_>>(),
                    "status": ProgressStatus::NotStarted.label(),
                })),
            ),
        }
    }

    async fn active_user(&self) -> Option<UserId> {
        self.sync().await;
        self.live.lock().await.user.clone()
    }

    // `None` when the snapshot no longer belongs to `user` (or is poisoned);
    // `Some(None)` when the user has no record for the resource.
    fn existing(&self, user: &UserId, resource_id: &ResourceId) -> Option<Option<UserProgress>> {
        let snapshot = self.snapshot.read().ok()?;
        if snapshot.owner.as_ref() != Some(user) {
            tracing::debug!(user = %user, "signed-in user changed, mutation dropped");
            return None;
        }
        Some(snapshot.progress.get(resource_id).cloned())
    }

    async fn write(&self, user: &UserId, resource_id: &ResourceId, fields: ProgressFields) {
        let now = self.clock.now();
        let path = match progress_collection(user).and_then(|c| c.doc(resource_id.as_str())) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(resource = %resource_id, error = %e, "cannot address progress record");
                return;
            }
        };
        let record = match encode_progress(fields, now) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(resource = %resource_id, error = %e, "cannot encode progress record");
                return;
            }
        };
        let payload = Value::Object(record.clone());

        match self.store.merge(&path, record).await {
            Ok(()) => self.apply_local(user, vec![progress_record(resource_id, fields, now)]),
            Err(e) => self
                .errors
                .report(&e, Operation::Write, path.as_string(), Some(payload)),
        }
    }

    fn follow_auth(&self, live: &mut LiveState) {
        let current = self.auth.current_user();
        if current == live.user {
            return;
        }
        live.subscription = None;
        self.replace_snapshot(current.as_ref(), ProgressSnapshot::default());
        live.user.clone_from(&current);

        let Some(user) = current else {
            tracing::debug!("signed out, progress cleared");
            return;
        };
        match progress_collection(&user) {
            Ok(collection) => {
                live.subscription = Some(Subscription::new(
                    Arc::clone(&self.store),
                    CollectionQuery(collection),
                ));
                tracing::debug!(user = %user, "subscribed to progress");
            }
            Err(e) => tracing::warn!(user = %user, error = %e, "cannot subscribe to progress"),
        }
    }

    fn apply(
        &self,
        user: &UserId,
        query: &CollectionQuery,
        result: Result<Vec<Document>, StorageError>,
    ) {
        match result {
            Ok(docs) => self.replace_snapshot(
                Some(user),
                ProgressSnapshot::new(decode_progress_list(&docs)),
            ),
            Err(e) => self
                .errors
                .report(&e, Operation::List, query.0.as_string(), None),
        }
    }

    // Mirror a confirmed write before the store's change notice is consumed,
    // so back-to-back toggles read their own writes. A write that completes
    // after the user switched belongs to the previous owner and is dropped.
    fn apply_local(&self, owner: &UserId, records: Vec<UserProgress>) {
        if let Ok(mut snapshot) = self.snapshot.write() {
            if snapshot.owner.as_ref() != Some(owner) {
                tracing::debug!(user = %owner, "write finished after user switch, not mirrored");
                return;
            }
            for record in records {
                snapshot.progress.upsert(record);
            }
        }
    }

    fn replace_snapshot(&self, owner: Option<&UserId>, next: ProgressSnapshot) {
        if let Ok(mut snapshot) = self.snapshot.write() {
            snapshot.owner = owner.cloned();
            snapshot.progress = next;
        }
    }
}

fn progress_record(
    resource_id: &ResourceId,
    fields: ProgressFields,
    updated_at: chrono::DateTime<chrono::Utc>,
) -> UserProgress {
    UserProgress {
        resource_id: resource_id.clone(),
        status: fields.status,
        is_favorite: fields.is_favorite,
        updated_at: Some(updated_at),
    }
}

/// Path of one progress record, for callers addressing it directly.
///
/// # Errors
///
/// Returns `StorageError::InvalidPath` for ids that cannot be path segments.
pub fn progress_path(user: &UserId, resource_id: &ResourceId) -> Result<DocPath, StorageError> {
    progress_collection(user)?.doc(resource_id.as_str())
}
