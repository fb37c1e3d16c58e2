use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::document::{CollectionPath, DocPath, Document, Fields, merge_fields, union_into};

/// Capacity of the change-notice channel; slow subscribers past this
/// simply reload.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Emitted after every committed write so live queries can refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub path: DocPath,
}

/// Merge-writes applied together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<(DocPath, Fields)>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a create-or-shallow-merge of `fields` at `path`.
    pub fn merge(&mut self, path: DocPath, fields: Fields) -> &mut Self {
        self.writes.push((path, fields));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn writes(&self) -> impl Iterator<Item = &(DocPath, Fields)> {
        self.writes.iter()
    }

    pub(crate) fn into_writes(self) -> Vec<(DocPath, Fields)> {
        self.writes
    }
}

/// Contract of the hierarchical document store.
///
/// Reads return absent documents as `None`. Every successful write
/// publishes one [`ChangeNotice`] per touched document on [`changes`].
///
/// [`changes`]: DocumentStore::changes
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PermissionDenied` or a backend error.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StorageError>;

    /// All documents of one collection, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PermissionDenied` or a backend error.
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StorageError>;

    /// Documents of every collection named `collection_id`, at any depth.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PermissionDenied` or a backend error.
    async fn list_group(&self, collection_id: &str) -> Result<Vec<Document>, StorageError>;

    /// Create the document or shallow-merge `fields` into it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PermissionDenied` or a backend error.
    async fn merge(&self, path: &DocPath, fields: Fields) -> Result<(), StorageError>;

    /// Apply every merge of `batch` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if any write is rejected; nothing is applied then.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError>;

    /// Create a document with a generated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PermissionDenied` or a backend error.
    async fn add(&self, collection: &CollectionPath, fields: Fields)
    -> Result<DocPath, StorageError>;

    /// Shallow-merge into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the document does not exist.
    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), StorageError>;

    /// Remove a document. Deleting an absent document succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PermissionDenied` or a backend error.
    async fn delete(&self, path: &DocPath) -> Result<(), StorageError>;

    /// Add `values` to the array `field` of an existing document, skipping
    /// values already present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when the document does not exist.
    async fn array_union(
        &self,
        path: &DocPath,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StorageError>;

    /// Subscribe to change notices for writes committed from now on.
    fn changes(&self) -> broadcast::Receiver<ChangeNotice>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone)]
struct DenyRule {
    prefix: String,
    access: Access,
}

fn covers(prefix: &str, path: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// In-memory store for tests and prototyping.
///
/// Access rules can deny reads or writes below a path prefix to reproduce
/// permission failures of a hosted store.
#[derive(Clone)]
pub struct InMemoryStore {
    docs: Arc<Mutex<BTreeMap<DocPath, Fields>>>,
    denied: Arc<Mutex<Vec<DenyRule>>>,
    notices: broadcast::Sender<ChangeNotice>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let (notices, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            docs: Arc::new(Mutex::new(BTreeMap::new())),
            denied: Arc::new(Mutex::new(Vec::new())),
            notices,
        }
    }

    /// Reject writes to `prefix` and everything below it.
    pub fn deny_writes(&self, prefix: &str) {
        self.push_rule(prefix, Access::Write);
    }

    /// Reject reads of `prefix` and everything below it.
    pub fn deny_reads(&self, prefix: &str) {
        self.push_rule(prefix, Access::Read);
    }

    /// Drop every access rule.
    pub fn allow_all(&self) {
        if let Ok(mut rules) = self.denied.lock() {
            rules.clear();
        }
    }

    fn push_rule(&self, prefix: &str, access: Access) {
        if let Ok(mut rules) = self.denied.lock() {
            rules.push(DenyRule {
                prefix: prefix.trim_end_matches('/').to_owned(),
                access,
            });
        }
    }

    fn check(&self, path: &str, access: Access) -> Result<(), StorageError> {
        let rules = self
            .denied
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if rules
            .iter()
            .any(|rule| rule.access == access && covers(&rule.prefix, path))
        {
            return Err(StorageError::PermissionDenied {
                path: path.to_owned(),
            });
        }
        Ok(())
    }

    fn lock_docs(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<DocPath, Fields>>, StorageError> {
        self.docs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn notify(&self, path: &DocPath) {
        // No receivers is fine: nobody is watching yet.
        let _ = self.notices.send(ChangeNotice { path: path.clone() });
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, StorageError> {
        self.check(&path.as_string(), Access::Read)?;
        let guard = self.lock_docs()?;
        Ok(guard.get(path).map(|fields| Document {
            path: path.clone(),
            fields: fields.clone(),
        }))
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, StorageError> {
        self.check(&collection.as_string(), Access::Read)?;
        let guard = self.lock_docs()?;
        Ok(guard
            .iter()
            .filter(|(path, _)| path.parent() == *collection)
            .map(|(path, fields)| Document {
                path: path.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    async fn list_group(&self, collection_id: &str) -> Result<Vec<Document>, StorageError> {
        let guard = self.lock_docs()?;
        let mut docs = Vec::new();
        for (path, fields) in guard.iter() {
            if path.parent().collection_id() != collection_id {
                continue;
            }
            self.check(&path.as_string(), Access::Read)?;
            docs.push(Document {
                path: path.clone(),
                fields: fields.clone(),
            });
        }
        Ok(docs)
    }

    async fn merge(&self, path: &DocPath, fields: Fields) -> Result<(), StorageError> {
        self.check(&path.as_string(), Access::Write)?;
        {
            let mut guard = self.lock_docs()?;
            merge_fields(guard.entry(path.clone()).or_default(), fields);
        }
        self.notify(path);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
        for (path, _) in batch.writes() {
            self.check(&path.as_string(), Access::Write)?;
        }
        let writes = batch.into_writes();
        {
            let mut guard = self.lock_docs()?;
            for (path, fields) in &writes {
                merge_fields(guard.entry(path.clone()).or_default(), fields.clone());
            }
        }
        for (path, _) in &writes {
            self.notify(path);
        }
        Ok(())
    }

    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<DocPath, StorageError> {
        let path = collection.doc(&uuid::Uuid::new_v4().simple().to_string())?;
        self.check(&path.as_string(), Access::Write)?;
        self.lock_docs()?.insert(path.clone(), fields);
        self.notify(&path);
        Ok(path)
    }

    async fn update(&self, path: &DocPath, fields: Fields) -> Result<(), StorageError> {
        self.check(&path.as_string(), Access::Write)?;
        {
            let mut guard = self.lock_docs()?;
            let existing = guard
                .get_mut(path)
                .ok_or_else(|| StorageError::NotFound(path.as_string()))?;
            merge_fields(existing, fields);
        }
        self.notify(path);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StorageError> {
        self.check(&path.as_string(), Access::Write)?;
        let removed = self.lock_docs()?.remove(path).is_some();
        if removed {
            self.notify(path);
        }
        Ok(())
    }

    async fn array_union(
        &self,
        path: &DocPath,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StorageError> {
        self.check(&path.as_string(), Access::Write)?;
        {
            let mut guard = self.lock_docs()?;
            let existing = guard
                .get_mut(path)
                .ok_or_else(|| StorageError::NotFound(path.as_string()))?;
            union_into(existing, field, values);
        }
        self.notify(path);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notices.subscribe()
    }
}

/// The store client handle, built once at startup and shared by services.
#[derive(Clone)]
pub struct Storage {
    pub documents: Arc<dyn DocumentStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(InMemoryStore::new())
    }

    #[must_use]
    pub fn from_store(store: impl DocumentStore + 'static) -> Self {
        Self {
            documents: Arc::new(store),
        }
    }
}
