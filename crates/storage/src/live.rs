//! Live queries: a snapshot now, and a fresh one after every relevant write.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::document::{CollectionPath, DocPath, Document};
use crate::repository::{ChangeNotice, DocumentStore, StorageError};

/// A query whose result can be recomputed when the store changes.
#[async_trait]
pub trait LiveQuery: Send + Sync {
    type Output: Send;

    /// Run the query against the current store state.
    ///
    /// # Errors
    ///
    /// Propagates the store's error, including permission denials.
    async fn load(&self, store: &dyn DocumentStore) -> Result<Self::Output, StorageError>;

    /// Whether a write at `notice.path` may change this query's result.
    fn affected_by(&self, notice: &ChangeNotice) -> bool;

    /// Path reported alongside failures of this query.
    fn describe(&self) -> String;
}

/// Every document of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery(pub CollectionPath);

/// Every document of every collection with a given name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupQuery(pub String);

/// A single document, `None` while absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery(pub DocPath);

#[async_trait]
impl LiveQuery for CollectionQuery {
    type Output = Vec<Document>;

    async fn load(&self, store: &dyn DocumentStore) -> Result<Vec<Document>, StorageError> {
        store.list(&self.0).await
    }

    fn affected_by(&self, notice: &ChangeNotice) -> bool {
        notice.path.parent() == self.0
    }

    fn describe(&self) -> String {
        self.0.as_string()
    }
}

#[async_trait]
impl LiveQuery for GroupQuery {
    type Output = Vec<Document>;

    async fn load(&self, store: &dyn DocumentStore) -> Result<Vec<Document>, StorageError> {
        store.list_group(&self.0).await
    }

    fn affected_by(&self, notice: &ChangeNotice) -> bool {
        notice.path.parent().collection_id() == self.0
    }

    fn describe(&self) -> String {
        self.0.clone()
    }
}

#[async_trait]
impl LiveQuery for DocumentQuery {
    type Output = Option<Document>;

    async fn load(&self, store: &dyn DocumentStore) -> Result<Option<Document>, StorageError> {
        store.get(&self.0).await
    }

    fn affected_by(&self, notice: &ChangeNotice) -> bool {
        notice.path == self.0
    }

    fn describe(&self) -> String {
        self.0.as_string()
    }
}

/// Handle on a running live query.
///
/// The change channel is joined when the subscription is created, so no
/// write committed afterwards is missed. Dropping the handle (or calling
/// [`Subscription::cancel`]) stops delivery.
pub struct Subscription<Q: LiveQuery> {
    store: Arc<dyn DocumentStore>,
    query: Q,
    changes: broadcast::Receiver<ChangeNotice>,
    primed: bool,
    _output: PhantomData<fn() -> Q::Output>,
}

impl<Q: LiveQuery> Subscription<Q> {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, query: Q) -> Self {
        let changes = store.changes();
        Self {
            store,
            query,
            changes,
            primed: false,
            _output: PhantomData,
        }
    }

    #[must_use]
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Wait for the next result.
    ///
    /// The first call returns the initial snapshot immediately; later calls
    /// wait for a write touching the query. Returns `None` once the store
    /// is gone.
    pub async fn next(&mut self) -> Option<Result<Q::Output, StorageError>> {
        if !self.primed {
            self.primed = true;
            return Some(self.query.load(self.store.as_ref()).await);
        }
        loop {
            match self.changes.recv().await {
                Ok(notice) if self.query.affected_by(&notice) => {
                    self.drain();
                    return Some(self.query.load(self.store.as_ref()).await);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(query = %self.query.describe(), skipped, "live query lagged, reloading");
                    return Some(self.query.load(self.store.as_ref()).await);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`next`](Self::next): reloads only when a
    /// relevant write is already queued.
    pub async fn poll_pending(&mut self) -> Option<Result<Q::Output, StorageError>> {
        if !self.primed {
            self.primed = true;
            return Some(self.query.load(self.store.as_ref()).await);
        }
        let mut dirty = false;
        loop {
            match self.changes.try_recv() {
                Ok(notice) => dirty |= self.query.affected_by(&notice),
                Err(TryRecvError::Lagged(_)) => dirty = true,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        if dirty {
            Some(self.query.load(self.store.as_ref()).await)
        } else {
            None
        }
    }

    /// Stop listening. Equivalent to dropping the handle.
    pub fn cancel(self) {}

    // Coalesce a burst of notices (a batch) into one reload.
    fn drain(&mut self) {
        while let Ok(_) | Err(TryRecvError::Lagged(_)) = self.changes.try_recv() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fields;
    use crate::repository::{InMemoryStore, WriteBatch};

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(InMemoryStore::new())
    }

    #[tokio::test]
    async fn first_result_is_initial_snapshot() {
        let store = store();
        let path = DocPath::parse("resources/r1").unwrap();
        store.merge(&path, Fields::new()).await.unwrap();

        let mut sub = Subscription::new(
            store.clone(),
            CollectionQuery(CollectionPath::parse("resources").unwrap()),
        );
        let docs = sub.next().await.unwrap().unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn unrelated_writes_do_not_wake_the_query() {
        let store = store();
        let mut sub = Subscription::new(
            store.clone(),
            DocumentQuery(DocPath::parse("users/u1").unwrap()),
        );
        assert!(sub.next().await.unwrap().unwrap().is_none());

        store
            .merge(&DocPath::parse("resources/r1").unwrap(), Fields::new())
            .await
            .unwrap();
        assert!(sub.poll_pending().await.is_none());

        store
            .merge(&DocPath::parse("users/u1").unwrap(), Fields::new())
            .await
            .unwrap();
        let doc = sub.poll_pending().await.unwrap().unwrap();
        assert!(doc.is_some());
    }

    #[tokio::test]
    async fn batch_yields_one_reload_with_all_writes() {
        let store = store();
        let mut sub = Subscription::new(store.clone(), GroupQuery("progress".into()));
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        let mut batch = WriteBatch::new();
        batch
            .merge(DocPath::parse("users/a/progress/r1").unwrap(), Fields::new())
            .merge(DocPath::parse("users/b/progress/r1").unwrap(), Fields::new());
        store.commit(batch).await.unwrap();

        let docs = sub.next().await.unwrap().unwrap();
        assert_eq!(docs.len(), 2);
        assert!(sub.poll_pending().await.is_none());
    }
}
