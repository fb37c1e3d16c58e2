//! Decoded, continuously refreshed views over store subscriptions.

use std::sync::Arc;

use storage::live::LiveQuery;
use storage::repository::DocumentStore;
use storage::{Document, DocumentQuery, Subscription};

use crate::permission::{Operation, PermissionErrorEmitter};

/// Latest decoded result of a listing query.
///
/// Until the first snapshot arrives (or after a failed load) the view is
/// empty, never an error.
pub struct LiveCollection<Q, T>
where
    Q: LiveQuery<Output = Vec<Document>>,
{
    subscription: Subscription<Q>,
    decode: fn(&[Document]) -> Vec<T>,
    items: Vec<T>,
    loaded: bool,
    errors: PermissionErrorEmitter,
}

impl<Q, T> LiveCollection<Q, T>
where
    Q: LiveQuery<Output = Vec<Document>>,
{
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        query: Q,
        decode: fn(&[Document]) -> Vec<T>,
        errors: PermissionErrorEmitter,
    ) -> Self {
        Self {
            subscription: Subscription::new(store, query),
            decode,
            items: Vec::new(),
            loaded: false,
            errors,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Apply a queued change, if any. Returns whether the items changed.
    pub async fn refresh(&mut self) -> bool {
        match self.subscription.poll_pending().await {
            Some(result) => self.apply(result),
            None => false,
        }
    }

    /// Wait for the next snapshot. Returns `false` once the store is gone.
    pub async fn next(&mut self) -> bool {
        match self.subscription.next().await {
            Some(result) => {
                self.apply(result);
                true
            }
            None => false,
        }
    }

    fn apply(&mut self, result: Result<Vec<Document>, storage::StorageError>) -> bool {
        match result {
            Ok(docs) => {
                self.items = (self.decode)(&docs);
                self.loaded = true;
                true
            }
            Err(e) => {
                self.errors.report(
                    &e,
                    Operation::List,
                    self.subscription.query().describe(),
                    None,
                );
                false
            }
        }
    }
}

/// Latest decoded state of one document; `None` while absent.
pub struct LiveDocument<T> {
    subscription: Subscription<DocumentQuery>,
    decode: fn(&Document) -> Option<T>,
    value: Option<T>,
    loaded: bool,
    errors: PermissionErrorEmitter,
}

impl<T> LiveDocument<T> {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        query: DocumentQuery,
        decode: fn(&Document) -> Option<T>,
        errors: PermissionErrorEmitter,
    ) -> Self {
        Self {
            subscription: Subscription::new(store, query),
            decode,
            value: None,
            loaded: false,
            errors,
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub async fn refresh(&mut self) -> bool {
        match self.subscription.poll_pending().await {
            Some(Ok(doc)) => {
                self.value = doc.as_ref().and_then(self.decode);
                self.loaded = true;
                true
            }
            Some(Err(e)) => {
                self.errors.report(
                    &e,
                    Operation::Get,
                    self.subscription.query().0.as_string(),
                    None,
                );
                false
            }
            None => false,
        }
    }
}
