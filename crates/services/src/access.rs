//! Administrator checks.
//!
//! A user is an administrator when a document exists at `admins/{uid}`.
//! The document's contents never matter; an empty one still grants access.

use std::sync::Arc;

use itetude_core::model::UserId;
use storage::CollectionPath;
use storage::mapping::ADMINS;
use storage::repository::{DocumentStore, StorageError};

use crate::auth::AuthProvider;
use crate::error::AccessError;

/// Whether `user` has an admin document.
///
/// An absent document, or one the store refuses to show, means "not an
/// admin".
///
/// # Errors
///
/// Returns `StorageError` for backend failures other than a denied read.
pub async fn is_admin(store: &dyn DocumentStore, user: &UserId) -> Result<bool, StorageError> {
    let path = CollectionPath::parse(ADMINS)?.doc(user.as_str())?;
    match store.get(&path).await {
        Ok(doc) => Ok(doc.is_some()),
        Err(StorageError::PermissionDenied { .. }) => {
            tracing::debug!(user = %user, "admin document not readable");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Guards admin-only operations on behalf of the signed-in user.
#[derive(Clone)]
pub struct AdminGate {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
}

impl AdminGate {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }

    /// Whether the signed-in user is an administrator. Signed out is `false`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the admin document cannot be read.
    pub async fn is_admin(&self) -> Result<bool, StorageError> {
        match self.auth.current_user() {
            Some(user) => is_admin(self.store.as_ref(), &user).await,
            None => Ok(false),
        }
    }

    /// The signed-in administrator, or the reason access is refused.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::SignedOut`, `AccessError::NotAdmin`, or
    /// `AccessError::Storage` if the check itself fails.
    pub async fn require(&self) -> Result<UserId, AccessError> {
        let user = self.auth.current_user().ok_or(AccessError::SignedOut)?;
        if is_admin(self.store.as_ref(), &user).await? {
            Ok(user)
        } else {
            tracing::warn!(user = %user, "admin operation refused");
            Err(AccessError::NotAdmin(user))
        }
    }
}
