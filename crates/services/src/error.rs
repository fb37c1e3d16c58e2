//! Shared error types for the services crate.

use thiserror::Error;

use itetude_core::model::{
    CertificationError, FeedbackError, PathError, ResourceError, UserId,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Why an admin-only operation was refused.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccessError {
    #[error("sign in required")]
    SignedOut,
    #[error("{0} is not an administrator")]
    NotAdmin(UserId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Certification(#[from] CertificationError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `FeedbackService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedbackServiceError {
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error("display name must not be empty")]
    EmptyDisplayName,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
