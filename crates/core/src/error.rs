use thiserror::Error;

use crate::model::{CertificationError, FeedbackError, PathError, ResourceError};

/// Validation failures raised by the domain model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Certification(#[from] CertificationError),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
}
