mod category;
mod certification;
mod feedback;
mod ids;
mod path;
mod profile;
mod progress;
mod resource;
mod tiers;

pub use category::{CATEGORIES, Category, category_by_id, category_by_slug};
pub use certification::{
    Certification, CertificationDraft, CertificationError, CertificationStatus,
};
pub use feedback::{
    Feedback, FeedbackDraft, FeedbackError, FeedbackStatus, FeedbackType, MIN_MESSAGE_CHARS,
    NewFeedback, Submitter,
};
pub use ids::{CategoryId, CertificationId, FeedbackId, ParseIdError, PathId, ResourceId, UserId};
pub use path::{LearningPath, PathDraft, PathError, Step};
pub use profile::{FALLBACK_DISPLAY_NAME, UserProfile, display_name_or_fallback};
pub use progress::{
    OwnedProgress, ProgressFields, ProgressPatch, ProgressSnapshot, ProgressStatus,
    UserProgress, merge_progress, resolve_progress,
};
pub use resource::{MIN_TITLE_CHARS, Resource, ResourceDraft, ResourceError};
pub use tiers::{DataWeight, Difficulty, ParseTierError};
