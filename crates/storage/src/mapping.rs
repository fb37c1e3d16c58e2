//! Typed records stored in documents, and their conversion to domain models.
//!
//! Decoders fail closed: a malformed document is logged and skipped rather
//! than failing the whole listing, the same way a client would ignore a
//! document it cannot render.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use itetude_core::model::{
    CategoryId, Certification, CertificationDraft, CertificationId, CertificationStatus,
    DataWeight, Difficulty, Feedback, FeedbackId, FeedbackStatus, FeedbackType, LearningPath,
    NewFeedback, OwnedProgress, PathDraft, PathId, ProgressFields, ProgressStatus, Resource,
    ResourceDraft, ResourceId, Step, Submitter, UserId, UserProfile, UserProgress,
    display_name_or_fallback,
};

use crate::document::{Document, Fields};
use crate::repository::StorageError;

// Collection names.
pub const RESOURCES: &str = "resources";
pub const LEARNING_PATHS: &str = "learningPaths";
pub const CERTIFICATIONS: &str = "certifications";
pub const FEEDBACK: &str = "feedback";
pub const USERS: &str = "users";
pub const PROGRESS: &str = "progress";
/// One document per administrator, keyed by user id. Its fields are unused.
pub const ADMINS: &str = "admins";

pub const HIDDEN_PATHS_FIELD: &str = "hiddenPaths";

const DEFAULT_LANGUAGE: &str = "Français";

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

fn decode<T: DeserializeOwned>(doc: &Document) -> Option<T> {
    match serde_json::from_value(Value::Object(doc.fields.clone())) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(path = %doc.path, error = %e, "skipping malformed document");
            None
        }
    }
}

fn encode<T: Serialize>(record: &T) -> Result<Fields, StorageError> {
    match serde_json::to_value(record).map_err(ser)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StorageError::Serialization(format!(
            "expected an object, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceRecord {
    title: String,
    url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_language")]
    language: String,
    data_weight: DataWeight,
    difficulty: Difficulty,
    category_id: CategoryId,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

#[must_use]
pub fn decode_resource(doc: &Document) -> Option<Resource> {
    let record: ResourceRecord = decode(doc)?;
    Some(Resource::from_persisted(
        ResourceId::new(doc.id()),
        ResourceDraft {
            title: record.title,
            url: record.url,
            description: record.description,
            language: record.language,
            data_weight: record.data_weight,
            difficulty: record.difficulty,
            category_id: record.category_id,
            author: record.author,
        },
    ))
}

#[must_use]
pub fn decode_resources(docs: &[Document]) -> Vec<Resource> {
    docs.iter().filter_map(decode_resource).collect()
}

/// Fields for a resource write. `created_at` is set on creation only so an
/// edit keeps the creation timestamp.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_resource(
    draft: &ResourceDraft,
    created_at: Option<DateTime<Utc>>,
) -> Result<Fields, StorageError> {
    encode(&ResourceRecord {
        title: draft.title.clone(),
        url: draft.url.clone(),
        description: draft.description.clone(),
        language: draft.language.clone(),
        data_weight: draft.data_weight,
        difficulty: draft.difficulty,
        category_id: draft.category_id,
        author: draft.author.clone(),
        created_at,
    })
}

// ---------------------------------------------------------------------------
// Learning paths
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathRecord {
    title: String,
    #[serde(default)]
    description: Option<String>,
    category_id: CategoryId,
    difficulty: Difficulty,
    #[serde(default)]
    steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

#[must_use]
pub fn decode_path(doc: &Document) -> Option<LearningPath> {
    let record: PathRecord = decode(doc)?;
    LearningPath::from_persisted(
        PathId::new(doc.id()),
        record.title,
        record.description,
        record.category_id,
        record.difficulty,
        record.steps,
    )
    .map_err(|e| tracing::debug!(path = %doc.path, error = %e, "skipping invalid learning path"))
    .ok()
}

#[must_use]
pub fn decode_paths(docs: &[Document]) -> Vec<LearningPath> {
    docs.iter().filter_map(decode_path).collect()
}

/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_path(
    draft: &PathDraft,
    created_at: Option<DateTime<Utc>>,
) -> Result<Fields, StorageError> {
    encode(&PathRecord {
        title: draft.title.clone(),
        description: draft.description.clone(),
        category_id: draft.category_id,
        difficulty: draft.difficulty,
        steps: draft.steps(),
        created_at,
    })
}

// ---------------------------------------------------------------------------
// Certifications
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CertificationRecord {
    title: String,
    issuing_body: String,
    url: String,
    logo_url: String,
    #[serde(default)]
    description: Option<String>,
    category_id: CategoryId,
    difficulty: Difficulty,
    #[serde(default)]
    issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    status: CertificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

#[must_use]
pub fn decode_certification(doc: &Document) -> Option<Certification> {
    let record: CertificationRecord = decode(doc)?;
    Some(Certification::from_persisted(
        CertificationId::new(doc.id()),
        CertificationDraft {
            title: record.title,
            issuing_body: record.issuing_body,
            url: record.url,
            logo_url: record.logo_url,
            description: record.description,
            category_id: record.category_id,
            difficulty: record.difficulty,
            issued_at: record.issued_at,
            expires_at: record.expires_at,
            language: record.language,
            status: record.status,
        },
    ))
}

#[must_use]
pub fn decode_certifications(docs: &[Document]) -> Vec<Certification> {
    docs.iter().filter_map(decode_certification).collect()
}

/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_certification(
    draft: &CertificationDraft,
    created_at: Option<DateTime<Utc>>,
) -> Result<Fields, StorageError> {
    encode(&CertificationRecord {
        title: draft.title.clone(),
        issuing_body: draft.issuing_body.clone(),
        url: draft.url.clone(),
        logo_url: draft.logo_url.clone(),
        description: draft.description.clone(),
        category_id: draft.category_id,
        difficulty: draft.difficulty,
        issued_at: draft.issued_at,
        expires_at: draft.expires_at,
        language: draft.language.clone(),
        status: draft.status,
        created_at,
    })
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRecord {
    #[serde(default)]
    status: ProgressStatus,
    #[serde(default)]
    is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// A progress document keyed by resource id. Missing fields take their
/// defaults.
#[must_use]
pub fn decode_progress(doc: &Document) -> Option<UserProgress> {
    let record: ProgressRecord = decode(doc)?;
    Some(UserProgress {
        resource_id: ResourceId::new(doc.id()),
        status: record.status,
        is_favorite: record.is_favorite,
        updated_at: record.updated_at,
    })
}

#[must_use]
pub fn decode_progress_list(docs: &[Document]) -> Vec<UserProgress> {
    docs.iter().filter_map(decode_progress).collect()
}

/// A progress document from a collection-group listing, attributed to the
/// user owning its parent collection.
#[must_use]
pub fn decode_owned_progress(doc: &Document) -> Option<OwnedProgress> {
    let user_id = UserId::new(doc.path.owner_id()?);
    Some(OwnedProgress {
        user_id,
        progress: decode_progress(doc)?,
    })
}

#[must_use]
pub fn decode_owned_progress_list(docs: &[Document]) -> Vec<OwnedProgress> {
    docs.iter().filter_map(decode_owned_progress).collect()
}

/// Full record written on every progress change.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_progress(
    fields: ProgressFields,
    updated_at: DateTime<Utc>,
) -> Result<Fields, StorageError> {
    encode(&ProgressRecord {
        status: fields.status,
        is_favorite: fields.is_favorite,
        updated_at: Some(updated_at),
    })
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRecord {
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    photo_url: Option<String>,
    #[serde(default)]
    hidden_paths: Vec<PathId>,
}

#[must_use]
pub fn decode_profile(doc: &Document) -> Option<UserProfile> {
    let record: ProfileRecord = decode(doc)?;
    let display_name =
        display_name_or_fallback(record.display_name.as_deref(), record.email.as_deref());
    Some(UserProfile {
        uid: UserId::new(record.uid.unwrap_or_else(|| doc.id().to_owned())),
        email: record.email,
        display_name,
        photo_url: record.photo_url,
        hidden_paths: record.hidden_paths.into_iter().collect(),
    })
}

#[must_use]
pub fn decode_profiles(docs: &[Document]) -> Vec<UserProfile> {
    docs.iter().filter_map(decode_profile).collect()
}

/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_profile(profile: &UserProfile) -> Result<Fields, StorageError> {
    encode(&ProfileRecord {
        uid: Some(profile.uid.to_string()),
        email: profile.email.clone(),
        display_name: Some(profile.display_name.clone()),
        photo_url: profile.photo_url.clone(),
        hidden_paths: profile.hidden_paths.iter().cloned().collect(),
    })
}

/// Fields for a display-name change only.
#[must_use]
pub fn encode_display_name(display_name: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("displayName".into(), Value::String(display_name.to_owned()));
    fields
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackRecord {
    #[serde(rename = "type")]
    kind: FeedbackType,
    message: String,
    #[serde(default)]
    status: FeedbackStatus,
    created_at: DateTime<Utc>,
    user_id: UserId,
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_title: Option<String>,
}

#[must_use]
pub fn decode_feedback(doc: &Document) -> Option<Feedback> {
    let record: FeedbackRecord = decode(doc)?;
    Some(Feedback {
        id: FeedbackId::new(doc.id()),
        kind: record.kind,
        message: record.message,
        status: record.status,
        created_at: record.created_at,
        submitter: Submitter {
            user_id: record.user_id,
            email: record.user_email,
            name: record.user_name,
        },
        resource_id: record.resource_id,
        resource_title: record.resource_title,
    })
}

#[must_use]
pub fn decode_feedback_list(docs: &[Document]) -> Vec<Feedback> {
    docs.iter().filter_map(decode_feedback).collect()
}

/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_new_feedback(feedback: &NewFeedback) -> Result<Fields, StorageError> {
    encode(&FeedbackRecord {
        kind: feedback.kind,
        message: feedback.message.clone(),
        status: feedback.status,
        created_at: feedback.created_at,
        user_id: feedback.submitter.user_id.clone(),
        user_email: feedback.submitter.email.clone(),
        user_name: feedback.submitter.name.clone(),
        resource_id: feedback.resource_id.clone(),
        resource_title: feedback.resource_title.clone(),
    })
}

/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_feedback_status(status: FeedbackStatus) -> Result<Fields, StorageError> {
    let mut fields = Fields::new();
    fields.insert("status".into(), serde_json::to_value(status).map_err(ser)?);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocPath;
    use serde_json::json;

    fn doc(path: &str, value: Value) -> Document {
        Document {
            path: DocPath::parse(path).unwrap(),
            fields: value.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn progress_defaults_fill_missing_fields() {
        let progress = decode_progress(&doc("users/u/progress/r1", json!({}))).unwrap();
        assert_eq!(progress.resource_id, ResourceId::new("r1"));
        assert_eq!(progress.status, ProgressStatus::NotStarted);
        assert!(!progress.is_favorite);

        let progress = decode_progress(&doc(
            "users/u/progress/r2",
            json!({"status": "terminé", "isFavorite": true}),
        ))
        .unwrap();
        assert!(progress.status.is_completed());
        assert!(progress.is_favorite);
    }

    #[test]
    fn owned_progress_takes_user_from_parent_path() {
        let owned = decode_owned_progress(&doc("users/alice/progress/r1", json!({}))).unwrap();
        assert_eq!(owned.user_id, UserId::new("alice"));
        assert!(decode_owned_progress(&doc("progress/r1", json!({}))).is_none());
    }

    #[test]
    fn malformed_resources_are_skipped() {
        let docs = vec![
            doc(
                "resources/ok",
                json!({
                    "title": "Rust book",
                    "url": "https://doc.rust-lang.org/book/",
                    "dataWeight": "Plume",
                    "difficulty": "Débutant",
                    "categoryId": 1
                }),
            ),
            doc("resources/bad", json!({"title": 42})),
        ];
        let resources = decode_resources(&docs);
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].language(), "Français");
    }

    #[test]
    fn progress_encoding_uses_stored_labels() {
        let fields = encode_progress(
            ProgressFields {
                status: ProgressStatus::InProgress,
                is_favorite: true,
            },
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(fields["status"], json!("en cours"));
        assert_eq!(fields["isFavorite"], json!(true));
        assert!(fields.contains_key("updatedAt"));
    }

    #[test]
    fn profile_falls_back_to_email_and_doc_id() {
        let profile = decode_profile(&doc(
            "users/u9",
            json!({"email": "marie@example.org", "hiddenPaths": ["p1", "p1"]}),
        ))
        .unwrap();
        assert_eq!(profile.uid, UserId::new("u9"));
        assert_eq!(profile.display_name, "marie");
        assert_eq!(profile.hidden_paths.len(), 1);
    }

    #[test]
    fn path_with_duplicate_orders_is_skipped() {
        let d = doc(
            "learningPaths/p",
            json!({
                "title": "Bases",
                "categoryId": 2,
                "difficulty": "Débutant",
                "steps": [
                    {"order": 1, "resourceId": "a"},
                    {"order": 1, "resourceId": "b"}
                ]
            }),
        );
        assert!(decode_path(&d).is_none());
    }

    #[test]
    fn feedback_type_is_stored_under_type_key() {
        let d = doc(
            "feedback/f1",
            json!({
                "type": "Problème de ressource",
                "message": "Le lien est cassé depuis hier",
                "createdAt": "2024-01-01T00:00:00Z",
                "userId": "u1",
                "resourceId": "r1",
                "resourceTitle": "Rust book"
            }),
        );
        let feedback = decode_feedback(&d).unwrap();
        assert_eq!(feedback.kind, FeedbackType::ResourceProblem);
        assert_eq!(feedback.status, FeedbackStatus::New);
        assert_eq!(feedback.resource_title.as_deref(), Some("Rust book"));
    }
}
