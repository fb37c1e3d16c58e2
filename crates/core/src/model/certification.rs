use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CategoryId, CertificationId};
use crate::model::resource::{MIN_TITLE_CHARS, normalize_optional, validate_http_url};
use crate::model::tiers::Difficulty;

const MIN_ISSUER_CHARS: usize = 2;

/// Whether sitting the certification costs money.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificationStatus {
    #[default]
    #[serde(rename = "Gratuit")]
    Free,
    #[serde(rename = "Payant")]
    Paid,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CertificationError {
    #[error("certification title must be at least {MIN_TITLE_CHARS} characters")]
    TitleTooShort,

    #[error("issuing body must be at least {MIN_ISSUER_CHARS} characters")]
    IssuerTooShort,

    #[error("certification url is not a valid http(s) url: {0}")]
    InvalidUrl(String),

    #[error("logo url is not a valid http(s) url: {0}")]
    InvalidLogoUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CertificationDraft {
    pub title: String,
    pub issuing_body: String,
    pub url: String,
    pub logo_url: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub difficulty: Difficulty,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub language: String,
    pub status: CertificationStatus,
}

impl CertificationDraft {
    /// # Errors
    ///
    /// Returns `CertificationError` for short title/issuer or invalid URLs.
    pub fn validate(self) -> Result<Self, CertificationError> {
        if self.title.trim().chars().count() < MIN_TITLE_CHARS {
            return Err(CertificationError::TitleTooShort);
        }
        if self.issuing_body.trim().chars().count() < MIN_ISSUER_CHARS {
            return Err(CertificationError::IssuerTooShort);
        }
        validate_http_url(&self.url).map_err(CertificationError::InvalidUrl)?;
        validate_http_url(&self.logo_url).map_err(CertificationError::InvalidLogoUrl)?;
        Ok(self)
    }
}

/// A certification listed in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Certification {
    id: CertificationId,
    draft: CertificationDraft,
}

impl Certification {
    /// # Errors
    ///
    /// Returns `CertificationError` if the draft fails validation.
    pub fn new(id: CertificationId, draft: CertificationDraft) -> Result<Self, CertificationError> {
        Ok(Self::from_persisted(id, draft.validate()?))
    }

    #[must_use]
    pub fn from_persisted(id: CertificationId, mut draft: CertificationDraft) -> Self {
        draft.title = draft.title.trim().to_owned();
        draft.issuing_body = draft.issuing_body.trim().to_owned();
        draft.description = normalize_optional(draft.description);
        Self { id, draft }
    }

    #[must_use]
    pub fn id(&self) -> &CertificationId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.draft.title
    }

    #[must_use]
    pub fn issuing_body(&self) -> &str {
        &self.draft.issuing_body
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.draft.url
    }

    #[must_use]
    pub fn logo_url(&self) -> &str {
        &self.draft.logo_url
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.draft.description.as_deref()
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.draft.category_id
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.draft.difficulty
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.draft.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.draft.expires_at
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.draft.language
    }

    #[must_use]
    pub fn status(&self) -> CertificationStatus {
        self.draft.status
    }

    /// True once the expiry timestamp lies before `now`. Never persisted.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.draft.expires_at.is_some_and(|expiry| expiry < now)
    }

    #[must_use]
    pub fn draft(&self) -> &CertificationDraft {
        &self.draft
    }
}
