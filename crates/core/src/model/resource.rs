use thiserror::Error;
use url::Url;

use crate::model::ids::{CategoryId, ResourceId};
use crate::model::tiers::{DataWeight, Difficulty};

/// Minimum title length accepted by the catalog forms.
pub const MIN_TITLE_CHARS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("resource title must be at least {MIN_TITLE_CHARS} characters")]
    TitleTooShort,

    #[error("resource url is not a valid http(s) url: {0}")]
    InvalidUrl(String),

    #[error("resource language cannot be empty")]
    EmptyLanguage,
}

/// Editable fields of a resource, as submitted by the admin form.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDraft {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub language: String,
    pub data_weight: DataWeight,
    pub difficulty: Difficulty,
    pub category_id: CategoryId,
    pub author: Option<String>,
}

impl ResourceDraft {
    /// Validate the draft against the catalog form rules.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` when the title is too short, the URL does not
    /// parse as http(s), or the language is blank.
    pub fn validate(self) -> Result<Self, ResourceError> {
        if self.title.trim().chars().count() < MIN_TITLE_CHARS {
            return Err(ResourceError::TitleTooShort);
        }
        validate_http_url(&self.url).map_err(ResourceError::InvalidUrl)?;
        if self.language.trim().is_empty() {
            return Err(ResourceError::EmptyLanguage);
        }
        Ok(self)
    }
}

/// A catalog entry pointing at external learning material.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    id: ResourceId,
    title: String,
    url: String,
    description: Option<String>,
    language: String,
    data_weight: DataWeight,
    difficulty: Difficulty,
    category_id: CategoryId,
    author: Option<String>,
}

impl Resource {
    /// Creates a validated resource.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` if the draft fails validation.
    pub fn new(id: ResourceId, draft: ResourceDraft) -> Result<Self, ResourceError> {
        Ok(Self::from_persisted(id, draft.validate()?))
    }

    /// Rebuilds a resource read back from the store.
    ///
    /// Only normalizes whitespace; documents written before the form rules
    /// existed are still accepted.
    #[must_use]
    pub fn from_persisted(id: ResourceId, draft: ResourceDraft) -> Self {
        Self {
            id,
            title: draft.title.trim().to_owned(),
            url: draft.url.trim().to_owned(),
            description: normalize_optional(draft.description),
            language: draft.language.trim().to_owned(),
            data_weight: draft.data_weight,
            difficulty: draft.difficulty,
            category_id: draft.category_id,
            author: normalize_optional(draft.author),
        }
    }

    #[must_use]
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn data_weight(&self) -> DataWeight {
        self.data_weight
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Editable fields of this resource, e.g. to prefill an edit form.
    #[must_use]
    pub fn to_draft(&self) -> ResourceDraft {
        ResourceDraft {
            title: self.title.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
            language: self.language.clone(),
            data_weight: self.data_weight,
            difficulty: self.difficulty,
            category_id: self.category_id,
            author: self.author.clone(),
        }
    }
}

pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn validate_http_url(raw: &str) -> Result<(), String> {
    match Url::parse(raw.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(raw.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ResourceDraft {
        ResourceDraft {
            title: "  The Rust Book ".into(),
            url: "https://doc.rust-lang.org/book/".into(),
            description: Some("   ".into()),
            language: "Anglais".into(),
            data_weight: DataWeight::Plume,
            difficulty: Difficulty::Beginner,
            category_id: CategoryId::new(1),
            author: None,
        }
    }

    #[test]
    fn new_trims_and_drops_blank_description() {
        let resource = Resource::new(ResourceId::new("r1"), draft()).unwrap();
        assert_eq!(resource.title(), "The Rust Book");
        assert_eq!(resource.description(), None);
        assert_eq!(resource.language(), "Anglais");
    }

    #[test]
    fn new_rejects_short_title() {
        let mut d = draft();
        d.title = " ab ".into();
        assert_eq!(
            Resource::new(ResourceId::new("r1"), d).unwrap_err(),
            ResourceError::TitleTooShort
        );
    }

    #[test]
    fn new_rejects_non_http_url() {
        let mut d = draft();
        d.url = "ftp://example.org/file".into();
        assert!(matches!(
            Resource::new(ResourceId::new("r1"), d).unwrap_err(),
            ResourceError::InvalidUrl(_)
        ));

        let mut d = draft();
        d.url = "not a url".into();
        assert!(Resource::new(ResourceId::new("r1"), d).is_err());
    }

    #[test]
    fn from_persisted_skips_form_rules() {
        let mut d = draft();
        d.title = "Go".into();
        let resource = Resource::from_persisted(ResourceId::new("r2"), d);
        assert_eq!(resource.title(), "Go");
    }

    #[test]
    fn to_draft_round_trips_fields() {
        let resource = Resource::new(ResourceId::new("r1"), draft()).unwrap();
        let again = Resource::new(ResourceId::new("r1"), resource.to_draft()).unwrap();
        assert_eq!(resource, again);
    }
}
