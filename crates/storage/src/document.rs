//! Addressing and shape of documents in the hierarchical store.
//!
//! Paths alternate collection and document segments:
//! `users` is a collection, `users/u1` a document,
//! `users/u1/progress` a sub-collection and `users/u1/progress/r1` a
//! document inside it.

use std::fmt;

use serde_json::Value;

use crate::repository::StorageError;

/// Loosely typed field map as stored in a document.
pub type Fields = serde_json::Map<String, Value>;

fn split(raw: &str) -> Result<Vec<String>, StorageError> {
    let segments: Vec<String> = raw.split('/').map(str::to_owned).collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(StorageError::InvalidPath(raw.to_owned()));
    }
    Ok(segments)
}

/// Path to a single document (even number of segments).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    segments: Vec<String>,
}

impl DocPath {
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` for empty segments or an odd
    /// segment count.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let segments = split(raw)?;
        if segments.len() % 2 != 0 {
            return Err(StorageError::InvalidPath(raw.to_owned()));
        }
        Ok(Self { segments })
    }

    /// Id of the document (last segment).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Collection containing this document.
    #[must_use]
    pub fn parent(&self) -> CollectionPath {
        CollectionPath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        }
    }

    /// Id of the document owning this document's collection, if nested.
    ///
    /// For `users/u1/progress/r1` this is `u1`.
    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        let len = self.segments.len();
        (len >= 4).then(|| self.segments[len - 3].as_str())
    }

    /// Sub-collection below this document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if `name` is empty or nested.
    pub fn collection(&self, name: &str) -> Result<CollectionPath, StorageError> {
        if name.trim().is_empty() || name.contains('/') {
            return Err(StorageError::InvalidPath(format!("{self}/{name}")));
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());
        Ok(CollectionPath { segments })
    }

    #[must_use]
    pub fn as_string(&self) -> String {
        self.segments.join("/")
    }
}

/// Path to a collection (odd number of segments).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` for empty segments or an even
    /// segment count.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let segments = split(raw)?;
        if segments.len() % 2 != 1 {
            return Err(StorageError::InvalidPath(raw.to_owned()));
        }
        Ok(Self { segments })
    }

    /// Last segment, the name collection-group queries match on.
    #[must_use]
    pub fn collection_id(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Document with the given id inside this collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if `id` is empty or nested.
    pub fn doc(&self, id: &str) -> Result<DocPath, StorageError> {
        if id.trim().is_empty() || id.contains('/') {
            return Err(StorageError::InvalidPath(format!("{self}/{id}")));
        }
        let mut segments = self.segments.clone();
        segments.push(id.to_owned());
        Ok(DocPath { segments })
    }

    #[must_use]
    pub fn as_string(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl fmt::Debug for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocPath({self})")
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl fmt::Debug for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionPath({self})")
    }
}

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub fields: Fields,
}

impl Document {
    #[must_use]
    pub fn id(&self) -> &str {
        self.path.id()
    }
}

/// Shallow merge: top-level keys of `patch` replace those of `target`.
pub(crate) fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

/// Append `values` to the array at `field`, skipping ones already present.
///
/// A missing or non-array field is replaced by a fresh array.
pub(crate) fn union_into(target: &mut Fields, field: &str, values: Vec<Value>) {
    let entry = target
        .entry(field.to_owned())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    if let Value::Array(items) = entry {
        for value in values {
            if !items.contains(&value) {
                items.push(value);
            }
        }
    }
}
