use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Document ids are opaque strings assigned by the store. Each collection gets
// its own newtype so a path id can never be passed where a resource id is
// expected.
macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw document id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed.contains('/') {
                    return Err(ParseIdError {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(trimmed.to_owned()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

document_id!(
    /// Identifier of a catalog resource (also the key of its progress record).
    ResourceId
);
document_id!(
    /// Identifier of a learning path.
    PathId
);
document_id!(
    /// Identifier of a certification entry.
    CertificationId
);
document_id!(
    /// Identifier of a feedback report.
    FeedbackId
);
document_id!(
    /// Opaque user id supplied by the authentication provider.
    UserId
);

/// Numeric reference into the static category list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(u32);

impl CategoryId {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CategoryId({})", self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CategoryId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(CategoryId::new)
            .map_err(|_| ParseIdError { kind: "CategoryId" })
    }
}

/// Error type for parsing an id from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_display_is_raw_value() {
        let id = ResourceId::new("rust-book");
        assert_eq!(id.to_string(), "rust-book");
        assert_eq!(format!("{id:?}"), "ResourceId(rust-book)");
    }

    #[test]
    fn document_id_rejects_empty_and_nested() {
        assert!("".parse::<PathId>().is_err());
        assert!("   ".parse::<UserId>().is_err());
        assert!("users/abc".parse::<UserId>().is_err());
        assert_eq!("  abc ".parse::<UserId>().unwrap(), UserId::new("abc"));
    }

    #[test]
    fn category_id_from_str() {
        let id: CategoryId = "3".parse().unwrap();
        assert_eq!(id, CategoryId::new(3));
        assert!("three".parse::<CategoryId>().is_err());
    }
}
