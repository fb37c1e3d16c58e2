use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Difficulty tier shared by resources, learning paths and certifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "Débutant")]
    Beginner,
    #[serde(rename = "Intermédiaire")]
    Intermediate,
    #[serde(rename = "Avancé")]
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    /// Label stored in documents and shown to users.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Beginner => "Débutant",
            Difficulty::Intermediate => "Intermédiaire",
            Difficulty::Advanced => "Avancé",
        }
    }
}

/// Payload size class of a resource, from lightest to heaviest.
///
/// The derived ordering follows declaration order, so
/// `Plume < Standard < Media < Flux`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataWeight {
    Plume,
    Standard,
    Media,
    Flux,
}

impl DataWeight {
    pub const ALL: [DataWeight; 4] = [
        DataWeight::Plume,
        DataWeight::Standard,
        DataWeight::Media,
        DataWeight::Flux,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DataWeight::Plume => "Plume",
            DataWeight::Standard => "Standard",
            DataWeight::Media => "Media",
            DataWeight::Flux => "Flux",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {raw}")]
pub struct ParseTierError {
    kind: &'static str,
    raw: String,
}

impl FromStr for Difficulty {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.label() == s)
            .ok_or_else(|| ParseTierError {
                kind: "difficulty",
                raw: s.to_owned(),
            })
    }
}

impl FromStr for DataWeight {
    type Err = ParseTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataWeight::ALL
            .into_iter()
            .find(|w| w.label() == s)
            .ok_or_else(|| ParseTierError {
                kind: "data weight",
                raw: s.to_owned(),
            })
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl fmt::Display for DataWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_weight_is_ordered_by_payload() {
        assert!(DataWeight::Plume < DataWeight::Standard);
        assert!(DataWeight::Standard < DataWeight::Media);
        assert!(DataWeight::Media < DataWeight::Flux);
    }

    #[test]
    fn difficulty_parses_french_labels() {
        assert_eq!("Avancé".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert_eq!(
            "Intermédiaire".parse::<Difficulty>().unwrap(),
            Difficulty::Intermediate
        );
        assert!("Expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn display_uses_stored_label() {
        assert_eq!(Difficulty::Beginner.to_string(), "Débutant");
        assert_eq!(DataWeight::Flux.to_string(), "Flux");
    }
}
