use std::collections::BTreeSet;

use crate::model::ids::{PathId, UserId};

/// Display name used when neither the provider nor the email gives one.
pub const FALLBACK_DISPLAY_NAME: &str = "Nouvel utilisateur";

/// Per-user profile document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub uid: UserId,
    pub email: Option<String>,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub hidden_paths: BTreeSet<PathId>,
}

impl UserProfile {
    #[must_use]
    pub fn hides(&self, path_id: &PathId) -> bool {
        self.hidden_paths.contains(path_id)
    }
}

/// Pick the display name stored for a new account.
///
/// Uses the provider's name, else the local part of the email, else
/// [`FALLBACK_DISPLAY_NAME`].
#[must_use]
pub fn display_name_or_fallback(display_name: Option<&str>, email: Option<&str>) -> String {
    if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_owned();
    }
    email
        .and_then(|e| e.split('@').next())
        .map(str::trim)
        .filter(|local| !local.is_empty())
        .map_or_else(|| FALLBACK_DISPLAY_NAME.to_owned(), str::to_owned)
}
