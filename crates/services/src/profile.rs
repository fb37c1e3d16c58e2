use std::sync::Arc;

use serde_json::Value;

use itetude_core::model::{PathId, UserId, UserProfile, display_name_or_fallback};
use storage::mapping::{
    HIDDEN_PATHS_FIELD, USERS, decode_profile, decode_profiles, encode_display_name,
    encode_profile,
};
use storage::repository::{DocumentStore, StorageError};
use storage::{CollectionPath, DocPath};

use crate::error::ProfileServiceError;

/// # Errors
///
/// Returns `StorageError::InvalidPath` if the user id cannot be a path
/// segment.
pub fn profile_path(user: &UserId) -> Result<DocPath, StorageError> {
    CollectionPath::parse(USERS)?.doc(user.as_str())
}

/// Identity reported by the authentication provider at sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub uid: UserId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Reads and edits per-user profile documents.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create or refresh the profile document after sign-in.
    ///
    /// Identity fields are merged in; an existing hidden-path list is kept.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the write fails.
    pub async fn ensure_profile(
        &self,
        account: AccountInfo,
    ) -> Result<UserProfile, ProfileServiceError> {
        let path = profile_path(&account.uid)?;
        let existing = self.store.get(&path).await?.as_ref().and_then(decode_profile);

        let profile = UserProfile {
            display_name: display_name_or_fallback(
                account.display_name.as_deref(),
                account.email.as_deref(),
            ),
            uid: account.uid,
            email: account.email,
            photo_url: account.photo_url,
            hidden_paths: existing.map(|p| p.hidden_paths).unwrap_or_default(),
        };
        let mut fields = encode_profile(&profile)?;
        // Leave the stored list alone; array-union is the only writer.
        fields.remove(HIDDEN_PATHS_FIELD);
        self.store.merge(&path, fields).await?;
        tracing::debug!(user = %profile.uid, "profile ensured");
        Ok(profile)
    }

    /// Fetch a profile. Absent profiles are `None`.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the read fails.
    pub async fn get(&self, user: &UserId) -> Result<Option<UserProfile>, ProfileServiceError> {
        let path = profile_path(user)?;
        Ok(self.store.get(&path).await?.as_ref().and_then(decode_profile))
    }

    /// All registered users, as listed on the admin page.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the listing fails.
    pub async fn list(&self) -> Result<Vec<UserProfile>, ProfileServiceError> {
        let docs = self.store.list(&CollectionPath::parse(USERS)?).await?;
        Ok(decode_profiles(&docs))
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::EmptyDisplayName` for blank names and
    /// `ProfileServiceError::Storage` if the profile is missing or the
    /// write fails.
    pub async fn rename(&self, user: &UserId, display_name: &str) -> Result<(), ProfileServiceError> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(ProfileServiceError::EmptyDisplayName);
        }
        self.store
            .update(&profile_path(user)?, encode_display_name(name))
            .await?;
        Ok(())
    }

    /// Hide a path from the user's dashboard. Hiding twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the profile is missing or
    /// the write fails.
    pub async fn hide_path(&self, user: &UserId, path_id: &PathId) -> Result<(), ProfileServiceError> {
        self.store
            .array_union(
                &profile_path(user)?,
                HIDDEN_PATHS_FIELD,
                vec![Value::String(path_id.to_string())],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itetude_core::model::FALLBACK_DISPLAY_NAME;
    use storage::repository::InMemoryStore;

    fn service() -> ProfileService {
        ProfileService::new(Arc::new(InMemoryStore::new()))
    }

    fn account(uid: &str, email: Option<&str>, name: Option<&str>) -> AccountInfo {
        AccountInfo {
            uid: UserId::new(uid),
            email: email.map(str::to_owned),
            display_name: name.map(str::to_owned),
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn ensure_uses_fallback_names() {
        let profiles = service();
        let p = profiles
            .ensure_profile(account("u1", Some("lina@example.org"), None))
            .await
            .unwrap();
        assert_eq!(p.display_name, "lina");

        let p = profiles.ensure_profile(account("u2", None, None)).await.unwrap();
        assert_eq!(p.display_name, FALLBACK_DISPLAY_NAME);
    }

    #[tokio::test]
    async fn ensure_keeps_hidden_paths() {
        let profiles = service();
        let uid = UserId::new("u1");
        profiles
            .ensure_profile(account("u1", None, Some("Ada")))
            .await
            .unwrap();
        profiles.hide_path(&uid, &PathId::new("p1")).await.unwrap();
        profiles.hide_path(&uid, &PathId::new("p1")).await.unwrap();

        let again = profiles
            .ensure_profile(account("u1", None, Some("Ada")))
            .await
            .unwrap();
        assert!(again.hides(&PathId::new("p1")));

        let stored = profiles.get(&uid).await.unwrap().unwrap();
        assert_eq!(stored.hidden_paths.len(), 1);
    }

    #[tokio::test]
    async fn rename_requires_profile_and_name() {
        let profiles = service();
        let uid = UserId::new("u1");
        assert!(matches!(
            profiles.rename(&uid, "Ada").await,
            Err(ProfileServiceError::Storage(StorageError::NotFound(_)))
        ));
        profiles
            .ensure_profile(account("u1", None, Some("Ada")))
            .await
            .unwrap();
        assert!(matches!(
            profiles.rename(&uid, "  ").await,
            Err(ProfileServiceError::EmptyDisplayName)
        ));
        profiles.rename(&uid, "Ada L.").await.unwrap();
        assert_eq!(profiles.get(&uid).await.unwrap().unwrap().display_name, "Ada L.");
        assert_eq!(profiles.list().await.unwrap().len(), 1);
    }
}
