use std::sync::RwLock;

use itetude_core::model::UserId;

/// Supplies the signed-in user, if any.
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Auth state held in process, switched by explicit sign-in/out calls.
#[derive(Debug, Default)]
pub struct SessionAuth {
    user: RwLock<Option<UserId>>,
}

impl SessionAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn signed_in(user: UserId) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: UserId) {
        if let Ok(mut guard) = self.user.write() {
            *guard = Some(user);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.user.write() {
            *guard = None;
        }
    }
}

impl AuthProvider for SessionAuth {
    fn current_user(&self) -> Option<UserId> {
        self.user.read().ok().and_then(|guard| guard.clone())
    }
}
