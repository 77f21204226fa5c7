//! Signed-in user context.
//!
//! `main` loads one `Session` per invocation and hands it to the command
//! handlers; nothing else reads the session file.

use crate::cli::Role;
use crate::domain::constants::USERS;
use crate::domain::models::{SessionFile, UserProfile};
use crate::error::AppError;
use crate::services::storage::load_session;
use crate::store::{fetch, DocumentStore};

#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<SessionFile>,
}

impl Session {
    #[cfg(test)]
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(file: SessionFile) -> Self {
        Self { user: Some(file) }
    }

    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            user: load_session()?,
        })
    }

    pub fn user(&self) -> Option<&SessionFile> {
        self.user.as_ref()
    }

    pub fn require_user(&self) -> Result<&SessionFile, AppError> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::Auth("invalid session; sign in again".to_string()))
    }

    /// Profile snapshot taken at sign-in.
    pub fn profile(&self) -> Option<&UserProfile> {
        self.user.as_ref().and_then(|u| u.profile.as_ref())
    }

    /// Role checks read the stored profile so a role change applies without a
    /// new sign-in.
    pub fn require_admin(&self, store: &dyn DocumentStore) -> Result<&SessionFile, AppError> {
        let user = self.require_user()?;
        let stored = fetch::<UserProfile>(store, USERS, &user.uid)
            .map_err(AppError::load("reading user profile"))?;
        match stored {
            Some(p) if p.doc.role == Role::Admin => Ok(user),
            _ => Err(AppError::Forbidden(
                "this operation requires the admin role".to_string(),
            )),
        }
    }
}
