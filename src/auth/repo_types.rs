use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object_id::ObjectId;

/// Access scope written into every session token.
pub const AUTH_ACCESS: &str = "auth";

/// One issued session token as stored on the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access: String,
    pub token: String,
}

/// User record as persisted.
#[derive(Clone)]
pub struct User {
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub tokens: Vec<AuthToken>,
    /// Plaintext waiting to be hashed by the write path. Never persisted.
    pending_password: Option<String>,
}

impl User {
    /// A fresh user whose password still has to go through the hashing step.
    pub fn new(name: String, email: String, password: String) -> Self {
        Self {
            id: ObjectId::new(),
            name,
            email,
            password_hash: String::new(),
            tokens: Vec::new(),
            pending_password: Some(password),
        }
    }

    /// Rebuilds a user loaded from storage.
    pub fn from_stored(
        id: ObjectId,
        name: String,
        email: String,
        password_hash: String,
        tokens: Vec<AuthToken>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            password_hash,
            tokens,
            pending_password: None,
        }
    }

    pub fn set_password(&mut self, plain: impl Into<String>) {
        self.pending_password = Some(plain.into());
    }

    pub fn password_modified(&self) -> bool {
        self.pending_password.is_some()
    }

    /// Hashes a pending password into `password_hash`. Does nothing when the
    /// password was not modified since the last save.
    pub async fn apply_password_change(&mut self) -> anyhow::Result<()> {
        if let Some(plain) = self.pending_password.take() {
            self.password_hash = super::password::hash_password_blocking(plain).await?;
        }
        Ok(())
    }

    pub fn has_token(&self, access: &str, token: &str) -> bool {
        self.tokens
            .iter()
            .any(|t| t.access == access && t.token == token)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("tokens", &self.tokens.len())
            .field("password_modified", &self.password_modified())
            .finish_non_exhaustive()
    }
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        }
    }
}
