//! Users and credential checks.

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthError, Claims};
use crate::error::Error;
use crate::store::Store;

/// How long a token issued by [`authenticate`] stays valid.
pub const TOKEN_LIFETIME: chrono::Duration = chrono::Duration::hours(1);

/// Someone who can exchange credentials for a token.
#[derive(Clone, Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// What is needed to register a user.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(min = 1, message = "at least one role is required"))]
    pub roles: Vec<String>,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "passwords do not match"))]
    pub password_confirm: String,
}

impl NewUser {
    /// Validates the input and hashes the password with `cost` rounds.
    pub fn into_user(self, now: DateTime<Utc>, cost: u32) -> Result<User, Error> {
        self.validate()?;
        let password_hash = bcrypt::hash(&self.password, cost).context("generating password hash")?;
        Ok(User {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            roles: self.roles,
            password_hash,
            date_created: now,
            date_updated: now,
        })
    }
}

/// Checks `email` and `password` against the store and, on success, returns
/// claims valid for [`TOKEN_LIFETIME`] from `now`.
///
/// An unknown email and a wrong password fail the same way, with
/// `AuthError::InvalidCredentials`.
pub async fn authenticate(
    store: &dyn Store,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<Claims, Error> {
    let Some(user) = store.find_user_by_email(email).await? else {
        return Err(AuthError::InvalidCredentials.into());
    };

    let password = password.to_owned();
    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("joining password check")?
        .context("verifying password hash")?;
    if !matches {
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(Claims::new(user.id.to_string(), user.roles, now, TOKEN_LIFETIME))
}
