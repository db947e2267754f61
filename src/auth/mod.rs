//! Login authenticator.
//!
//! `authenticate` resolves the user kind to its record space, canonicalizes
//! teacher emails, looks the record up, and verifies the password. A missing
//! record and a wrong password fail the same way so callers cannot probe which
//! identifiers are registered.

pub mod email;
pub mod password;

pub use self::email::validate_email;
pub use self::password::{hash_password, verify_password};

use crate::store::UserStore;
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Hash verified when no record matches, so a miss costs the same as a wrong password.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("classauth-dummy-password").ok());

/// The two user populations, each with its own identifier space.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Teacher,
    Student,
}

impl UserKind {
    /// Table holding this kind's records.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    /// Column holding this kind's identifier.
    #[must_use]
    pub const fn id_column(self) -> &'static str {
        match self {
            Self::Teacher => "email",
            Self::Student => "user_name",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.table()
    }
}

impl std::fmt::Display for UserKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials for a single login attempt.
#[derive(Debug)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: SecretString,
    pub kind: UserKind,
}

impl LoginRequest {
    #[must_use]
    pub fn new(identifier: impl Into<String>, password: SecretString, kind: UserKind) -> Self {
        Self {
            identifier: identifier.into(),
            password,
            kind,
        }
    }
}

/// A successful login. The token is not stored anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email address: {0}")]
    InvalidIdentifierFormat(String),
    #[error("User does not exist")]
    InvalidCredentials,
    #[error("user store unavailable")]
    Store(#[source] anyhow::Error),
}

/// Verify `request` against the record space of its kind.
///
/// # Errors
/// - [`AuthError::InvalidIdentifierFormat`] when a teacher identifier is not a valid email.
/// - [`AuthError::InvalidCredentials`] when no record matches or the password is wrong.
/// - [`AuthError::Store`] when the lookup itself fails.
#[instrument(skip(store, request), fields(kind = %request.kind))]
pub async fn authenticate(
    store: &dyn UserStore,
    request: LoginRequest,
) -> Result<Session, AuthError> {
    let LoginRequest {
        identifier,
        password,
        kind,
    } = request;

    let identifier = match kind {
        UserKind::Teacher => validate_email(&identifier).map_err(|diagnostic| {
            debug!("Invalid teacher email: {diagnostic}");
            AuthError::InvalidIdentifierFormat(diagnostic)
        })?,
        UserKind::Student => identifier,
    };

    let record = store.find_one(kind, &identifier).await.map_err(|e| {
        error!("Error looking up {kind} record: {e:?}");
        AuthError::Store(e)
    })?;

    let verified = match &record {
        Some(record) => verify_password(password.expose_secret(), &record.password_hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password.expose_secret(), dummy);
            }
            false
        }
    };

    if !verified {
        debug!("Login rejected");
        return Err(AuthError::InvalidCredentials);
    }

    debug!("Login successful");

    Ok(Session {
        token: generate_token(),
    })
}

/// Fresh opaque bearer token (random v4 UUID).
#[must_use]
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}
