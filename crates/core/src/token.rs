//! Opaque session tokens used for authentication-change detection.
//!
//! A token identifies "which authenticated identity, if any, is current"
//! purely for change detection. It is never an authorization credential.
//! The value must be unguessable: if it were derived from the user id, a
//! client could re-set a cleared cookie from script and navigate back to
//! a cached authenticated page.

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

/// Length of a generated token, matching the entropy of a strong
/// generated password (43 alphanumeric characters, ~256 bits).
const TOKEN_LENGTH: usize = 43;

/// Opaque proof of the current authenticated identity.
///
/// Invariant: the inner string is never empty. Absence of a token is
/// modeled as `Option<SessionToken>::None`, not as an empty value, so a
/// cleared cookie and a never-set cookie compare the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generate a fresh unguessable token.
    pub fn generate() -> Self {
        let value: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        Self(value)
    }

    /// Wrap an existing token value.
    ///
    /// Returns `None` for an empty string, preserving the non-empty
    /// invariant.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() { None } else { Some(Self(value)) }
    }

    /// The raw token string, suitable for a cookie value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
