//! Authentication error types.
//!
//! Token classifications ([`InvalidTokenFormat`](AuthError::InvalidTokenFormat),
//! [`InvalidSignature`](AuthError::InvalidSignature),
//! [`TokenExpired`](AuthError::TokenExpired),
//! [`UnsupportedAlgorithm`](AuthError::UnsupportedAlgorithm)) exist to drive
//! the verification state machine and never cross the service boundary.
//! Only [`InvalidCredentials`](AuthError::InvalidCredentials),
//! [`StoreUnavailable`](AuthError::StoreUnavailable) and
//! [`Configuration`](AuthError::Configuration) reach callers as distinct
//! conditions.

use keyward_storage::StorageError;
use thiserror::Error;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Downstream match expressions
/// must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Token is structurally invalid: wrong segment count, undecodable
    /// payload, unexpected claims, or an empty issuer.
    #[error("Invalid token format: {message}")]
    InvalidTokenFormat {
        /// What was wrong with the token.
        message: String,
    },

    /// Signature does not match the token contents under the signing secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token was validly signed but `now >= exp`.
    #[error("Token expired")]
    TokenExpired,

    /// Token header names an algorithm other than the pinned one.
    #[error("Unsupported algorithm: {message}")]
    UnsupportedAlgorithm {
        /// Which algorithm was presented and why it was refused.
        message: String,
    },

    /// Unknown principal or wrong password. The two cases are deliberately
    /// indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The credential store could not answer (down, timed out, or returned a
    /// corrupt record).
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),

    /// Missing or invalid startup configuration (empty secret or salt,
    /// non-positive TTL).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Which setting was rejected.
        message: String,
    },

    /// A token could not be produced.
    #[error("Token encoding failed: {message}")]
    TokenEncoding {
        /// Why encoding failed.
        message: String,
    },
}

impl AuthError {
    /// Creates an [`InvalidTokenFormat`](Self::InvalidTokenFormat) error.
    #[must_use]
    pub fn invalid_token_format(message: impl Into<String>) -> Self {
        Self::InvalidTokenFormat { message: message.into() }
    }

    /// Creates an [`InvalidSignature`](Self::InvalidSignature) error.
    #[must_use]
    pub fn invalid_signature() -> Self {
        Self::InvalidSignature
    }

    /// Creates a [`TokenExpired`](Self::TokenExpired) error.
    #[must_use]
    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    /// Creates an [`UnsupportedAlgorithm`](Self::UnsupportedAlgorithm) error.
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { message: message.into() }
    }

    /// Creates an [`InvalidCredentials`](Self::InvalidCredentials) error.
    #[must_use]
    pub fn invalid_credentials() -> Self {
        Self::InvalidCredentials
    }

    /// Creates a [`Configuration`](Self::Configuration) error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a [`TokenEncoding`](Self::TokenEncoding) error.
    #[must_use]
    pub fn token_encoding(message: impl Into<String>) -> Self {
        Self::TokenEncoding { message: message.into() }
    }
}

/// Only token production goes through `jsonwebtoken`'s fallible API;
/// decoding classifies failures itself.
impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::token_encoding(err.to_string())
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::StoreUnavailable(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
