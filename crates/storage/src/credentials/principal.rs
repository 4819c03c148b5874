//! Principal record type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// An account that can authenticate: a stable identifier plus the salted
/// hash of its password.
///
/// Principals are immutable once provisioned. A password change is modelled
/// as removing the principal and creating a new one.
///
/// # Storage
///
/// Stored as JSON under `users/{id}` by
/// [`BackendCredentialStore`](super::BackendCredentialStore). Unknown fields
/// are rejected on read so that a record written by a different schema
/// surfaces as a serialization error instead of being half-parsed.
///
/// # Example
///
/// ```
/// use keyward_storage::credentials::Principal;
///
/// let principal = Principal::builder()
///     .id("alice@example.com")
///     .password_hash("3q2+7w==".to_owned())
///     .build();
///
/// assert_eq!(principal.id, "alice@example.com");
/// // The hash never shows up in debug output.
/// assert!(!format!("{principal:?}").contains("3q2+7w=="));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct Principal {
    /// Stable identifier, usually an email address. Compared byte-for-byte.
    #[builder(into)]
    pub id: String,

    /// Base64-encoded PBKDF2 digest of the password.
    ///
    /// Wrapped in [`Zeroizing`] so the digest is scrubbed from memory when
    /// the record is dropped.
    #[builder(into)]
    pub password_hash: Zeroizing<String>,

    /// When the principal was provisioned.
    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip_preserves_fields() {
        let principal =
            Principal::builder().id("bob@example.com").password_hash("aGFzaA==".to_owned()).build();

        let json = serde_json::to_vec(&principal).unwrap();
        let decoded: Principal = serde_json::from_slice(&json).unwrap();

        assert_eq!(decoded, principal);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{
            "id": "bob@example.com",
            "password_hash": "aGFzaA==",
            "created_at": "2024-01-01T00:00:00Z",
            "role": "admin"
        }"#;

        let result: Result<Principal, _> = serde_json::from_str(json);
        assert!(result.is_err(), "extra fields must not be accepted");
    }

    #[test]
    fn test_debug_redacts_hash() {
        let principal =
            Principal::builder().id("carol@example.com").password_hash("c2VjcmV0".to_owned()).build();

        let debug = format!("{principal:?}");
        assert!(debug.contains("carol@example.com"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("c2VjcmV0"));
    }
}
