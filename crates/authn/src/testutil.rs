//! Shared test utilities for authentication testing.
//!
//! Fixed secrets, ready-made codec/hasher/issuer instances, raw JWT builders
//! for attack testing, and the [`assert_auth_error!`] macro. Feature-gated
//! behind `testutil` to keep it out of production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! keyward-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use keyward_authn::testutil::{authenticator_with_users, craft_raw_jwt};
//! ```

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey};
use keyward_storage::credentials::StaticCredentialStore;

use crate::{
    Authenticator, issuer::TokenIssuer, jwt::TokenCodec, password::PasswordHasher,
};

/// Signing secret used by every helper in this module.
pub const TEST_SECRET: &[u8] = b"keyward-test-signing-secret";

/// Password salt used by every helper in this module.
pub const TEST_SALT: &[u8] = b"keyward-test-salt";

/// A codec keyed with [`TEST_SECRET`].
#[must_use]
pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET).expect("test secret is non-empty")
}

/// A hasher salted with [`TEST_SALT`].
#[must_use]
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(TEST_SALT.to_vec()).expect("test salt is non-empty")
}

/// An issuer over [`test_codec`] with default lifetimes.
#[must_use]
pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(test_codec())
}

/// An authenticator over a static store holding `users` as
/// `(principal_id, plaintext_password)` pairs, hashed with [`test_hasher`].
#[must_use]
pub fn authenticator_with_users(users: &[(&str, &str)]) -> Authenticator {
    let hasher = test_hasher();
    let store: StaticCredentialStore =
        users.iter().map(|(id, password)| (*id, hasher.hash(password))).collect();

    Authenticator::builder().store(Arc::new(store)).hasher(hasher).issuer(test_issuer()).build()
}

/// Creates a raw JWT string from arbitrary header and payload JSON.
///
/// The result has the structure `{header_b64}.{payload_b64}.` with an empty
/// signature, for testing rejection of unsigned or malformed tokens.
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_jwt(header_json: &serde_json::Value, payload_json: &serde_json::Value) -> String {
    format!("{}.", signing_input(header_json, payload_json))
}

/// Creates a JWT from arbitrary header and payload JSON, HS256-signed with
/// [`TEST_SECRET`] regardless of what the header claims.
///
/// Lets tests present a correctly signed token whose header or claims the
/// codec would never produce.
///
/// # Panics
///
/// Panics if JSON serialization or signing fails.
pub fn sign_raw_jwt(header_json: &serde_json::Value, payload_json: &serde_json::Value) -> String {
    let input = signing_input(header_json, payload_json);
    let signature = jsonwebtoken::crypto::sign(
        input.as_bytes(),
        &EncodingKey::from_secret(TEST_SECRET),
        Algorithm::HS256,
    )
    .expect("HMAC signing cannot fail");
    format!("{input}.{signature}")
}

fn signing_input(header_json: &serde_json::Value, payload_json: &serde_json::Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}")
}

/// Replaces the character at `position` of `token` with a different
/// base64url character.
///
/// # Panics
///
/// Panics if `position` is out of range or points at a `.` separator.
#[must_use]
pub fn flip_char(token: &str, position: usize) -> String {
    let mut bytes = token.as_bytes().to_vec();
    let original = bytes[position];
    assert_ne!(original, b'.', "position {position} is a separator");
    bytes[position] = if original == b'A' { b'B' } else { b'A' };
    String::from_utf8(bytes).expect("token is ASCII")
}

/// Alters one character in the middle of segment `segment` (0 = header,
/// 1 = payload, 2 = signature).
///
/// # Panics
///
/// Panics if the token has fewer segments or the segment is empty.
#[must_use]
pub fn tamper_segment(token: &str, segment: usize) -> String {
    let mut offset = 0;
    for (index, part) in token.split('.').enumerate() {
        if index == segment {
            assert!(!part.is_empty(), "segment {segment} is empty");
            return flip_char(token, offset + part.len() / 2);
        }
        offset += part.len() + 1;
    }
    panic!("token has no segment {segment}");
}

/// Asserts that a [`Result<T, AuthError>`](crate::AuthError) is an `Err` matching the given
/// variant.
///
/// The result expression is evaluated once. On failure, prints the expected
/// variant and the actual result.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use keyward_authn::{AuthError, assert_auth_error};
///
/// let result: Result<(), AuthError> = Err(AuthError::token_expired());
/// assert_auth_error!(result, TokenExpired);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        match $result {
            Err($crate::error::AuthError::$variant { .. }) => {},
            other => panic!("expected AuthError::{}, got: {:?}", stringify!($variant), other),
        }
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        match $result {
            Err($crate::error::AuthError::$variant { .. }) => {},
            other => {
                panic!("{}: expected AuthError::{}, got: {:?}", $msg, stringify!($variant), other)
            },
        }
    };
}
