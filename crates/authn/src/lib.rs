//! # Keyward Authentication
//!
//! Credential verification and the access/refresh token lifecycle.
//!
//! This crate provides:
//! - **Password hashing**: salted PBKDF2 with constant-time comparison
//! - **Token codec**: HS256 JWTs carrying `iss`, `iat` and `exp`, with the algorithm pinned
//! - **Token issuance**: access/refresh pairs sharing issuer and issue time
//! - **Verification**: the accept / renew / reject state machine
//! - **Authenticator**: login and verification over a pluggable credential store
//!
//! ## Flow
//!
//! ```text
//! login(id, password)
//!   └─► CredentialStore::lookup ─► PasswordHasher::verify ─► TokenIssuer::issue_pair
//!
//! verify(access?, refresh?)
//!   └─► TokenCodec::decode(access) ── ok ──► Accepted
//!          └─ fail ─► TokenCodec::decode(refresh) ── ok ──► Renewed (fresh pair)
//!                        └─ fail ─► Rejected
//! ```
//!
//! ## Example
//!
//! ```
//! use keyward_authn::{PasswordHasher, SessionVerifier, TokenCodec, TokenIssuer, Verdict};
//!
//! # fn main() -> Result<(), keyward_authn::AuthError> {
//! let issuer = TokenIssuer::new(TokenCodec::new(b"signing secret")?);
//! let pair = issuer.issue_pair("email1")?;
//!
//! let sessions = SessionVerifier::new(issuer);
//! assert_eq!(
//!     sessions.verify(Some(&pair.access_token), None),
//!     Verdict::Accepted { principal: "email1".into() }
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with fixed test secrets, raw JWT builders and
//!   the `assert_auth_error!` macro.

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Authentication error types.
pub mod error;
/// Token issuance.
pub mod issuer;
/// Token claims and codec.
pub mod jwt;
pub mod metrics;
/// Password hashing.
pub mod password;
/// Login and verification service.
pub mod service;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
/// Algorithm pinning.
pub mod validation;
/// Verification state machine.
pub mod verify;

// Re-export key types for convenience
pub use error::{AuthError, Result};
pub use issuer::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, MAX_TTL, TokenIssuer, TokenPair};
pub use jwt::{TokenClaims, TokenCodec};
pub use password::PasswordHasher;
pub use service::Authenticator;
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
pub use verify::{SessionVerifier, Verdict};
