//! Salted password hashing and verification.
//!
//! Hashes are PBKDF2-HMAC-SHA1 over the password with a process-wide salt,
//! [`PBKDF2_ITERATIONS`] rounds and a [`DERIVED_KEY_LEN`]-byte output, stored
//! as standard (padded) base64. These parameters are fixed: changing any of
//! them invalidates every stored hash.
//!
//! # Example
//!
//! ```
//! use keyward_authn::password::PasswordHasher;
//!
//! let hasher = PasswordHasher::new(b"pepper-and-salt".to_vec())?;
//! let stored = hasher.hash("correct horse");
//!
//! assert!(hasher.verify(&stored, "correct horse"));
//! assert!(!hasher.verify(&stored, "correct horsf"));
//! # Ok::<(), keyward_authn::AuthError>(())
//! ```

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::AuthError;

/// PBKDF2 round count.
pub const PBKDF2_ITERATIONS: u32 = 4096;

/// Length of the derived key in bytes.
pub const DERIVED_KEY_LEN: usize = 32;

/// Derives and checks password hashes with a fixed salt.
///
/// Cloning is cheap enough for per-service use; the salt is zeroized on drop.
#[derive(Clone)]
pub struct PasswordHasher {
    salt: Zeroizing<Vec<u8>>,
}

impl PasswordHasher {
    /// Creates a hasher with the given salt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the salt is empty.
    pub fn new(salt: impl Into<Vec<u8>>) -> Result<Self, AuthError> {
        let salt = Zeroizing::new(salt.into());
        if salt.is_empty() {
            return Err(AuthError::configuration("password salt must not be empty"));
        }
        Ok(Self { salt })
    }

    /// Derives the stored representation of `password`.
    ///
    /// Deterministic: the same password and salt always give the same string.
    #[must_use]
    pub fn hash(&self, password: impl AsRef<[u8]>) -> String {
        STANDARD.encode(self.derive(password.as_ref()).as_slice())
    }

    /// Checks `password` against a stored hash.
    ///
    /// The comparison runs in constant time with respect to the position of
    /// the first differing byte. A stored hash of the wrong length simply
    /// fails to match.
    #[must_use]
    pub fn verify(&self, stored_hash: &str, password: impl AsRef<[u8]>) -> bool {
        let computed = Zeroizing::new(self.hash(password));
        computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
    }

    fn derive(&self, password: &[u8]) -> Zeroizing<[u8; DERIVED_KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
        pbkdf2_hmac::<Sha1>(password, &self.salt, PBKDF2_ITERATIONS, key.as_mut_slice());
        key
    }
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("salt", &"<redacted>")
            .field("iterations", &PBKDF2_ITERATIONS)
            .finish()
    }
}
