//! Token claims and the HS256 codec.
//!
//! A token is a compact JWT (`header.payload.signature`, base64url without
//! padding) whose payload carries exactly three claims:
//!
//! ```json
//! { "iss": "email1", "iat": 1700000000, "exp": 1700000060 }
//! ```
//!
//! Decoding fails closed and checks, in order:
//!
//! 1. three `.`-separated segments ([`AuthError::InvalidTokenFormat`])
//! 2. the HS256 signature over `header.payload` ([`AuthError::InvalidSignature`])
//! 3. the header `alg` against the pinned algorithm ([`AuthError::UnsupportedAlgorithm`])
//! 4. the payload shape ([`AuthError::InvalidTokenFormat`])
//! 5. expiry, `now >= exp` ([`AuthError::TokenExpired`])
//!
//! The signature is checked before anything in the token is trusted, so any
//! altered byte reports an invalid signature.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeDelta, Utc};
//! use keyward_authn::jwt::TokenCodec;
//!
//! let codec = TokenCodec::new(b"a signing secret")?;
//! let now = Utc::now();
//! let token = codec.encode("email1", now, TimeDelta::minutes(1))?;
//!
//! let claims = codec.decode_at(&token, now)?;
//! assert_eq!(claims.iss, "email1");
//! assert_eq!(claims.exp - claims.iat, 60);
//! # Ok::<(), keyward_authn::AuthError>(())
//! ```

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::{
    error::AuthError,
    validation::{SIGNING_ALGORITHM, validate_algorithm},
};

/// Claims carried by every access and refresh token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenClaims {
    /// Issuer: the authenticated principal's identifier.
    pub iss: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
}

impl TokenClaims {
    /// Whether the token is expired at `now`. A token is valid strictly
    /// before `exp`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Only the `alg` member matters; other header members are tolerated.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Signs and verifies tokens with a single symmetric secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Creates a codec for `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the secret is empty.
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::configuration("signing secret must not be empty"));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Encodes a token for `issuer` valid from `issued_at` for `ttl`.
    ///
    /// Timestamps are truncated to whole seconds, so `exp - iat` always
    /// equals `ttl` in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEncoding`] if the issuer is empty or the
    /// token cannot be serialized.
    pub fn encode(
        &self,
        issuer: &str,
        issued_at: DateTime<Utc>,
        ttl: TimeDelta,
    ) -> Result<String, AuthError> {
        if issuer.is_empty() {
            return Err(AuthError::token_encoding("issuer must not be empty"));
        }

        let iat = issued_at.timestamp();
        let exp = iat
            .checked_add(ttl.num_seconds())
            .ok_or_else(|| AuthError::token_encoding("expiry overflows"))?;
        let claims = TokenClaims { iss: issuer.to_owned(), iat, exp };

        Ok(jsonwebtoken::encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)?)
    }

    /// Decodes and fully validates a token against the current time.
    ///
    /// # Errors
    ///
    /// See [`decode_at`](Self::decode_at).
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.decode_at(token, Utc::now())
    }

    /// Decodes and fully validates a token as of `now`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidTokenFormat`]: not three segments, undecodable payload, missing or
    ///   unknown claims, or an empty issuer
    /// - [`AuthError::InvalidSignature`]: the signature does not match
    /// - [`AuthError::UnsupportedAlgorithm`]: the header names another algorithm
    /// - [`AuthError::TokenExpired`]: `now >= exp`
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header, payload, signature] = parts.as_slice() else {
            return Err(AuthError::invalid_token_format(format!(
                "JWT must have 3 parts separated by dots, found {}",
                parts.len()
            )));
        };

        let signing_input_len = header.len() + 1 + payload.len();
        let signing_input = &token[..signing_input_len];
        let signature_ok = jsonwebtoken::crypto::verify(
            signature,
            signing_input.as_bytes(),
            &self.decoding_key,
            SIGNING_ALGORITHM,
        )
        .unwrap_or(false);
        if !signature_ok {
            return Err(AuthError::invalid_signature());
        }

        let header: RawHeader = decode_segment(header, "header")?;
        validate_algorithm(&header.alg)?;

        let claims: TokenClaims = decode_segment(payload, "payload")?;
        if claims.iss.is_empty() {
            return Err(AuthError::invalid_token_format("issuer claim is empty"));
        }

        if claims.is_expired_at(now) {
            return Err(AuthError::token_expired());
        }

        Ok(claims)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str, what: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::invalid_token_format(format!("Failed to decode JWT {what}: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::invalid_token_format(format!("Failed to parse JWT {what}: {e}")))
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("secret", &"<redacted>")
            .finish()
    }
}
