//! Access/refresh token pair issuance.

use std::{fmt, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::{error::AuthError, jwt::TokenCodec};

/// Default access token lifetime.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(60);

/// Default refresh token lifetime.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(60 * 60);

/// Longest accepted lifetime for either token: ten years.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// A freshly issued access/refresh pair.
///
/// Both tokens carry the same issuer and issue time.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    /// Short-lived token presented on every request.
    pub access_token: String,
    /// Long-lived token used to obtain a new pair.
    pub refresh_token: String,
    /// Shared issue time of both tokens.
    pub issued_at: DateTime<Utc>,
    /// When the access token stops being accepted.
    pub access_expires_at: DateTime<Utc>,
    /// When the refresh token stops being accepted.
    pub refresh_expires_at: DateTime<Utc>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish()
    }
}

/// Produces token pairs with fixed lifetimes.
#[derive(Clone, Debug)]
pub struct TokenIssuer {
    codec: TokenCodec,
    access_ttl: TimeDelta,
    refresh_ttl: TimeDelta,
}

impl TokenIssuer {
    /// Creates an issuer with [`DEFAULT_ACCESS_TTL`] and [`DEFAULT_REFRESH_TTL`].
    #[must_use]
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            access_ttl: TimeDelta::seconds(DEFAULT_ACCESS_TTL.as_secs() as i64),
            refresh_ttl: TimeDelta::seconds(DEFAULT_REFRESH_TTL.as_secs() as i64),
        }
    }

    /// Replaces both lifetimes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if either lifetime is shorter than
    /// one second or longer than [`MAX_TTL`], or the refresh lifetime is
    /// shorter than the access lifetime.
    ///
    /// Lifetimes are truncated to whole seconds, matching the claims.
    pub fn with_ttls(mut self, access: Duration, refresh: Duration) -> Result<Self, AuthError> {
        let access = to_ttl(access, "access")?;
        let refresh = to_ttl(refresh, "refresh")?;
        if refresh < access {
            return Err(AuthError::configuration(
                "refresh token lifetime must not be shorter than access token lifetime",
            ));
        }
        self.access_ttl = access;
        self.refresh_ttl = refresh;
        Ok(self)
    }

    /// The codec used to sign and verify tokens.
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Access token lifetime.
    #[must_use]
    pub fn access_ttl(&self) -> TimeDelta {
        self.access_ttl
    }

    /// Refresh token lifetime.
    #[must_use]
    pub fn refresh_ttl(&self) -> TimeDelta {
        self.refresh_ttl
    }

    /// Issues a pair for `principal_id` as of the current time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEncoding`] if either token cannot be produced.
    pub fn issue_pair(&self, principal_id: &str) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(principal_id, Utc::now())
    }

    /// Issues a pair for `principal_id` with both tokens issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenEncoding`] if either token cannot be produced.
    pub fn issue_pair_at(
        &self,
        principal_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        // Whole seconds, matching the claims.
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0)
            .ok_or_else(|| AuthError::token_encoding("issue time out of range"))?;

        let access_token = self.codec.encode(principal_id, issued_at, self.access_ttl)?;
        let refresh_token = self.codec.encode(principal_id, issued_at, self.refresh_ttl)?;

        let expiry = |ttl: TimeDelta| {
            issued_at
                .checked_add_signed(ttl)
                .ok_or_else(|| AuthError::token_encoding("expiry out of range"))
        };

        Ok(TokenPair {
            access_token,
            refresh_token,
            issued_at,
            access_expires_at: expiry(self.access_ttl)?,
            refresh_expires_at: expiry(self.refresh_ttl)?,
        })
    }
}

fn to_ttl(ttl: Duration, which: &str) -> Result<TimeDelta, AuthError> {
    let secs = ttl.as_secs();
    if secs == 0 {
        return Err(AuthError::configuration(format!(
            "{which} token lifetime must be at least one second"
        )));
    }
    if secs > MAX_TTL.as_secs() {
        return Err(AuthError::configuration(format!(
            "{which} token lifetime must not exceed {} seconds",
            MAX_TTL.as_secs()
        )));
    }
    // Bounded by MAX_TTL above.
    Ok(TimeDelta::seconds(secs as i64))
}
