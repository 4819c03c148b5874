//! The authentication service: login and token verification.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use keyward_storage::{StorageError, credentials::CredentialStore};

use crate::{
    error::{AuthError, Result},
    issuer::{TokenIssuer, TokenPair},
    metrics,
    password::PasswordHasher,
    verify::{SessionVerifier, Verdict},
};

/// Stored-hash stand-in for unknown principals: 32 zero bytes, base64.
///
/// Verifying against it costs one full key derivation, the same as a real
/// principal, and no password derives to it in practice.
const DECOY_HASH: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

/// Logs principals in and verifies their tokens.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use keyward_authn::{Authenticator, PasswordHasher, TokenCodec, TokenIssuer, Verdict};
/// use keyward_storage::credentials::StaticCredentialStore;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), keyward_authn::AuthError> {
/// let hasher = PasswordHasher::new(b"salt".to_vec())?;
/// let store = StaticCredentialStore::from_iter([("email1", hasher.hash("password"))]);
///
/// let auth = Authenticator::builder()
///     .store(Arc::new(store))
///     .hasher(hasher)
///     .issuer(TokenIssuer::new(TokenCodec::new(b"secret")?))
///     .build();
///
/// let pair = auth.login("email1", "password").await?;
/// let verdict = auth.verify(Some(&pair.access_token), Some(&pair.refresh_token));
/// assert_eq!(verdict.principal(), Some("email1"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    sessions: SessionVerifier,
    lookup_timeout: Option<Duration>,
}

#[bon::bon]
impl Authenticator {
    /// Creates an authenticator.
    ///
    /// `lookup_timeout` bounds every credential store lookup made by
    /// [`login`](Self::login). Without it, lookups are unbounded.
    #[builder]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        lookup_timeout: Option<Duration>,
    ) -> Self {
        metrics::describe();
        Self { store, hasher, sessions: SessionVerifier::new(issuer), lookup_timeout }
    }
}

impl Authenticator {
    /// The password hasher, for provisioning new principals.
    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// The verification state machine.
    #[must_use]
    pub fn sessions(&self) -> &SessionVerifier {
        &self.sessions
    }

    /// Authenticates a principal and issues a token pair, bounding the store
    /// lookup by the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`login_with_deadline`](Self::login_with_deadline).
    pub async fn login(&self, principal_id: &str, password: &str) -> Result<TokenPair> {
        self.login_with_deadline(principal_id, password, self.lookup_timeout).await
    }

    /// Authenticates a principal and issues a token pair, bounding the store
    /// lookup by `deadline`.
    ///
    /// Unknown principals are checked against a decoy hash so both rejection
    /// paths do the same work. No tokens are issued unless the lookup and the
    /// password check both complete.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] for an unknown principal or a wrong password
    /// - [`AuthError::StoreUnavailable`] if the store fails or misses the deadline
    /// - [`AuthError::TokenEncoding`] if the pair cannot be produced
    #[tracing::instrument(skip(self, password, deadline))]
    pub async fn login_with_deadline(
        &self,
        principal_id: &str,
        password: &str,
        deadline: Option<Duration>,
    ) -> Result<TokenPair> {
        let started = Instant::now();
        let lookup = self.store.lookup(principal_id);
        let found = match deadline {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .unwrap_or_else(|_| Err(StorageError::timeout())),
            None => lookup.await,
        };
        metrics::record_store_lookup(started.elapsed());

        let principal = match found {
            Ok(principal) => principal,
            Err(e) => {
                tracing::warn!(error = %e, "credential store unavailable");
                metrics::record_login("store_unavailable");
                return Err(AuthError::StoreUnavailable(e));
            },
        };

        let stored_hash = principal.as_ref().map_or(DECOY_HASH, |p| p.password_hash.as_str());
        let password_ok = self.hasher.verify(stored_hash, password);
        if principal.is_none() || !password_ok {
            tracing::info!("login rejected");
            metrics::record_login("invalid_credentials");
            return Err(AuthError::invalid_credentials());
        }

        let pair = self.sessions.issuer().issue_pair(principal_id)?;
        tracing::info!("login succeeded");
        metrics::record_login("success");
        Ok(pair)
    }

    /// Verifies a request's tokens against the current time.
    #[tracing::instrument(skip_all)]
    pub fn verify(&self, access: Option<&str>, refresh: Option<&str>) -> Verdict {
        self.verify_at(access, refresh, Utc::now())
    }

    /// Verifies a request's tokens as of `now`.
    pub fn verify_at(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Verdict {
        let verdict = self.sessions.verify_at(access, refresh, now);
        tracing::debug!(outcome = verdict.outcome(), principal = ?verdict.principal(), "verified");
        metrics::record_verify(verdict.outcome());
        verdict
    }

    /// Checks that the credential store can serve lookups.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnavailable`] if the store is unhealthy.
    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await.map_err(AuthError::StoreUnavailable)
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("hasher", &self.hasher)
            .field("sessions", &self.sessions)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}
