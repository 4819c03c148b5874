//! End-to-end token lifecycle tests through the `Authenticator`.
//!
//! Covers login, verification, silent renewal, enumeration resistance and
//! store failures, against both credential store implementations.
#![allow(clippy::expect_used, clippy::panic)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use keyward_authn::{
    AuthError, Authenticator, TokenCodec, TokenIssuer, Verdict, assert_auth_error,
    testutil::{authenticator_with_users, tamper_segment, test_hasher, test_issuer},
};
use keyward_storage::{
    MemoryBackend, StorageError,
    credentials::{BackendCredentialStore, Principal},
    testutil::{FailingBackend, StalledBackend},
};
use rstest::rstest;
use tracing_subscriber::{Layer, fmt::MakeWriter, layer::SubscriberExt};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode_at(auth: &Authenticator, token: &str, now: DateTime<Utc>) -> keyward_authn::TokenClaims {
    auth.sessions().issuer().codec().decode_at(token, now).expect("token should decode")
}

async fn backend_authenticator(users: &[(&str, &str)]) -> Authenticator {
    let hasher = test_hasher();
    let store = BackendCredentialStore::new(MemoryBackend::new());
    for (id, password) in users {
        let principal = Principal::builder().id(*id).password_hash(hasher.hash(password)).build();
        store.create_user(&principal).await.expect("provision user");
    }
    Authenticator::builder().store(Arc::new(store)).hasher(hasher).issuer(test_issuer()).build()
}

/// Captures formatted log output for leak checks.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("lock poisoned")).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("lock poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ---------------------------------------------------------------------------
// The full scenario
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_verify_renew_reject_scenario() {
    let auth = authenticator_with_users(&[("email1", "password1"), ("email2", "password2")]);

    // Login issues a pair for the principal.
    let pair = auth.login("email1", "password1").await.expect("login should succeed");
    let login_time = pair.issued_at;
    assert_eq!(decode_at(&auth, &pair.access_token, login_time).iss, "email1");
    assert_eq!(decode_at(&auth, &pair.refresh_token, login_time).iss, "email1");

    // Wrong password is refused.
    assert_auth_error!(auth.login("email1", "password2").await, InvalidCredentials);

    // Fresh access token is accepted without reissue.
    assert_eq!(
        auth.verify_at(Some(&pair.access_token), Some(&pair.refresh_token), login_time),
        Verdict::Accepted { principal: "email1".into() }
    );

    // Access aged past one minute, refresh still within the hour: renewed.
    let later = login_time + TimeDelta::minutes(2);
    let verdict = auth.verify_at(Some(&pair.access_token), Some(&pair.refresh_token), later);
    let Verdict::Renewed { principal, tokens } = verdict else {
        panic!("expected renewal, got {verdict:?}");
    };
    assert_eq!(principal, "email1");
    let renewed = decode_at(&auth, &tokens.access_token, later);
    assert_eq!(renewed.iss, "email1");
    assert_eq!(renewed.exp, renewed.iat + 60);
    assert!(renewed.iat > login_time.timestamp());

    // The renewed pair is accepted in turn.
    assert!(matches!(
        auth.verify_at(Some(&tokens.access_token), Some(&tokens.refresh_token), later),
        Verdict::Accepted { .. }
    ));

    // A forged pair is rejected.
    let forged_access = tamper_segment(&pair.access_token, 1);
    let forged_refresh = tamper_segment(&pair.refresh_token, 1);
    assert_eq!(auth.verify_at(Some(&forged_access), Some(&forged_refresh), later), Verdict::Rejected);
}

#[tokio::test]
async fn renewal_after_refresh_expiry_is_rejected() {
    let auth = authenticator_with_users(&[("email1", "password1")]);
    let pair = auth.login("email1", "password1").await.expect("login");

    let after_refresh = pair.refresh_expires_at;
    assert_eq!(
        auth.verify_at(Some(&pair.access_token), Some(&pair.refresh_token), after_refresh),
        Verdict::Rejected
    );
}

#[tokio::test]
async fn custom_ttls_flow_through_login() {
    let issuer = TokenIssuer::new(TokenCodec::new(b"another secret").expect("codec"))
        .with_ttls(Duration::from_secs(300), Duration::from_secs(7200))
        .expect("ttls");
    let hasher = test_hasher();
    let store: keyward_storage::credentials::StaticCredentialStore =
        [("email1", hasher.hash("pw"))].into_iter().collect();
    let auth =
        Authenticator::builder().store(Arc::new(store)).hasher(hasher).issuer(issuer).build();

    let pair = auth.login("email1", "pw").await.expect("login");
    assert_eq!(pair.access_expires_at - pair.issued_at, TimeDelta::minutes(5));
    assert_eq!(pair.refresh_expires_at - pair.issued_at, TimeDelta::hours(2));
}

// ---------------------------------------------------------------------------
// Enumeration resistance
// ---------------------------------------------------------------------------

#[rstest]
#[case::unknown_principal("nobody", "password1")]
#[case::wrong_password("email1", "wrong")]
#[case::empty_password("email1", "")]
#[case::empty_principal("", "password1")]
#[tokio::test]
async fn rejected_logins_are_indistinguishable(#[case] id: &str, #[case] password: &str) {
    for auth in [
        authenticator_with_users(&[("email1", "password1")]),
        backend_authenticator(&[("email1", "password1")]).await,
    ] {
        let err = auth.login(id, password).await.expect_err("login must fail");
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid credentials");
    }
}

#[tokio::test]
async fn backend_store_login_matches_static_store() {
    let auth = backend_authenticator(&[("email1", "password1")]).await;
    let pair = auth.login("email1", "password1").await.expect("login");
    assert_eq!(decode_at(&auth, &pair.access_token, pair.issued_at).iss, "email1");
}

// ---------------------------------------------------------------------------
// Store failures are operational, never "invalid credentials"
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_store_is_unavailable() {
    let auth = Authenticator::builder()
        .store(Arc::new(BackendCredentialStore::new(FailingBackend::new())))
        .hasher(test_hasher())
        .issuer(test_issuer())
        .build();

    assert_auth_error!(auth.login("email1", "password1").await, StoreUnavailable);
}

#[tokio::test(start_paused = true)]
async fn stalled_store_times_out_as_unavailable() {
    let backend = StalledBackend::new(MemoryBackend::new(), Duration::from_secs(10));
    let auth = Authenticator::builder()
        .store(Arc::new(BackendCredentialStore::new(backend)))
        .hasher(test_hasher())
        .issuer(test_issuer())
        .build();

    let result = auth.login_with_deadline("email1", "password1", Some(Duration::from_secs(1))).await;
    assert!(matches!(result, Err(AuthError::StoreUnavailable(StorageError::Timeout))));
}

#[tokio::test(start_paused = true)]
async fn slow_store_within_deadline_succeeds() {
    let hasher = test_hasher();
    let backend = StalledBackend::new(MemoryBackend::new(), Duration::from_millis(200));
    let store = BackendCredentialStore::new(backend);
    let principal = Principal::builder().id("email1").password_hash(hasher.hash("password1")).build();
    store.create_user(&principal).await.expect("provision");

    let auth = Authenticator::builder()
        .store(Arc::new(store))
        .hasher(hasher)
        .issuer(test_issuer())
        .lookup_timeout(Duration::from_secs(1))
        .build();

    assert!(auth.login("email1", "password1").await.is_ok());
}

// ---------------------------------------------------------------------------
// Nothing secret reaches the logs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logs_never_contain_passwords_or_tokens() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_filter(tracing_subscriber::filter::LevelFilter::TRACE),
    );
    let _guard = tracing::subscriber::set_default(subscriber);

    let auth = authenticator_with_users(&[("email1", "hunter2-password")]);
    let pair = auth.login("email1", "hunter2-password").await.expect("login");
    let _ = auth.login("email1", "wrong-password-xyz").await;
    let _ = auth.verify(Some(&pair.access_token), Some(&pair.refresh_token));
    let _ = auth.verify(Some("garbage"), Some(&pair.refresh_token));

    let output = logs.contents();
    assert!(output.contains("login succeeded"), "expected login events, got: {output}");
    assert!(!output.contains("hunter2-password"));
    assert!(!output.contains("wrong-password-xyz"));
    assert!(!output.contains(&pair.access_token));
    assert!(!output.contains(&pair.refresh_token));
}
