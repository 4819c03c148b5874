//! # Keyward Server
//!
//! HTTP transport for the Keyward token lifecycle.
//!
//! - `POST /auth/api/v1/login`: HTTP Basic credentials in, `access_token` and
//!   `refresh_token` cookies out.
//! - `POST /auth/api/v1/verify`: token cookies in, `{"email": ..}` out, with
//!   both cookies re-set when the pair was renewed.
//! - `GET /healthz`: credential store health.
//!
//! Both token paths are configurable. See [`config::Config`].

#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use keyward_authn::{Authenticator, PasswordHasher, TokenCodec, TokenIssuer};
use keyward_storage::{
    MemoryBackend,
    credentials::{BackendCredentialStore, CredentialStore, Principal, StaticCredentialStore},
};
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::{Config, CredentialSource},
    handlers::AppState,
};

pub mod config;
pub mod cookies;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod routes;

/// Builds the authenticator described by `config`.
///
/// Principals come from the users file. With [`CredentialSource::Memory`]
/// they are provisioned one by one into a fresh in-memory backend.
///
/// # Errors
///
/// Fails on a missing secret or salt, unusable TTLs, an unreadable users
/// file, or a duplicate principal while provisioning.
pub async fn build_authenticator(config: &Config) -> anyhow::Result<Authenticator> {
    let hasher = PasswordHasher::new(config.require_password_salt()?.expose().to_vec())?;
    let codec = TokenCodec::new(config.require_signing_secret()?.expose())?;
    let issuer = TokenIssuer::new(codec).with_ttls(config.access_ttl(), config.refresh_ttl())?;
    let users = config.load_users()?;
    let count = users.len();

    let store: Arc<dyn CredentialStore> = match config.credential_source {
        CredentialSource::Static => Arc::new(StaticCredentialStore::from_map(users)),
        CredentialSource::Memory => {
            let store = BackendCredentialStore::new(MemoryBackend::new());
            for (id, password_hash) in users {
                let principal = Principal::builder().id(id).password_hash(password_hash).build();
                store
                    .create_user(&principal)
                    .await
                    .with_context(|| format!("failed to provision principal {}", principal.id))?;
            }
            Arc::new(store)
        },
    };
    info!(source = %config.credential_source, principals = count, "Credential store ready");

    Ok(Authenticator::builder()
        .store(store)
        .hasher(hasher)
        .issuer(issuer)
        .lookup_timeout(config.lookup_timeout())
        .build())
}

/// Serves the HTTP API until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(config: &Config, auth: Authenticator) -> anyhow::Result<()> {
    let state = AppState::new(auth, config.secure_cookies);
    let router = routes::create_router(state, config);

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(listen = %config.listen, "Starting HTTP server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    info!("HTTP server stopped");
    Ok(())
}

/// Completes on Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed, that signal is ignored and the other
/// still triggers shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM signal, initiating shutdown");
        }
    }
}
