//! HTTP handlers for login, verification and health.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use keyward_authn::{AuthError, Authenticator, TokenPair, Verdict};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::cookies::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, get_cookie, pair_cookies};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Login and verification service.
    pub auth: Arc<Authenticator>,
    /// Whether token cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
}

impl AppState {
    /// Creates handler state around an authenticator.
    #[must_use]
    pub fn new(auth: Authenticator, secure_cookies: bool) -> Self {
        Self { auth: Arc::new(auth), secure_cookies }
    }
}

/// Body of a successful verification.
#[derive(Debug, Serialize)]
struct PrincipalResponse<'a> {
    email: &'a str,
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
}

/// Handler failures, each mapped to a fixed status and body.
#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed or rejected credentials or tokens.
    AccessDenied,
    /// The credential store could not answer.
    Unavailable,
    /// Anything else.
    Internal,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access denied",
            Self::Unavailable => "service unavailable",
            Self::Internal => "internal error",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::AccessDenied,
            AuthError::StoreUnavailable(_) => Self::Unavailable,
            other => {
                tracing::error!(error = %other, "login failed unexpectedly");
                Self::Internal
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorResponse { error: self.message() })).into_response()
    }
}

/// Decodes `Authorization: Basic <base64(id:password)>`.
///
/// The decoded buffer holding the password is zeroized on drop.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, Zeroizing<String>)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = Zeroizing::new(STANDARD.decode(encoded.trim()).ok()?);
    let decoded = std::str::from_utf8(&decoded).ok()?;
    let (id, password) = decoded.split_once(':')?;
    Some((id.to_owned(), Zeroizing::new(password.to_owned())))
}

/// Attaches both token cookies to a response.
fn with_pair_cookies(mut response: Response, pair: &TokenPair, secure: bool) -> Result<Response, ApiError> {
    let cookies = pair_cookies(pair, secure).ok_or_else(|| {
        tracing::error!("issued tokens are not valid cookie values");
        ApiError::Internal
    })?;
    for cookie in cookies {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Login endpoint
///
/// POST with HTTP Basic credentials. Sets `access_token` and `refresh_token`
/// cookies on success.
pub async fn login(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let Some((principal_id, password)) = basic_credentials(&headers) else {
        tracing::debug!("login without usable basic credentials");
        return Err(ApiError::AccessDenied);
    };

    let pair = state.auth.login(&principal_id, &password).await?;
    with_pair_cookies(StatusCode::OK.into_response(), &pair, state.secure_cookies)
}

/// Verify endpoint
///
/// Reads the token cookies. A renewal re-sets both cookies.
pub async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let access = get_cookie(&headers, ACCESS_COOKIE_NAME);
    let refresh = get_cookie(&headers, REFRESH_COOKIE_NAME);

    match state.auth.verify(access, refresh) {
        Verdict::Accepted { principal } => {
            Ok(Json(PrincipalResponse { email: &principal }).into_response())
        },
        Verdict::Renewed { principal, tokens } => {
            let response = Json(PrincipalResponse { email: &principal }).into_response();
            with_pair_cookies(response, &tokens, state.secure_cookies)
        },
        Verdict::Rejected => Err(ApiError::AccessDenied),
    }
}

/// Health endpoint: 200 while the credential store answers, 503 otherwise.
pub async fn healthz(State(state): State<AppState>) -> Response {
    match state.auth.health_check().await {
        Ok(()) => Json(serde_json::json!({"status": "ok"})).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            ApiError::Unavailable.into_response()
        },
    }
}
