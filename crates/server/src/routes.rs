use axum::{
    Router,
    extract::Request,
    http::HeaderName,
    routing::{get, post},
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    config::{Config, HEALTH_PATH},
    handlers::{self, AppState},
};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create router with state, request ids and request tracing applied
///
/// Login and verify paths come from configuration; the health route is fixed.
/// A caller-supplied `x-request-id` is kept, otherwise a UUID is generated.
/// Either way it is echoed on the response and recorded on the request span.
pub fn create_router(state: AppState, config: &Config) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    // Outermost last: the id is set before the trace span opens.
    Router::new()
        .route(&config.login_path, post(handlers::login))
        .route(&config.verify_path, post(handlers::verify))
        .route(HEALTH_PATH, get(handlers::healthz))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                request_id
            )
        }))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}
