use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

use super::RouteBothExt;

/// Public Router Module
///
/// Endpoints reachable without a bearer token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /v1/account/login
        // Exchanges credentials for a 24-hour bearer token.
        .route_both("/v1/account/login", post(handlers::login))
}
