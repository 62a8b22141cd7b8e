//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the ledger service
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: query/response DTOs and extraction helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router around already-built services.
pub fn build_app(jwt_secret: String, services: AppServices) -> Router {
    let jwt = Arc::new(stockledger_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}

/// Build the router from configuration (public entrypoint used by `main.rs`).
pub async fn build_app_from_config(config: &ApiConfig) -> anyhow::Result<Router> {
    let services = services::build_services(config).await?;
    Ok(build_app(config.jwt_secret.clone(), services))
}
