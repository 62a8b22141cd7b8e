use axum::{Router, routing::get};

pub mod categories;
pub mod items;
pub mod movement_log;
pub mod reports;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/dashboard", get(items::dashboard))
        .merge(items::router())
        .merge(categories::router())
        .merge(movement_log::router())
        .merge(reports::router())
}
