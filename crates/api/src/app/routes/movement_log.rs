use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockledger_auth::Permission;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/movement-log", get(list_movements))
        .route("/movement-log/clear", post(clear_movements))
}

/// Newest first; superusers see every user's entries.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::LOGS_READ) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };

    match services.ledger().movement_log(actor).await {
        Ok(entries) => {
            let items: Vec<dto::MovementView<'_>> =
                entries.iter().map(dto::MovementView::from).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn clear_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::LOGS_CLEAR) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };

    match services.ledger().clear_logs(actor).await {
        Ok(removed) => {
            let scope = if actor.superuser { "all" } else { "own" };
            (
                StatusCode::OK,
                Json(serde_json::json!({ "removed": removed, "scope": scope })),
            )
                .into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}
