use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use stockledger_auth::Permission;
use stockledger_core::CategoryId;
use stockledger_inventory::CategoryForm;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", delete(delete_category))
}

/// Any authenticated principal may list categories.
pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.ledger().list_categories().await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<CategoryForm>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = require(&principal, Permission::CATEGORIES_MANAGE) {
        return errors::forbidden(e);
    }
    let form = match dto::json_body(body) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.ledger().create_category(form).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = require(&principal, Permission::CATEGORIES_MANAGE) {
        return errors::forbidden(e);
    }
    let id: CategoryId = match dto::parse_id(&id, "category") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().delete_category(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
