use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockledger_auth::Permission;
use stockledger_core::ItemId;
use stockledger_inventory::{ItemForm, StockAdjustment};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/items", post(create_item))
        .route("/items/filter", get(filter_items))
        .route("/items/:id", get(get_item).put(edit_item).delete(delete_item))
        .route("/items/:id/increase", post(increase_stock))
        .route("/items/:id/decrease", post(decrease_stock))
}

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::DashboardQuery>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::ITEMS_READ) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };

    match services
        .ledger()
        .dashboard(actor, query.filter.as_deref(), query.page.as_deref())
        .await
    {
        Ok(dashboard) => (StatusCode::OK, Json(dashboard)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn filter_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ItemFilterQuery>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::ITEMS_READ) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };

    match services.ledger().filter_items(actor, query.name.as_deref()).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<ItemForm>, JsonRejection>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::ITEMS_WRITE) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };
    let form = match dto::json_body(body) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.ledger().create_item(actor, form).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::ITEMS_READ) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };
    let id: ItemId = match dto::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().get_item(actor, id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn edit_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<ItemForm>, JsonRejection>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::ITEMS_WRITE) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };
    let id: ItemId = match dto::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let form = match dto::json_body(body) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.ledger().edit_item(actor, id, form).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::ITEMS_WRITE) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };
    let id: ItemId = match dto::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().delete_item(actor, id).await {
        Ok(entry) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": id.to_string(),
                "entry": dto::MovementView::from(&entry),
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn increase_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<StockAdjustment>, JsonRejection>,
) -> axum::response::Response {
    adjust(services, principal, id, body, AdjustKind::Increase).await
}

pub async fn decrease_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<StockAdjustment>, JsonRejection>,
) -> axum::response::Response {
    adjust(services, principal, id, body, AdjustKind::Decrease).await
}

enum AdjustKind {
    Increase,
    Decrease,
}

async fn adjust(
    services: Arc<AppServices>,
    principal: PrincipalContext,
    id: String,
    body: Result<Json<StockAdjustment>, JsonRejection>,
    kind: AdjustKind,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::ITEMS_WRITE) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };
    let id: ItemId = match dto::parse_id(&id, "item") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let adjustment = match dto::json_body(body) {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let result = match kind {
        AdjustKind::Increase => services.ledger().increase(actor, id, adjustment).await,
        AdjustKind::Decrease => services.ledger().decrease(actor, id, adjustment).await,
    };

    match result {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
