use std::sync::Arc;

use axum::{
    Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::get,
};

use stockledger_auth::Permission;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/reports/most-sold", get(most_sold))
}

pub async fn most_sold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let actor = match require(&principal, Permission::REPORTS_READ) {
        Ok(a) => a,
        Err(e) => return errors::forbidden(e),
    };

    match services.ledger().most_sold(actor).await {
        Ok(rows) => {
            let items: Vec<dto::MostSoldView<'_>> =
                rows.iter().map(dto::MostSoldView::from).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::ledger_error_to_response(e),
    }
}
