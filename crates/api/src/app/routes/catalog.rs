use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use bazaar_auth::Permission;

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::dto;
use crate::context::PrincipalContext;

/// Purchasable listings, oldest verification first.
pub async fn list_catalog(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(resp) = CmdAuth::new((), Permission::CATALOG_READ).authorize(&principal) {
        return resp;
    }

    let items: Vec<_> = services
        .catalog()
        .list()
        .iter()
        .map(dto::catalog_entry_to_json)
        .collect();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
