use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;

use bazaar_auth::Permission;
use bazaar_core::SellerId;

use crate::app::routes::common::CmdAuth;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/sellers/:id/tier", get(get_tier).put(set_tier))
}

fn parse_seller_id(raw: &str) -> Result<SellerId, Response> {
    raw.parse().map_err(|_| errors::invalid_id("seller"))
}

pub async fn set_tier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetTierRequest>,
) -> Response {
    let seller_id = match parse_seller_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match CmdAuth::new(body, Permission::TIERS_MANAGE).authorize(&principal) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let actor_id = principal.user_id();
    let result = services
        .run_tiers(move |tiers| {
            let change = tiers.set_tier(
                seller_id,
                body.tier_level,
                body.bypasses_assessment,
                actor_id,
                Utc::now(),
            )?;
            Ok((change, tiers.get_tier(seller_id)?))
        })
        .await;

    match result {
        Ok((change, current)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "tier": dto::tier_to_json(&current),
                "changed": change.is_some(),
                "change": change.as_ref().map(dto::tier_change_to_json),
            })),
        )
            .into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_tier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let seller_id = match parse_seller_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = CmdAuth::new((), Permission::TIERS_MANAGE).authorize(&principal) {
        return resp;
    }

    let result = services
        .run_tiers(move |tiers| Ok((tiers.get_tier(seller_id)?, tiers.changes(seller_id)?)))
        .await;

    match result {
        Ok((current, changes)) => {
            let changes: Vec<_> = changes.iter().map(dto::tier_change_to_json).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "tier": dto::tier_to_json(&current),
                    "changes": changes,
                })),
            )
                .into_response()
        }
        Err(resp) => resp,
    }
}
