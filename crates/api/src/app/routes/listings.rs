use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use bazaar_auth::Permission;
use bazaar_core::SellerId;
use bazaar_infra::{AssessmentError, CommandMeta};
use bazaar_listings::ProductListing;

use crate::app::routes::common::{CmdAuth, parse_listing_id};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::has_permission;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_listing).get(list_listings))
        .route("/:id", get(get_listing))
        .route("/:id/history", get(listing_history))
        .route("/:id/resubmit", post(resubmit_listing))
        .route("/:id/approve-for-sample", post(approve_for_sample))
        .route("/:id/sample-received", post(sample_received))
        .route("/:id/logistics-note", post(logistics_note))
        .route("/:id/pass-quality-check", post(pass_quality_check))
        .route("/:id/reject", post(reject_listing))
        .route("/:id/request-revision", post(request_revision))
}

fn meta(principal: &PrincipalContext, expected_version: Option<u64>) -> CommandMeta {
    CommandMeta {
        actor_id: principal.user_id(),
        expected_version,
    }
}

fn forbidden(message: &str) -> Response {
    errors::json_error(StatusCode::FORBIDDEN, "forbidden", message)
}

fn ok(listing: &ProductListing) -> Response {
    (StatusCode::OK, Json(dto::listing_to_json(listing))).into_response()
}

/// Sellers only see their own listings; reviewers and admins see all.
///
/// Another seller's listing answers exactly like an unknown id.
fn ensure_visible(principal: &PrincipalContext, seller_id: SellerId) -> Result<(), Response> {
    if has_permission(principal, &Permission::LISTINGS_READ_ALL)
        || principal.seller_id() == Some(seller_id)
    {
        Ok(())
    } else {
        Err(errors::assessment_error_to_response(AssessmentError::NotFound))
    }
}

/// Seller account a submission is filed under.
fn submitting_seller(
    principal: &PrincipalContext,
    requested: Option<&str>,
) -> Result<SellerId, Response> {
    let requested = match requested {
        Some(raw) => Some(
            raw.parse::<SellerId>()
                .map_err(|_| errors::invalid_id("seller"))?,
        ),
        None => None,
    };

    match (principal.seller_id(), requested) {
        (Some(own), Some(other)) if own != other => {
            Err(forbidden("sellers may only submit for their own account"))
        }
        (Some(own), _) => Ok(own),
        (None, Some(seller)) => Ok(seller),
        (None, None) => Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "seller_id is required",
        )),
    }
}

pub async fn submit_listing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::SubmitListingRequest>,
) -> Response {
    let body = match CmdAuth::new(body, Permission::LISTINGS_SUBMIT).authorize(&principal) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let seller_id = match submitting_seller(&principal, body.seller_id.as_deref()) {
        Ok(seller_id) => seller_id,
        Err(resp) => return resp,
    };
    let draft = match body.listing.normalize() {
        Ok(draft) => draft,
        Err(e) => return errors::assessment_error_to_response(AssessmentError::from(e)),
    };

    let actor_id = principal.user_id();
    match services
        .run_engine(move |engine| engine.submit(seller_id, actor_id, draft))
        .await
    {
        Ok(listing) => (StatusCode::CREATED, Json(dto::listing_to_json(&listing))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn resubmit_listing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ResubmitListingRequest>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match CmdAuth::new(body, Permission::LISTINGS_SUBMIT).authorize(&principal) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let Some(seller_id) = principal.seller_id() else {
        return forbidden("only the owning seller may resubmit");
    };
    let draft = match body.listing.normalize() {
        Ok(draft) => draft,
        Err(e) => return errors::assessment_error_to_response(AssessmentError::from(e)),
    };

    let meta = meta(&principal, body.expected_version);
    match services
        .run_engine(move |engine| engine.resubmit(listing_id, seller_id, draft, meta))
        .await
    {
        Ok(listing) => ok(&listing),
        Err(resp) => resp,
    }
}

pub async fn approve_for_sample(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::VersionedRequest>>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let expected = body.and_then(|Json(b)| b.expected_version);
    let meta = match CmdAuth::new(meta(&principal, expected), Permission::LISTINGS_APPROVE_FOR_SAMPLE)
        .authorize(&principal)
    {
        Ok(meta) => meta,
        Err(resp) => return resp,
    };

    match services
        .run_engine(move |engine| engine.approve_for_sample_submission(listing_id, meta))
        .await
    {
        Ok(listing) => ok(&listing),
        Err(resp) => resp,
    }
}

pub async fn sample_received(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::VersionedRequest>>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let expected = body.and_then(|Json(b)| b.expected_version);
    let meta = match CmdAuth::new(meta(&principal, expected), Permission::LISTINGS_RECEIVE_SAMPLE)
        .authorize(&principal)
    {
        Ok(meta) => meta,
        Err(resp) => return resp,
    };

    match services
        .run_engine(move |engine| engine.record_sample_received(listing_id, meta))
        .await
    {
        Ok(listing) => ok(&listing),
        Err(resp) => resp,
    }
}

pub async fn logistics_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::LogisticsNoteRequest>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match CmdAuth::new(body, Permission::LISTINGS_LOGISTICS_NOTE).authorize(&principal) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let meta = meta(&principal, body.expected_version);
    match services
        .run_engine(move |engine| engine.set_logistics_note(listing_id, body.note, meta))
        .await
    {
        Ok(listing) => ok(&listing),
        Err(resp) => resp,
    }
}

pub async fn pass_quality_check(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<dto::VersionedRequest>>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let expected = body.and_then(|Json(b)| b.expected_version);
    let meta = match CmdAuth::new(meta(&principal, expected), Permission::LISTINGS_PASS_QUALITY)
        .authorize(&principal)
    {
        Ok(meta) => meta,
        Err(resp) => return resp,
    };

    match services
        .run_engine(move |engine| engine.pass_quality_check(listing_id, meta))
        .await
    {
        Ok(listing) => ok(&listing),
        Err(resp) => resp,
    }
}

pub async fn reject_listing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReasonRequest>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match CmdAuth::new(body, Permission::LISTINGS_REJECT).authorize(&principal) {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let meta = meta(&principal, body.expected_version);
    match services
        .run_engine(move |engine| engine.reject_listing(listing_id, body.reason, body.stage, meta))
        .await
    {
        Ok(listing) => ok(&listing),
        Err(resp) => resp,
    }
}

pub async fn request_revision(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReasonRequest>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match CmdAuth::new(body, Permission::LISTINGS_REQUEST_REVISION).authorize(&principal)
    {
        Ok(body) => body,
        Err(resp) => return resp,
    };

    let meta = meta(&principal, body.expected_version);
    match services
        .run_engine(move |engine| {
            engine.request_revision(listing_id, body.reason, body.stage, meta)
        })
        .await
    {
        Ok(listing) => ok(&listing),
        Err(resp) => resp,
    }
}

pub async fn get_listing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if !has_permission(&principal, &Permission::LISTINGS_READ) {
        return forbidden("missing permission listings.read");
    }

    let listing = match services.run_engine(move |engine| engine.load(listing_id)).await {
        Ok(listing) => listing,
        Err(resp) => return resp,
    };
    if let Err(resp) = ensure_visible(&principal, listing.seller_id()) {
        return resp;
    }
    ok(&listing)
}

pub async fn list_listings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListListingsQuery>,
) -> Response {
    if !has_permission(&principal, &Permission::LISTINGS_READ) {
        return forbidden("missing permission listings.read");
    }
    let requested = match query.seller_id.as_deref().map(str::parse::<SellerId>) {
        None => None,
        Some(Ok(seller_id)) => Some(seller_id),
        Some(Err(_)) => return errors::invalid_id("seller"),
    };

    let filter = if has_permission(&principal, &Permission::LISTINGS_READ_ALL) {
        requested
    } else {
        match (principal.seller_id(), requested) {
            (Some(own), Some(other)) if own != other => {
                return forbidden("sellers may only list their own listings");
            }
            (Some(own), _) => Some(own),
            (None, _) => return forbidden("no seller account on this token"),
        }
    };

    match services.run_engine(move |engine| engine.load_all(filter)).await {
        Ok(listings) => {
            let items: Vec<_> = listings.iter().map(dto::listing_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(resp) => resp,
    }
}

/// Audit trail of one listing; reviewers and admins only.
pub async fn listing_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let listing_id = match parse_listing_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(resp) = CmdAuth::new((), Permission::LISTINGS_HISTORY).authorize(&principal) {
        return resp;
    }

    let entries = match services
        .run_engine(move |engine| Ok(engine.history(listing_id)?.to_vec()?))
        .await
    {
        Ok(entries) => entries,
        Err(resp) => return resp,
    };

    let items: Vec<_> = entries.iter().map(dto::history_entry_to_json).collect();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "listing_id": listing_id.to_string(),
            "entries": items,
        })),
    )
        .into_response()
}
