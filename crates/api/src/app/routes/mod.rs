use axum::{Router, routing::get};

pub mod catalog;
pub mod common;
pub mod listings;
pub mod system;
pub mod tiers;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/listings", listings::router())
        .nest("/admin", tiers::router())
        .route("/catalog", get(catalog::list_catalog))
}
