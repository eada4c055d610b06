use axum::http::StatusCode;
use axum::response::Response;

use bazaar_auth::{CommandAuthorization, Permission};
use bazaar_listings::ListingId;

use crate::app::errors;
use crate::context::PrincipalContext;

/// Small helper wrapper to associate required permissions with a command.
pub struct CmdAuth<C> {
    pub inner: C,
    pub required: Vec<Permission>,
}

impl<C> CmdAuth<C> {
    pub fn new(inner: C, required: Permission) -> Self {
        Self {
            inner,
            required: vec![required],
        }
    }

    /// Check the principal and hand back the wrapped command.
    pub fn authorize(self, principal: &PrincipalContext) -> Result<C, Response> {
        crate::authz::authorize_command(principal, &self)
            .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))?;
        Ok(self.inner)
    }
}

impl<C> CommandAuthorization for CmdAuth<C> {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

pub fn parse_listing_id(raw: &str) -> Result<ListingId, Response> {
    raw.parse().map_err(|_| errors::invalid_id("listing"))
}
