use bazaar_auth::Role;
use bazaar_core::{SellerId, UserId};

/// Principal context for a request (authenticated identity + roles).
///
/// Derived from the bearer token only; handlers never take the acting user or
/// seller from the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
    seller_id: Option<SellerId>,
    roles: Vec<Role>,
}

impl PrincipalContext {
    pub fn new(user_id: UserId, seller_id: Option<SellerId>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            seller_id,
            roles,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Seller account the user acts for, if any.
    pub fn seller_id(&self) -> Option<SellerId> {
        self.seller_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }
}
