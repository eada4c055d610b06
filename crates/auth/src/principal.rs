use bazaar_core::{SellerId, UserId};

use crate::{Permission, Role, permissions_for_roles};

/// A fully resolved principal for authorization decisions.
///
/// `seller_id` is present when the user acts on behalf of a seller account;
/// seller-scoped routes use it instead of trusting ids from the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub seller_id: Option<SellerId>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    /// Resolve effective permissions from roles.
    pub fn from_roles(user_id: UserId, seller_id: Option<SellerId>, roles: Vec<Role>) -> Self {
        let permissions = permissions_for_roles(&roles);
        Self {
            user_id,
            seller_id,
            roles,
            permissions,
        }
    }

    pub fn has(&self, required: &Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| p.is_wildcard() || p == required)
    }
}
