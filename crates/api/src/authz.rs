//! API-side authorization guard for commands.
//!
//! This enforces authorization at the command boundary (before the engine is
//! called), while keeping the domain and infra crates auth-agnostic.

use bazaar_auth::{AuthzError, CommandAuthorization, Permission, Principal, authorize};

use crate::context::PrincipalContext;

fn principal(ctx: &PrincipalContext) -> Principal {
    Principal::from_roles(ctx.user_id(), ctx.seller_id(), ctx.roles().to_vec())
}

/// Check authorization for a command in the current request context.
///
/// This is intended to be called **before** dispatching a command.
pub fn authorize_command<C: CommandAuthorization>(
    ctx: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = principal(ctx);
    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }
    Ok(())
}

/// Whether the request's principal holds `permission`.
pub fn has_permission(ctx: &PrincipalContext, permission: &Permission) -> bool {
    principal(ctx).has(permission)
}

#[cfg(test)]
mod tests {
    use bazaar_auth::Role;
    use bazaar_core::{SellerId, UserId};

    use super::*;

    struct Needs(Vec<Permission>);

    impl CommandAuthorization for Needs {
        fn required_permissions(&self) -> &[Permission] {
            &self.0
        }
    }

    #[test]
    fn every_required_permission_must_be_held() {
        let qa = PrincipalContext::new(UserId::new(), None, vec![Role::QA_REVIEWER]);
        assert!(authorize_command(&qa, &Needs(vec![Permission::LISTINGS_PASS_QUALITY])).is_ok());
        assert!(
            authorize_command(
                &qa,
                &Needs(vec![
                    Permission::LISTINGS_PASS_QUALITY,
                    Permission::LISTINGS_APPROVE_FOR_SAMPLE,
                ])
            )
            .is_err()
        );
    }

    #[test]
    fn sellers_cannot_read_other_sellers() {
        let seller = PrincipalContext::new(UserId::new(), Some(SellerId::new()), vec![Role::SELLER]);
        assert!(has_permission(&seller, &Permission::LISTINGS_READ));
        assert!(!has_permission(&seller, &Permission::LISTINGS_READ_ALL));
    }
}
