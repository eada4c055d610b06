use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier carried in tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const DIGITAL_REVIEWER: Role = Role(Cow::Borrowed("digital_reviewer"));
    pub const QA_REVIEWER: Role = Role(Cow::Borrowed("qa_reviewer"));
    pub const LOGISTICS: Role = Role(Cow::Borrowed("logistics"));
    pub const SELLER: Role = Role(Cow::Borrowed("seller"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Permissions granted by this role. Unknown roles grant nothing.
    pub fn permissions(&self) -> Vec<Permission> {
        match self.as_str() {
            "admin" => vec![Permission::WILDCARD],
            "digital_reviewer" => vec![
                Permission::LISTINGS_APPROVE_FOR_SAMPLE,
                Permission::LISTINGS_REJECT,
                Permission::LISTINGS_REQUEST_REVISION,
                Permission::LISTINGS_READ,
                Permission::LISTINGS_READ_ALL,
                Permission::LISTINGS_HISTORY,
                Permission::CATALOG_READ,
            ],
            "qa_reviewer" => vec![
                Permission::LISTINGS_PASS_QUALITY,
                Permission::LISTINGS_REJECT,
                Permission::LISTINGS_REQUEST_REVISION,
                Permission::LISTINGS_READ,
                Permission::LISTINGS_READ_ALL,
                Permission::LISTINGS_HISTORY,
                Permission::CATALOG_READ,
            ],
            "logistics" => vec![
                Permission::LISTINGS_RECEIVE_SAMPLE,
                Permission::LISTINGS_LOGISTICS_NOTE,
                Permission::LISTINGS_READ,
                Permission::LISTINGS_READ_ALL,
                Permission::CATALOG_READ,
            ],
            "seller" => vec![
                Permission::LISTINGS_SUBMIT,
                Permission::LISTINGS_READ,
                Permission::CATALOG_READ,
            ],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Union of the permissions granted by `roles`, without duplicates.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    for perm in roles.iter().flat_map(Role::permissions) {
        if !out.contains(&perm) {
            out.push(perm);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviewers_cannot_act_on_each_others_stage() {
        let digital = Role::DIGITAL_REVIEWER.permissions();
        let qa = Role::QA_REVIEWER.permissions();

        assert!(digital.contains(&Permission::LISTINGS_APPROVE_FOR_SAMPLE));
        assert!(!digital.contains(&Permission::LISTINGS_PASS_QUALITY));
        assert!(qa.contains(&Permission::LISTINGS_PASS_QUALITY));
        assert!(!qa.contains(&Permission::LISTINGS_APPROVE_FOR_SAMPLE));
    }

    #[test]
    fn sellers_only_see_their_own_listings() {
        let perms = Role::SELLER.permissions();
        assert!(perms.contains(&Permission::LISTINGS_SUBMIT));
        assert!(!perms.contains(&Permission::LISTINGS_READ_ALL));
        assert!(!perms.contains(&Permission::LISTINGS_HISTORY));
    }

    #[test]
    fn combined_roles_are_deduplicated() {
        let perms = permissions_for_roles(&[Role::DIGITAL_REVIEWER, Role::QA_REVIEWER]);
        let reads = perms.iter().filter(|p| **p == Permission::LISTINGS_READ).count();
        assert_eq!(reads, 1);
        assert!(permissions_for_roles(&[Role::new("viewer")]).is_empty());
    }
}
