use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "listings.approve_for_sample").
/// The wildcard `"*"` is granted to administrators and allows everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission::from_static("*");

    pub const LISTINGS_SUBMIT: Permission = Permission::from_static("listings.submit");
    pub const LISTINGS_APPROVE_FOR_SAMPLE: Permission =
        Permission::from_static("listings.approve_for_sample");
    pub const LISTINGS_RECEIVE_SAMPLE: Permission = Permission::from_static("listings.receive_sample");
    pub const LISTINGS_LOGISTICS_NOTE: Permission = Permission::from_static("listings.logistics_note");
    pub const LISTINGS_PASS_QUALITY: Permission = Permission::from_static("listings.pass_quality");
    pub const LISTINGS_REJECT: Permission = Permission::from_static("listings.reject");
    pub const LISTINGS_REQUEST_REVISION: Permission =
        Permission::from_static("listings.request_revision");
    pub const LISTINGS_READ: Permission = Permission::from_static("listings.read");
    /// Read listings of every seller (administrative view).
    pub const LISTINGS_READ_ALL: Permission = Permission::from_static("listings.read_all");
    pub const LISTINGS_HISTORY: Permission = Permission::from_static("listings.history");
    pub const TIERS_MANAGE: Permission = Permission::from_static("tiers.manage");
    pub const CATALOG_READ: Permission = Permission::from_static("catalog.read");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
