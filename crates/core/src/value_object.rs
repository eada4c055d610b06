//! Value object marker: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are immutable once constructed; to
/// "change" one, build a new value. In this workspace that covers money
/// amounts, normalized categories and variant attributes, all of which are
/// validated in their constructors so an invalid value never reaches an
/// aggregate.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Money { centavos: u64 }
///
/// impl ValueObject for Money {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
