//! Seller trust tiers: a policy fact about a seller, not about any listing.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{AggregateId, DomainError, DomainResult, SellerId, UserId};
use bazaar_events::Event;

/// Stream type under which tier assignments are stored (one stream per seller).
pub const TIER_AGGREGATE_TYPE: &str = "sellers.trust_tier";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierLevel {
    #[default]
    Standard,
    TrustedBrand,
    PremiumOutlet,
}

impl TierLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TierLevel::Standard => "standard",
            TierLevel::TrustedBrand => "trusted_brand",
            TierLevel::PremiumOutlet => "premium_outlet",
        }
    }

    /// Only elevated tiers may carry the assessment bypass.
    pub fn is_elevated(self) -> bool {
        matches!(self, TierLevel::TrustedBrand | TierLevel::PremiumOutlet)
    }
}

impl core::fmt::Display for TierLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(TierLevel::Standard),
            "trusted_brand" => Ok(TierLevel::TrustedBrand),
            "premium_outlet" => Ok(TierLevel::PremiumOutlet),
            other => Err(DomainError::validation(format!("unknown tier level '{other}'"))),
        }
    }
}

/// Trust tier of one seller.
///
/// Invariant: `bypasses_assessment` implies an elevated `tier_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SellerTrustTier {
    seller_id: SellerId,
    tier_level: TierLevel,
    bypasses_assessment: bool,
}

impl SellerTrustTier {
    pub fn new(
        seller_id: SellerId,
        tier_level: TierLevel,
        bypasses_assessment: bool,
    ) -> DomainResult<Self> {
        if bypasses_assessment && !tier_level.is_elevated() {
            return Err(DomainError::validation(format!(
                "tier '{tier_level}' cannot bypass assessment"
            )));
        }
        Ok(Self {
            seller_id,
            tier_level,
            bypasses_assessment,
        })
    }

    /// The tier every seller has until an admin says otherwise.
    pub fn standard(seller_id: SellerId) -> Self {
        Self {
            seller_id,
            tier_level: TierLevel::Standard,
            bypasses_assessment: false,
        }
    }

    pub fn seller_id(&self) -> SellerId {
        self.seller_id
    }

    pub fn tier_level(&self) -> TierLevel {
        self.tier_level
    }

    pub fn bypasses_assessment(&self) -> bool {
        self.bypasses_assessment
    }
}

/// Stored record of an administrative tier assignment.
///
/// Validated through [`SellerTrustTier::new`] before it is written and again
/// when it is read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAssigned {
    pub seller_id: SellerId,
    pub tier_level: TierLevel,
    pub bypasses_assessment: bool,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl TierAssigned {
    pub fn new(tier: SellerTrustTier, actor_id: UserId, occurred_at: DateTime<Utc>) -> Self {
        Self {
            seller_id: tier.seller_id,
            tier_level: tier.tier_level,
            bypasses_assessment: tier.bypasses_assessment,
            actor_id,
            occurred_at,
        }
    }

    pub fn tier(&self) -> DomainResult<SellerTrustTier> {
        SellerTrustTier::new(self.seller_id, self.tier_level, self.bypasses_assessment)
    }
}

impl Event for TierAssigned {
    fn event_type(&self) -> &'static str {
        "sellers.trust_tier.assigned"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Namespace for tier stream ids, so they never collide with listing streams.
const TIER_STREAM_NAMESPACE: uuid::Uuid =
    uuid::Uuid::from_u128(0x6b1f_3c2e_9a47_5d08_b3e1_27c4_f0a9_d512);

/// Stream id of a seller's tier history.
///
/// Derived as a UUIDv5 of the seller id, so a seller id that happens to equal
/// a listing id still maps to a distinct stream.
pub fn tier_stream_id(seller_id: SellerId) -> AggregateId {
    AggregateId::from_uuid(uuid::Uuid::new_v5(
        &TIER_STREAM_NAMESPACE,
        seller_id.as_uuid().as_bytes(),
    ))
}

/// Audit record of an administrative tier change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierChange {
    pub seller_id: SellerId,
    pub previous: Option<SellerTrustTier>,
    pub current: SellerTrustTier,
    pub actor_id: UserId,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_requires_elevated_tier() {
        let seller = SellerId::new();
        assert!(SellerTrustTier::new(seller, TierLevel::Standard, true).is_err());
        assert!(SellerTrustTier::new(seller, TierLevel::TrustedBrand, true).is_ok());
        assert!(SellerTrustTier::new(seller, TierLevel::PremiumOutlet, true).is_ok());
    }

    #[test]
    fn elevated_tier_without_bypass_is_allowed() {
        let tier = SellerTrustTier::new(SellerId::new(), TierLevel::TrustedBrand, false).unwrap();
        assert!(!tier.bypasses_assessment());
    }

    #[test]
    fn stored_assignment_is_revalidated_on_read() {
        let seller = SellerId::new();
        let mut record = TierAssigned::new(
            SellerTrustTier::new(seller, TierLevel::PremiumOutlet, true).unwrap(),
            UserId::new(),
            Utc::now(),
        );
        assert!(record.tier().unwrap().bypasses_assessment());

        record.tier_level = TierLevel::Standard;
        assert!(record.tier().is_err());
    }

    #[test]
    fn tier_stream_is_distinct_from_the_seller_id() {
        let seller = SellerId::new();
        assert_ne!(tier_stream_id(seller).as_uuid(), seller.as_uuid());
        assert_eq!(tier_stream_id(seller), tier_stream_id(seller));
        assert_ne!(tier_stream_id(seller), tier_stream_id(SellerId::new()));
    }

    #[test]
    fn tier_level_tokens_round_trip() {
        for level in [TierLevel::Standard, TierLevel::TrustedBrand, TierLevel::PremiumOutlet] {
            assert_eq!(level.as_str().parse::<TierLevel>().unwrap(), level);
            assert_eq!(
                serde_json::to_value(level).unwrap(),
                serde_json::Value::String(level.as_str().to_string())
            );
        }
    }
}
