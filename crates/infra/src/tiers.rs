//! Seller trust tiers: the bypass decision and its administrative registry.
//!
//! Each seller's assignments are an append-only stream of [`TierAssigned`]
//! records in the event store, separate from any listing stream. The latest
//! record is the current tier; the whole stream is the audit trail.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::{DomainError, ExpectedVersion, SellerId, UserId};
use bazaar_listings::{
    SellerTrustTier, TIER_AGGREGATE_TYPE, TierAssigned, TierChange, TierLevel, tier_stream_id,
};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum TierError {
    /// The requested tier violates the bypass invariant.
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("tier store failure: {0}")]
    Store(#[from] EventStoreError),

    #[error("failed to deserialize tier record {sequence_number}: {message}")]
    Deserialize { sequence_number: u64, message: String },
}

/// Bypass decision consulted once per (re)submission.
///
/// Implementations must read the current tier on every call; callers rely on
/// a tier change taking effect for the very next submission.
pub trait TierPolicy: Send + Sync {
    fn tier(&self, seller_id: SellerId) -> Result<SellerTrustTier, TierError>;

    fn is_bypassed(&self, seller_id: SellerId) -> Result<bool, TierError> {
        Ok(self.tier(seller_id)?.bypasses_assessment())
    }
}

impl<P> TierPolicy for Arc<P>
where
    P: TierPolicy + ?Sized,
{
    fn tier(&self, seller_id: SellerId) -> Result<SellerTrustTier, TierError> {
        (**self).tier(seller_id)
    }
}

/// Event-store backed tier registry.
#[derive(Debug, Clone)]
pub struct TierRegistry<S> {
    store: S,
}

impl<S> TierRegistry<S>
where
    S: EventStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn load(&self, seller_id: SellerId) -> Result<Vec<(u64, TierAssigned)>, TierError> {
        self.store
            .load_stream(tier_stream_id(seller_id))?
            .into_iter()
            .map(|stored| {
                if stored.aggregate_type != TIER_AGGREGATE_TYPE {
                    return Err(TierError::Store(EventStoreError::AggregateTypeMismatch(
                        format!(
                            "expected {TIER_AGGREGATE_TYPE}, found {}",
                            stored.aggregate_type
                        ),
                    )));
                }
                decode(stored)
            })
            .collect()
    }

    /// Assign a tier. Idempotent: re-assigning the current tier writes nothing.
    ///
    /// Returns the audit record when something changed.
    pub fn set_tier(
        &self,
        seller_id: SellerId,
        tier_level: TierLevel,
        bypasses_assessment: bool,
        actor_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<TierChange>, TierError> {
        let requested = SellerTrustTier::new(seller_id, tier_level, bypasses_assessment)?;

        let history = self.load(seller_id)?;
        let version = history.last().map(|(seq, _)| *seq).unwrap_or(0);
        let previous = match history.last() {
            Some((_, record)) => Some(record.tier()?),
            None => None,
        };

        if previous.unwrap_or_else(|| SellerTrustTier::standard(seller_id)) == requested {
            tracing::debug!(%seller_id, tier = %tier_level, "tier unchanged");
            return Ok(None);
        }

        let record = TierAssigned::new(requested, actor_id, at);
        let uncommitted = UncommittedEvent::from_typed(
            tier_stream_id(seller_id),
            TIER_AGGREGATE_TYPE,
            Uuid::now_v7(),
            &record,
        )?;
        self.store
            .append(vec![uncommitted], ExpectedVersion::Exact(version))?;

        tracing::info!(
            %seller_id,
            %actor_id,
            tier = %tier_level,
            bypasses_assessment,
            "seller tier changed"
        );

        Ok(Some(TierChange {
            seller_id,
            previous,
            current: requested,
            actor_id,
            changed_at: at,
        }))
    }

    /// Current tier; sellers without a record are `standard` without bypass.
    pub fn get_tier(&self, seller_id: SellerId) -> Result<SellerTrustTier, TierError> {
        match self.load(seller_id)?.last() {
            Some((_, record)) => Ok(record.tier()?),
            None => Ok(SellerTrustTier::standard(seller_id)),
        }
    }

    /// Audit trail of every change for one seller, oldest first.
    pub fn changes(&self, seller_id: SellerId) -> Result<Vec<TierChange>, TierError> {
        let mut previous: Option<SellerTrustTier> = None;
        let mut out = Vec::new();
        for (_, record) in self.load(seller_id)? {
            let current = record.tier()?;
            out.push(TierChange {
                seller_id,
                previous,
                current,
                actor_id: record.actor_id,
                changed_at: record.occurred_at,
            });
            previous = Some(current);
        }
        Ok(out)
    }
}

impl<S> TierPolicy for TierRegistry<S>
where
    S: EventStore,
{
    fn tier(&self, seller_id: SellerId) -> Result<SellerTrustTier, TierError> {
        self.get_tier(seller_id)
    }
}

fn decode(stored: StoredEvent) -> Result<(u64, TierAssigned), TierError> {
    let seq = stored.sequence_number;
    serde_json::from_value(stored.payload)
        .map(|record| (seq, record))
        .map_err(|e| TierError::Deserialize {
            sequence_number: seq,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use bazaar_core::AggregateId;
    use bazaar_listings::LISTING_AGGREGATE_TYPE;

    use super::*;
    use crate::event_store::InMemoryEventStore;

    fn registry() -> TierRegistry<Arc<InMemoryEventStore>> {
        TierRegistry::new(Arc::new(InMemoryEventStore::new()))
    }

    #[test]
    fn unknown_seller_is_standard_and_not_bypassed() {
        let reg = registry();
        let seller = SellerId::new();
        assert_eq!(reg.get_tier(seller).unwrap(), SellerTrustTier::standard(seller));
        assert!(!reg.is_bypassed(seller).unwrap());
    }

    #[test]
    fn set_tier_is_idempotent_and_audited() {
        let reg = registry();
        let seller = SellerId::new();
        let admin = UserId::new();
        let now = Utc::now();

        let change = reg
            .set_tier(seller, TierLevel::TrustedBrand, true, admin, now)
            .unwrap()
            .unwrap();
        assert_eq!(change.previous, None);
        assert!(reg.is_bypassed(seller).unwrap());

        assert!(reg
            .set_tier(seller, TierLevel::TrustedBrand, true, admin, now)
            .unwrap()
            .is_none());

        reg.set_tier(seller, TierLevel::TrustedBrand, false, admin, now)
            .unwrap();
        assert!(!reg.is_bypassed(seller).unwrap());

        let audit = reg.changes(seller).unwrap();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[1].previous.map(|t| t.bypasses_assessment()), Some(true));
    }

    #[test]
    fn bypass_without_elevated_tier_is_refused() {
        let reg = registry();
        let seller = SellerId::new();
        let err = reg
            .set_tier(seller, TierLevel::Standard, true, UserId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, TierError::Invalid(DomainError::Validation(_))));
        assert!(reg.changes(seller).unwrap().is_empty());
    }

    #[test]
    fn seller_id_equal_to_a_listing_id_has_its_own_stream() {
        let store = Arc::new(InMemoryEventStore::new());
        let reg = TierRegistry::new(store.clone());
        let listing = AggregateId::new();
        store
            .append(
                vec![UncommittedEvent {
                    event_id: Uuid::now_v7(),
                    aggregate_id: listing,
                    aggregate_type: LISTING_AGGREGATE_TYPE.to_string(),
                    event_type: "listings.listing.submitted".to_string(),
                    event_version: 1,
                    occurred_at: Utc::now(),
                    payload: serde_json::json!({ "unrelated": true }),
                }],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let seller = SellerId::from_uuid(*listing.as_uuid());
        assert_eq!(reg.get_tier(seller).unwrap(), SellerTrustTier::standard(seller));
        reg.set_tier(seller, TierLevel::PremiumOutlet, true, UserId::new(), Utc::now())
            .unwrap();
        assert!(reg.is_bypassed(seller).unwrap());
        assert_eq!(store.load_stream(listing).unwrap().len(), 1);
    }

    #[test]
    fn setting_standard_on_unknown_seller_writes_nothing() {
        let reg = registry();
        let seller = SellerId::new();
        assert!(reg
            .set_tier(seller, TierLevel::Standard, false, UserId::new(), Utc::now())
            .unwrap()
            .is_none());
    }
}
