use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use bazaar_core::{AggregateId, SellerId};
use bazaar_events::EventEnvelope;
use bazaar_listings::{LISTING_AGGREGATE_TYPE, ListingDraft, ListingEvent, ListingId};

/// A purchasable listing as the storefront sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub listing_id: ListingId,
    pub seller_id: SellerId,
    pub draft: ListingDraft,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CatalogProjectionError {
    #[error("failed to deserialize listing event: {0}")]
    Deserialize(String),

    #[error("event listing_id does not match envelope aggregate_id")]
    StreamMismatch,
}

#[derive(Debug, Clone)]
struct Tracked {
    seller_id: SellerId,
    draft: ListingDraft,
    verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    cursors: HashMap<AggregateId, u64>,
    listings: HashMap<ListingId, Tracked>,
    /// Listing ids in verification order.
    published: Vec<ListingId>,
    /// Envelopes that arrived ahead of their predecessor, keyed by sequence.
    pending: HashMap<AggregateId, BTreeMap<u64, EventEnvelope<JsonValue>>>,
}

/// Catalog publisher read model.
///
/// Consumes committed listing records from the bus and exposes a listing only
/// once it has been verified. Tracks the last applied sequence number per
/// stream, so redelivered envelopes are no-ops. Envelopes that arrive ahead
/// of a missing predecessor are held until the gap fills, then applied in
/// sequence order.
#[derive(Debug, Default)]
pub struct CatalogProjection {
    state: RwLock<State>,
}

impl CatalogProjection {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        match self.state.read() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self, listing_id: ListingId) -> Option<CatalogEntry> {
        let state = self.read();
        entry(listing_id, state.listings.get(&listing_id)?)
    }

    /// Purchasable listings, oldest verification first.
    pub fn list(&self) -> Vec<CatalogEntry> {
        let state = self.read();
        state
            .published
            .iter()
            .filter_map(|id| entry(*id, state.listings.get(id)?))
            .collect()
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CatalogProjectionError> {
        if envelope.aggregate_type() != LISTING_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        let mut state = self.write();

        let last = state.cursors.get(&aggregate_id).copied().unwrap_or(0);
        if seq <= last {
            return Ok(());
        }
        if seq != last + 1 {
            tracing::debug!(%aggregate_id, last, found = seq, "holding envelope until gap fills");
            state
                .pending
                .entry(aggregate_id)
                .or_default()
                .insert(seq, envelope.clone());
            return Ok(());
        }

        state.apply_next(envelope)?;
        state.drain_pending(aggregate_id)
    }

    /// Forget everything and replay `envelopes` in stream order.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), CatalogProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        *self.write() = State::default();

        envs.sort_by_key(|e| (*e.aggregate_id().as_uuid().as_bytes(), e.sequence_number()));

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}

impl State {
    /// Apply the envelope directly after the stream's cursor.
    fn apply_next(
        &mut self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), CatalogProjectionError> {
        let aggregate_id = envelope.aggregate_id();

        let ev: ListingEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| CatalogProjectionError::Deserialize(e.to_string()))?;
        if ev.listing_id().aggregate_id() != aggregate_id {
            return Err(CatalogProjectionError::StreamMismatch);
        }

        let listing_id = ev.listing_id();
        let verified = ev.verifies_listing();

        match ev {
            ListingEvent::ListingSubmitted(e) => {
                self.listings.insert(
                    listing_id,
                    Tracked {
                        seller_id: e.seller_id,
                        draft: e.draft,
                        verified_at: None,
                    },
                );
            }
            ListingEvent::ListingResubmitted(e) => {
                if let Some(tracked) = self.listings.get_mut(&listing_id) {
                    tracked.draft = e.draft;
                }
            }
            _ => {}
        }

        if verified {
            let at = envelope.occurred_at();
            let newly_published = match self.listings.get_mut(&listing_id) {
                Some(tracked) if tracked.verified_at.is_none() => {
                    tracked.verified_at = Some(at);
                    true
                }
                _ => false,
            };
            if newly_published {
                self.published.push(listing_id);
                tracing::info!(%listing_id, "listing published to catalog");
            }
        }

        self.cursors.insert(aggregate_id, envelope.sequence_number());
        Ok(())
    }

    /// Apply held envelopes that now follow the cursor without a gap.
    fn drain_pending(&mut self, aggregate_id: AggregateId) -> Result<(), CatalogProjectionError> {
        loop {
            let next = self.cursors.get(&aggregate_id).copied().unwrap_or(0) + 1;
            let Some(held) = self.pending.get_mut(&aggregate_id) else {
                return Ok(());
            };
            held.retain(|seq, _| *seq >= next);
            let Some(envelope) = held.remove(&next) else {
                if held.is_empty() {
                    self.pending.remove(&aggregate_id);
                }
                return Ok(());
            };
            self.apply_next(&envelope)?;
        }
    }
}

fn entry(listing_id: ListingId, tracked: &Tracked) -> Option<CatalogEntry> {
    Some(CatalogEntry {
        listing_id,
        seller_id: tracked.seller_id,
        draft: tracked.draft.clone(),
        verified_at: tracked.verified_at?,
    })
}
