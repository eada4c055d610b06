//! Reason ledger: the append-only audit trail of listing transitions.
//!
//! The ledger does not keep a second copy of anything. A listing's stream
//! records are both its state changes and its audit entries, so appending a
//! record here is the single write that moves a listing forward.

use serde::Deserialize as _;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::ExpectedVersion;
use bazaar_listings::{AssessmentEvent, LISTING_AGGREGATE_TYPE, ListingEvent, ListingId};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] EventStoreError),

    #[error("failed to deserialize listing record {sequence_number}: {message}")]
    Deserialize { sequence_number: u64, message: String },
}

/// Writer and reader of listing streams.
#[derive(Debug, Clone)]
pub struct ReasonLedger<S> {
    store: S,
}

impl<S> ReasonLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> ReasonLedger<S>
where
    S: EventStore,
{
    /// Append one record to the listing's stream, write-once.
    ///
    /// Fails with `EventStoreError::Concurrency` if the stream is no longer at
    /// `expected_version`. Advisory records (logistics notes) are stored too
    /// but never show up in [`history`](Self::history).
    pub fn append(
        &self,
        event: &ListingEvent,
        expected_version: ExpectedVersion,
    ) -> Result<StoredEvent, LedgerError> {
        let uncommitted = UncommittedEvent::from_typed(
            event.listing_id().aggregate_id(),
            LISTING_AGGREGATE_TYPE,
            Uuid::now_v7(),
            event,
        )?;

        let mut committed = self.store.append(vec![uncommitted], expected_version)?;
        committed.pop().ok_or_else(|| {
            LedgerError::Store(EventStoreError::InvalidAppend(
                "store committed no record".to_string(),
            ))
        })
    }

    /// Raw records of a listing stream, in sequence order.
    pub fn records(&self, listing_id: ListingId) -> Result<Vec<StoredEvent>, LedgerError> {
        Ok(self.store.load_stream(listing_id.aggregate_id())?)
    }

    /// Every listing that has a stream, in submission order.
    pub fn listing_ids(&self) -> Result<Vec<ListingId>, LedgerError> {
        Ok(self
            .store
            .stream_ids(LISTING_AGGREGATE_TYPE)?
            .into_iter()
            .map(ListingId::new)
            .collect())
    }

    /// Chronological transition history of one listing.
    ///
    /// The returned value is a snapshot of the stream at call time; iterating
    /// it decodes entries lazily and may be restarted any number of times.
    pub fn history(&self, listing_id: ListingId) -> Result<LedgerHistory, LedgerError> {
        Ok(LedgerHistory {
            records: self.records(listing_id)?,
        })
    }
}

/// Decode a stored listing record.
pub fn decode_record(stored: &StoredEvent) -> Result<ListingEvent, LedgerError> {
    decode_payload(stored.sequence_number, &stored.payload)
}

fn decode_payload(sequence_number: u64, payload: &JsonValue) -> Result<ListingEvent, LedgerError> {
    ListingEvent::deserialize(payload).map_err(|e| LedgerError::Deserialize {
        sequence_number,
        message: e.to_string(),
    })
}

/// Finite, restartable view of one listing's ledger entries.
#[derive(Debug, Clone)]
pub struct LedgerHistory {
    records: Vec<StoredEvent>,
}

impl LedgerHistory {
    /// Lazily decode entries in sequence (= chronological) order.
    pub fn iter(&self) -> impl Iterator<Item = Result<AssessmentEvent, LedgerError>> + '_ {
        self.records.iter().filter_map(|stored| {
            match decode_record(stored) {
                Ok(event) => AssessmentEvent::from_record(stored.sequence_number, &event).map(Ok),
                Err(e) => Some(Err(e)),
            }
        })
    }

    /// Decode every entry, failing on the first corrupt record.
    pub fn to_vec(&self) -> Result<Vec<AssessmentEvent>, LedgerError> {
        self.iter().collect()
    }

    /// True when the listing has no stream at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a LedgerHistory {
    type Item = Result<AssessmentEvent, LedgerError>;
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
