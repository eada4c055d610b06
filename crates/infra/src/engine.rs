//! Assessment engine: the command pipeline for listings.
//!
//! ```text
//! command
//!   ↓ load the listing stream and rehydrate
//!   ↓ check the caller's expected version (if any)
//!   ↓ handle (pure: validates the source state, decides one record)
//!   ↓ append with ExpectedVersion::Exact(loaded version)
//!   ↓ publish the committed record on the bus
//! ```
//!
//! The append is the only write. Because it is conditional on the version the
//! decision was made against, two writers racing from the same state cannot
//! both succeed: the loser gets [`AssessmentError::ConcurrencyConflict`] and
//! may retry, which re-reads the stream and re-checks the precondition.

use serde_json::Value as JsonValue;
use thiserror::Error;

use bazaar_core::{
    Aggregate, AggregateRoot, Clock, DomainError, ExpectedVersion, SellerId, UserId,
};
use bazaar_events::{EventBus, EventEnvelope};
use bazaar_listings::{
    ApproveForSampleSubmission, LISTING_AGGREGATE_TYPE, ListingCommand, ListingDraft, ListingId,
    PassQualityCheck, ProductListing, RecordSampleReceived, RejectListing, RequestRevision,
    ResubmissionPolicy, ResubmitListing, ReviewStage, SetLogisticsNote, SubmitListing,
};

use crate::event_store::{EventStore, EventStoreError, StoredEvent};
use crate::ledger::{LedgerError, LedgerHistory, ReasonLedger, decode_record};
use crate::tiers::{TierError, TierPolicy};

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cannot {action} while listing is {from}")]
    InvalidTransition { from: String, action: String },

    #[error("listing not found")]
    NotFound,

    /// Another writer moved the listing first. Reload and retry.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("storage failure: {0}")]
    Store(EventStoreError),

    #[error("corrupt listing record {sequence_number}: {message}")]
    Deserialize { sequence_number: u64, message: String },

    /// The record is committed; only the downstream notification failed.
    #[error("publication failed after commit: {0}")]
    Publish(String),

    #[error("tier lookup failed: {0}")]
    TierLookup(String),
}

impl From<DomainError> for AssessmentError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => AssessmentError::Validation(msg),
            DomainError::InvalidTransition { from, action } => {
                AssessmentError::InvalidTransition { from, action }
            }
            DomainError::InvalidId(msg) => AssessmentError::Validation(msg),
            DomainError::NotFound => AssessmentError::NotFound,
            DomainError::Conflict(msg) => AssessmentError::ConcurrencyConflict(msg),
            DomainError::Unauthorized => AssessmentError::Unauthorized,
        }
    }
}

impl From<EventStoreError> for AssessmentError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => AssessmentError::ConcurrencyConflict(msg),
            other => AssessmentError::Store(other),
        }
    }
}

impl From<LedgerError> for AssessmentError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Store(e) => e.into(),
            LedgerError::Deserialize {
                sequence_number,
                message,
            } => AssessmentError::Deserialize {
                sequence_number,
                message,
            },
        }
    }
}

impl From<TierError> for AssessmentError {
    fn from(value: TierError) -> Self {
        AssessmentError::TierLookup(value.to_string())
    }
}

/// Who is acting, and optionally which version they acted on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CommandMeta {
    pub actor_id: UserId,
    /// Version the caller last saw; `None` means "whatever is current".
    pub expected_version: Option<u64>,
}

impl CommandMeta {
    pub fn by(actor_id: UserId) -> Self {
        Self {
            actor_id,
            expected_version: None,
        }
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Listing approval service.
///
/// Holds no listing state of its own; every call reads the stream fresh.
#[derive(Debug)]
pub struct AssessmentEngine<S, B, T, C> {
    ledger: ReasonLedger<S>,
    bus: B,
    tiers: T,
    clock: C,
    resubmission: ResubmissionPolicy,
}

impl<S, B, T, C> AssessmentEngine<S, B, T, C> {
    pub fn new(store: S, bus: B, tiers: T, clock: C) -> Self {
        Self {
            ledger: ReasonLedger::new(store),
            bus,
            tiers,
            clock,
            resubmission: ResubmissionPolicy::default(),
        }
    }

    pub fn with_resubmission_policy(mut self, policy: ResubmissionPolicy) -> Self {
        self.resubmission = policy;
        self
    }

    pub fn resubmission_policy(&self) -> ResubmissionPolicy {
        self.resubmission
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Read access to the listing streams (replay, catalog rebuilds).
    pub fn ledger(&self) -> &ReasonLedger<S> {
        &self.ledger
    }
}

impl<S, B, T, C> AssessmentEngine<S, B, T, C>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    T: TierPolicy,
    C: Clock,
{
    /// Create a listing. The seller's tier is read now and only now.
    pub fn submit(
        &self,
        seller_id: SellerId,
        actor_id: UserId,
        draft: ListingDraft,
    ) -> Result<ProductListing, AssessmentError> {
        let bypass_assessment = self.tiers.is_bypassed(seller_id)?;
        let cmd = ListingCommand::Submit(SubmitListing {
            listing_id: ListingId::generate(),
            seller_id,
            actor_id,
            draft,
            bypass_assessment,
            occurred_at: self.clock.now(),
        });
        self.dispatch(cmd, None)
    }

    /// Send revised content back into the pipeline after `FOR_REVISION`.
    pub fn resubmit(
        &self,
        listing_id: ListingId,
        seller_id: SellerId,
        draft: ListingDraft,
        meta: CommandMeta,
    ) -> Result<ProductListing, AssessmentError> {
        let bypass_assessment = self.tiers.is_bypassed(seller_id)?;
        let cmd = ListingCommand::Resubmit(ResubmitListing {
            listing_id,
            seller_id,
            actor_id: meta.actor_id,
            draft,
            bypass_assessment,
            policy: self.resubmission,
            occurred_at: self.clock.now(),
        });
        self.dispatch(cmd, meta.expected_version)
    }

    pub fn approve_for_sample_submission(
        &self,
        listing_id: ListingId,
        meta: CommandMeta,
    ) -> Result<ProductListing, AssessmentError> {
        let cmd = ListingCommand::ApproveForSampleSubmission(ApproveForSampleSubmission {
            listing_id,
            actor_id: meta.actor_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(cmd, meta.expected_version)
    }

    /// Issued by the receiving process when a sample physically arrives.
    pub fn record_sample_received(
        &self,
        listing_id: ListingId,
        meta: CommandMeta,
    ) -> Result<ProductListing, AssessmentError> {
        let cmd = ListingCommand::RecordSampleReceived(RecordSampleReceived {
            listing_id,
            actor_id: meta.actor_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(cmd, meta.expected_version)
    }

    pub fn set_logistics_note(
        &self,
        listing_id: ListingId,
        note: impl Into<String>,
        meta: CommandMeta,
    ) -> Result<ProductListing, AssessmentError> {
        let cmd = ListingCommand::SetLogisticsNote(SetLogisticsNote {
            listing_id,
            actor_id: meta.actor_id,
            note: note.into(),
            occurred_at: self.clock.now(),
        });
        self.dispatch(cmd, meta.expected_version)
    }

    pub fn pass_quality_check(
        &self,
        listing_id: ListingId,
        meta: CommandMeta,
    ) -> Result<ProductListing, AssessmentError> {
        let cmd = ListingCommand::PassQualityCheck(PassQualityCheck {
            listing_id,
            actor_id: meta.actor_id,
            occurred_at: self.clock.now(),
        });
        self.dispatch(cmd, meta.expected_version)
    }

    /// Terminal rejection. `stage` defaults to the stage owning the current state.
    pub fn reject_listing(
        &self,
        listing_id: ListingId,
        reason: impl Into<String>,
        stage: Option<ReviewStage>,
        meta: CommandMeta,
    ) -> Result<ProductListing, AssessmentError> {
        let cmd = ListingCommand::Reject(RejectListing {
            listing_id,
            actor_id: meta.actor_id,
            reason: reason.into(),
            stage,
            occurred_at: self.clock.now(),
        });
        self.dispatch(cmd, meta.expected_version)
    }

    pub fn request_revision(
        &self,
        listing_id: ListingId,
        reason: impl Into<String>,
        stage: Option<ReviewStage>,
        meta: CommandMeta,
    ) -> Result<ProductListing, AssessmentError> {
        let cmd = ListingCommand::RequestRevision(RequestRevision {
            listing_id,
            actor_id: meta.actor_id,
            reason: reason.into(),
            stage,
            occurred_at: self.clock.now(),
        });
        self.dispatch(cmd, meta.expected_version)
    }

    pub fn load(&self, listing_id: ListingId) -> Result<ProductListing, AssessmentError> {
        let listing = self.rehydrate(listing_id)?;
        if !listing.exists() {
            return Err(AssessmentError::NotFound);
        }
        Ok(listing)
    }

    /// Every listing in submission order; `Some(seller)` scopes to one seller.
    pub fn load_all(
        &self,
        seller_filter: Option<SellerId>,
    ) -> Result<Vec<ProductListing>, AssessmentError> {
        let mut out = Vec::new();
        for listing_id in self.ledger.listing_ids()? {
            let listing = self.rehydrate(listing_id)?;
            if !listing.exists() {
                continue;
            }
            if seller_filter.is_none_or(|seller| listing.seller_id() == seller) {
                out.push(listing);
            }
        }
        Ok(out)
    }

    /// Transition history of one listing, oldest first.
    pub fn history(&self, listing_id: ListingId) -> Result<LedgerHistory, AssessmentError> {
        let history = self.ledger.history(listing_id)?;
        if history.is_empty() {
            return Err(AssessmentError::NotFound);
        }
        Ok(history)
    }

    fn rehydrate(&self, listing_id: ListingId) -> Result<ProductListing, AssessmentError> {
        let stream = self.ledger.records(listing_id)?;
        validate_loaded_stream(listing_id, &stream)?;

        let mut listing = ProductListing::empty(listing_id);
        for stored in &stream {
            listing.apply(&decode_record(stored)?);
        }
        Ok(listing)
    }

    fn dispatch(
        &self,
        command: ListingCommand,
        expected_version: Option<u64>,
    ) -> Result<ProductListing, AssessmentError> {
        let listing_id = command.listing_id();
        let action = command.action();

        let result = self.execute(&command, expected_version);
        if let Err(e) = &result {
            tracing::debug!(%listing_id, action, error = %e, "listing command refused");
        }
        result
    }

    fn execute(
        &self,
        command: &ListingCommand,
        expected_version: Option<u64>,
    ) -> Result<ProductListing, AssessmentError> {
        let mut listing = self.rehydrate(command.listing_id())?;

        if let Some(expected) = expected_version {
            if listing.exists() && listing.version() != expected {
                return Err(AssessmentError::ConcurrencyConflict(format!(
                    "listing is at version {}, caller expected {expected}",
                    listing.version()
                )));
            }
        }

        let decided = listing.handle(command)?;
        let loaded_version = listing.version();

        let mut committed = Vec::with_capacity(decided.len());
        for (offset, event) in decided.iter().enumerate() {
            let expected = ExpectedVersion::Exact(loaded_version + offset as u64);
            committed.push(self.ledger.append(event, expected)?);
            listing.apply(event);

            match event.transition() {
                Some(t) => tracing::info!(
                    listing_id = %listing.id_typed(),
                    from = ?t.from,
                    to = %t.to,
                    stage = ?t.stage,
                    actor_id = %t.actor_id,
                    "listing transitioned"
                ),
                None => tracing::info!(
                    listing_id = %listing.id_typed(),
                    actor_id = %command_actor(command),
                    "listing annotated"
                ),
            }
        }

        self.publish(&committed)?;
        Ok(listing)
    }

    fn publish(&self, committed: &[StoredEvent]) -> Result<(), AssessmentError> {
        for stored in committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| AssessmentError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }
}

fn command_actor(command: &ListingCommand) -> UserId {
    match command {
        ListingCommand::Submit(c) => c.actor_id,
        ListingCommand::Resubmit(c) => c.actor_id,
        ListingCommand::ApproveForSampleSubmission(c) => c.actor_id,
        ListingCommand::RecordSampleReceived(c) => c.actor_id,
        ListingCommand::PassQualityCheck(c) => c.actor_id,
        ListingCommand::Reject(c) => c.actor_id,
        ListingCommand::RequestRevision(c) => c.actor_id,
        ListingCommand::SetLogisticsNote(c) => c.actor_id,
    }
}

/// Refuse to rehydrate from a stream the store returned out of shape.
fn validate_loaded_stream(
    listing_id: ListingId,
    stream: &[StoredEvent],
) -> Result<(), AssessmentError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != listing_id.aggregate_id() {
            return Err(AssessmentError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.aggregate_type != LISTING_AGGREGATE_TYPE {
            return Err(AssessmentError::Store(EventStoreError::AggregateTypeMismatch(
                format!("expected {LISTING_AGGREGATE_TYPE}, found {}", e.aggregate_type),
            )));
        }
        if e.sequence_number != last + 1 {
            return Err(AssessmentError::Store(EventStoreError::InvalidAppend(format!(
                "non-contiguous sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}
