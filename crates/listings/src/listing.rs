use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{Aggregate, AggregateId, AggregateRoot, DomainError, SellerId, UserId};
use bazaar_events::Event;

use crate::payload::ListingDraft;
use crate::resubmission::ResubmissionPolicy;
use crate::status::{ListingStatus, ReviewStage};

/// Stream type under which listing records are stored.
pub const LISTING_AGGREGATE_TYPE: &str = "listings.listing";

/// Listing identifier. Stable across revision loops.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub AggregateId);

impl ListingId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(AggregateId::new())
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.0
    }
}

impl core::fmt::Display for ListingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ListingId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Aggregate root: a seller's product listing moving through assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    id: ListingId,
    seller_id: SellerId,
    draft: ListingDraft,
    status: ListingStatus,
    submitted_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    verified_at: Option<DateTime<Utc>>,
    revision_requested_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    rejection_stage: Option<ReviewStage>,
    logistics_note: Option<String>,
    version: u64,
    created: bool,
}

impl ProductListing {
    /// Create an empty, not-yet-submitted aggregate instance for rehydration.
    pub fn empty(id: ListingId) -> Self {
        Self {
            id,
            seller_id: SellerId::from_uuid(uuid::Uuid::nil()),
            draft: ListingDraft::default(),
            status: ListingStatus::PendingDigitalReview,
            submitted_at: None,
            approved_at: None,
            verified_at: None,
            revision_requested_at: None,
            rejected_at: None,
            rejection_reason: None,
            rejection_stage: None,
            logistics_note: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ListingId {
        self.id
    }

    /// Whether a submission record has been applied.
    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn seller_id(&self) -> SellerId {
        self.seller_id
    }

    pub fn draft(&self) -> &ListingDraft {
        &self.draft
    }

    pub fn name(&self) -> &str {
        &self.draft.name
    }

    pub fn status(&self) -> ListingStatus {
        self.status
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn revision_requested_at(&self) -> Option<DateTime<Utc>> {
        self.revision_requested_at
    }

    pub fn rejected_at(&self) -> Option<DateTime<Utc>> {
        self.rejected_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn rejection_stage(&self) -> Option<ReviewStage> {
        self.rejection_stage
    }

    pub fn logistics_note(&self) -> Option<&str> {
        self.logistics_note.as_deref()
    }

    /// Only verified listings may be sold.
    pub fn is_purchasable(&self) -> bool {
        self.created && self.status == ListingStatus::ActiveVerified
    }
}

impl AggregateRoot for ProductListing {
    type Id = ListingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: a seller submits a new listing.
///
/// `bypass_assessment` is the trust-tier decision taken by the caller at
/// submission time; the aggregate never looks tiers up itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitListing {
    pub listing_id: ListingId,
    pub seller_id: SellerId,
    pub actor_id: UserId,
    pub draft: ListingDraft,
    pub bypass_assessment: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: the seller sends a revised listing after `FOR_REVISION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResubmitListing {
    pub listing_id: ListingId,
    pub seller_id: SellerId,
    pub actor_id: UserId,
    pub draft: ListingDraft,
    pub bypass_assessment: bool,
    pub policy: ResubmissionPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: digital review passed; the seller may ship a physical sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveForSampleSubmission {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command (external receiving process): the physical sample arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSampleReceived {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: quality review passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassQualityCheck {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: terminal rejection.
///
/// When `stage` is `None` it is inferred from the state being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectListing {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub reason: String,
    pub stage: Option<ReviewStage>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: send the listing back to the seller for changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRevision {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub reason: String,
    pub stage: Option<ReviewStage>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: advisory shipping note while a sample is awaited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetLogisticsNote {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingCommand {
    Submit(SubmitListing),
    Resubmit(ResubmitListing),
    ApproveForSampleSubmission(ApproveForSampleSubmission),
    RecordSampleReceived(RecordSampleReceived),
    PassQualityCheck(PassQualityCheck),
    Reject(RejectListing),
    RequestRevision(RequestRevision),
    SetLogisticsNote(SetLogisticsNote),
}

impl ListingCommand {
    pub fn listing_id(&self) -> ListingId {
        match self {
            ListingCommand::Submit(c) => c.listing_id,
            ListingCommand::Resubmit(c) => c.listing_id,
            ListingCommand::ApproveForSampleSubmission(c) => c.listing_id,
            ListingCommand::RecordSampleReceived(c) => c.listing_id,
            ListingCommand::PassQualityCheck(c) => c.listing_id,
            ListingCommand::Reject(c) => c.listing_id,
            ListingCommand::RequestRevision(c) => c.listing_id,
            ListingCommand::SetLogisticsNote(c) => c.listing_id,
        }
    }

    /// Human-readable action name used in error messages and logs.
    pub fn action(&self) -> &'static str {
        match self {
            ListingCommand::Submit(_) => "submit",
            ListingCommand::Resubmit(_) => "resubmit",
            ListingCommand::ApproveForSampleSubmission(_) => "approve for sample submission",
            ListingCommand::RecordSampleReceived(_) => "record sample received",
            ListingCommand::PassQualityCheck(_) => "pass quality check",
            ListingCommand::Reject(_) => "reject",
            ListingCommand::RequestRevision(_) => "request revision",
            ListingCommand::SetLogisticsNote(_) => "set logistics note",
        }
    }
}

/// Event: listing created. `status` is `PENDING_DIGITAL_REVIEW`, or
/// `ACTIVE_VERIFIED` when the seller's tier bypassed assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSubmitted {
    pub listing_id: ListingId,
    pub seller_id: SellerId,
    pub actor_id: UserId,
    pub draft: ListingDraft,
    pub status: ListingStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: revised content re-entered the pipeline at `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingResubmitted {
    pub listing_id: ListingId,
    pub seller_id: SellerId,
    pub actor_id: UserId,
    pub draft: ListingDraft,
    pub status: ListingStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedForSampleSubmission {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleReceived {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCheckPassed {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRejected {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub from: ListingStatus,
    pub reason: String,
    pub stage: ReviewStage,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRequested {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub from: ListingStatus,
    pub reason: String,
    pub stage: ReviewStage,
    pub occurred_at: DateTime<Utc>,
}

/// Event: logistics note recorded. Not a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsNoteRecorded {
    pub listing_id: ListingId,
    pub actor_id: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingEvent {
    ListingSubmitted(ListingSubmitted),
    ListingResubmitted(ListingResubmitted),
    ApprovedForSampleSubmission(ApprovedForSampleSubmission),
    SampleReceived(SampleReceived),
    QualityCheckPassed(QualityCheckPassed),
    ListingRejected(ListingRejected),
    RevisionRequested(RevisionRequested),
    LogisticsNoteRecorded(LogisticsNoteRecorded),
}

/// The state change described by a transition record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Option<ListingStatus>,
    pub to: ListingStatus,
    pub stage: Option<ReviewStage>,
    pub actor_id: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ListingEvent {
    pub fn listing_id(&self) -> ListingId {
        match self {
            ListingEvent::ListingSubmitted(e) => e.listing_id,
            ListingEvent::ListingResubmitted(e) => e.listing_id,
            ListingEvent::ApprovedForSampleSubmission(e) => e.listing_id,
            ListingEvent::SampleReceived(e) => e.listing_id,
            ListingEvent::QualityCheckPassed(e) => e.listing_id,
            ListingEvent::ListingRejected(e) => e.listing_id,
            ListingEvent::RevisionRequested(e) => e.listing_id,
            ListingEvent::LogisticsNoteRecorded(e) => e.listing_id,
        }
    }

    /// The status change this record represents, or `None` for advisory records.
    pub fn transition(&self) -> Option<Transition> {
        let t = match self {
            ListingEvent::ListingSubmitted(e) => Transition {
                from: None,
                to: e.status,
                stage: None,
                actor_id: e.actor_id,
                reason: None,
                occurred_at: e.occurred_at,
            },
            ListingEvent::ListingResubmitted(e) => Transition {
                from: Some(ListingStatus::ForRevision),
                to: e.status,
                stage: None,
                actor_id: e.actor_id,
                reason: None,
                occurred_at: e.occurred_at,
            },
            ListingEvent::ApprovedForSampleSubmission(e) => Transition {
                from: Some(ListingStatus::PendingDigitalReview),
                to: ListingStatus::WaitingForSample,
                stage: Some(ReviewStage::Digital),
                actor_id: e.actor_id,
                reason: None,
                occurred_at: e.occurred_at,
            },
            ListingEvent::SampleReceived(e) => Transition {
                from: Some(ListingStatus::WaitingForSample),
                to: ListingStatus::InQualityReview,
                stage: Some(ReviewStage::Physical),
                actor_id: e.actor_id,
                reason: None,
                occurred_at: e.occurred_at,
            },
            ListingEvent::QualityCheckPassed(e) => Transition {
                from: Some(ListingStatus::InQualityReview),
                to: ListingStatus::ActiveVerified,
                stage: Some(ReviewStage::Physical),
                actor_id: e.actor_id,
                reason: None,
                occurred_at: e.occurred_at,
            },
            ListingEvent::ListingRejected(e) => Transition {
                from: Some(e.from),
                to: ListingStatus::Rejected,
                stage: Some(e.stage),
                actor_id: e.actor_id,
                reason: Some(e.reason.clone()),
                occurred_at: e.occurred_at,
            },
            ListingEvent::RevisionRequested(e) => Transition {
                from: Some(e.from),
                to: ListingStatus::ForRevision,
                stage: Some(e.stage),
                actor_id: e.actor_id,
                reason: Some(e.reason.clone()),
                occurred_at: e.occurred_at,
            },
            ListingEvent::LogisticsNoteRecorded(_) => return None,
        };
        Some(t)
    }

    /// Whether this record makes the listing purchasable.
    pub fn verifies_listing(&self) -> bool {
        match self {
            ListingEvent::ListingSubmitted(e) => e.status == ListingStatus::ActiveVerified,
            ListingEvent::ListingResubmitted(e) => e.status == ListingStatus::ActiveVerified,
            ListingEvent::QualityCheckPassed(_) => true,
            _ => false,
        }
    }
}

impl Event for ListingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ListingEvent::ListingSubmitted(_) => "listings.listing.submitted",
            ListingEvent::ListingResubmitted(_) => "listings.listing.resubmitted",
            ListingEvent::ApprovedForSampleSubmission(_) => "listings.listing.approved_for_sample",
            ListingEvent::SampleReceived(_) => "listings.listing.sample_received",
            ListingEvent::QualityCheckPassed(_) => "listings.listing.quality_passed",
            ListingEvent::ListingRejected(_) => "listings.listing.rejected",
            ListingEvent::RevisionRequested(_) => "listings.listing.revision_requested",
            ListingEvent::LogisticsNoteRecorded(_) => "listings.listing.logistics_note_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ListingEvent::ListingSubmitted(e) => e.occurred_at,
            ListingEvent::ListingResubmitted(e) => e.occurred_at,
            ListingEvent::ApprovedForSampleSubmission(e) => e.occurred_at,
            ListingEvent::SampleReceived(e) => e.occurred_at,
            ListingEvent::QualityCheckPassed(e) => e.occurred_at,
            ListingEvent::ListingRejected(e) => e.occurred_at,
            ListingEvent::RevisionRequested(e) => e.occurred_at,
            ListingEvent::LogisticsNoteRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ProductListing {
    type Command = ListingCommand;
    type Event = ListingEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ListingEvent::ListingSubmitted(e) => {
                self.id = e.listing_id;
                self.seller_id = e.seller_id;
                self.draft = e.draft.clone();
                self.status = e.status;
                self.submitted_at.get_or_insert(e.occurred_at);
                if e.status == ListingStatus::ActiveVerified {
                    self.verified_at.get_or_insert(e.occurred_at);
                }
                self.created = true;
            }
            ListingEvent::ListingResubmitted(e) => {
                self.draft = e.draft.clone();
                self.status = e.status;
                self.rejection_reason = None;
                if e.status == ListingStatus::ActiveVerified {
                    self.verified_at.get_or_insert(e.occurred_at);
                }
            }
            ListingEvent::ApprovedForSampleSubmission(e) => {
                self.status = ListingStatus::WaitingForSample;
                self.approved_at.get_or_insert(e.occurred_at);
            }
            ListingEvent::SampleReceived(_) => {
                self.status = ListingStatus::InQualityReview;
            }
            ListingEvent::QualityCheckPassed(e) => {
                self.status = ListingStatus::ActiveVerified;
                self.verified_at.get_or_insert(e.occurred_at);
            }
            ListingEvent::ListingRejected(e) => {
                self.status = ListingStatus::Rejected;
                self.rejected_at.get_or_insert(e.occurred_at);
                self.rejection_reason = Some(e.reason.clone());
                self.rejection_stage = Some(e.stage);
            }
            ListingEvent::RevisionRequested(e) => {
                self.status = ListingStatus::ForRevision;
                self.revision_requested_at.get_or_insert(e.occurred_at);
                self.rejection_reason = Some(e.reason.clone());
                self.rejection_stage = Some(e.stage);
            }
            ListingEvent::LogisticsNoteRecorded(e) => {
                self.logistics_note = Some(e.note.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ListingCommand::Submit(cmd) => self.handle_submit(cmd),
            ListingCommand::Resubmit(cmd) => self.handle_resubmit(cmd),
            ListingCommand::ApproveForSampleSubmission(cmd) => self.handle_approve(cmd),
            ListingCommand::RecordSampleReceived(cmd) => self.handle_sample_received(cmd),
            ListingCommand::PassQualityCheck(cmd) => self.handle_pass_quality(cmd),
            ListingCommand::Reject(cmd) => self.handle_reject(cmd),
            ListingCommand::RequestRevision(cmd) => self.handle_request_revision(cmd),
            ListingCommand::SetLogisticsNote(cmd) => self.handle_logistics_note(cmd),
        }
    }
}

impl ProductListing {
    fn ensure_exists(&self, listing_id: ListingId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != listing_id {
            return Err(DomainError::invalid_id("listing_id mismatch"));
        }
        Ok(())
    }

    fn ensure_status(&self, expected: ListingStatus, action: &str) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::invalid_transition(self.status, action));
        }
        Ok(())
    }

    /// Shared precondition of reject and request-revision.
    fn review_outcome_source(
        &self,
        reason: &str,
        stage: Option<ReviewStage>,
        action: &str,
    ) -> Result<(String, ReviewStage), DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("reason cannot be empty"));
        }
        if !self.status.accepts_review_outcome() {
            return Err(DomainError::invalid_transition(self.status, action));
        }
        let stage = stage
            .or_else(|| self.status.review_stage())
            .unwrap_or(ReviewStage::Digital);
        Ok((reason.to_string(), stage))
    }

    fn handle_submit(&self, cmd: &SubmitListing) -> Result<Vec<ListingEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("listing already exists"));
        }
        cmd.draft.validate()?;

        let status = if cmd.bypass_assessment {
            ListingStatus::ActiveVerified
        } else {
            ListingStatus::PendingDigitalReview
        };

        Ok(vec![ListingEvent::ListingSubmitted(ListingSubmitted {
            listing_id: cmd.listing_id,
            seller_id: cmd.seller_id,
            actor_id: cmd.actor_id,
            draft: cmd.draft.clone(),
            status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resubmit(&self, cmd: &ResubmitListing) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_exists(cmd.listing_id)?;
        if self.seller_id != cmd.seller_id {
            return Err(DomainError::Unauthorized);
        }
        self.ensure_status(ListingStatus::ForRevision, "resubmit")?;
        cmd.draft.validate()?;

        let status = if cmd.bypass_assessment {
            ListingStatus::ActiveVerified
        } else {
            cmd.policy.entry_status(self.rejection_stage)
        };

        Ok(vec![ListingEvent::ListingResubmitted(ListingResubmitted {
            listing_id: cmd.listing_id,
            seller_id: cmd.seller_id,
            actor_id: cmd.actor_id,
            draft: cmd.draft.clone(),
            status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(
        &self,
        cmd: &ApproveForSampleSubmission,
    ) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_exists(cmd.listing_id)?;
        self.ensure_status(ListingStatus::PendingDigitalReview, "approve for sample submission")?;

        Ok(vec![ListingEvent::ApprovedForSampleSubmission(
            ApprovedForSampleSubmission {
                listing_id: cmd.listing_id,
                actor_id: cmd.actor_id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_sample_received(
        &self,
        cmd: &RecordSampleReceived,
    ) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_exists(cmd.listing_id)?;
        self.ensure_status(ListingStatus::WaitingForSample, "record sample received")?;

        Ok(vec![ListingEvent::SampleReceived(SampleReceived {
            listing_id: cmd.listing_id,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_pass_quality(&self, cmd: &PassQualityCheck) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_exists(cmd.listing_id)?;
        self.ensure_status(ListingStatus::InQualityReview, "pass quality check")?;

        Ok(vec![ListingEvent::QualityCheckPassed(QualityCheckPassed {
            listing_id: cmd.listing_id,
            actor_id: cmd.actor_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectListing) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_exists(cmd.listing_id)?;
        let (reason, stage) = self.review_outcome_source(&cmd.reason, cmd.stage, "reject")?;

        Ok(vec![ListingEvent::ListingRejected(ListingRejected {
            listing_id: cmd.listing_id,
            actor_id: cmd.actor_id,
            from: self.status,
            reason,
            stage,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_request_revision(
        &self,
        cmd: &RequestRevision,
    ) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_exists(cmd.listing_id)?;
        let (reason, stage) =
            self.review_outcome_source(&cmd.reason, cmd.stage, "request revision")?;

        Ok(vec![ListingEvent::RevisionRequested(RevisionRequested {
            listing_id: cmd.listing_id,
            actor_id: cmd.actor_id,
            from: self.status,
            reason,
            stage,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_logistics_note(&self, cmd: &SetLogisticsNote) -> Result<Vec<ListingEvent>, DomainError> {
        self.ensure_exists(cmd.listing_id)?;
        let note = cmd.note.trim();
        if note.is_empty() {
            return Err(DomainError::validation("logistics note cannot be empty"));
        }
        self.ensure_status(ListingStatus::WaitingForSample, "set logistics note")?;

        Ok(vec![ListingEvent::LogisticsNoteRecorded(LogisticsNoteRecorded {
            listing_id: cmd.listing_id,
            actor_id: cmd.actor_id,
            note: note.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_events::execute;
    use chrono::Duration;

    use crate::payload::{Category, Money};

    fn draft() -> ListingDraft {
        ListingDraft {
            name: "Handwoven Banig Mat".to_string(),
            category: Category::named("Home"),
            base_price: Money::from_centavos(89_900).unwrap(),
            description: "Pandan leaf mat".to_string(),
            images: vec!["https://cdn.example/banig.jpg".to_string()],
            variants: vec![],
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    struct Fixture {
        listing: ProductListing,
        seller: SellerId,
        reviewer: UserId,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn submitted(bypass: bool) -> Self {
            let id = ListingId::generate();
            let seller = SellerId::new();
            let mut listing = ProductListing::empty(id);
            let cmd = ListingCommand::Submit(SubmitListing {
                listing_id: id,
                seller_id: seller,
                actor_id: UserId::new(),
                draft: draft(),
                bypass_assessment: bypass,
                occurred_at: t0(),
            });
            execute(&mut listing, &cmd).unwrap();
            Self {
                listing,
                seller,
                reviewer: UserId::new(),
                now: t0(),
            }
        }

        fn tick(&mut self) -> DateTime<Utc> {
            self.now += Duration::minutes(5);
            self.now
        }

        fn id(&self) -> ListingId {
            self.listing.id_typed()
        }

        fn run(&mut self, cmd: ListingCommand) -> Result<Vec<ListingEvent>, DomainError> {
            execute(&mut self.listing, &cmd)
        }

        fn approve(&mut self) -> Result<Vec<ListingEvent>, DomainError> {
            let cmd = ListingCommand::ApproveForSampleSubmission(ApproveForSampleSubmission {
                listing_id: self.id(),
                actor_id: self.reviewer,
                occurred_at: self.tick(),
            });
            self.run(cmd)
        }

        fn receive_sample(&mut self) -> Result<Vec<ListingEvent>, DomainError> {
            let cmd = ListingCommand::RecordSampleReceived(RecordSampleReceived {
                listing_id: self.id(),
                actor_id: self.reviewer,
                occurred_at: self.tick(),
            });
            self.run(cmd)
        }

        fn pass(&mut self) -> Result<Vec<ListingEvent>, DomainError> {
            let cmd = ListingCommand::PassQualityCheck(PassQualityCheck {
                listing_id: self.id(),
                actor_id: self.reviewer,
                occurred_at: self.tick(),
            });
            self.run(cmd)
        }

        fn reject(&mut self, reason: &str) -> Result<Vec<ListingEvent>, DomainError> {
            let cmd = ListingCommand::Reject(RejectListing {
                listing_id: self.id(),
                actor_id: self.reviewer,
                reason: reason.to_string(),
                stage: None,
                occurred_at: self.tick(),
            });
            self.run(cmd)
        }

        fn revise(&mut self, reason: &str, stage: Option<ReviewStage>) -> Result<Vec<ListingEvent>, DomainError> {
            let cmd = ListingCommand::RequestRevision(RequestRevision {
                listing_id: self.id(),
                actor_id: self.reviewer,
                reason: reason.to_string(),
                stage,
                occurred_at: self.tick(),
            });
            self.run(cmd)
        }

        fn resubmit(&mut self, policy: ResubmissionPolicy) -> Result<Vec<ListingEvent>, DomainError> {
            let cmd = ListingCommand::Resubmit(ResubmitListing {
                listing_id: self.id(),
                seller_id: self.seller,
                actor_id: UserId::new(),
                draft: draft(),
                bypass_assessment: false,
                policy,
                occurred_at: self.tick(),
            });
            self.run(cmd)
        }
    }

    fn assert_invalid_transition(result: Result<Vec<ListingEvent>, DomainError>) {
        match result {
            Err(DomainError::InvalidTransition { .. }) => {}
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn standard_submission_waits_for_digital_review() {
        let f = Fixture::submitted(false);
        assert_eq!(f.listing.status(), ListingStatus::PendingDigitalReview);
        assert_eq!(f.listing.submitted_at(), Some(t0()));
        assert_eq!(f.listing.verified_at(), None);
        assert_eq!(f.listing.version(), 1);
    }

    #[test]
    fn bypass_submission_is_verified_at_submission_instant() {
        let f = Fixture::submitted(true);
        assert_eq!(f.listing.status(), ListingStatus::ActiveVerified);
        assert_eq!(f.listing.verified_at(), f.listing.submitted_at());
        assert!(f.listing.is_purchasable());
    }

    #[test]
    fn submit_rejects_malformed_draft() {
        let id = ListingId::generate();
        let listing = ProductListing::empty(id);
        let mut bad = draft();
        bad.images.clear();
        let err = listing
            .handle(&ListingCommand::Submit(SubmitListing {
                listing_id: id,
                seller_id: SellerId::new(),
                actor_id: UserId::new(),
                draft: bad,
                bypass_assessment: false,
                occurred_at: t0(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn submit_twice_is_a_conflict() {
        let f = Fixture::submitted(false);
        let err = f
            .listing
            .handle(&ListingCommand::Submit(SubmitListing {
                listing_id: f.id(),
                seller_id: f.seller,
                actor_id: UserId::new(),
                draft: draft(),
                bypass_assessment: false,
                occurred_at: t0(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn approve_moves_to_waiting_for_sample_and_keeps_submitted_at() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        assert_eq!(f.listing.status(), ListingStatus::WaitingForSample);
        assert_eq!(f.listing.submitted_at(), Some(t0()));
        assert!(f.listing.approved_at().unwrap() > t0());
    }

    #[test]
    fn approve_outside_digital_review_is_invalid() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        assert_invalid_transition(f.approve());

        let mut verified = Fixture::submitted(true);
        assert_invalid_transition(verified.approve());
    }

    #[test]
    fn full_happy_path_reaches_active_verified() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        f.receive_sample().unwrap();
        assert_eq!(f.listing.status(), ListingStatus::InQualityReview);
        let events = f.pass().unwrap();
        assert!(events[0].verifies_listing());
        assert_eq!(f.listing.status(), ListingStatus::ActiveVerified);
        assert!(f.listing.verified_at().unwrap() > f.listing.approved_at().unwrap());
    }

    #[test]
    fn pass_quality_check_requires_quality_review() {
        let mut f = Fixture::submitted(false);
        assert_invalid_transition(f.pass());
        f.approve().unwrap();
        assert_invalid_transition(f.pass());
    }

    #[test]
    fn rejection_in_quality_review_is_terminal() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        f.receive_sample().unwrap();
        f.reject("Counterfeit").unwrap();

        assert_eq!(f.listing.status(), ListingStatus::Rejected);
        assert_eq!(f.listing.rejection_reason(), Some("Counterfeit"));
        assert_eq!(f.listing.rejection_stage(), Some(ReviewStage::Physical));
        assert!(f.listing.rejected_at().is_some());

        assert_invalid_transition(f.pass());
        assert_invalid_transition(f.approve());
        assert_invalid_transition(f.reject("again"));
        assert_invalid_transition(f.revise("again", None));
    }

    #[test]
    fn revision_from_digital_review_records_reason_and_stage() {
        let mut f = Fixture::submitted(false);
        f.revise("Images too blurry", Some(ReviewStage::Digital)).unwrap();

        assert_eq!(f.listing.status(), ListingStatus::ForRevision);
        assert!(f.listing.revision_requested_at().is_some());
        assert_eq!(f.listing.rejection_reason(), Some("Images too blurry"));
        assert_eq!(f.listing.rejection_stage(), Some(ReviewStage::Digital));
    }

    #[test]
    fn empty_reason_is_a_validation_error() {
        let mut f = Fixture::submitted(false);
        assert!(matches!(f.reject(""), Err(DomainError::Validation(_))));
        assert!(matches!(f.revise("   ", None), Err(DomainError::Validation(_))));
        assert_eq!(f.listing.status(), ListingStatus::PendingDigitalReview);
    }

    #[test]
    fn reject_while_waiting_for_sample_is_invalid() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        assert_invalid_transition(f.reject("late"));
        assert_invalid_transition(f.revise("late", None));
    }

    #[test]
    fn resubmission_restarts_digital_review_by_default() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        f.receive_sample().unwrap();
        f.revise("Stitching loose", None).unwrap();
        assert_eq!(f.listing.rejection_stage(), Some(ReviewStage::Physical));

        f.resubmit(ResubmissionPolicy::RestartDigitalReview).unwrap();

        assert_eq!(f.listing.status(), ListingStatus::PendingDigitalReview);
        assert_eq!(f.listing.rejection_reason(), None);
        assert_eq!(f.listing.rejection_stage(), Some(ReviewStage::Physical));
        assert_eq!(f.listing.submitted_at(), Some(t0()));
    }

    #[test]
    fn resubmission_can_return_to_physical_stage() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        f.receive_sample().unwrap();
        f.revise("Stitching loose", None).unwrap();

        f.resubmit(ResubmissionPolicy::ReturnToRejectedStage).unwrap();

        assert_eq!(f.listing.status(), ListingStatus::WaitingForSample);
    }

    #[test]
    fn resubmission_requires_for_revision_and_owner() {
        let mut f = Fixture::submitted(false);
        assert_invalid_transition(f.resubmit(ResubmissionPolicy::default()));

        f.revise("Wrong category", None).unwrap();
        let err = f
            .listing
            .handle(&ListingCommand::Resubmit(ResubmitListing {
                listing_id: f.id(),
                seller_id: SellerId::new(),
                actor_id: UserId::new(),
                draft: draft(),
                bypass_assessment: false,
                policy: ResubmissionPolicy::default(),
                occurred_at: t0(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
    }

    #[test]
    fn timestamps_are_write_once_across_revision_loops() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        let first_approval = f.listing.approved_at();
        f.receive_sample().unwrap();
        f.revise("Color mismatch", None).unwrap();
        f.resubmit(ResubmissionPolicy::RestartDigitalReview).unwrap();
        f.approve().unwrap();

        assert_eq!(f.listing.approved_at(), first_approval);
    }

    #[test]
    fn logistics_note_is_advisory() {
        let mut f = Fixture::submitted(false);
        let note_cmd = |id, actor, at| {
            ListingCommand::SetLogisticsNote(SetLogisticsNote {
                listing_id: id,
                actor_id: actor,
                note: "Courier pickup Tuesday".to_string(),
                occurred_at: at,
            })
        };
        let (id, actor) = (f.id(), f.reviewer);
        assert_invalid_transition(f.run(note_cmd(id, actor, t0())));

        f.approve().unwrap();
        let events = f.run(note_cmd(id, actor, t0())).unwrap();

        assert!(events[0].transition().is_none());
        assert_eq!(f.listing.status(), ListingStatus::WaitingForSample);
        assert_eq!(f.listing.logistics_note(), Some("Courier pickup Tuesday"));
    }

    #[test]
    fn commands_against_unknown_listing_are_not_found() {
        let listing = ProductListing::empty(ListingId::generate());
        let err = listing
            .handle(&ListingCommand::PassQualityCheck(PassQualityCheck {
                listing_id: listing.id_typed(),
                actor_id: UserId::new(),
                occurred_at: t0(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let f = Fixture::submitted(false);
        let before = f.listing.clone();
        let _ = f.listing.handle(&ListingCommand::ApproveForSampleSubmission(
            ApproveForSampleSubmission {
                listing_id: f.id(),
                actor_id: f.reviewer,
                occurred_at: t0(),
            },
        ));
        assert_eq!(f.listing, before);
    }

    #[test]
    fn transition_records_carry_source_state() {
        let mut f = Fixture::submitted(false);
        f.approve().unwrap();
        f.receive_sample().unwrap();
        let events = f.reject("Counterfeit").unwrap();
        let t = events[0].transition().unwrap();
        assert_eq!(t.from, Some(ListingStatus::InQualityReview));
        assert_eq!(t.to, ListingStatus::Rejected);
        assert_eq!(t.stage, Some(ReviewStage::Physical));
        assert_eq!(t.reason.as_deref(), Some("Counterfeit"));
        assert_eq!(t.actor_id, f.reviewer);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Step {
            Approve,
            Receive,
            Pass,
            Reject,
            Revise,
            Resubmit,
            EmptyReject,
        }

        fn step() -> impl Strategy<Value = Step> {
            prop_oneof![
                Just(Step::Approve),
                Just(Step::Receive),
                Just(Step::Pass),
                Just(Step::Reject),
                Just(Step::Revise),
                Just(Step::Resubmit),
                Just(Step::EmptyReject),
            ]
        }

        fn run_step(f: &mut Fixture, step: Step) -> Result<Vec<ListingEvent>, DomainError> {
            match step {
                Step::Approve => f.approve(),
                Step::Receive => f.receive_sample(),
                Step::Pass => f.pass(),
                Step::Reject => f.reject("policy violation"),
                Step::Revise => f.revise("needs better photos", None),
                Step::Resubmit => f.resubmit(ResubmissionPolicy::ReturnToRejectedStage),
                Step::EmptyReject => f.reject(""),
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            #[test]
            fn terminal_states_never_change(
                bypass in any::<bool>(),
                steps in prop::collection::vec(step(), 0..24),
            ) {
                let mut f = Fixture::submitted(bypass);
                let mut terminal: Option<ListingStatus> = None;

                for s in steps {
                    let before = f.listing.clone();
                    let result = run_step(&mut f, s);

                    if let Some(t) = terminal {
                        prop_assert!(result.is_err());
                        prop_assert_eq!(f.listing.status(), t);
                    }
                    if result.is_err() {
                        prop_assert_eq!(&f.listing, &before);
                    }
                    if f.listing.status().is_terminal() {
                        terminal = Some(f.listing.status());
                    }
                }
            }

            #[test]
            fn each_accepted_command_yields_one_record(
                steps in prop::collection::vec(step(), 0..24),
            ) {
                let mut f = Fixture::submitted(false);
                for s in steps {
                    let version = f.listing.version();
                    if let Ok(events) = run_step(&mut f, s) {
                        prop_assert_eq!(events.len(), 1);
                        prop_assert!(events[0].transition().is_some());
                        prop_assert_eq!(f.listing.version(), version + 1);
                    } else {
                        prop_assert_eq!(f.listing.version(), version);
                    }
                }
            }

            #[test]
            fn rejection_fields_track_status(
                steps in prop::collection::vec(step(), 0..24),
            ) {
                let mut f = Fixture::submitted(false);
                for s in steps {
                    let _ = run_step(&mut f, s);
                    let needs_reason = matches!(
                        f.listing.status(),
                        ListingStatus::Rejected | ListingStatus::ForRevision
                    );
                    prop_assert_eq!(f.listing.rejection_reason().is_some(), needs_reason);
                    prop_assert_eq!(f.listing.rejected_at().is_some(), f.listing.status() == ListingStatus::Rejected);
                }
            }
        }
    }
}
