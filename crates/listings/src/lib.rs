//! Listing approval domain (event-sourced).
//!
//! Business rules for moving a seller's listing through digital review,
//! sample inspection and quality review, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod assessment;
pub mod listing;
pub mod payload;
pub mod resubmission;
pub mod status;
pub mod tier;

pub use assessment::AssessmentEvent;
pub use listing::{
    ApproveForSampleSubmission, ApprovedForSampleSubmission, LISTING_AGGREGATE_TYPE,
    ListingCommand, ListingEvent, ListingId, ListingRejected, ListingResubmitted, ListingSubmitted,
    LogisticsNoteRecorded, PassQualityCheck, ProductListing, QualityCheckPassed,
    RecordSampleReceived, RejectListing, RequestRevision, ResubmitListing, RevisionRequested,
    SampleReceived, SetLogisticsNote, SubmitListing, Transition,
};
pub use payload::{Category, ListingDraft, Money, RawListingPayload, Variant};
pub use resubmission::ResubmissionPolicy;
pub use status::{ListingStatus, ReviewStage};
pub use tier::{
    SellerTrustTier, TIER_AGGREGATE_TYPE, TierAssigned, TierChange, TierLevel, tier_stream_id,
};
