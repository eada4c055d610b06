//! Ledger entries: the audit view of a listing's transition records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::UserId;

use crate::listing::{ListingEvent, ListingId};
use crate::status::{ListingStatus, ReviewStage};

/// One immutable entry of a listing's assessment history.
///
/// `sequence_number` is the position of the underlying record in the listing's
/// stream; entries of one listing are totally ordered by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentEvent {
    pub listing_id: ListingId,
    pub sequence_number: u64,
    pub from_state: Option<ListingStatus>,
    pub to_state: ListingStatus,
    pub stage: Option<ReviewStage>,
    pub actor_id: UserId,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AssessmentEvent {
    /// Build the ledger entry for a stored record; `None` for advisory records.
    pub fn from_record(sequence_number: u64, event: &ListingEvent) -> Option<Self> {
        let t = event.transition()?;
        Some(Self {
            listing_id: event.listing_id(),
            sequence_number,
            from_state: t.from,
            to_state: t.to,
            stage: t.stage,
            actor_id: t.actor_id,
            reason: t.reason,
            timestamp: t.occurred_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{LogisticsNoteRecorded, SampleReceived};

    #[test]
    fn sample_received_entry_is_physical_stage() {
        let listing_id = ListingId::generate();
        let actor = UserId::new();
        let at = Utc::now();
        let entry = AssessmentEvent::from_record(
            3,
            &ListingEvent::SampleReceived(SampleReceived {
                listing_id,
                actor_id: actor,
                occurred_at: at,
            }),
        )
        .unwrap();

        assert_eq!(entry.sequence_number, 3);
        assert_eq!(entry.from_state, Some(ListingStatus::WaitingForSample));
        assert_eq!(entry.to_state, ListingStatus::InQualityReview);
        assert_eq!(entry.stage, Some(ReviewStage::Physical));
        assert_eq!(entry.actor_id, actor);
        assert_eq!(entry.reason, None);
    }

    #[test]
    fn logistics_notes_are_not_ledger_entries() {
        let event = ListingEvent::LogisticsNoteRecorded(LogisticsNoteRecorded {
            listing_id: ListingId::generate(),
            actor_id: UserId::new(),
            note: "J&T pickup".to_string(),
            occurred_at: Utc::now(),
        });
        assert!(AssessmentEvent::from_record(4, &event).is_none());
    }

    #[test]
    fn entry_serializes_state_tokens() {
        let entry = AssessmentEvent {
            listing_id: ListingId::generate(),
            sequence_number: 1,
            from_state: None,
            to_state: ListingStatus::ActiveVerified,
            stage: None,
            actor_id: UserId::new(),
            reason: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["from_state"], serde_json::Value::Null);
        assert_eq!(json["to_state"], "ACTIVE_VERIFIED");
    }
}
