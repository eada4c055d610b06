use serde::Deserialize;
use serde_json::json;

use bazaar_core::AggregateRoot;
use bazaar_listings::{
    AssessmentEvent, ProductListing, RawListingPayload, ReviewStage, SellerTrustTier, TierChange,
    TierLevel,
};
use bazaar_infra::projections::CatalogEntry;

#[derive(Debug, Deserialize)]
pub struct SubmitListingRequest {
    /// Only honoured for callers without a seller account (admins).
    #[serde(default)]
    pub seller_id: Option<String>,
    pub listing: RawListingPayload,
}

#[derive(Debug, Deserialize)]
pub struct ResubmitListingRequest {
    pub listing: RawListingPayload,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Body of commands that carry nothing but an optional version check.
#[derive(Debug, Default, Deserialize)]
pub struct VersionedRequest {
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
    #[serde(default)]
    pub stage: Option<ReviewStage>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LogisticsNoteRequest {
    pub note: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SetTierRequest {
    pub tier_level: TierLevel,
    #[serde(default)]
    pub bypasses_assessment: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListListingsQuery {
    #[serde(default)]
    pub seller_id: Option<String>,
}

pub fn listing_to_json(listing: &ProductListing) -> serde_json::Value {
    json!({
        "id": listing.id_typed().to_string(),
        "seller_id": listing.seller_id().to_string(),
        "status": listing.status().as_str(),
        "version": listing.version(),
        "draft": listing.draft(),
        "submitted_at": listing.submitted_at(),
        "approved_at": listing.approved_at(),
        "verified_at": listing.verified_at(),
        "revision_requested_at": listing.revision_requested_at(),
        "rejected_at": listing.rejected_at(),
        "rejection_reason": listing.rejection_reason(),
        "rejection_stage": listing.rejection_stage().map(ReviewStage::as_str),
        "logistics_note": listing.logistics_note(),
        "purchasable": listing.is_purchasable(),
    })
}

pub fn history_entry_to_json(entry: &AssessmentEvent) -> serde_json::Value {
    json!({
        "sequence_number": entry.sequence_number,
        "from_state": entry.from_state.map(|s| s.as_str()),
        "to_state": entry.to_state.as_str(),
        "stage": entry.stage.map(ReviewStage::as_str),
        "actor_id": entry.actor_id.to_string(),
        "reason": entry.reason,
        "timestamp": entry.timestamp,
    })
}

pub fn tier_to_json(tier: &SellerTrustTier) -> serde_json::Value {
    json!({
        "seller_id": tier.seller_id().to_string(),
        "tier_level": tier.tier_level().as_str(),
        "bypasses_assessment": tier.bypasses_assessment(),
    })
}

pub fn tier_change_to_json(change: &TierChange) -> serde_json::Value {
    json!({
        "seller_id": change.seller_id.to_string(),
        "previous": change.previous.as_ref().map(tier_to_json),
        "current": tier_to_json(&change.current),
        "actor_id": change.actor_id.to_string(),
        "changed_at": change.changed_at,
    })
}

pub fn catalog_entry_to_json(entry: &CatalogEntry) -> serde_json::Value {
    json!({
        "listing_id": entry.listing_id.to_string(),
        "seller_id": entry.seller_id.to_string(),
        "draft": entry.draft,
        "verified_at": entry.verified_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_body_accepts_loose_payload() {
        let body: SubmitListingRequest = serde_json::from_value(json!({
            "listing": {
                "name": "Abaca Tote",
                "category": {"id": "bags", "name": "Bags"},
                "price": "899.50",
                "images": ["https://cdn.example/tote.jpg"],
            }
        }))
        .unwrap();

        assert!(body.seller_id.is_none());
        let draft = body.listing.normalize().unwrap();
        assert_eq!(draft.base_price.centavos(), 89_950);
    }

    #[test]
    fn reason_body_stage_is_optional() {
        let body: ReasonRequest =
            serde_json::from_value(json!({"reason": "Blurry photos"})).unwrap();
        assert!(body.stage.is_none());

        let body: ReasonRequest =
            serde_json::from_value(json!({"reason": "Torn seam", "stage": "physical"})).unwrap();
        assert_eq!(body.stage, Some(ReviewStage::Physical));
    }
}
