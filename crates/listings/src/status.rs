use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bazaar_core::DomainError;

/// Position of a listing in the approval pipeline.
///
/// Persisted as the exact upper-case tokens (`PENDING_DIGITAL_REVIEW`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    PendingDigitalReview,
    WaitingForSample,
    InQualityReview,
    ForRevision,
    ActiveVerified,
    Rejected,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 6] = [
        ListingStatus::PendingDigitalReview,
        ListingStatus::WaitingForSample,
        ListingStatus::InQualityReview,
        ListingStatus::ForRevision,
        ListingStatus::ActiveVerified,
        ListingStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::PendingDigitalReview => "PENDING_DIGITAL_REVIEW",
            ListingStatus::WaitingForSample => "WAITING_FOR_SAMPLE",
            ListingStatus::InQualityReview => "IN_QUALITY_REVIEW",
            ListingStatus::ForRevision => "FOR_REVISION",
            ListingStatus::ActiveVerified => "ACTIVE_VERIFIED",
            ListingStatus::Rejected => "REJECTED",
        }
    }

    /// No command may move a listing out of a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, ListingStatus::ActiveVerified | ListingStatus::Rejected)
    }

    /// States from which a reviewer may reject or bounce a listing back.
    pub fn accepts_review_outcome(self) -> bool {
        matches!(
            self,
            ListingStatus::PendingDigitalReview | ListingStatus::InQualityReview
        )
    }

    /// The review stage that is acting on a listing in this state, if any.
    pub fn review_stage(self) -> Option<ReviewStage> {
        match self {
            ListingStatus::PendingDigitalReview => Some(ReviewStage::Digital),
            ListingStatus::WaitingForSample | ListingStatus::InQualityReview => {
                Some(ReviewStage::Physical)
            }
            ListingStatus::ForRevision | ListingStatus::ActiveVerified | ListingStatus::Rejected => {
                None
            }
        }
    }
}

impl core::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown listing status '{s}'")))
    }
}

/// Review phase that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStage {
    Digital,
    Physical,
}

impl ReviewStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStage::Digital => "digital",
            ReviewStage::Physical => "physical",
        }
    }
}

impl core::fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStage {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "digital" => Ok(ReviewStage::Digital),
            "physical" | "quality" => Ok(ReviewStage::Physical),
            other => Err(DomainError::validation(format!(
                "stage must be 'digital' or 'physical', got '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_persisted_token() {
        for status in ListingStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.as_str().to_string()));
            assert_eq!(status.as_str().parse::<ListingStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_token_is_rejected() {
        assert!("APPROVED".parse::<ListingStatus>().is_err());
        assert!(serde_json::from_str::<ListingStatus>("\"approved\"").is_err());
    }

    #[test]
    fn only_verified_and_rejected_are_terminal() {
        let terminal: Vec<_> = ListingStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![ListingStatus::ActiveVerified, ListingStatus::Rejected]);
    }

    #[test]
    fn stage_parsing_accepts_quality_alias() {
        assert_eq!("Physical".parse::<ReviewStage>().unwrap(), ReviewStage::Physical);
        assert_eq!("quality".parse::<ReviewStage>().unwrap(), ReviewStage::Physical);
        assert!("warehouse".parse::<ReviewStage>().is_err());
    }
}
