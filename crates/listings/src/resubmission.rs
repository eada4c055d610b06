use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bazaar_core::DomainError;

use crate::status::{ListingStatus, ReviewStage};

/// Where a listing re-enters the pipeline after the seller revises it.
///
/// This is the only place that decides it; the aggregate asks the policy and
/// never hard-codes a re-entry state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResubmissionPolicy {
    /// Every resubmission goes back through digital review.
    #[default]
    RestartDigitalReview,
    /// Resume at the stage that bounced the listing: digital bounces go back to
    /// digital review, physical bounces wait for a fresh sample.
    ReturnToRejectedStage,
}

impl ResubmissionPolicy {
    pub fn entry_status(self, rejection_stage: Option<ReviewStage>) -> ListingStatus {
        match (self, rejection_stage) {
            (ResubmissionPolicy::RestartDigitalReview, _) => ListingStatus::PendingDigitalReview,
            (ResubmissionPolicy::ReturnToRejectedStage, Some(ReviewStage::Physical)) => {
                ListingStatus::WaitingForSample
            }
            (ResubmissionPolicy::ReturnToRejectedStage, _) => ListingStatus::PendingDigitalReview,
        }
    }
}

impl FromStr for ResubmissionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "restart" | "restart_digital_review" => Ok(ResubmissionPolicy::RestartDigitalReview),
            "return_to_stage" | "return_to_rejected_stage" => {
                Ok(ResubmissionPolicy::ReturnToRejectedStage)
            }
            other => Err(DomainError::validation(format!(
                "unknown resubmission policy '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_ignores_rejection_stage() {
        let policy = ResubmissionPolicy::RestartDigitalReview;
        assert_eq!(
            policy.entry_status(Some(ReviewStage::Physical)),
            ListingStatus::PendingDigitalReview
        );
    }

    #[test]
    fn return_to_stage_resumes_physical_at_sample_wait() {
        let policy = ResubmissionPolicy::ReturnToRejectedStage;
        assert_eq!(
            policy.entry_status(Some(ReviewStage::Physical)),
            ListingStatus::WaitingForSample
        );
        assert_eq!(
            policy.entry_status(Some(ReviewStage::Digital)),
            ListingStatus::PendingDigitalReview
        );
        assert_eq!(policy.entry_status(None), ListingStatus::PendingDigitalReview);
    }

    #[test]
    fn policy_parses_config_tokens() {
        assert_eq!(
            "return_to_stage".parse::<ResubmissionPolicy>().unwrap(),
            ResubmissionPolicy::ReturnToRejectedStage
        );
        assert!("sometimes".parse::<ResubmissionPolicy>().is_err());
    }
}
