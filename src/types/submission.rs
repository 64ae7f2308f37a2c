use serde::{Deserialize, Serialize};

use super::form::FormData;
use super::result::PricingResult;

/// Payload sent to the registration endpoint: the form as entered plus the
/// totals the user saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub form_data: FormData,
    pub pricing_results: PricingResult,
}

/// What the submission endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub status: u16,
    pub body: String,
}

impl SubmissionReceipt {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
