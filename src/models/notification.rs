//! Outcome of a notification batch

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-run result of the overdue reminder batch. Each loan is attempted
/// independently; failures are listed instead of aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OverdueReport {
    pub sent: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_loan_ids: Vec<i32>,
}

impl OverdueReport {
    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    pub fn record_failure(&mut self, loan_id: i32) {
        self.failed += 1;
        self.failed_loan_ids.push(loan_id);
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for OverdueReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} sent, {} failed", self.sent, self.failed)
    }
}
