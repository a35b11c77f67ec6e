use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, AutomationId, OwnerId, ScheduledEmailId, TemplateId};

/// Lifecycle status of a [`ScheduledEmail`] row, per §3/§4.3.
///
/// ```text
/// Pending --claim--> Processing --markVerified(false)--> Pending (requires_verification=false)
/// Pending --claim--> Processing --markSent-------------> Sent
/// Pending --claim--> Processing --markFailedOrRetry-----> Pending | Failed
/// Pending/Processing --cancel---------------------------> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledEmailStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Cancelled,
}

/// A single planned (and, eventually, dispatched) marketing email.
///
/// `requires_verification` starts `true` for date-triggered plans and
/// `false` for `"immediate"` plans; the verifier (C4) flips it to `false`
/// once a row has been re-qualified, or cancels the row outright. The
/// sender (C5) only dispatches rows that are `Pending` with
/// `requires_verification == false`.
///
/// `(automation_id, account_id, node_id, qualification_value)` is the
/// uniqueness key the planner dedups against (§4.2 Step D, §4.6 GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEmail {
    pub id: ScheduledEmailId,
    pub account_id: AccountId,
    pub owner_id: OwnerId,
    pub automation_id: AutomationId,
    /// The `send_email` workflow node this row was generated from.
    pub node_id: String,
    pub template_id: TemplateId,
    /// The date-trigger field this row was derived from, or `None` for an
    /// immediate (no date-trigger) plan.
    pub trigger_field: Option<String>,
    /// ISO date of the trigger occurrence, or the literal `"immediate"`.
    pub qualification_value: String,
    pub status: ScheduledEmailStatus,
    pub scheduled_for: DateTime<Utc>,
    pub requires_verification: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Populated when `status` transitions to `Cancelled` or `Failed`.
    pub reason: Option<String>,
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledEmail {
    #[must_use]
    pub fn is_due_for_verification(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.status == ScheduledEmailStatus::Pending
            && self.requires_verification
            && self.scheduled_for <= now + window
    }

    #[must_use]
    pub fn is_ready_to_send(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduledEmailStatus::Pending
            && !self.requires_verification
            && self.scheduled_for <= now
    }

    /// The identity the planner dedups new rows against.
    #[must_use]
    pub fn dedup_key(&self) -> (AutomationId, AccountId, &str, &str) {
        (self.automation_id, self.account_id, self.node_id.as_str(), self.qualification_value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> ScheduledEmail {
        let now = Utc::now();
        ScheduledEmail {
            id: ScheduledEmailId::new(),
            account_id: AccountId::new(),
            owner_id: OwnerId::new(),
            automation_id: AutomationId::new(),
            node_id: "step-1".into(),
            template_id: TemplateId::new(),
            trigger_field: Some("policy_expiration".into()),
            qualification_value: "2025-06-15".into(),
            status: ScheduledEmailStatus::Pending,
            scheduled_for: now,
            requires_verification: true,
            verified_at: None,
            attempts: 0,
            last_error: None,
            reason: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn due_for_verification_within_window() {
        let mut row = base();
        row.scheduled_for = Utc::now() + Duration::hours(12);
        assert!(row.is_due_for_verification(Utc::now(), Duration::hours(24)));
    }

    #[test]
    fn not_due_outside_window() {
        let mut row = base();
        row.scheduled_for = Utc::now() + Duration::hours(48);
        assert!(!row.is_due_for_verification(Utc::now(), Duration::hours(24)));
    }

    #[test]
    fn verified_row_not_due_again() {
        let mut row = base();
        row.requires_verification = false;
        assert!(!row.is_due_for_verification(Utc::now(), Duration::hours(24)));
    }

    #[test]
    fn ready_to_send_requires_verified_and_due() {
        let mut row = base();
        row.scheduled_for = Utc::now() - Duration::minutes(1);
        assert!(!row.is_ready_to_send(Utc::now()));
        row.requires_verification = false;
        assert!(row.is_ready_to_send(Utc::now()));
    }

    #[test]
    fn dedup_key_distinguishes_qualification_value() {
        let a = base();
        let mut b = base();
        b.qualification_value = "2025-07-15".into();
        assert_ne!(a.dedup_key(), b.dedup_key());
    }
}
