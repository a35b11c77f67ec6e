use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, AutomationId, EmailLogId, OwnerId, ScheduledEmailId};

/// Delivery status of an [`EmailLog`] entry, as last reported by the
/// provider (directly on send, or via a later webhook -- webhook ingestion
/// itself is out of scope, see spec Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailLogStatus {
    Queued,
    Sent,
    Delivered,
    Opened,
    Clicked,
    Failed,
    Bounced,
}

/// An audit record of one email dispatch attempt, independent of the
/// [`ScheduledEmail`](crate::ScheduledEmail) row it originated from --
/// scheduled-email rows are mutated in place as they're retried, while
/// `EmailLog` accumulates one entry per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: EmailLogId,
    pub scheduled_email_id: ScheduledEmailId,
    pub account_id: AccountId,
    pub owner_id: OwnerId,
    pub automation_id: AutomationId,
    pub status: EmailLogStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&EmailLogStatus::Bounced).unwrap();
        assert_eq!(json, "\"bounced\"");
    }
}
