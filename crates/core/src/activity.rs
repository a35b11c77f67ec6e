use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OwnerId, ScheduledEmailId};

/// The kind of event recorded by an [`ActivityLogEntry`]. Not an exhaustive
/// enum in the persisted schema (the `activity_log` table accepts free-form
/// kinds from other subsystems out of scope here), but these are the ones
/// the core itself emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    EmailSent,
    EmailFailed,
    AutomationPlanCancelled,
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailSent => "email_sent",
            Self::EmailFailed => "email_failed",
            Self::AutomationPlanCancelled => "automation_plan_cancelled",
        }
    }
}

/// An audit trail entry linking back to the scheduled email that produced
/// it, written by the sender (C5) and reactor (C6) as they act.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub account_id: crate::ids::AccountId,
    pub owner_id: OwnerId,
    pub kind: ActivityKind,
    pub related_scheduled_email_id: Option<ScheduledEmailId>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
