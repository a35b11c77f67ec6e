use serde::{Deserialize, Serialize};

use crate::filter::FilterConfig;
use crate::ids::{AutomationId, OwnerId, TemplateId};

/// Lifecycle status of an [`Automation`]. Only `Active` automations generate
/// or are referenced by pending scheduled emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationStatus {
    Draft,
    Active,
    Paused,
    Archived,
}

impl AutomationStatus {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Unit for a `delay` node's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayUnit {
    Hours,
    Days,
    Weeks,
}

impl DelayUnit {
    /// Convert a duration in this unit to whole days, per §4.2 Step C
    /// (`unit -> days via x1 / x7 / /24`). Sub-day hour delays truncate
    /// toward zero, matching integer-day bookkeeping used everywhere else
    /// in the planner.
    #[must_use]
    pub fn to_days(self, duration: i64) -> i64 {
        match self {
            Self::Hours => duration / 24,
            Self::Days => duration,
            Self::Weeks => duration * 7,
        }
    }
}

/// How a `send_email` node identifies its template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TemplateRef {
    /// Literal template UUID.
    Id(TemplateId),
    /// Resolved against the owner's templates by `default_key` at plan time.
    Key(String),
}

/// Pacing configuration carried by the `entry_criteria` node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "spreadOverDays")]
    pub spread_over_days: u32,
    /// Days of week on which sends are allowed, `0 = Sunday .. 6 = Saturday`.
    #[serde(default, rename = "allowedDays")]
    pub allowed_days: Vec<u8>,
}

impl PacingConfig {
    /// Whether this config restricts sends to fewer than all seven days,
    /// even when `enabled` is false (§4.2 Step E, second clause).
    #[must_use]
    pub fn restricts_days(&self) -> bool {
        !self.allowed_days.is_empty() && self.allowed_days.len() < 7
    }
}

/// A node in an automation's workflow graph.
///
/// The planner (§4.2 Step C) walks this list in order, skipping
/// `EntryCriteria` and `Trigger`, accumulating `Delay` durations, and
/// emitting one scheduled-email candidate per `SendEmail` node. `Condition`
/// nodes recurse into their `yes` branch only -- the `no` branch is a
/// deliberate simplification left to runtime (§9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowNode {
    EntryCriteria { pacing: PacingConfig },
    Trigger { time: String, timezone: String },
    SendEmail { node_id: String, template: TemplateRef },
    Delay { duration: i64, unit: DelayUnit },
    Condition { node_id: String, branches_yes: Vec<WorkflowNode> },
}

/// A user-defined marketing-email workflow: filter + nodes + schedule +
/// pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    /// `None` means "system default" (not owned by a specific agency).
    pub owner_id: Option<OwnerId>,
    pub name: String,
    pub status: AutomationStatus,
    /// Local wall-clock send time, e.g. `"09:00"`.
    pub send_time: String,
    /// IANA timezone name, e.g. `"America/Chicago"`.
    pub timezone: String,
    pub filter: FilterConfig,
    pub nodes: Vec<WorkflowNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_unit_conversion() {
        assert_eq!(DelayUnit::Days.to_days(14), 14);
        assert_eq!(DelayUnit::Weeks.to_days(2), 14);
        assert_eq!(DelayUnit::Hours.to_days(48), 2);
        assert_eq!(DelayUnit::Hours.to_days(36), 1);
    }

    #[test]
    fn pacing_restricts_days_requires_nonempty_subset() {
        let mut pacing = PacingConfig::default();
        assert!(!pacing.restricts_days());
        pacing.allowed_days = vec![1, 2, 3, 4, 5];
        assert!(pacing.restricts_days());
        pacing.allowed_days = vec![0, 1, 2, 3, 4, 5, 6];
        assert!(!pacing.restricts_days());
    }

    #[test]
    fn automation_status_active_only() {
        assert!(AutomationStatus::Active.is_active());
        assert!(!AutomationStatus::Draft.is_active());
        assert!(!AutomationStatus::Paused.is_active());
        assert!(!AutomationStatus::Archived.is_active());
    }

    #[test]
    fn workflow_node_serde_roundtrip() {
        let node = WorkflowNode::SendEmail {
            node_id: "step-1".into(),
            template: TemplateRef::Key("reminder".into()),
        };
        let json = serde_json::to_string(&node).unwrap();
        let back: WorkflowNode = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, WorkflowNode::SendEmail { node_id, .. } if node_id == "step-1"));
    }
}
