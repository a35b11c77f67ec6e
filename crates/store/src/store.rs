use async_trait::async_trait;
use cadence_core::{AccountId, AutomationId, EmailLogId, OwnerId, ScheduledEmail, ScheduledEmailId, TemplateId};
use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;

/// A row the planner has computed and wants persisted. Distinct from
/// [`ScheduledEmail`] because the store, not the planner, assigns `id`,
/// `status`, `attempts`, and the timestamps.
#[derive(Debug, Clone)]
pub struct NewScheduledEmail {
    pub account_id: AccountId,
    pub owner_id: OwnerId,
    pub automation_id: AutomationId,
    pub node_id: String,
    pub template_id: TemplateId,
    pub trigger_field: Option<String>,
    pub qualification_value: String,
    pub scheduled_for: DateTime<Utc>,
    pub requires_verification: bool,
}

/// Durable queue of planned marketing emails (§4.3).
///
/// Implementations must make `claim` a single atomic conditional-update --
/// never a read followed by a separate write -- since it is the only
/// mechanism preventing two concurrent workers from dispatching the same
/// row (§5 "Shared-resource policy").
#[async_trait]
pub trait ScheduledEmailStore: Send + Sync {
    /// Insert `rows`, skipping any whose `(automation_id, account_id,
    /// template_id, qualification_value)` already exists among
    /// Pending/Processing rows for that automation. Returns the rows that
    /// were actually inserted.
    async fn insert_batch(&self, rows: Vec<NewScheduledEmail>) -> Result<Vec<ScheduledEmail>, StoreError>;

    /// Whether a Pending/Processing row with this uniqueness key already
    /// exists, used by the planner's in-run dedup set before it even
    /// attempts an insert.
    async fn exists_active(
        &self,
        automation_id: AutomationId,
        account_id: AccountId,
        template_id: TemplateId,
        qualification_value: &str,
    ) -> Result<bool, StoreError>;

    async fn get(&self, id: ScheduledEmailId) -> Result<Option<ScheduledEmail>, StoreError>;

    /// Rows with `status=Pending, requires_verification=true,
    /// scheduled_for` within `[now, now+24h]`, ordered by `scheduled_for`.
    async fn list_due_for_verification(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledEmail>, StoreError>;

    /// Rows with `status=Pending, requires_verification=false,
    /// scheduled_for <= now`, ordered by `scheduled_for`.
    async fn list_ready_to_send(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledEmail>, StoreError>;

    /// Atomic compare-and-set: `Pending -> Processing`, incrementing
    /// `attempts`. Returns `true` only if this call performed the
    /// transition (i.e. the row was still Pending).
    async fn claim(&self, id: ScheduledEmailId) -> Result<bool, StoreError>;

    async fn mark_verified(&self, id: ScheduledEmailId) -> Result<(), StoreError>;

    async fn cancel(&self, id: ScheduledEmailId, reason: &str) -> Result<(), StoreError>;

    async fn mark_sent(&self, id: ScheduledEmailId, email_log_id: EmailLogId) -> Result<(), StoreError>;

    /// If `attempts < max_attempts`, returns the row to `Pending`;
    /// otherwise transitions it to `Failed`.
    async fn mark_failed_or_retry(
        &self,
        id: ScheduledEmailId,
        error: &str,
        max_attempts: u32,
    ) -> Result<(), StoreError>;

    /// Bulk-cancel every Pending/Processing row for `automation_id`, used on
    /// deactivation. Returns the number of rows affected.
    async fn cancel_pending_for_automation(
        &self,
        automation_id: AutomationId,
        reason: &str,
    ) -> Result<u64, StoreError>;

    /// Recover rows stuck in `Processing` for longer than `threshold`,
    /// returning them to `Pending` so they're retried (§5 "Cancellation /
    /// timeouts"). Returns the number of rows recovered.
    async fn reap_stuck_processing(&self, threshold: Duration) -> Result<u64, StoreError>;
}
