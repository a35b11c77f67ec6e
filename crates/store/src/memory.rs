use async_trait::async_trait;
use cadence_core::{
    AccountId, AutomationId, EmailLogId, ScheduledEmail, ScheduledEmailId, ScheduledEmailStatus,
    TemplateId,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::error::StoreError;
use crate::store::{NewScheduledEmail, ScheduledEmailStore};

/// In-process reference implementation of [`ScheduledEmailStore`], backed by
/// a `DashMap`. Intended for tests and single-instance deployments; the
/// uniqueness and atomic-claim guarantees it provides hold only within one
/// process, unlike `cadence-store-postgres`.
#[derive(Debug, Default)]
pub struct MemoryScheduledEmailStore {
    rows: DashMap<ScheduledEmailId, ScheduledEmail>,
}

impl MemoryScheduledEmailStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn has_active_key(
        &self,
        automation_id: AutomationId,
        account_id: AccountId,
        template_id: TemplateId,
        qualification_value: &str,
    ) -> bool {
        self.rows.iter().any(|row| {
            row.automation_id == automation_id
                && row.account_id == account_id
                && row.template_id == template_id
                && row.qualification_value == qualification_value
                && matches!(row.status, ScheduledEmailStatus::Pending | ScheduledEmailStatus::Processing)
        })
    }
}

#[async_trait]
impl ScheduledEmailStore for MemoryScheduledEmailStore {
    async fn insert_batch(&self, rows: Vec<NewScheduledEmail>) -> Result<Vec<ScheduledEmail>, StoreError> {
        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            if self.has_active_key(row.automation_id, row.account_id, row.template_id, &row.qualification_value) {
                continue;
            }
            let now = Utc::now();
            let record = ScheduledEmail {
                id: ScheduledEmailId::new(),
                account_id: row.account_id,
                owner_id: row.owner_id,
                automation_id: row.automation_id,
                node_id: row.node_id,
                template_id: row.template_id,
                trigger_field: row.trigger_field,
                qualification_value: row.qualification_value,
                status: ScheduledEmailStatus::Pending,
                scheduled_for: row.scheduled_for,
                requires_verification: row.requires_verification,
                verified_at: None,
                attempts: 0,
                last_error: None,
                reason: None,
                failed_at: None,
                created_at: now,
                updated_at: now,
            };
            self.rows.insert(record.id, record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }

    async fn exists_active(
        &self,
        automation_id: AutomationId,
        account_id: AccountId,
        template_id: TemplateId,
        qualification_value: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.has_active_key(automation_id, account_id, template_id, qualification_value))
    }

    async fn get(&self, id: ScheduledEmailId) -> Result<Option<ScheduledEmail>, StoreError> {
        Ok(self.rows.get(&id).map(|r| r.clone()))
    }

    async fn list_due_for_verification(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledEmail>, StoreError> {
        let window = now + Duration::hours(24);
        let mut due: Vec<ScheduledEmail> = self
            .rows
            .iter()
            .map(|r| r.clone())
            .filter(|r| {
                r.status == ScheduledEmailStatus::Pending
                    && r.requires_verification
                    && r.scheduled_for >= now
                    && r.scheduled_for <= window
            })
            .collect();
        due.sort_by_key(|r| r.scheduled_for);
        due.truncate(limit);
        Ok(due)
    }

    async fn list_ready_to_send(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ScheduledEmail>, StoreError> {
        let mut ready: Vec<ScheduledEmail> = self
            .rows
            .iter()
            .map(|r| r.clone())
            .filter(|r| {
                r.status == ScheduledEmailStatus::Pending
                    && !r.requires_verification
                    && r.scheduled_for <= now
            })
            .collect();
        ready.sort_by_key(|r| r.scheduled_for);
        ready.truncate(limit);
        Ok(ready)
    }

    async fn claim(&self, id: ScheduledEmailId) -> Result<bool, StoreError> {
        let Some(mut row) = self.rows.get_mut(&id) else { return Ok(false) };
        if row.status != ScheduledEmailStatus::Pending {
            return Ok(false);
        }
        row.status = ScheduledEmailStatus::Processing;
        row.attempts += 1;
        row.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_verified(&self, id: ScheduledEmailId) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(&id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        row.requires_verification = false;
        row.verified_at = Some(Utc::now());
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn cancel(&self, id: ScheduledEmailId, reason: &str) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(&id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        row.status = ScheduledEmailStatus::Cancelled;
        row.reason = Some(reason.to_string());
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_sent(&self, id: ScheduledEmailId, email_log_id: EmailLogId) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(&id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        row.status = ScheduledEmailStatus::Sent;
        row.last_error = None;
        row.updated_at = Utc::now();
        let _ = email_log_id;
        Ok(())
    }

    async fn mark_failed_or_retry(
        &self,
        id: ScheduledEmailId,
        error: &str,
        max_attempts: u32,
    ) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(&id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        row.last_error = Some(error.to_string());
        row.updated_at = Utc::now();
        if row.attempts < max_attempts {
            row.status = ScheduledEmailStatus::Pending;
        } else {
            row.status = ScheduledEmailStatus::Failed;
            row.failed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn cancel_pending_for_automation(
        &self,
        automation_id: AutomationId,
        reason: &str,
    ) -> Result<u64, StoreError> {
        let mut count = 0u64;
        for mut row in self.rows.iter_mut() {
            if row.automation_id == automation_id
                && matches!(row.status, ScheduledEmailStatus::Pending | ScheduledEmailStatus::Processing)
            {
                row.status = ScheduledEmailStatus::Cancelled;
                row.reason = Some(reason.to_string());
                row.updated_at = Utc::now();
                count += 1;
            }
        }
        Ok(count)
    }

    async fn reap_stuck_processing(&self, threshold: Duration) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut count = 0u64;
        for mut row in self.rows.iter_mut() {
            if row.status == ScheduledEmailStatus::Processing && now - row.updated_at > threshold {
                row.status = ScheduledEmailStatus::Pending;
                row.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{AccountId, AutomationId, OwnerId, TemplateId};

    fn new_row(automation_id: AutomationId, account_id: AccountId) -> NewScheduledEmail {
        NewScheduledEmail {
            account_id,
            owner_id: OwnerId::new(),
            automation_id,
            node_id: "step-1".into(),
            template_id: TemplateId::new(),
            trigger_field: Some("policy_expiration".into()),
            qualification_value: "2025-06-15".into(),
            scheduled_for: Utc::now() - Duration::minutes(1),
            requires_verification: false,
        }
    }

    #[tokio::test]
    async fn conforms_to_shared_store_suite() {
        let store = MemoryScheduledEmailStore::new();
        crate::testing::run_store_conformance_tests(&store).await.unwrap();
    }

    #[tokio::test]
    async fn insert_then_claim_then_send() {
        let store = MemoryScheduledEmailStore::new();
        let automation_id = AutomationId::new();
        let account_id = AccountId::new();
        let inserted = store.insert_batch(vec![new_row(automation_id, account_id)]).await.unwrap();
        assert_eq!(inserted.len(), 1);

        let id = inserted[0].id;
        assert!(store.claim(id).await.unwrap());
        assert!(!store.claim(id).await.unwrap(), "second claim must fail");

        store.mark_sent(id, EmailLogId::new()).await.unwrap();
        let row = store.get(id).await.unwrap().unwrap();
        assert_eq!(row.status, ScheduledEmailStatus::Sent);
    }

    #[tokio::test]
    async fn dedup_on_reinsert() {
        let store = MemoryScheduledEmailStore::new();
        let automation_id = AutomationId::new();
        let account_id = AccountId::new();
        store.insert_batch(vec![new_row(automation_id, account_id)]).await.unwrap();
        let second = store.insert_batch(vec![new_row(automation_id, account_id)]).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn cancel_pending_for_automation_bulk_transitions() {
        let store = MemoryScheduledEmailStore::new();
        let automation_id = AutomationId::new();
        store.insert_batch(vec![new_row(automation_id, AccountId::new())]).await.unwrap();
        store.insert_batch(vec![new_row(automation_id, AccountId::new())]).await.unwrap();
        let affected = store
            .cancel_pending_for_automation(automation_id, "Automation deactivated")
            .await
            .unwrap();
        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn reap_stuck_processing_requires_threshold_elapsed() {
        let store = MemoryScheduledEmailStore::new();
        let automation_id = AutomationId::new();
        let inserted = store.insert_batch(vec![new_row(automation_id, AccountId::new())]).await.unwrap();
        let id = inserted[0].id;
        store.claim(id).await.unwrap();

        let recovered = store.reap_stuck_processing(Duration::hours(1)).await.unwrap();
        assert_eq!(recovered, 0, "freshly claimed row should not be reaped yet");

        {
            let mut row = store.rows.get_mut(&id).unwrap();
            row.updated_at = Utc::now() - Duration::hours(2);
        }
        let recovered = store.reap_stuck_processing(Duration::hours(1)).await.unwrap();
        assert_eq!(recovered, 1);
    }
}
