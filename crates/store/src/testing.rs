use cadence_core::{AccountId, AutomationId, OwnerId, ScheduledEmailStatus, TemplateId};
use chrono::{Duration, Utc};

use crate::error::StoreError;
use crate::store::{NewScheduledEmail, ScheduledEmailStore};

fn row(automation_id: AutomationId, account_id: AccountId, requires_verification: bool) -> NewScheduledEmail {
    NewScheduledEmail {
        account_id,
        owner_id: OwnerId::new(),
        automation_id,
        node_id: "step-1".into(),
        template_id: TemplateId::new(),
        trigger_field: Some("policy_expiration".into()),
        qualification_value: "2025-06-15".into(),
        scheduled_for: Utc::now() - Duration::minutes(1),
        requires_verification,
    }
}

/// Run the full scheduled-email store conformance suite against `store`.
///
/// Call this from a backend's own test module with a fresh store instance,
/// so every implementation (in-memory, `PostgreSQL`, ...) is held to the
/// same claim/dedup/lifecycle contract.
///
/// # Errors
///
/// Returns an error if any conformance check fails.
pub async fn run_store_conformance_tests(store: &dyn ScheduledEmailStore) -> Result<(), StoreError> {
    test_insert_and_dedup(store).await?;
    test_claim_is_exclusive(store).await?;
    test_list_due_for_verification_window(store).await?;
    test_list_ready_to_send_requires_verified(store).await?;
    test_mark_failed_or_retry_respects_max_attempts(store).await?;
    test_cancel_pending_for_automation(store).await?;
    test_reap_stuck_processing(store).await?;
    Ok(())
}

async fn test_insert_and_dedup(store: &dyn ScheduledEmailStore) -> Result<(), StoreError> {
    let automation_id = AutomationId::new();
    let account_id = AccountId::new();
    let inserted = store.insert_batch(vec![row(automation_id, account_id, false)]).await?;
    assert_eq!(inserted.len(), 1, "first insert should succeed");
    let second = store.insert_batch(vec![row(automation_id, account_id, false)]).await?;
    assert!(second.is_empty(), "re-inserting the same key must be a no-op");
    Ok(())
}

async fn test_claim_is_exclusive(store: &dyn ScheduledEmailStore) -> Result<(), StoreError> {
    let inserted =
        store.insert_batch(vec![row(AutomationId::new(), AccountId::new(), false)]).await?;
    let id = inserted[0].id;
    assert!(store.claim(id).await?, "first claim should succeed");
    assert!(!store.claim(id).await?, "second concurrent claim must fail");
    Ok(())
}

async fn test_list_due_for_verification_window(store: &dyn ScheduledEmailStore) -> Result<(), StoreError> {
    let account_id = AccountId::new();
    let mut unverified = row(AutomationId::new(), account_id, true);
    unverified.scheduled_for = Utc::now() + Duration::hours(1);
    let inserted = store.insert_batch(vec![unverified]).await?;
    let id = inserted[0].id;

    let due = store.list_due_for_verification(Utc::now(), 100).await?;
    assert!(due.iter().any(|r| r.id == id), "row within the 24h window should be due");
    Ok(())
}

async fn test_list_ready_to_send_requires_verified(store: &dyn ScheduledEmailStore) -> Result<(), StoreError> {
    let account_id = AccountId::new();
    let unverified = row(AutomationId::new(), account_id, true);
    let verified = row(AutomationId::new(), account_id, false);
    let inserted = store.insert_batch(vec![unverified, verified]).await?;
    let verified_id = inserted.iter().find(|r| !r.requires_verification).unwrap().id;

    let ready = store.list_ready_to_send(Utc::now(), 100).await?;
    assert!(ready.iter().all(|r| !r.requires_verification));
    assert!(ready.iter().any(|r| r.id == verified_id));
    Ok(())
}

async fn test_mark_failed_or_retry_respects_max_attempts(
    store: &dyn ScheduledEmailStore,
) -> Result<(), StoreError> {
    let inserted =
        store.insert_batch(vec![row(AutomationId::new(), AccountId::new(), false)]).await?;
    let id = inserted[0].id;

    store.claim(id).await?;
    store.mark_failed_or_retry(id, "provider 503", 3).await?;
    let row = store.get(id).await?.unwrap();
    assert_eq!(row.status, ScheduledEmailStatus::Pending, "should retry while attempts < max");

    store.claim(id).await?;
    store.mark_failed_or_retry(id, "provider 503", 1).await?;
    let row = store.get(id).await?.unwrap();
    assert_eq!(row.status, ScheduledEmailStatus::Failed, "should fail once attempts >= max");
    Ok(())
}

async fn test_cancel_pending_for_automation(store: &dyn ScheduledEmailStore) -> Result<(), StoreError> {
    let automation_id = AutomationId::new();
    store.insert_batch(vec![row(automation_id, AccountId::new(), false)]).await?;
    store.insert_batch(vec![row(automation_id, AccountId::new(), false)]).await?;
    let affected = store.cancel_pending_for_automation(automation_id, "Automation deactivated").await?;
    assert_eq!(affected, 2);
    Ok(())
}

async fn test_reap_stuck_processing(store: &dyn ScheduledEmailStore) -> Result<(), StoreError> {
    let inserted =
        store.insert_batch(vec![row(AutomationId::new(), AccountId::new(), false)]).await?;
    let id = inserted[0].id;
    store.claim(id).await?;
    let recovered = store.reap_stuck_processing(Duration::seconds(0)).await?;
    assert!(recovered >= 1, "a just-claimed row with a zero threshold should be reapable");
    Ok(())
}
