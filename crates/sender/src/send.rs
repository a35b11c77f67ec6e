use cadence_core::{ActivityKind, ActivityLogEntry};
use cadence_email::{
    ComposeInput, EmailError, EmailProvider, EmailProviderConfig, compose_email, is_retryable_status,
};
use cadence_store::ScheduledEmailStore;
use chrono::{Duration, Utc};

use crate::config::SenderConfig;
use crate::datasource::{NewEmailLog, SenderDataSource};
use crate::error::SenderError;

#[derive(Debug, Default)]
pub struct SendOutcome {
    pub sent: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub errors: Vec<String>,
}

/// Claim, recheck, compose, and dispatch every row that's ready to send
/// (§4.5 steps 1-10), up to `config.max_emails_per_run`.
#[tracing::instrument(skip_all)]
pub async fn send_due(
    store: &dyn ScheduledEmailStore,
    data: &dyn SenderDataSource,
    provider: &EmailProvider,
    email_config: &EmailProviderConfig,
    config: &SenderConfig,
) -> SendOutcome {
    let mut outcome = SendOutcome::default();
    let now = Utc::now();

    let ready = match store.list_ready_to_send(now, config.max_emails_per_run).await {
        Ok(rows) => rows,
        Err(e) => {
            outcome.errors.push(format!("failed to list rows ready to send: {e}"));
            return outcome;
        }
    };

    for row in ready {
        match store.claim(row.id).await {
            Ok(true) => {}
            Ok(false) => continue, // lost the race to another worker
            Err(e) => {
                outcome.errors.push(format!("row {}: claim failed: {e}", row.id));
                continue;
            }
        }

        match dispatch_one(store, data, provider, email_config, config, &row, now).await {
            Ok(Outcome::Sent) => outcome.sent += 1,
            Ok(Outcome::Cancelled) => outcome.cancelled += 1,
            Ok(Outcome::Failed) => outcome.failed += 1,
            Err(e) => {
                outcome.errors.push(format!("row {}: {e}", row.id));
                outcome.failed += 1;
            }
        }
    }

    outcome
}

/// Claim and dispatch one specific row immediately, regardless of its
/// `scheduled_for` time -- used by the "Send Now" UI action. Still runs the
/// full recheck-compose-dispatch flow; only the due-time gate is skipped.
#[tracing::instrument(skip(store, data, provider, email_config, config))]
pub async fn send_one(
    store: &dyn ScheduledEmailStore,
    data: &dyn SenderDataSource,
    provider: &EmailProvider,
    email_config: &EmailProviderConfig,
    config: &SenderConfig,
    id: cadence_core::ScheduledEmailId,
) -> SendOutcome {
    let mut outcome = SendOutcome::default();
    let now = Utc::now();

    let row = match store.get(id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            outcome.errors.push(format!("row {id} not found"));
            return outcome;
        }
        Err(e) => {
            outcome.errors.push(format!("row {id}: {e}"));
            return outcome;
        }
    };

    match store.claim(id).await {
        Ok(true) => {}
        Ok(false) => {
            outcome.errors.push(format!("row {id} is not Pending"));
            return outcome;
        }
        Err(e) => {
            outcome.errors.push(format!("row {id}: claim failed: {e}"));
            return outcome;
        }
    }

    match dispatch_one(store, data, provider, email_config, config, &row, now).await {
        Ok(Outcome::Sent) => outcome.sent += 1,
        Ok(Outcome::Cancelled) => outcome.cancelled += 1,
        Ok(Outcome::Failed) => outcome.failed += 1,
        Err(e) => {
            outcome.errors.push(format!("row {id}: {e}"));
            outcome.failed += 1;
        }
    }
    outcome
}

enum Outcome {
    Sent,
    Cancelled,
    Failed,
}

async fn dispatch_one(
    store: &dyn ScheduledEmailStore,
    data: &dyn SenderDataSource,
    provider: &EmailProvider,
    email_config: &EmailProviderConfig,
    config: &SenderConfig,
    row: &cadence_core::ScheduledEmail,
    now: chrono::DateTime<Utc>,
) -> Result<Outcome, SenderError> {
    let Some(account) = data.account(row.account_id).await? else {
        return cancel(store, row.id, "Account no longer exists").await;
    };
    if account.opted_out {
        return cancel(store, row.id, "Account has opted out of email").await;
    }
    if !account.is_sendable() {
        return cancel(store, row.id, "Account's email is no longer valid").await;
    }
    if data.is_unsubscribed(&account.email).await? {
        return cancel(store, row.id, "Email is on unsubscribe list").await;
    }

    let dedup_since = now - Duration::days(config.dedup_window_days);
    if data.recent_send_exists(row.template_id, &account.email, dedup_since).await? {
        return cancel(
            store,
            row.id,
            &format!(
                "Another email from template {} was already sent to this recipient within {} days",
                row.template_id, config.dedup_window_days
            ),
        )
        .await;
    }

    let Some(template) = data.template(row.template_id).await? else {
        return cancel(store, row.id, "Template no longer exists").await;
    };
    let Some(user_settings) = data.user_settings(row.owner_id).await? else {
        return cancel(store, row.id, "Owner's sender settings no longer exist").await;
    };

    let sender_domain = data.sender_domain_for(row.owner_id, &template.from_email).await?;
    let has_connection = data.has_active_provider_connection(row.owner_id).await?;

    let email_log_id = data
        .create_email_log(NewEmailLog {
            scheduled_email_id: row.id,
            account_id: row.account_id,
            owner_id: row.owner_id,
            automation_id: row.automation_id,
        })
        .await?;

    let trigger_date = row.qualification_value.parse::<chrono::NaiveDate>().ok();
    let compose_input = ComposeInput {
        scheduled_email_id: row.id,
        email_log_id,
        automation_id: row.automation_id,
        account: &account,
        template: &template,
        user_settings: &user_settings,
        sender_domain: sender_domain.as_ref(),
        trigger_date,
        has_active_provider_connection: has_connection,
        config: email_config,
    };
    let message = compose_email(&compose_input);

    match provider.send(&message).await {
        Ok(result) => {
            data.mark_email_log_sent(email_log_id, &result.provider_message_id).await?;
            store.mark_sent(row.id, email_log_id).await?;
            data.record_activity(ActivityLogEntry {
                account_id: row.account_id,
                owner_id: row.owner_id,
                kind: ActivityKind::EmailSent,
                related_scheduled_email_id: Some(row.id),
                message: format!("Sent via {}", provider_name(&result.provider_message_id)),
                created_at: now,
            })
            .await?;
            Ok(Outcome::Sent)
        }
        Err(err) => {
            let error_text = err.to_string();
            data.mark_email_log_failed(email_log_id, &error_text).await?;
            data.record_activity(ActivityLogEntry {
                account_id: row.account_id,
                owner_id: row.owner_id,
                kind: ActivityKind::EmailFailed,
                related_scheduled_email_id: Some(row.id),
                message: error_text.clone(),
                created_at: now,
            })
            .await?;

            if is_retryable(&err) {
                store.mark_failed_or_retry(row.id, &error_text, config.max_attempts).await?;
            } else {
                // Non-retryable: force a terminal Failed regardless of
                // remaining attempts by passing a ceiling already met.
                store.mark_failed_or_retry(row.id, &error_text, 0).await?;
            }
            Ok(Outcome::Failed)
        }
    }
}

fn is_retryable(err: &EmailError) -> bool {
    match err {
        EmailError::Rejected { status, .. } => is_retryable_status(*status),
        EmailError::Request(_) => true,
        EmailError::Template(_) => false,
    }
}

fn provider_name(provider_message_id: &str) -> &'static str {
    if provider_message_id.starts_with("dry-run-") { "dry-run" } else { "provider" }
}

async fn cancel(
    store: &dyn ScheduledEmailStore,
    id: cadence_core::ScheduledEmailId,
    reason: &str,
) -> Result<Outcome, SenderError> {
    store.cancel(id, reason).await?;
    Ok(Outcome::Cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cadence_core::{AccountId, EmailLogId, EmailValidationStatus, OwnerId, TemplateId};
    use cadence_store::{MemoryScheduledEmailStore, NewScheduledEmail};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeDataSource {
        accounts: HashMap<AccountId, cadence_core::Account>,
        templates: HashMap<TemplateId, cadence_core::EmailTemplate>,
        settings: HashMap<OwnerId, cadence_core::UserSettings>,
        unsubscribed: Mutex<Vec<String>>,
        recent_sends: Mutex<Vec<(TemplateId, String)>>,
        logs_sent: Mutex<Vec<EmailLogId>>,
        logs_failed: Mutex<Vec<EmailLogId>>,
    }

    #[async_trait]
    impl SenderDataSource for FakeDataSource {
        async fn account(&self, id: AccountId) -> Result<Option<cadence_core::Account>, SenderError> {
            Ok(self.accounts.get(&id).cloned())
        }

        async fn template(
            &self,
            id: TemplateId,
        ) -> Result<Option<cadence_core::EmailTemplate>, SenderError> {
            Ok(self.templates.get(&id).cloned())
        }

        async fn user_settings(
            &self,
            owner_id: OwnerId,
        ) -> Result<Option<cadence_core::UserSettings>, SenderError> {
            Ok(self.settings.get(&owner_id).cloned())
        }

        async fn sender_domain_for(
            &self,
            _owner_id: OwnerId,
            _from_email: &str,
        ) -> Result<Option<cadence_core::SenderDomain>, SenderError> {
            Ok(None)
        }

        async fn has_active_provider_connection(&self, _owner_id: OwnerId) -> Result<bool, SenderError> {
            Ok(false)
        }

        async fn is_unsubscribed(&self, email: &str) -> Result<bool, SenderError> {
            Ok(self.unsubscribed.lock().unwrap().iter().any(|e| e == email))
        }

        async fn recent_send_exists(
            &self,
            template_id: TemplateId,
            to_email: &str,
            _since: chrono::DateTime<Utc>,
        ) -> Result<bool, SenderError> {
            Ok(self
                .recent_sends
                .lock()
                .unwrap()
                .iter()
                .any(|(t, e)| *t == template_id && e == to_email))
        }

        async fn create_email_log(&self, _entry: NewEmailLog) -> Result<EmailLogId, SenderError> {
            Ok(EmailLogId::new())
        }

        async fn mark_email_log_sent(
            &self,
            id: EmailLogId,
            _provider_message_id: &str,
        ) -> Result<(), SenderError> {
            self.logs_sent.lock().unwrap().push(id);
            Ok(())
        }

        async fn mark_email_log_failed(&self, id: EmailLogId, _error: &str) -> Result<(), SenderError> {
            self.logs_failed.lock().unwrap().push(id);
            Ok(())
        }

        async fn record_activity(&self, _entry: ActivityLogEntry) -> Result<(), SenderError> {
            Ok(())
        }
    }

    fn base_account(id: AccountId, owner_id: OwnerId) -> cadence_core::Account {
        cadence_core::Account {
            id,
            owner_id,
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: "jane@example.com".into(),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            opted_out: false,
            marketing_subscribed: true,
            email_validation_status: EmailValidationStatus::Valid,
            status: "active".into(),
            survey_outcome: None,
            created_at: Utc::now(),
        }
    }

    fn base_template(id: TemplateId) -> cadence_core::EmailTemplate {
        cadence_core::EmailTemplate {
            id,
            owner_id: None,
            default_key: Some("reminder".into()),
            subject: "Hi {{first_name}}".into(),
            body_html: "<p>Hello {{first_name}}</p>".into(),
            body_text: None,
            from_email: "agent@agency.com".into(),
            from_name: "Agency".into(),
            created_at: Utc::now(),
        }
    }

    fn base_settings(owner_id: OwnerId) -> cadence_core::UserSettings {
        cadence_core::UserSettings {
            owner_id,
            from_email: "agent@agency.com".into(),
            from_name: "Agency".into(),
            reply_to_email: None,
            signature_html: None,
            agency_name: None,
            agency_address: None,
            agency_phone: None,
            agency_website: None,
            google_review_link: None,
            trial_start: None,
            trial_end: None,
            default_send_time: "09:00".into(),
            timezone: "America/Chicago".into(),
            daily_send_limit: 500,
            preferences: serde_json::Value::Null,
        }
    }

    async fn pending_row(
        store: &MemoryScheduledEmailStore,
        account_id: AccountId,
        owner_id: OwnerId,
        template_id: TemplateId,
    ) -> cadence_core::ScheduledEmailId {
        let inserted = store
            .insert_batch(vec![NewScheduledEmail {
                account_id,
                owner_id,
                automation_id: cadence_core::AutomationId::new(),
                node_id: "step-1".into(),
                template_id,
                trigger_field: None,
                qualification_value: "immediate".into(),
                scheduled_for: Utc::now() - Duration::minutes(1),
                requires_verification: false,
            }])
            .await
            .unwrap();
        inserted[0].id
    }

    #[tokio::test]
    async fn sends_healthy_row() {
        let store = MemoryScheduledEmailStore::new();
        let account_id = AccountId::new();
        let owner_id = OwnerId::new();
        let template_id = TemplateId::new();
        let row_id = pending_row(&store, account_id, owner_id, template_id).await;

        let data = FakeDataSource {
            accounts: HashMap::from([(account_id, base_account(account_id, owner_id))]),
            templates: HashMap::from([(template_id, base_template(template_id))]),
            settings: HashMap::from([(owner_id, base_settings(owner_id))]),
            unsubscribed: Mutex::new(vec![]),
            recent_sends: Mutex::new(vec![]),
            logs_sent: Mutex::new(vec![]),
            logs_failed: Mutex::new(vec![]),
        };

        let provider = EmailProvider::new(&EmailProviderConfig::default());
        let outcome = send_due(&store, &data, &provider, &EmailProviderConfig::default(), &SenderConfig::default())
            .await;

        assert_eq!(outcome.sent, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.cancelled, 0);
        assert_eq!(data.logs_sent.lock().unwrap().len(), 1);
        assert_eq!(store.get(row_id).await.unwrap().unwrap().status, cadence_core::ScheduledEmailStatus::Sent);
    }

    #[tokio::test]
    async fn cancels_unsubscribed_recipient() {
        let store = MemoryScheduledEmailStore::new();
        let account_id = AccountId::new();
        let owner_id = OwnerId::new();
        let template_id = TemplateId::new();
        let row_id = pending_row(&store, account_id, owner_id, template_id).await;

        let data = FakeDataSource {
            accounts: HashMap::from([(account_id, base_account(account_id, owner_id))]),
            templates: HashMap::from([(template_id, base_template(template_id))]),
            settings: HashMap::from([(owner_id, base_settings(owner_id))]),
            unsubscribed: Mutex::new(vec!["jane@example.com".to_string()]),
            recent_sends: Mutex::new(vec![]),
            logs_sent: Mutex::new(vec![]),
            logs_failed: Mutex::new(vec![]),
        };

        let provider = EmailProvider::new(&EmailProviderConfig::default());
        let outcome = send_due(&store, &data, &provider, &EmailProviderConfig::default(), &SenderConfig::default())
            .await;

        assert_eq!(outcome.cancelled, 1);
        assert_eq!(outcome.sent, 0);
        assert_eq!(
            store.get(row_id).await.unwrap().unwrap().status,
            cadence_core::ScheduledEmailStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn cancels_on_recent_dedup_match() {
        let store = MemoryScheduledEmailStore::new();
        let account_id = AccountId::new();
        let owner_id = OwnerId::new();
        let template_id = TemplateId::new();
        let _row_id = pending_row(&store, account_id, owner_id, template_id).await;

        let data = FakeDataSource {
            accounts: HashMap::from([(account_id, base_account(account_id, owner_id))]),
            templates: HashMap::from([(template_id, base_template(template_id))]),
            settings: HashMap::from([(owner_id, base_settings(owner_id))]),
            unsubscribed: Mutex::new(vec![]),
            recent_sends: Mutex::new(vec![(template_id, "jane@example.com".to_string())]),
            logs_sent: Mutex::new(vec![]),
            logs_failed: Mutex::new(vec![]),
        };

        let provider = EmailProvider::new(&EmailProviderConfig::default());
        let outcome = send_due(&store, &data, &provider, &EmailProviderConfig::default(), &SenderConfig::default())
            .await;

        assert_eq!(outcome.cancelled, 1);
    }
}
