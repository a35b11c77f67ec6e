use std::collections::HashMap;

use async_trait::async_trait;
use cadence_core::{
    Account, AccountId, ActivityLogEntry, Automation, AutomationId, AutomationStatus, EmailLog, EmailLogId,
    EmailLogStatus, EmailTemplate, OwnerId, Policy, ScheduledEmailId, SenderDomain, TemplateId, Unsubscribe,
    UserSettings,
};
use cadence_reactor::{AccountPage, ReactorDataSource, ReactorError};
use cadence_sender::{NewEmailLog, SenderDataSource, SenderError};
use cadence_verifier::{VerifierDataSource, VerifierError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// In-process reference implementation of every repository port the
/// reactor needs, backed by `DashMap`. Mirrors
/// `cadence_store::MemoryScheduledEmailStore`: useful for single-instance
/// deployments, demos, and `run-once`, but not a substitute for the
/// relational schema described in `SPEC_FULL.md` §6 "Persisted state
/// layout" that a production deployment would point at instead.
#[derive(Default)]
pub struct MemoryDataSource {
    pub accounts: DashMap<AccountId, Account>,
    pub automations: DashMap<AutomationId, Automation>,
    pub policies: DashMap<AccountId, Vec<Policy>>,
    pub templates: DashMap<TemplateId, EmailTemplate>,
    pub user_settings: DashMap<OwnerId, UserSettings>,
    pub sender_domains: DashMap<OwnerId, Vec<SenderDomain>>,
    pub provider_connections: DashMap<OwnerId, bool>,
    pub unsubscribes: DashMap<String, Unsubscribe>,
    pub email_logs: DashMap<EmailLogId, EmailLog>,
    pub activity_log: DashMap<ScheduledEmailId, Vec<ActivityLogEntry>>,
}

impl MemoryDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Approximates per-template dedup by recipient email and recency.
    /// `email_logs` only retains `account_id`, not the template a given
    /// send used (`NewEmailLog` carries no `template_id`), so this in-memory
    /// backend widens the check to "any send to this address in the
    /// window" rather than "any send of this exact template". A
    /// relational store can join `email_logs` to `scheduled_emails` to
    /// recover the exact template and should prefer that instead (see
    /// `DESIGN.md`).
    fn recent_send_exists_impl(&self, _template_id: TemplateId, to_email: &str, since: DateTime<Utc>) -> bool {
        self.email_logs.iter().any(|entry| {
            entry.created_at >= since
                && matches!(
                    entry.status,
                    EmailLogStatus::Sent | EmailLogStatus::Delivered | EmailLogStatus::Opened | EmailLogStatus::Clicked
                )
                && self
                    .accounts
                    .get(&entry.account_id)
                    .is_some_and(|a| a.email.eq_ignore_ascii_case(to_email))
        })
    }
}

#[async_trait]
impl ReactorDataSource for MemoryDataSource {
    async fn active_automations(&self) -> Result<Vec<Automation>, ReactorError> {
        Ok(self
            .automations
            .iter()
            .filter(|a| a.status == AutomationStatus::Active)
            .map(|a| a.clone())
            .collect())
    }

    async fn automation(&self, id: AutomationId) -> Result<Option<Automation>, ReactorError> {
        Ok(self.automations.get(&id).map(|a| a.clone()))
    }

    async fn set_automation_status(&self, id: AutomationId, status: AutomationStatus) -> Result<(), ReactorError> {
        if let Some(mut a) = self.automations.get_mut(&id) {
            a.status = status;
        }
        Ok(())
    }

    async fn accounts_page(
        &self,
        owner_id: Option<OwnerId>,
        offset: usize,
        limit: usize,
    ) -> Result<AccountPage, ReactorError> {
        let mut all: Vec<Account> = self
            .accounts
            .iter()
            .filter(|a| owner_id.is_none_or(|o| a.owner_id == o))
            .map(|a| a.clone())
            .collect();
        all.sort_by_key(|a| a.id);
        let page: Vec<Account> = all.iter().skip(offset).take(limit).cloned().collect();
        let has_more = offset + page.len() < all.len();
        Ok(AccountPage { accounts: page, has_more })
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, ReactorError> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn policies_by_account(
        &self,
        account_ids: &[AccountId],
    ) -> Result<HashMap<AccountId, Vec<Policy>>, ReactorError> {
        Ok(account_ids
            .iter()
            .filter_map(|id| self.policies.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn templates_for_owner(&self, owner_id: Option<OwnerId>) -> Result<Vec<EmailTemplate>, ReactorError> {
        Ok(self
            .templates
            .iter()
            .filter(|t| t.owner_id == owner_id || t.owner_id.is_none())
            .map(|t| t.clone())
            .collect())
    }

    async fn last_email_sent(
        &self,
        account_ids: &[AccountId],
    ) -> Result<HashMap<AccountId, DateTime<Utc>>, ReactorError> {
        let mut last: HashMap<AccountId, DateTime<Utc>> = HashMap::new();
        for entry in &self.email_logs {
            if !account_ids.contains(&entry.account_id) {
                continue;
            }
            if let Some(sent_at) = entry.sent_at {
                last.entry(entry.account_id).and_modify(|t| *t = (*t).max(sent_at)).or_insert(sent_at);
            }
        }
        Ok(last)
    }
}

#[async_trait]
impl VerifierDataSource for MemoryDataSource {
    async fn automation(&self, id: AutomationId) -> Result<Option<Automation>, VerifierError> {
        Ok(self.automations.get(&id).map(|a| a.clone()))
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>, VerifierError> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn active_policies(&self, account_id: AccountId) -> Result<Vec<Policy>, VerifierError> {
        Ok(self
            .policies
            .get(&account_id)
            .map(|p| p.iter().filter(|p| p.status.is_active()).cloned().collect())
            .unwrap_or_default())
    }

    async fn is_unsubscribed(&self, email: &str) -> Result<bool, VerifierError> {
        Ok(self.unsubscribes.iter().any(|u| u.matches(email)))
    }

    async fn recent_send_exists(
        &self,
        template_id: TemplateId,
        to_email: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, VerifierError> {
        Ok(self.recent_send_exists_impl(template_id, to_email, since))
    }
}

#[async_trait]
impl SenderDataSource for MemoryDataSource {
    async fn account(&self, id: AccountId) -> Result<Option<Account>, SenderError> {
        Ok(self.accounts.get(&id).map(|a| a.clone()))
    }

    async fn template(&self, id: TemplateId) -> Result<Option<EmailTemplate>, SenderError> {
        Ok(self.templates.get(&id).map(|t| t.clone()))
    }

    async fn user_settings(&self, owner_id: OwnerId) -> Result<Option<UserSettings>, SenderError> {
        Ok(self.user_settings.get(&owner_id).map(|s| s.clone()))
    }

    async fn sender_domain_for(&self, owner_id: OwnerId, from_email: &str) -> Result<Option<SenderDomain>, SenderError> {
        Ok(self
            .sender_domains
            .get(&owner_id)
            .and_then(|domains| domains.iter().find(|d| d.matches_email_domain(from_email)).cloned()))
    }

    async fn has_active_provider_connection(&self, owner_id: OwnerId) -> Result<bool, SenderError> {
        Ok(self.provider_connections.get(&owner_id).map(|v| *v).unwrap_or(false))
    }

    async fn is_unsubscribed(&self, email: &str) -> Result<bool, SenderError> {
        Ok(self.unsubscribes.iter().any(|u| u.matches(email)))
    }

    async fn recent_send_exists(
        &self,
        template_id: TemplateId,
        to_email: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, SenderError> {
        Ok(self.recent_send_exists_impl(template_id, to_email, since))
    }

    async fn create_email_log(&self, entry: NewEmailLog) -> Result<EmailLogId, SenderError> {
        let id = EmailLogId::new();
        self.email_logs.insert(
            id,
            EmailLog {
                id,
                scheduled_email_id: entry.scheduled_email_id,
                account_id: entry.account_id,
                owner_id: entry.owner_id,
                automation_id: entry.automation_id,
                status: EmailLogStatus::Queued,
                provider_message_id: None,
                error: None,
                sent_at: None,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn mark_email_log_sent(&self, id: EmailLogId, provider_message_id: &str) -> Result<(), SenderError> {
        if let Some(mut log) = self.email_logs.get_mut(&id) {
            log.status = EmailLogStatus::Sent;
            log.provider_message_id = Some(provider_message_id.to_string());
            log.sent_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_email_log_failed(&self, id: EmailLogId, error: &str) -> Result<(), SenderError> {
        if let Some(mut log) = self.email_logs.get_mut(&id) {
            log.status = EmailLogStatus::Failed;
            log.error = Some(error.to_string());
        }
        Ok(())
    }

    async fn record_activity(&self, entry: ActivityLogEntry) -> Result<(), SenderError> {
        if let Some(id) = entry.related_scheduled_email_id {
            self.activity_log.entry(id).or_default().push(entry);
        }
        Ok(())
    }
}
