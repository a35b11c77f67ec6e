use async_trait::async_trait;
use cadence_core::{
    Account, AccountId, ActivityLogEntry, AutomationId, EmailLogId, EmailTemplate, OwnerId,
    SenderDomain, TemplateId, UserSettings,
};
use chrono::{DateTime, Utc};

use crate::error::SenderError;

/// A new `email_log` row to create in `Queued` state before dispatch
/// (§3 "Email-log"). The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub scheduled_email_id: cadence_core::ScheduledEmailId,
    pub account_id: AccountId,
    pub owner_id: OwnerId,
    pub automation_id: AutomationId,
}

/// Repository port the sender (C5) needs to compose and dispatch one
/// message (§4.5). Overlaps `cadence_verifier::VerifierDataSource` since
/// both recheck eligibility, but the sender additionally needs template,
/// settings, and email-log/activity-log writes the verifier never touches,
/// so the two crates each define their own narrow port instead of sharing
/// one broad trait.
#[async_trait]
pub trait SenderDataSource: Send + Sync {
    async fn account(&self, id: AccountId) -> Result<Option<Account>, SenderError>;
    async fn template(&self, id: TemplateId) -> Result<Option<EmailTemplate>, SenderError>;
    async fn user_settings(&self, owner_id: OwnerId) -> Result<Option<UserSettings>, SenderError>;
    async fn sender_domain_for(
        &self,
        owner_id: OwnerId,
        from_email: &str,
    ) -> Result<Option<SenderDomain>, SenderError>;
    async fn has_active_provider_connection(&self, owner_id: OwnerId) -> Result<bool, SenderError>;
    async fn is_unsubscribed(&self, email: &str) -> Result<bool, SenderError>;
    async fn recent_send_exists(
        &self,
        template_id: TemplateId,
        to_email: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, SenderError>;
    async fn create_email_log(&self, entry: NewEmailLog) -> Result<EmailLogId, SenderError>;
    async fn mark_email_log_sent(
        &self,
        id: EmailLogId,
        provider_message_id: &str,
    ) -> Result<(), SenderError>;
    async fn mark_email_log_failed(&self, id: EmailLogId, error: &str) -> Result<(), SenderError>;
    async fn record_activity(&self, entry: ActivityLogEntry) -> Result<(), SenderError>;
}
