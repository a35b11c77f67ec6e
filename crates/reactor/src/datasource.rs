use std::collections::HashMap;

use async_trait::async_trait;
use cadence_core::{Account, AccountId, Automation, AutomationId, AutomationStatus, EmailTemplate, OwnerId, Policy};
use chrono::{DateTime, Utc};

use crate::error::ReactorError;

/// A page of accounts for one owner (or the system default when `owner_id`
/// is `None`), with an explicit has-more flag so the reactor can resume a
/// chunked refresh at `next_offset` on a later run (§4.6, "Resumable scan").
pub struct AccountPage {
    pub accounts: Vec<Account>,
    pub has_more: bool,
}

/// Repository port the reactor (C6) needs to drive planning across an
/// owner's whole account book in bounded chunks (§5 "Shared-resource
/// policy", `MAX_ACCOUNTS_PER_REFRESH`).
#[async_trait]
pub trait ReactorDataSource: Send + Sync {
    async fn active_automations(&self) -> Result<Vec<Automation>, ReactorError>;
    async fn automation(&self, id: AutomationId) -> Result<Option<Automation>, ReactorError>;
    async fn set_automation_status(
        &self,
        id: AutomationId,
        status: AutomationStatus,
    ) -> Result<(), ReactorError>;

    async fn accounts_page(
        &self,
        owner_id: Option<OwnerId>,
        offset: usize,
        limit: usize,
    ) -> Result<AccountPage, ReactorError>;
    async fn account(&self, id: AccountId) -> Result<Option<Account>, ReactorError>;

    async fn policies_by_account(
        &self,
        account_ids: &[AccountId],
    ) -> Result<HashMap<AccountId, Vec<Policy>>, ReactorError>;

    async fn templates_for_owner(&self, owner_id: Option<OwnerId>) -> Result<Vec<EmailTemplate>, ReactorError>;

    async fn last_email_sent(
        &self,
        account_ids: &[AccountId],
    ) -> Result<HashMap<AccountId, DateTime<Utc>>, ReactorError>;
}
