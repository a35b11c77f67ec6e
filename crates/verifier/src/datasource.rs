use async_trait::async_trait;
use cadence_core::{Account, Automation, AutomationId, AccountId, Policy, TemplateId};
use chrono::{DateTime, Utc};

use crate::error::VerifierError;

/// Read-only access to the entities the verifier re-checks at send time.
///
/// A separate trait from [`cadence_store::ScheduledEmailStore`] because the
/// verifier's reads span the account/automation/policy/unsubscribe/email-log
/// tables (§6 "Persisted state layout"), which the core treats as an external
/// contract rather than something it owns the schema for.
#[async_trait]
pub trait VerifierDataSource: Send + Sync {
    async fn automation(&self, id: AutomationId) -> Result<Option<Automation>, VerifierError>;

    async fn account(&self, id: AccountId) -> Result<Option<Account>, VerifierError>;

    /// Active policies belonging to `account_id`.
    async fn active_policies(&self, account_id: AccountId) -> Result<Vec<Policy>, VerifierError>;

    /// Whether `email` (case-insensitive) appears in the global unsubscribe list.
    async fn is_unsubscribed(&self, email: &str) -> Result<bool, VerifierError>;

    /// Whether an `email_logs` row exists for `(template_id, to_email)`
    /// case-insensitively with a terminal-success status, created on or
    /// after `since` (§4.4 step 7 / §4.5 step 2).
    async fn recent_send_exists(
        &self,
        template_id: TemplateId,
        to_email: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, VerifierError>;
}
