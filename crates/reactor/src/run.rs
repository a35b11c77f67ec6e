use cadence_core::{Account, AccountId, AutomationId, AutomationStatus};
use cadence_email::{EmailProvider, EmailProviderConfig};
use cadence_planner::plan_automation;
use cadence_rules::{GeocodeCache, GeocoderClient, geocode_key_for};
use cadence_sender::{SenderDataSource, send_due};
use cadence_store::ScheduledEmailStore;
use cadence_verifier::{VerifierDataSource, verify_due};
use chrono::Utc;

use crate::config::ReactorConfig;
use crate::datasource::ReactorDataSource;
use crate::error::ReactorError;
use crate::summary::RunSummary;

/// Bundles everything one reactor run needs so call sites don't thread six
/// trait objects through every method (§4.6).
pub struct Reactor<'a> {
    pub store: &'a dyn ScheduledEmailStore,
    pub data: &'a dyn ReactorDataSource,
    pub verifier_data: &'a dyn VerifierDataSource,
    pub sender_data: &'a dyn SenderDataSource,
    pub email_provider: &'a EmailProvider,
    pub email_config: &'a EmailProviderConfig,
    pub geocodes: &'a GeocodeCache,
    pub geocoder: &'a GeocoderClient,
    pub config: &'a ReactorConfig,
}

/// Pre-populate `geocodes` with every lookup key `accounts` might need, so
/// the synchronous location predicate (`evaluate_account`) never has to
/// block on a network call (§4.1).
async fn warm_geocodes(geocodes: &GeocodeCache, geocoder: &GeocoderClient, accounts: &[Account]) {
    let keys: Vec<String> = accounts.iter().filter_map(geocode_key_for).collect();
    geocodes.warm(keys, geocoder).await;
}

impl<'a> Reactor<'a> {
    /// Refresh (re-plan) one automation's next chunk of accounts, starting
    /// at `offset` (§4.6, "Resumable scan").
    #[tracing::instrument(skip(self), fields(automation_id = %automation_id))]
    pub async fn refresh(&self, automation_id: AutomationId, offset: usize) -> RunSummary {
        let mut summary = RunSummary::for_action("refresh");

        let automation = match self.data.automation(automation_id).await {
            Ok(Some(a)) => a,
            Ok(None) => {
                summary.errors.push(format!("automation {automation_id} not found"));
                return summary;
            }
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };
        if automation.status != AutomationStatus::Active {
            return summary;
        }

        let page = match self
            .data
            .accounts_page(automation.owner_id, offset, self.config.max_accounts_per_refresh)
            .await
        {
            Ok(p) => p,
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };
        summary.has_more = page.has_more;
        if page.has_more {
            summary.next_offset = Some(offset + self.config.max_accounts_per_refresh);
        }
        summary.refreshed = page.accounts.len() as u64;

        let account_ids: Vec<AccountId> = page.accounts.iter().map(|a| a.id).collect();
        let policies_by_account = match self.data.policies_by_account(&account_ids).await {
            Ok(p) => p,
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };
        let templates = match self.data.templates_for_owner(automation.owner_id).await {
            Ok(t) => t,
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };
        let last_email_sent = match self.data.last_email_sent(&account_ids).await {
            Ok(m) => m,
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };

        warm_geocodes(self.geocodes, self.geocoder, &page.accounts).await;
        let outcome = plan_automation(
            &automation,
            &page.accounts,
            &policies_by_account,
            &templates,
            &last_email_sent,
            self.geocodes,
            Utc::now(),
            self.store,
        )
        .await;
        summary.new_scheduled = outcome.new_scheduled;
        summary.errors.extend(outcome.errors);
        summary
    }

    /// Refresh every Active automation's first chunk (§4.6 "daily").
    #[tracing::instrument(skip(self))]
    pub async fn refresh_all(&self) -> RunSummary {
        let mut summary = RunSummary::for_action("refresh");
        let automations = match self.data.active_automations().await {
            Ok(a) => a,
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };
        for automation in automations {
            summary.absorb(self.refresh(automation.id, 0).await);
        }
        summary
    }

    #[tracing::instrument(skip(self))]
    pub async fn verify(&self) -> RunSummary {
        let mut summary = RunSummary::for_action("verify");
        let outcome = verify_due(self.store, self.verifier_data, &self.config.verifier).await;
        summary.verified = outcome.verified;
        summary.cancelled = outcome.cancelled;
        summary.errors = outcome.errors;
        summary
    }

    #[tracing::instrument(skip(self))]
    pub async fn send(&self) -> RunSummary {
        let mut summary = RunSummary::for_action("send");
        let outcome = send_due(
            self.store,
            self.sender_data,
            self.email_provider,
            self.email_config,
            &self.config.sender,
        )
        .await;
        summary.sent = outcome.sent;
        summary.failed = outcome.failed;
        summary.cancelled = outcome.cancelled;
        summary.errors = outcome.errors;
        summary
    }

    /// Full daily cycle: refresh every active automation, then verify, then
    /// send, in that order (§4.6 "daily" ordering guarantee -- a row
    /// planned this run must be eligible for same-run verification and
    /// send only once it has actually been persisted and, for
    /// date-triggered rows, reached its verification window).
    #[tracing::instrument(skip(self))]
    pub async fn daily(&self) -> RunSummary {
        let mut summary = RunSummary::for_action("daily");
        summary.absorb(self.refresh_all().await);
        summary.absorb(self.verify().await);
        summary.absorb(self.send().await);
        summary.action = "daily".to_string();
        summary
    }

    /// Mark an automation Active and immediately plan its first account
    /// chunk (§4.6 "activate").
    #[tracing::instrument(skip(self), fields(automation_id = %automation_id))]
    pub async fn activate(&self, automation_id: AutomationId) -> Result<RunSummary, ReactorError> {
        self.data.set_automation_status(automation_id, AutomationStatus::Active).await?;
        let mut summary = self.refresh(automation_id, 0).await;
        summary.action = "activate".to_string();
        Ok(summary)
    }

    /// Mark an automation Paused and cancel every Pending/Processing row it
    /// owns (§4.6 "deactivate").
    #[tracing::instrument(skip(self), fields(automation_id = %automation_id))]
    pub async fn deactivate(&self, automation_id: AutomationId) -> Result<RunSummary, ReactorError> {
        self.data.set_automation_status(automation_id, AutomationStatus::Paused).await?;
        let cancelled = self.store.cancel_pending_for_automation(automation_id, "Automation deactivated").await?;
        let mut summary = RunSummary::for_action("deactivate");
        summary.cancelled = cancelled;
        Ok(summary)
    }

    /// Plan every Active automation owned by `account`'s owner against
    /// just this one account (§4.6 "onAccountCreated").
    #[tracing::instrument(skip(self), fields(account_id = %account_id))]
    pub async fn on_account_created(&self, account_id: AccountId) -> RunSummary {
        self.replan_single_account(account_id).await
    }

    /// Re-plan every Active automation owned by `account`'s owner against
    /// this one account after one of its policies changed (§4.6
    /// "onPolicyChanged"): a changed effective/expiration date can bring a
    /// date-triggered row into or out of its trigger window.
    #[tracing::instrument(skip(self), fields(account_id = %account_id))]
    pub async fn on_policy_changed(&self, account_id: AccountId) -> RunSummary {
        self.replan_single_account(account_id).await
    }

    async fn replan_single_account(&self, account_id: AccountId) -> RunSummary {
        let mut summary = RunSummary::for_action("refresh");
        let account = match self.data.account(account_id).await {
            Ok(Some(a)) => a,
            Ok(None) => {
                summary.errors.push(format!("account {account_id} not found"));
                return summary;
            }
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };

        let automations = match self.data.active_automations().await {
            Ok(a) => a,
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };
        let account_ids = [account.id];
        let policies_by_account = match self.data.policies_by_account(&account_ids).await {
            Ok(p) => p,
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };
        let last_email_sent = match self.data.last_email_sent(&account_ids).await {
            Ok(m) => m,
            Err(e) => {
                summary.errors.push(e.to_string());
                return summary;
            }
        };

        warm_geocodes(self.geocodes, self.geocoder, std::slice::from_ref(&account)).await;
        for automation in automations.into_iter().filter(|a| a.owner_id == Some(account.owner_id) || a.owner_id.is_none()) {
            let templates = match self.data.templates_for_owner(automation.owner_id).await {
                Ok(t) => t,
                Err(e) => {
                    summary.errors.push(e.to_string());
                    continue;
                }
            };
            let outcome = plan_automation(
                &automation,
                std::slice::from_ref(&account),
                &policies_by_account,
                &templates,
                &last_email_sent,
                self.geocodes,
                Utc::now(),
                self.store,
            )
            .await;
            summary.refreshed += 1;
            summary.new_scheduled += outcome.new_scheduled;
            summary.errors.extend(outcome.errors);
        }
        summary
    }

    /// Verify then send without a refresh pass (§4.6 "process") -- the
    /// every-few-minutes cadence a scheduler runs between daily refreshes.
    #[tracing::instrument(skip(self))]
    pub async fn process(&self) -> RunSummary {
        let mut summary = RunSummary::for_action("process");
        summary.absorb(self.verify().await);
        summary.absorb(self.send().await);
        summary.action = "process".to_string();
        summary
    }

    /// Send one specific row immediately, bypassing its `scheduled_for`
    /// gate (§4.6 "send" with `scheduledEmailId`, the UI's "Send Now").
    #[tracing::instrument(skip(self), fields(scheduled_email_id = %id))]
    pub async fn send_specific(&self, id: cadence_core::ScheduledEmailId) -> RunSummary {
        let mut summary = RunSummary::for_action("send");
        let outcome =
            cadence_sender::send_one(self.store, self.sender_data, self.email_provider, self.email_config, &self.config.sender, id)
                .await;
        summary.sent = outcome.sent;
        summary.failed = outcome.failed;
        summary.cancelled = outcome.cancelled;
        summary.errors = outcome.errors;
        summary
    }
}
