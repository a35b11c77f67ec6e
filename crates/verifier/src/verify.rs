use cadence_core::AutomationStatus;
use cadence_store::ScheduledEmailStore;
use chrono::{Duration, NaiveDate, Utc};

use crate::config::VerifierConfig;
use crate::datasource::VerifierDataSource;

/// Outcome of one verification pass, folded into the reactor's run summary.
#[derive(Debug, Default)]
pub struct VerifyOutcome {
    pub verified: u64,
    pub cancelled: u64,
    pub errors: Vec<String>,
}

/// Re-qualify every row due for verification (§4.4).
///
/// Errors raised by the underlying store or data source are logged and
/// counted into `errors` but never abort the batch -- one row's failure
/// must not block the rest.
#[tracing::instrument(skip_all)]
pub async fn verify_due(
    store: &dyn ScheduledEmailStore,
    data: &dyn VerifierDataSource,
    config: &VerifierConfig,
) -> VerifyOutcome {
    let mut outcome = VerifyOutcome::default();
    let now = Utc::now();

    let due = match store.list_due_for_verification(now, config.batch_limit).await {
        Ok(rows) => rows,
        Err(e) => {
            outcome.errors.push(format!("failed to list rows due for verification: {e}"));
            return outcome;
        }
    };

    for row in due {
        match requalify(store, data, &row, config, now - Duration::days(config.dedup_window_days))
            .await
        {
            Ok(Some(reason)) => {
                if let Err(e) = store.cancel(row.id, &reason).await {
                    outcome.errors.push(format!("row {}: cancel failed: {e}", row.id));
                } else {
                    outcome.cancelled += 1;
                }
            }
            Ok(None) => {
                if let Err(e) = store.mark_verified(row.id).await {
                    outcome.errors.push(format!("row {}: mark_verified failed: {e}", row.id));
                } else {
                    outcome.verified += 1;
                }
            }
            Err(e) => {
                outcome.errors.push(format!("row {}: {e}", row.id));
            }
        }
    }

    outcome
}

/// Evaluate the 7-step re-qualification (§4.4). Returns `Ok(Some(reason))` if
/// the row should be cancelled, `Ok(None)` if it still qualifies.
async fn requalify(
    _store: &dyn ScheduledEmailStore,
    data: &dyn VerifierDataSource,
    row: &cadence_core::ScheduledEmail,
    config: &VerifierConfig,
    dedup_since: chrono::DateTime<Utc>,
) -> Result<Option<String>, crate::error::VerifierError> {
    // 1. Automation exists and is Active.
    let Some(automation) = data.automation(row.automation_id).await? else {
        return Ok(Some("Automation no longer exists".to_string()));
    };
    if automation.status != AutomationStatus::Active {
        return Ok(Some("Automation is no longer active".to_string()));
    }

    // 2/3/4. Account exists, not opted out, validation status valid, email well-formed.
    let Some(account) = data.account(row.account_id).await? else {
        return Ok(Some("Account no longer exists".to_string()));
    };
    if account.opted_out {
        return Ok(Some("Account has opted out of email".to_string()));
    }
    if !account.is_sendable() {
        return Ok(Some("Account's email is no longer valid".to_string()));
    }

    // 5. Global unsubscribe list.
    if data.is_unsubscribed(&account.email).await? {
        return Ok(Some("Email is on unsubscribe list".to_string()));
    }

    // 6. Trigger still present.
    if let Some(field) = row.trigger_field.as_deref() {
        if field == "policy_expiration" || field == "policy_effective" {
            let Ok(target) = NaiveDate::parse_from_str(&row.qualification_value, "%Y-%m-%d") else {
                return Ok(Some(format!(
                    "Policy with {field} = {} no longer exists or is inactive",
                    row.qualification_value
                )));
            };
            let policies = data.active_policies(row.account_id).await?;
            let still_present = policies.iter().any(|p| {
                let date = if field == "policy_expiration" { p.expiration_date } else { p.effective_date };
                date == target
            });
            if !still_present {
                return Ok(Some(format!(
                    "Policy with {field} = {} no longer exists or is inactive",
                    row.qualification_value
                )));
            }
        }
    }

    // 7. Template-level 7-day dedup.
    if data.recent_send_exists(row.template_id, &account.email, dedup_since).await? {
        return Ok(Some(format!(
            "Another email from template {} was already sent to this recipient within {} days",
            row.template_id, config.dedup_window_days
        )));
    }

    Ok(None)
}
