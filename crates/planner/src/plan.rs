use std::collections::{HashMap, HashSet};

use cadence_core::{
    Account, AccountId, Automation, AutomationId, AutomationStatus, EmailTemplate, OwnerId, Policy, TemplateId,
    TemplateRef, WorkflowNode,
};
use cadence_rules::{EvalContext, GeocodeCache, evaluate_account};
use cadence_store::{NewScheduledEmail, ScheduledEmailStore};
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::pacing::apply_pacing;
use crate::timezone::local_to_utc;
use crate::trigger_window::{TriggerWindow, partition_date_trigger_rules};
use crate::workflow::plan_steps;

const MAX_HORIZON_DAYS: i64 = 365;
const INSERT_BATCH_SIZE: usize = 100;

/// Summary of one `plan_automation` invocation, suitable for folding into
/// the reactor's run-level response.
#[derive(Debug, Default)]
pub struct PlanOutcome {
    pub new_scheduled: u64,
    pub errors: Vec<String>,
}

struct RowDraft {
    account_id: AccountId,
    owner_id: OwnerId,
    node_id: String,
    template_id: TemplateId,
    trigger_field: Option<String>,
    qualification_value: String,
    local_date: NaiveDate,
}

/// Plan the full set of scheduled-email rows for one Active automation
/// (§4.2). Accounts, policies, and templates are supplied by the caller
/// (the reactor, C6) in chunks per its own scan-size policy; this function
/// is pure with respect to I/O except for the final batched inserts.
#[tracing::instrument(skip_all, fields(automation_id = %automation.id))]
pub async fn plan_automation(
    automation: &Automation,
    accounts: &[Account],
    policies_by_account: &HashMap<AccountId, Vec<Policy>>,
    templates: &[EmailTemplate],
    last_email_sent: &HashMap<AccountId, DateTime<Utc>>,
    geocodes: &GeocodeCache,
    now: DateTime<Utc>,
    store: &dyn ScheduledEmailStore,
) -> PlanOutcome {
    let mut outcome = PlanOutcome::default();
    if automation.status != AutomationStatus::Active {
        return outcome;
    }

    let steps = plan_steps(&automation.nodes);
    if steps.is_empty() {
        outcome.errors.push(format!("automation {}: workflow has no send_email steps", automation.id));
        return outcome;
    }

    // Resolve every step's template up front; abort the whole plan rather
    // than partially schedule if any step can't resolve one (§4.2).
    let mut resolved_templates = HashMap::with_capacity(steps.len());
    for step in &steps {
        match resolve_template(&step.template, automation.owner_id, templates) {
            Some(id) => {
                resolved_templates.insert(step.node_id.clone(), id);
            }
            None => {
                outcome.errors.push(format!(
                    "automation {}: no template could be resolved for node {}",
                    automation.id, step.node_id
                ));
                return outcome;
            }
        }
    }

    let (base_filter, trigger_windows) = partition_date_trigger_rules(&automation.filter);
    let ctx = EvalContext { now, policies_by_account, last_email_sent, geocodes };
    let candidates: Vec<&Account> = accounts
        .iter()
        .filter(|a| a.is_sendable())
        .filter(|a| evaluate_account(&base_filter, a, &ctx).matched)
        .collect();

    let pacing = automation
        .nodes
        .iter()
        .find_map(|n| match n {
            WorkflowNode::EntryCriteria { pacing } => Some(pacing.clone()),
            _ => None,
        })
        .unwrap_or_default();

    let today_local = now.date_naive();
    let drafts = if trigger_windows.is_empty() {
        build_immediate_drafts(&candidates, &steps, &resolved_templates, automation, now, today_local)
    } else {
        build_date_triggered_drafts(
            &candidates,
            &steps,
            &resolved_templates,
            &trigger_windows,
            policies_by_account,
        )
    };

    let mut local_dates: Vec<NaiveDate> = drafts.iter().map(|d| d.local_date).collect();
    apply_pacing(&mut local_dates, today_local, &pacing);
    let drafts: Vec<RowDraft> = drafts
        .into_iter()
        .zip(local_dates)
        .map(|(mut draft, date)| {
            draft.local_date = date;
            draft
        })
        .collect();

    materialize_rows(automation, drafts, now, store, &mut outcome).await;
    outcome
}

fn build_immediate_drafts(
    candidates: &[&Account],
    steps: &[crate::workflow::PlanStep],
    resolved_templates: &HashMap<String, TemplateId>,
    automation: &Automation,
    now: DateTime<Utc>,
    today_local: NaiveDate,
) -> Vec<RowDraft> {
    let Some(first_step) = steps.first() else { return Vec::new() };
    let mut drafts = Vec::with_capacity(candidates.len());

    for account in candidates {
        let mut local_date = today_local + Duration::days(first_step.days_offset);
        if first_step.days_offset == 0
            && let Ok(candidate_utc) = local_to_utc(local_date, &automation.send_time, &automation.timezone)
            && candidate_utc <= now
        {
            local_date += Duration::days(1);
        }
        drafts.push(RowDraft {
            account_id: account.id,
            owner_id: account.owner_id,
            node_id: first_step.node_id.clone(),
            template_id: resolved_templates[&first_step.node_id],
            trigger_field: Some("activation".to_string()),
            qualification_value: "immediate".to_string(),
            local_date,
        });
    }
    drafts
}

fn build_date_triggered_drafts(
    candidates: &[&Account],
    steps: &[crate::workflow::PlanStep],
    resolved_templates: &HashMap<String, TemplateId>,
    trigger_windows: &HashMap<String, TriggerWindow>,
    policies_by_account: &HashMap<AccountId, Vec<Policy>>,
) -> Vec<RowDraft> {
    let mut drafts = Vec::new();
    for account in candidates {
        for (field, window) in trigger_windows {
            for trigger_date in trigger_dates_for(account, field, window, policies_by_account) {
                let first_qual_date = trigger_date - Duration::days(window.days_before_trigger);
                for step in steps {
                    drafts.push(RowDraft {
                        account_id: account.id,
                        owner_id: account.owner_id,
                        node_id: step.node_id.clone(),
                        template_id: resolved_templates[&step.node_id],
                        trigger_field: Some(field.clone()),
                        qualification_value: trigger_date.format("%Y-%m-%d").to_string(),
                        local_date: first_qual_date + Duration::days(step.days_offset),
                    });
                }
            }
        }
    }
    drafts
}

async fn materialize_rows(
    automation: &Automation,
    drafts: Vec<RowDraft>,
    now: DateTime<Utc>,
    store: &dyn ScheduledEmailStore,
    outcome: &mut PlanOutcome,
) {
    let mut seen_this_run: HashSet<(AutomationId, AccountId, TemplateId, String)> = HashSet::new();
    let mut batch = Vec::with_capacity(INSERT_BATCH_SIZE);

    for draft in drafts {
        let scheduled_for = match local_to_utc(draft.local_date, &automation.send_time, &automation.timezone) {
            Ok(dt) => dt,
            Err(err) => {
                outcome.errors.push(format!("automation {}: {err}", automation.id));
                continue;
            }
        };

        if scheduled_for < now || scheduled_for > now + Duration::days(MAX_HORIZON_DAYS) {
            continue;
        }

        let key = (automation.id, draft.account_id, draft.template_id, draft.qualification_value.clone());
        if seen_this_run.contains(&key) {
            continue;
        }
        match store
            .exists_active(automation.id, draft.account_id, draft.template_id, &draft.qualification_value)
            .await
        {
            Ok(true) => continue,
            Ok(false) => {}
            Err(err) => {
                outcome.errors.push(format!("automation {}: dedup check failed: {err}", automation.id));
                continue;
            }
        }
        seen_this_run.insert(key);

        let requires_verification = draft.qualification_value != "immediate";
        batch.push(NewScheduledEmail {
            account_id: draft.account_id,
            owner_id: draft.owner_id,
            automation_id: automation.id,
            node_id: draft.node_id,
            template_id: draft.template_id,
            trigger_field: draft.trigger_field,
            qualification_value: draft.qualification_value,
            scheduled_for,
            requires_verification,
        });

        if batch.len() >= INSERT_BATCH_SIZE {
            flush_batch(store, &mut batch, outcome).await;
        }
    }
    if !batch.is_empty() {
        flush_batch(store, &mut batch, outcome).await;
    }
}

async fn flush_batch(store: &dyn ScheduledEmailStore, batch: &mut Vec<NewScheduledEmail>, outcome: &mut PlanOutcome) {
    let rows = std::mem::take(batch);
    match store.insert_batch(rows).await {
        Ok(inserted) => outcome.new_scheduled += inserted.len() as u64,
        Err(err) => outcome.errors.push(format!("batch insert failed: {err}")),
    }
}

fn resolve_template(
    template_ref: &TemplateRef,
    owner_id: Option<OwnerId>,
    templates: &[EmailTemplate],
) -> Option<TemplateId> {
    match template_ref {
        TemplateRef::Id(id) => Some(*id),
        TemplateRef::Key(key) => templates
            .iter()
            .find(|t| t.owner_id == owner_id && t.matches_key(key))
            .or_else(|| templates.iter().find(|t| t.owner_id.is_none() && t.matches_key(key)))
            .map(|t| t.id),
    }
}

fn trigger_dates_for(
    account: &Account,
    field: &str,
    window: &TriggerWindow,
    policies_by_account: &HashMap<AccountId, Vec<Policy>>,
) -> Vec<NaiveDate> {
    match field {
        "policy_expiration" | "policy_effective" => policies_by_account
            .get(&account.id)
            .into_iter()
            .flatten()
            .filter(|p| p.status.is_active())
            .filter(|p| policy_matches_restriction(p, window))
            .map(|p| if field == "policy_expiration" { p.expiration_date } else { p.effective_date })
            .collect(),
        "account_created" => vec![account.created_at.date_naive()],
        _ => vec![],
    }
}

fn policy_matches_restriction(policy: &Policy, window: &TriggerWindow) -> bool {
    if let Some(policy_type) = &window.policy_type
        && !policy.lob.to_lowercase().contains(&policy_type.to_lowercase())
    {
        return false;
    }
    if let Some(policy_term) = &window.policy_term {
        let term = policy.term.as_deref().unwrap_or_default();
        if !term.to_lowercase().contains(&policy_term.to_lowercase()) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{
        Account, AutomationId, AutomationStatus, EmailValidationStatus, FilterConfig, Group, PolicyId,
        PolicyStatus, Rule, TemplateId,
    };
    use cadence_store::MemoryScheduledEmailStore;

    fn account() -> Account {
        Account {
            id: AccountId::new(),
            owner_id: OwnerId::new(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: "jane@example.com".into(),
            phone: None,
            address: None,
            city: Some("Austin".into()),
            state: Some("TX".into()),
            zip_code: Some("78701".into()),
            opted_out: false,
            marketing_subscribed: true,
            email_validation_status: EmailValidationStatus::Valid,
            status: "active".into(),
            survey_outcome: None,
            created_at: Utc::now() - Duration::days(400),
        }
    }

    fn template(owner_id: Option<OwnerId>, key: &str) -> EmailTemplate {
        EmailTemplate {
            id: TemplateId::new(),
            owner_id,
            default_key: Some(key.to_string()),
            subject: "Subject".into(),
            body_html: "<p>hi</p>".into(),
            body_text: None,
            from_email: "noreply@example.com".into(),
            from_name: "Agency".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn expiration_reminder_emits_two_rows_scenario_1() {
        let account = account();
        let now = Utc::now();
        // 90 days out clears the rule's 60-day floor with room for t2's
        // 14-day delay, regardless of which real calendar day the test runs.
        let expiration = now.date_naive() + Duration::days(90);
        let policy = Policy {
            id: PolicyId::new(),
            account_id: account.id,
            lob: "Auto".into(),
            status: PolicyStatus::Active,
            effective_date: expiration - Duration::days(180),
            expiration_date: expiration,
            term: Some("6 months".into()),
            created_at: Utc::now(),
        };

        let automation = Automation {
            id: AutomationId::new(),
            owner_id: Some(account.owner_id),
            name: "Expiration reminder".into(),
            status: AutomationStatus::Active,
            send_time: "09:00".into(),
            timezone: "America/Chicago".into(),
            filter: FilterConfig {
                groups: vec![Group {
                    rules: vec![
                        Rule::new("active_policy_type", "is").with_value("Auto"),
                        Rule::new("policy_expiration", "more_than_days_future").with_value("60"),
                    ],
                }],
                not_opted_out: false,
                search: String::new(),
            },
            nodes: vec![
                WorkflowNode::SendEmail {
                    node_id: "t1".into(),
                    template: TemplateRef::Key("reminder1".into()),
                },
                WorkflowNode::Delay { duration: 14, unit: cadence_core::DelayUnit::Days },
                WorkflowNode::SendEmail {
                    node_id: "t2".into(),
                    template: TemplateRef::Key("reminder2".into()),
                },
            ],
        };

        let templates = vec![template(Some(account.owner_id), "reminder1"), template(Some(account.owner_id), "reminder2")];
        let mut policies_by_account = HashMap::new();
        policies_by_account.insert(account.id, vec![policy]);
        let last_email_sent = HashMap::new();
        let geocodes = GeocodeCache::new();
        let store = MemoryScheduledEmailStore::new();

        let outcome = plan_automation(
            &automation,
            std::slice::from_ref(&account),
            &policies_by_account,
            &templates,
            &last_email_sent,
            &geocodes,
            now,
            &store,
        )
        .await;

        assert!(outcome.errors.is_empty(), "unexpected errors: {:?}", outcome.errors);
        assert_eq!(outcome.new_scheduled, 2);
    }

    #[tokio::test]
    async fn replanning_is_idempotent_scenario_2() {
        let account = account();
        let now = Utc::now();
        let expiration = now.date_naive() + Duration::days(60);
        let policy = Policy {
            id: PolicyId::new(),
            account_id: account.id,
            lob: "Auto".into(),
            status: PolicyStatus::Active,
            effective_date: expiration - Duration::days(180),
            expiration_date: expiration,
            term: Some("6 months".into()),
            created_at: Utc::now(),
        };
        let automation = Automation {
            id: AutomationId::new(),
            owner_id: Some(account.owner_id),
            name: "Expiration reminder".into(),
            status: AutomationStatus::Active,
            send_time: "09:00".into(),
            timezone: "America/Chicago".into(),
            filter: FilterConfig {
                groups: vec![Group {
                    rules: vec![Rule::new("policy_expiration", "more_than_days_future").with_value("30")],
                }],
                not_opted_out: false,
                search: String::new(),
            },
            nodes: vec![WorkflowNode::SendEmail {
                node_id: "t1".into(),
                template: TemplateRef::Key("reminder1".into()),
            }],
        };
        let templates = vec![template(Some(account.owner_id), "reminder1")];
        let mut policies_by_account = HashMap::new();
        policies_by_account.insert(account.id, vec![policy]);
        let last_email_sent = HashMap::new();
        let geocodes = GeocodeCache::new();
        let store = MemoryScheduledEmailStore::new();

        let first = plan_automation(
            &automation,
            std::slice::from_ref(&account),
            &policies_by_account,
            &templates,
            &last_email_sent,
            &geocodes,
            now,
            &store,
        )
        .await;
        let second = plan_automation(
            &automation,
            std::slice::from_ref(&account),
            &policies_by_account,
            &templates,
            &last_email_sent,
            &geocodes,
            now,
            &store,
        )
        .await;

        assert_eq!(first.new_scheduled, 1);
        assert_eq!(second.new_scheduled, 0);
    }

    #[tokio::test]
    async fn unresolved_template_aborts_whole_plan() {
        let account = account();
        let automation = Automation {
            id: AutomationId::new(),
            owner_id: Some(account.owner_id),
            name: "Broken".into(),
            status: AutomationStatus::Active,
            send_time: "09:00".into(),
            timezone: "America/Chicago".into(),
            filter: FilterConfig::default(),
            nodes: vec![WorkflowNode::SendEmail {
                node_id: "t1".into(),
                template: TemplateRef::Key("does_not_exist".into()),
            }],
        };
        let policies_by_account = HashMap::new();
        let last_email_sent = HashMap::new();
        let geocodes = GeocodeCache::new();
        let store = MemoryScheduledEmailStore::new();

        let outcome = plan_automation(
            &automation,
            std::slice::from_ref(&account),
            &policies_by_account,
            &[],
            &last_email_sent,
            &geocodes,
            Utc::now(),
            &store,
        )
        .await;

        assert_eq!(outcome.new_scheduled, 0);
        assert_eq!(outcome.errors.len(), 1);
    }
}
