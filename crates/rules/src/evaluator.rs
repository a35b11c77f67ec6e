use cadence_core::{Account, Policy, Rule};

use crate::context::EvalContext;
use crate::date_predicate::date_matches;
use crate::text_ops::{list_op_matches, numeric_op_matches, strip_month_suffix, text_op_matches};

/// Parse `"lat,lng"` into a pair of floats, tolerating surrounding
/// whitespace. Malformed values make `within_radius` a degenerate no-op,
/// consistent with the rest of §4.1.
fn parse_latlng(value: &str) -> Option<(f64, f64)> {
    let (lat, lng) = value.split_once(',')?;
    Some((lat.trim().parse().ok()?, lng.trim().parse().ok()?))
}

/// The geocode cache key for an account, in order of preference (§4.1
/// "Location predicate"). Returns `None` if the account has no usable
/// address fields.
#[must_use]
pub fn geocode_key_for(account: &Account) -> Option<String> {
    match (&account.zip_code, &account.state, &account.city) {
        (Some(zip), Some(state), _) if !zip.is_empty() && !state.is_empty() => {
            Some(format!("{zip}, {state}, USA"))
        }
        (_, Some(state), Some(city)) if !state.is_empty() && !city.is_empty() => {
            Some(format!("{city}, {state}, USA"))
        }
        (Some(zip), _, _) if !zip.is_empty() => Some(format!("{zip}, USA")),
        _ => None,
    }
}

fn policy_type_matches(operator: &str, value: Option<&str>, lob_lower: &str) -> bool {
    let Some(value) = value else { return true };
    match operator {
        "is" => lob_lower.contains(&value.to_lowercase()),
        "is_not" => !lob_lower.contains(&value.to_lowercase()),
        "is_any" => value.split(',').any(|v| lob_lower.contains(&v.trim().to_lowercase())),
        "is_not_any" => value.split(',').all(|v| !lob_lower.contains(&v.trim().to_lowercase())),
        _ => true,
    }
}

/// Whether `policy` is selected by a rule's optional `policyType`/
/// `policyTerm` restriction (used by date-trigger rules on
/// `policy_expiration`/`policy_effective`, §4.1 table footnotes).
fn policy_selected_by_restriction(policy: &Policy, rule: &Rule) -> bool {
    if let Some(policy_type) = &rule.policy_type
        && !policy.lob.to_lowercase().contains(&policy_type.to_lowercase())
    {
        return false;
    }
    if let Some(policy_term) = &rule.policy_term {
        let term = policy.term.as_deref().unwrap_or_default();
        if strip_month_suffix(term) != strip_month_suffix(policy_term) {
            return false;
        }
    }
    true
}

/// Evaluate a single [`Rule`] against one account. `today` is the account's
/// local calendar date as seen by the caller (the planner and rules both
/// use UTC-normalized dates here; per-account timezone nuance lives in the
/// planner, not the filter).
#[must_use]
pub fn rule_matches(rule: &Rule, account: &Account, ctx: &EvalContext<'_>) -> bool {
    let policies = ctx.policies_for(account.id);
    let today = ctx.now.date_naive();

    match rule.field.as_str() {
        "account_status" | "customer_status" => {
            list_op_matches(&rule.operator, rule.value.as_deref(), &account.status, str::to_lowercase)
        }

        "policy_type" => policies.iter().any(|p| {
            policy_type_matches(&rule.operator, rule.value.as_deref(), &p.lob.to_lowercase())
        }),

        "active_policy_type" => policies
            .iter()
            .filter(|p| p.status.as_str().trim() == "active")
            .any(|p| policy_type_matches(&rule.operator, rule.value.as_deref(), &p.lob.to_lowercase())),

        "policy_status" => policies
            .iter()
            .any(|p| list_op_matches(&rule.operator, rule.value.as_deref(), p.status.as_str(), str::to_lowercase)),

        "policy_count" => numeric_op_matches(
            &rule.operator,
            rule.value.as_deref(),
            rule.value2.as_deref(),
            policies.len() as f64,
        ),

        "policy_expiration" => policies.iter().filter(|p| policy_selected_by_restriction(p, rule)).any(|p| {
            date_matches(&rule.operator, rule.value.as_deref(), rule.value2.as_deref(), Some(p.expiration_date), today)
        }),

        "policy_effective" => policies.iter().filter(|p| policy_selected_by_restriction(p, rule)).any(|p| {
            date_matches(&rule.operator, rule.value.as_deref(), rule.value2.as_deref(), Some(p.effective_date), today)
        }),

        "account_created" => date_matches(
            &rule.operator,
            rule.value.as_deref(),
            rule.value2.as_deref(),
            Some(account.created_at.date_naive()),
            today,
        ),

        "last_email_sent" => date_matches(
            &rule.operator,
            rule.value.as_deref(),
            rule.value2.as_deref(),
            ctx.last_email_sent_for(account.id).map(|dt| dt.date_naive()),
            today,
        ),

        "state" => list_op_matches(
            &rule.operator,
            rule.value.as_deref(),
            account.state.as_deref().unwrap_or_default(),
            |s| s.to_uppercase(),
        ),

        "city" => text_op_matches(&rule.operator, rule.value.as_deref(), account.city.as_deref().unwrap_or_default()),

        "zip_code" => {
            text_op_matches(&rule.operator, rule.value.as_deref(), account.zip_code.as_deref().unwrap_or_default())
        }

        "email_domain" => {
            let domain = account.email.rsplit_once('@').map_or("", |(_, d)| d);
            text_op_matches(&rule.operator, rule.value.as_deref(), domain)
        }

        "policy_term" => policies.iter().any(|p| {
            let Some(value) = &rule.value else { return true };
            let term = p.term.as_deref().unwrap_or_default();
            strip_month_suffix(term).contains(&strip_month_suffix(value))
        }),

        "location" => {
            let (Some(value), Some(radius)) = (&rule.value, rule.radius) else { return true };
            let Some((lat, lng)) = parse_latlng(value) else { return true };
            let Some(key) = geocode_key_for(account) else { return false };
            let Some(point) = ctx.geocode(&key) else { return false };
            let target = crate::geocoder::LatLng { lat, lng };
            point.distance_miles(target) <= radius
        }

        // Unrecognized field: degenerate no-op, never silently exclude
        // everyone for a rule the UI doesn't know how to build yet.
        _ => true,
    }
}

/// Result of matching a [`cadence_core::FilterConfig`] against one account:
/// whether it matched overall, and which group indices matched (for preview
/// / debugging breakdowns, §4.1 "Compilation strategy").
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub matched: bool,
    pub matched_groups: Vec<usize>,
}

/// Evaluate a full filter against one account, honoring `notOptedOut` and
/// the free-text `search` (matched against name/email, case-insensitively).
#[must_use]
pub fn evaluate_account(
    filter: &cadence_core::FilterConfig,
    account: &Account,
    ctx: &EvalContext<'_>,
) -> MatchResult {
    if filter.not_opted_out && account.opted_out {
        return MatchResult::default();
    }
    if !filter.search.is_empty() {
        let needle = filter.search.to_lowercase();
        let haystack = format!("{} {}", account.full_name(), account.email).to_lowercase();
        if !haystack.contains(&needle) {
            return MatchResult::default();
        }
    }

    if filter.groups.is_empty() {
        return MatchResult { matched: true, matched_groups: vec![] };
    }

    let matched_groups: Vec<usize> = filter
        .groups
        .iter()
        .enumerate()
        .filter(|(_, group)| group.rules.iter().all(|rule| rule_matches(rule, account, ctx)))
        .map(|(i, _)| i)
        .collect();

    MatchResult { matched: !matched_groups.is_empty(), matched_groups }
}
