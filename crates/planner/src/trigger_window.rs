use std::collections::HashMap;

use cadence_core::{DATE_TRIGGER_FIELDS, FilterConfig, Group, Rule};

/// How far before (or, if negative, after) a trigger date the email
/// sequence's `firstQualDate` sits, plus the optional policy restriction the
/// originating rule carried (§4.2 Step A).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerWindow {
    pub days_before_trigger: i64,
    pub policy_type: Option<String>,
    pub policy_term: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Builder {
    inner: Option<i64>,
    outer: Option<i64>,
    after: Option<i64>,
    policy_type: Option<String>,
    policy_term: Option<String>,
}

fn is_date_trigger_operator(operator: &str) -> bool {
    matches!(operator, "in_next_days" | "more_than_days_future" | "less_than_days_future" | "in_last_days")
}

/// Split `filter` into (i) a base filter with every relative-date rule on
/// the three trigger-date fields removed, and (ii) one [`TriggerWindow`] per
/// trigger-date field actually referenced by the filter (§4.2 Step A). An
/// empty result map means the automation is non-date-based ("immediate").
#[must_use]
pub fn partition_date_trigger_rules(filter: &FilterConfig) -> (FilterConfig, HashMap<String, TriggerWindow>) {
    let mut builders: HashMap<String, Builder> = HashMap::new();
    let mut base_groups = Vec::with_capacity(filter.groups.len());

    for group in &filter.groups {
        let mut base_rules = Vec::with_capacity(group.rules.len());
        for rule in &group.rules {
            if DATE_TRIGGER_FIELDS.contains(&rule.field.as_str()) && is_date_trigger_operator(&rule.operator) {
                fold_rule_into_builder(builders.entry(rule.field.clone()).or_default(), rule);
            } else {
                base_rules.push(rule.clone());
            }
        }
        base_groups.push(Group { rules: base_rules });
    }

    let windows = builders
        .into_iter()
        .map(|(field, b)| {
            let days_before_trigger = b.inner.or(b.outer).or(b.after).unwrap_or(0);
            (field, TriggerWindow { days_before_trigger, policy_type: b.policy_type, policy_term: b.policy_term })
        })
        .collect();

    let base_filter = FilterConfig {
        groups: base_groups,
        not_opted_out: filter.not_opted_out,
        search: filter.search.clone(),
    };
    (base_filter, windows)
}

fn fold_rule_into_builder(builder: &mut Builder, rule: &Rule) {
    if builder.policy_type.is_none() {
        builder.policy_type = rule.policy_type.clone();
    }
    if builder.policy_term.is_none() {
        builder.policy_term = rule.policy_term.clone();
    }
    let Some(n) = rule.value.as_deref().and_then(|v| v.trim().parse::<i64>().ok()) else { return };

    match rule.operator.as_str() {
        "in_next_days" | "more_than_days_future" => {
            builder.inner = Some(builder.inner.map_or(n, |current| current.max(n)));
        }
        "less_than_days_future" if builder.inner.is_none() => {
            builder.outer = Some(n);
        }
        "in_last_days" => {
            builder.after = Some(-n);
        }
        _ => {}
    }
}
