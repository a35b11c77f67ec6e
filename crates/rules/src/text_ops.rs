/// Evaluate the `is`/`is_not`/`is_any`/`is_not_any` family shared by
/// `account_status`, `customer_status`, `policy_type`, `active_policy_type`,
/// `policy_status`, and `state` (§4.1). `actual` and the rule's `value` are
/// compared after `normalize` is applied to both sides.
#[must_use]
pub fn list_op_matches(
    operator: &str,
    value: Option<&str>,
    actual: &str,
    normalize: impl Fn(&str) -> String,
) -> bool {
    let Some(value) = value else { return true };
    let actual = normalize(actual);
    match operator {
        "is" => actual == normalize(value),
        "is_not" => actual != normalize(value),
        "is_any" => value.split(',').any(|v| actual == normalize(v.trim())),
        "is_not_any" => value.split(',').all(|v| actual != normalize(v.trim())),
        _ => true,
    }
}

/// Evaluate the substring/equality family shared by `city`, `zip_code`, and
/// `email_domain` (§4.1).
#[must_use]
pub fn text_op_matches(operator: &str, value: Option<&str>, actual: &str) -> bool {
    let actual_lower = actual.to_lowercase();
    match operator {
        "is_empty" => actual.trim().is_empty(),
        "is_not_empty" => !actual.trim().is_empty(),
        _ => {
            let Some(value) = value else { return true };
            let value_lower = value.to_lowercase();
            match operator {
                "contains" => actual_lower.contains(&value_lower),
                "not_contains" => !actual_lower.contains(&value_lower),
                "equals" => actual_lower == value_lower,
                "not_equals" => actual_lower != value_lower,
                "starts_with" => actual_lower.starts_with(&value_lower),
                "ends_with" => actual_lower.ends_with(&value_lower),
                _ => true,
            }
        }
    }
}

/// Strip a trailing `"month"`/`"months"` (any case, optional leading space)
/// from a policy-term label, so `"6 Months"` and `"6"` compare equal
/// (§4.1 `policy_term`).
#[must_use]
pub fn strip_month_suffix(s: &str) -> String {
    let trimmed = s.trim();
    let lower = trimmed.to_lowercase();
    for suffix in ["months", "month"] {
        if let Some(stripped) = lower.strip_suffix(suffix) {
            return stripped.trim().to_string();
        }
    }
    lower
}

#[must_use]
pub fn numeric_op_matches(operator: &str, value: Option<&str>, value2: Option<&str>, actual: f64) -> bool {
    let Some(target) = value.and_then(|v| v.trim().parse::<f64>().ok()) else { return true };
    match operator {
        "equals" => (actual - target).abs() < f64::EPSILON,
        "greater_than" => actual > target,
        "less_than" => actual < target,
        "at_least" => actual >= target,
        "at_most" => actual <= target,
        "between" => {
            let Some(target2) = value2.and_then(|v| v.trim().parse::<f64>().ok()) else {
                return true;
            };
            actual >= target && actual <= target2
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_op_is_any_splits_commas() {
        assert!(list_op_matches("is_any", Some("TX, CA"), "ca", |s| s.to_uppercase()));
        assert!(!list_op_matches("is_any", Some("TX, CA"), "ny", |s| s.to_uppercase()));
    }

    #[test]
    fn list_op_missing_value_is_noop() {
        assert!(list_op_matches("is", None, "anything", str::to_string));
    }

    #[test]
    fn text_op_is_empty_ignores_value() {
        assert!(text_op_matches("is_empty", None, "  "));
        assert!(!text_op_matches("is_empty", None, "austin"));
    }

    #[test]
    fn text_op_contains_is_case_insensitive() {
        assert!(text_op_matches("contains", Some("AUS"), "austin"));
    }

    #[test]
    fn month_suffix_stripped_regardless_of_plural() {
        assert_eq!(strip_month_suffix("6 Months"), "6");
        assert_eq!(strip_month_suffix("12 month"), "12");
        assert_eq!(strip_month_suffix("annual"), "annual");
    }

    #[test]
    fn numeric_between_is_inclusive() {
        assert!(numeric_op_matches("between", Some("1"), Some("3"), 2.0));
        assert!(numeric_op_matches("between", Some("1"), Some("3"), 1.0));
        assert!(!numeric_op_matches("between", Some("1"), Some("3"), 4.0));
    }
}
