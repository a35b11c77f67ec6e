use chrono::NaiveDate;

/// Evaluate one of the date-trigger operators from §4.1 against a `target`
/// date relative to `today`.
///
/// `target = None` models "no such date" (most relevantly, an account that
/// has never been emailed for `last_email_sent`): it is treated as further
/// in the past than any real date, so it satisfies `before`/`more_than_*_ago`
/// predicates but never a forward-looking or bounded-recency one.
#[must_use]
pub fn date_matches(
    operator: &str,
    value: Option<&str>,
    value2: Option<&str>,
    target: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    let Some(target) = target else {
        return matches!(operator, "before" | "more_than_days_ago");
    };

    match operator {
        "in_next_days" => {
            let Some(n) = parse_days(value) else { return true };
            target >= today && target <= today + chrono::Duration::days(n)
        }
        "in_last_days" => {
            let Some(n) = parse_days(value) else { return true };
            target <= today && target >= today - chrono::Duration::days(n)
        }
        "more_than_days_future" => {
            let Some(n) = parse_days(value) else { return true };
            target > today + chrono::Duration::days(n)
        }
        "less_than_than_days_future" => {
            let Some(n) = parse_days(value) else { return true };
            target > today && target < today + chrono::Duration::days(n)
        }
        "more_than_days_ago" => {
            let Some(n) = parse_days(value) else { return true };
            (today - target).num_days() > n
        }
        "less_than_days_ago" => {
            let Some(n) = parse_days(value) else { return true };
            let diff = (today - target).num_days();
            diff >= 0 && diff < n
        }
        "before" => {
            let Some(d) = parse_date(value) else { return true };
            target < d
        }
        "after" => {
            let Some(d) = parse_date(value) else { return true };
            target > d
        }
        "between" => {
            let (Some(start), Some(end)) = (parse_date(value), parse_date(value2)) else {
                return true;
            };
            target >= start && target <= end
        }
        // Unrecognized operator: degenerate no-op.
        _ => true,
    }
}

fn parse_days(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}
