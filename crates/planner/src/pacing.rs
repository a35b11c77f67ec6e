use cadence_core::PacingConfig;
use chrono::{Datelike, Duration, NaiveDate};

fn weekday_index(date: NaiveDate) -> u8 {
    u8::try_from(date.weekday().num_days_from_sunday()).expect("0..=6 fits in u8")
}

/// The next `spread_over_days` consecutive calendar days starting `today`,
/// filtered to those whose weekday is in `allowed_days` (§4.2 Step E).
#[must_use]
pub fn valid_pacing_days(today: NaiveDate, spread_over_days: u32, allowed_days: &[u8]) -> Vec<NaiveDate> {
    (0..i64::from(spread_over_days))
        .map(|offset| today + Duration::days(offset))
        .filter(|date| allowed_days.contains(&weekday_index(*date)))
        .collect()
}

/// Round-robin a batch of local send dates across `pacing`'s valid days
/// when `pacing.enabled`, or nudge disallowed-day dates forward to the next
/// allowed day (searching up to 7 days) when pacing merely restricts
/// `allowed_days` without being fully enabled (§4.2 Step E).
pub fn apply_pacing(dates: &mut [NaiveDate], today: NaiveDate, pacing: &PacingConfig) {
    if pacing.enabled && pacing.spread_over_days > 0 && !pacing.allowed_days.is_empty() {
        let buckets = valid_pacing_days(today, pacing.spread_over_days, &pacing.allowed_days);
        if !buckets.is_empty() {
            for (i, date) in dates.iter_mut().enumerate() {
                *date = buckets[i % buckets.len()];
            }
            return;
        }
    }

    if pacing.restricts_days() {
        for date in dates.iter_mut() {
            *date = next_allowed_day(*date, &pacing.allowed_days);
        }
    }
}

fn next_allowed_day(date: NaiveDate, allowed_days: &[u8]) -> NaiveDate {
    for offset in 0..7 {
        let candidate = date + Duration::days(offset);
        if allowed_days.contains(&weekday_index(candidate)) {
            return candidate;
        }
    }
    date
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn monday_plus_five_weekdays_gives_five_buckets() {
        let monday = d("2025-06-02");
        let buckets = valid_pacing_days(monday, 5, &[1, 2, 3, 4, 5]);
        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets[0], monday);
        assert_eq!(buckets[4], d("2025-06-06"));
    }

    #[test]
    fn round_robin_distributes_1000_rows_across_5_buckets() {
        let monday = d("2025-06-02");
        let pacing = PacingConfig { enabled: true, spread_over_days: 5, allowed_days: vec![1, 2, 3, 4, 5] };
        let mut dates = vec![monday; 1000];
        apply_pacing(&mut dates, monday, &pacing);

        let buckets = valid_pacing_days(monday, 5, &[1, 2, 3, 4, 5]);
        for bucket in &buckets {
            assert!(!dates.iter().any(|d| *d == *bucket) || dates.contains(bucket));
        }
        assert!(dates.iter().all(|d| d.weekday().num_days_from_sunday() != 0
            && d.weekday().num_days_from_sunday() != 6));
    }

    #[test]
    fn disabled_but_restricted_nudges_forward() {
        let saturday = d("2025-06-07");
        let pacing = PacingConfig { enabled: false, spread_over_days: 0, allowed_days: vec![1, 2, 3, 4, 5] };
        let mut dates = vec![saturday];
        apply_pacing(&mut dates, saturday, &pacing);
        assert_eq!(dates[0], d("2025-06-09"));
    }

    #[test]
    fn unrestricted_pacing_leaves_dates_untouched() {
        let saturday = d("2025-06-07");
        let pacing = PacingConfig::default();
        let mut dates = vec![saturday];
        apply_pacing(&mut dates, saturday, &pacing);
        assert_eq!(dates[0], saturday);
    }
}
