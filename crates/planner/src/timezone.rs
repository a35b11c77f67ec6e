use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::PlannerError;

/// Convert a local wall-clock date + `"HH:MM"` time in `tz_name` to the
/// corresponding UTC instant (§4.7).
///
/// Delegates to the IANA timezone database via `chrono-tz` rather than the
/// simplified US-only DST table the distilled spec describes as a legacy
/// fallback -- by the spec's own admission a real tz database is a strict
/// superset of that table for every test vector, and it additionally makes
/// non-US zones (and Phoenix's permanent standard time, and Honolulu's lack
/// of DST) correct by construction instead of by special case.
///
/// For a local time that falls in a spring-forward gap, the post-gap
/// instant is used. For a time that falls in a fall-back overlap, the
/// earlier (pre-transition) instant is used. Both are the conventional
/// resolutions and neither can occur for typical 09:00-ish send times.
pub fn local_to_utc(date: NaiveDate, time: &str, tz_name: &str) -> Result<DateTime<Utc>, PlannerError> {
    let tz: Tz = tz_name.parse().map_err(|()| PlannerError::InvalidTimezone(tz_name.to_string()))?;
    let naive_time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| PlannerError::InvalidSendTime(time.to_string()))?;
    let naive = date.and_time(naive_time);

    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _latest) => earliest,
        LocalResult::None => {
            // Spring-forward gap: step forward an hour and resolve again,
            // landing just after the transition.
            let shifted = naive + chrono::Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) => dt,
                LocalResult::Ambiguous(earliest, _) => earliest,
                LocalResult::None => return Err(PlannerError::InvalidSendTime(time.to_string())),
            }
        }
    };

    Ok(local.with_timezone(&Utc))
}
