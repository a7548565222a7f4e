//! Due dates: parsing user input and describing how close a date is.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};

use crate::error::{Error, Result};

/// Parse a due-date argument relative to `now`.
///
/// Accepted forms:
/// - empty: `now`
/// - `M/D` or `M/D/YYYY`: that day at 00:00 UTC, the year defaulting to
///   the year of `now`
/// - `<int><unit>` with unit `d`, `w`, `m` or `y`: `now` shifted by that many
///   days, weeks, calendar months or years (month ends clamp)
pub fn parse_due_date(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(now);
    }
    if input.contains('/') {
        parse_calendar_date(input, now)
    } else {
        parse_relative(input, now)
    }
}

fn parse_calendar_date(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let invalid = || Error::InvalidInput(format!("invalid due date '{input}' (expected M/D or M/D/YYYY)"));
    let parts: Vec<&str> = input.split('/').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid());
    }
    let month: u32 = parts[0].parse().map_err(|_| invalid())?;
    let day: u32 = parts[1].parse().map_err(|_| invalid())?;
    let year: i32 = match parts.get(2) {
        Some(year) if year.len() == 4 => year.parse().map_err(|_| invalid())?,
        Some(_) => return Err(invalid()),
        None => now.year(),
    };
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&midnight))
}

fn parse_relative(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let invalid = |why: &str| Error::InvalidInput(format!("invalid relative due date '{input}': {why}"));
    let Some(unit) = input.chars().last() else {
        return Err(invalid("empty"));
    };
    let amount = &input[..input.len() - unit.len_utf8()];
    if amount.is_empty() {
        return Err(invalid("missing amount"));
    }
    let amount: i64 = amount.parse().map_err(|_| invalid("amount is not an integer"))?;
    let overflow = || invalid("out of range");

    match unit {
        'd' => Duration::try_days(amount)
            .and_then(|offset| now.checked_add_signed(offset))
            .ok_or_else(overflow),
        'w' => amount
            .checked_mul(7)
            .and_then(Duration::try_days)
            .and_then(|offset| now.checked_add_signed(offset))
            .ok_or_else(overflow),
        'm' => shift_months(now, amount).ok_or_else(overflow),
        'y' => amount
            .checked_mul(12)
            .and_then(|months| shift_months(now, months))
            .ok_or_else(overflow),
        _ => Err(invalid("unit must be one of d, w, m, y")),
    }
}

fn shift_months(now: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        now.checked_add_months(Months::new(magnitude))
    } else {
        now.checked_sub_months(Months::new(magnitude))
    }
}

/// How close a due date is to the end of today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
    /// Due before the end of the day before yesterday.
    VeryLate,
    /// Due yesterday.
    Late,
    Today,
    Tomorrow,
    Later,
}

impl DueBucket {
    pub fn of(due: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let end_of_today = end_of_day(now);
        if due < end_of_today - Duration::days(2) {
            DueBucket::VeryLate
        } else if due < end_of_today - Duration::days(1) {
            DueBucket::Late
        } else if due < end_of_today {
            DueBucket::Today
        } else if due < end_of_today + Duration::days(1) {
            DueBucket::Tomorrow
        } else {
            DueBucket::Later
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DueBucket::VeryLate => "very_late",
            DueBucket::Late => "late",
            DueBucket::Today => "today",
            DueBucket::Tomorrow => "tomorrow",
            DueBucket::Later => "later",
        }
    }

    /// Marker appended to the due column in task tables.
    pub fn marker(self) -> &'static str {
        match self {
            DueBucket::VeryLate => "!!",
            DueBucket::Late => "!",
            DueBucket::Today => "*",
            DueBucket::Tomorrow | DueBucket::Later => "",
        }
    }
}

/// 00:00 UTC on the day of `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(ts)
}

fn end_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(now) + Duration::days(1) - Duration::nanoseconds(1)
}

/// `M-D`, with `-YYYY` appended when the year differs from `now`'s.
pub fn format_due(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if due.year() == now.year() {
        due.format("%-m-%-d").to_string()
    } else {
        due.format("%-m-%-d-%Y").to_string()
    }
}

/// Compact age of `ts`: days under two weeks, weeks under eight weeks,
/// then 30-day months.
pub fn since_label(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - ts).num_days();
    if days < 14 {
        return format!("{days}d");
    }
    let weeks = days / 7;
    if weeks < 8 {
        return format!("{weeks}w");
    }
    format!("{}m", days / 30)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_input_is_now() {
        assert_eq!(parse_due_date("", now()).unwrap(), now());
        assert_eq!(parse_due_date("   ", now()).unwrap(), now());
    }

    #[test]
    fn relative_days_and_weeks() {
        assert_eq!(
            parse_due_date("2d", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_due_date("1w", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 8, 12, 0, 0).unwrap()
        );
        assert_eq!(
            parse_due_date("-1d", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn relative_months_clamp_to_month_end() {
        let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        assert_eq!(
            parse_due_date("1m", jan31).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap()
        );
        assert_eq!(
            parse_due_date("1y", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn calendar_dates() {
        assert_eq!(
            parse_due_date("6/15", now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_due_date("1/2/2025", now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["6", "d", "2x", "2.5d", "13/1", "2/30", "1/2/3/4", "1/2/25", "a/b"] {
            let err = parse_due_date(input, now()).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{input}");
        }
    }

    #[test]
    fn huge_offsets_are_rejected() {
        assert!(parse_due_date("99999999999999d", now()).is_err());
        assert!(parse_due_date("9999999999y", now()).is_err());
    }

    #[test]
    fn buckets_follow_end_of_today() {
        let at = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 6, d, h, 0, 0).unwrap();
        assert_eq!(DueBucket::of(at(1, 8), now()), DueBucket::Today);
        assert_eq!(DueBucket::of(at(1, 23), now()), DueBucket::Today);
        assert_eq!(DueBucket::of(at(2, 10), now()), DueBucket::Tomorrow);
        assert_eq!(DueBucket::of(at(3, 0), now()), DueBucket::Later);
        let may = |d: u32| Utc.with_ymd_and_hms(2024, 5, d, 10, 0, 0).unwrap();
        assert_eq!(DueBucket::of(may(31), now()), DueBucket::Late);
        assert_eq!(DueBucket::of(may(30), now()), DueBucket::VeryLate);
    }

    #[test]
    fn start_of_day_truncates_to_midnight() {
        assert_eq!(
            start_of_day(now()),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn format_due_adds_year_only_when_different() {
        let due = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        assert_eq!(format_due(due, now()), "6-3");
        let next_year = Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap();
        assert_eq!(format_due(next_year, now()), "1-9-2025");
    }

    #[test]
    fn since_label_units() {
        assert_eq!(since_label(now(), now()), "0d");
        assert_eq!(since_label(now() - Duration::days(13), now()), "13d");
        assert_eq!(since_label(now() - Duration::days(14), now()), "2w");
        assert_eq!(since_label(now() - Duration::days(55), now()), "7w");
        assert_eq!(since_label(now() - Duration::days(56), now()), "1m");
        assert_eq!(since_label(now() - Duration::days(400), now()), "13m");
    }
}
