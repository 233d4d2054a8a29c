//! Five-field cron expressions.
//!
//! Fields are minute, hour, day-of-month, month and day-of-week. Each
//! field accepts `*`, single values, ranges (`a-b`), lists (`a,b`) and
//! steps (`*/n`, `a-b/n`, `a/n`). Months and weekdays may be given by
//! three-letter name. Weekday 7 is Sunday, like 0.
//!
//! When both day fields are restricted a day matches if either matches.
//! Times are evaluated in UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Upper bound on search steps in [`CronSchedule::next_after`].
const MAX_SEARCH_STEPS: usize = 100_000;

/// Errors from parsing a cron expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("expected 5 fields, found {found} in '{expr}'")]
    FieldCount { expr: String, found: usize },

    #[error("invalid {field} field '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("unsupported macro '{0}'")]
    UnknownMacro(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
}

impl Field {
    fn name(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfMonth => "day-of-month",
            Self::Month => "month",
            Self::DayOfWeek => "day-of-week",
        }
    }

    fn bounds(self) -> (u32, u32) {
        match self {
            Self::Minute => (0, 59),
            Self::Hour => (0, 23),
            Self::DayOfMonth => (1, 31),
            Self::Month => (1, 12),
            Self::DayOfWeek => (0, 7),
        }
    }

    fn names(self) -> Option<(&'static [&'static str], u32)> {
        match self {
            Self::Month => Some((&MONTH_NAMES, 1)),
            Self::DayOfWeek => Some((&DAY_NAMES, 0)),
            _ => None,
        }
    }
}

/// Set of allowed values for one field, as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValueSet(u64);

impl ValueSet {
    fn contains(self, value: u32) -> bool {
        value < 64 && self.0 & (1 << value) != 0
    }

    fn insert(&mut self, value: u32) {
        self.0 |= 1 << value;
    }
}

/// A parsed cron schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    source: String,
    minutes: ValueSet,
    hours: ValueSet,
    days_of_month: ValueSet,
    months: ValueSet,
    days_of_week: ValueSet,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    /// Parse an expression or `@macro`
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let trimmed = expr.trim();
        let expanded = match trimmed {
            "@yearly" | "@annually" => "0 0 1 1 *",
            "@monthly" => "0 0 1 * *",
            "@weekly" => "0 0 * * 0",
            "@daily" | "@midnight" => "0 0 * * *",
            "@hourly" => "0 * * * *",
            other if other.starts_with('@') => return Err(CronError::UnknownMacro(other.to_string())),
            other => other,
        };

        let fields: Vec<&str> = expanded.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::FieldCount {
                expr: trimmed.to_string(),
                found: fields.len(),
            });
        }

        let mut days_of_week = parse_field(fields[4], Field::DayOfWeek)?;
        if days_of_week.contains(7) {
            days_of_week.insert(0);
        }

        Ok(Self {
            source: trimmed.to_string(),
            minutes: parse_field(fields[0], Field::Minute)?,
            hours: parse_field(fields[1], Field::Hour)?,
            days_of_month: parse_field(fields[2], Field::DayOfMonth)?,
            months: parse_field(fields[3], Field::Month)?,
            days_of_week,
            dom_restricted: !fields[2].starts_with('*'),
            dow_restricted: !fields[4].starts_with('*'),
        })
    }

    /// The expression as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `time`, truncated to the minute, is a fire time
    pub fn matches(&self, time: DateTime<Utc>) -> bool {
        let t = time.naive_utc();
        self.months.contains(t.month())
            && self.day_matches(t.date())
            && self.hours.contains(t.hour())
            && self.minutes.contains(t.minute())
    }

    /// First fire time strictly after `after`
    ///
    /// Returns `None` when no fire time exists within the search bound,
    /// e.g. for `0 0 30 2 *`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.naive_utc();
        let mut t = start.date().and_hms_opt(start.hour(), start.minute(), 0)? + Duration::minutes(1);

        for _ in 0..MAX_SEARCH_STEPS {
            if !self.months.contains(t.month()) {
                t = first_of_next_month(t)?;
            } else if !self.day_matches(t.date()) {
                t = t.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
            } else if !self.hours.contains(t.hour()) {
                t = t.date().and_hms_opt(t.hour(), 0, 0)? + Duration::hours(1);
            } else if !self.minutes.contains(t.minute()) {
                t += Duration::minutes(1);
            } else {
                return Some(t.and_utc());
            }
        }

        None
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = self.days_of_month.contains(date.day());
        let dow = self.days_of_week.contains(date.weekday().num_days_from_sunday());
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }
}

impl FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn first_of_next_month(t: NaiveDateTime) -> Option<NaiveDateTime> {
    let (year, month) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

fn parse_field(text: &str, field: Field) -> Result<ValueSet, CronError> {
    let invalid = |reason: String| CronError::InvalidField {
        field: field.name(),
        value: text.to_string(),
        reason,
    };

    let (min, max) = field.bounds();
    let mut set = ValueSet(0);

    for item in text.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| invalid(format!("step '{step}' is not a number")))?;
                if step == 0 {
                    return Err(invalid("step must be positive".to_string()));
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        let (start, end) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, field).map_err(&invalid)?, parse_value(b, field).map_err(&invalid)?)
        } else {
            let value = parse_value(range, field).map_err(&invalid)?;
            // `a/n` means every n starting at a
            (value, if step.is_some() { max } else { value })
        };

        if start < min || end > max {
            return Err(invalid(format!("values must be within {min}-{max}")));
        }
        if start > end {
            return Err(invalid(format!("range {start}-{end} is reversed")));
        }

        for value in (start..=end).step_by(step.unwrap_or(1) as usize) {
            set.insert(value);
        }
    }

    Ok(set)
}

fn parse_value(text: &str, field: Field) -> Result<u32, String> {
    if let Ok(value) = text.parse::<u32>() {
        return Ok(value);
    }

    if let Some((names, offset)) = field.names() {
        let lower = text.to_ascii_lowercase();
        if let Some(index) = names.iter().position(|n| *n == lower) {
            return Ok(index as u32 + offset);
        }
    }

    Err(format!("'{text}' is not a valid value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn next(expr: &str, after: DateTime<Utc>) -> DateTime<Utc> {
        CronSchedule::parse(expr).unwrap().next_after(after).unwrap()
    }

    #[test]
    fn test_every_minute() {
        assert_eq!(next("* * * * *", at(2024, 1, 1, 10, 0)), at(2024, 1, 1, 10, 1));
        let mid_minute = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 30).unwrap();
        assert_eq!(next("* * * * *", mid_minute), at(2024, 1, 1, 10, 1));
    }

    #[test]
    fn test_next_is_strictly_after() {
        assert_eq!(next("30 9 * * *", at(2024, 1, 1, 9, 30)), at(2024, 1, 2, 9, 30));
    }

    #[test]
    fn test_steps_and_ranges() {
        assert_eq!(next("*/15 * * * *", at(2024, 1, 1, 10, 1)), at(2024, 1, 1, 10, 15));
        assert_eq!(next("0 9-17/4 * * *", at(2024, 1, 1, 14, 0)), at(2024, 1, 1, 17, 0));
        assert_eq!(next("5/20 * * * *", at(2024, 1, 1, 10, 26)), at(2024, 1, 1, 10, 45));
        assert_eq!(next("0 8,20 * * *", at(2024, 1, 1, 9, 0)), at(2024, 1, 1, 20, 0));
    }

    #[test]
    fn test_month_rollover() {
        assert_eq!(next("0 0 1 * *", at(2024, 12, 15, 0, 0)), at(2025, 1, 1, 0, 0));
        assert_eq!(next("0 12 * feb *", at(2024, 3, 1, 0, 0)), at(2025, 2, 1, 12, 0));
    }

    #[test]
    fn test_leap_day() {
        assert_eq!(next("0 0 29 2 *", at(2025, 1, 1, 0, 0)), at(2028, 2, 29, 0, 0));
    }

    #[test]
    fn test_impossible_date() {
        let schedule = CronSchedule::parse("0 0 30 2 *").unwrap();
        assert_eq!(schedule.next_after(at(2024, 1, 1, 0, 0)), None);
    }

    #[test]
    fn test_weekday_names_and_sunday_seven() {
        // 2024-01-01 is a Monday
        assert_eq!(next("0 9 * * mon-fri", at(2024, 1, 5, 10, 0)), at(2024, 1, 8, 9, 0));
        assert_eq!(next("0 0 * * 7", at(2024, 1, 1, 0, 0)), at(2024, 1, 7, 0, 0));
        assert_eq!(next("0 0 * * SUN", at(2024, 1, 1, 0, 0)), at(2024, 1, 7, 0, 0));
    }

    #[test]
    fn test_day_fields_or_when_both_restricted() {
        // the 15th or any Friday; 2024-01-05 is a Friday
        assert_eq!(next("0 0 15 * fri", at(2024, 1, 1, 0, 0)), at(2024, 1, 5, 0, 0));
        // weekday starred: only the 15th
        assert_eq!(next("0 0 15 * *", at(2024, 1, 1, 0, 0)), at(2024, 1, 15, 0, 0));
    }

    #[test]
    fn test_macros() {
        assert_eq!(next("@hourly", at(2024, 1, 1, 10, 5)), at(2024, 1, 1, 11, 0));
        assert_eq!(next("@daily", at(2024, 1, 1, 10, 5)), at(2024, 1, 2, 0, 0));
        assert_eq!(next("@weekly", at(2024, 1, 1, 10, 5)), at(2024, 1, 7, 0, 0));
        assert_eq!(next("@yearly", at(2024, 1, 1, 10, 5)), at(2025, 1, 1, 0, 0));
        assert_eq!(
            CronSchedule::parse("@reboot"),
            Err(CronError::UnknownMacro("@reboot".to_string()))
        );
    }

    #[test]
    fn test_matches() {
        let schedule = CronSchedule::parse("*/5 * * * *").unwrap();
        assert!(schedule.matches(at(2024, 1, 1, 10, 5)));
        assert!(!schedule.matches(at(2024, 1, 1, 10, 6)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CronSchedule::parse("* * * *"),
            Err(CronError::FieldCount { found: 4, .. })
        ));
        assert!(matches!(
            CronSchedule::parse("60 * * * *"),
            Err(CronError::InvalidField { field: "minute", .. })
        ));
        assert!(matches!(
            CronSchedule::parse("* * 0 * *"),
            Err(CronError::InvalidField { field: "day-of-month", .. })
        ));
        assert!(CronSchedule::parse("*/0 * * * *").is_err());
        assert!(CronSchedule::parse("5-1 * * * *").is_err());
        assert!(CronSchedule::parse("* * * foo *").is_err());
    }

    #[test]
    fn test_display_keeps_source() {
        let schedule: CronSchedule = "  */10 * * * *".parse().unwrap();
        assert_eq!(schedule.to_string(), "*/10 * * * *");
    }
}
