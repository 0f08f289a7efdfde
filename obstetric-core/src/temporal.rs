//! Calendar arithmetic and gestational-age text handling.
//!
//! Time-zone policy: instants are converted to the clinic's fixed UTC offset
//! before their date is taken. All arithmetic below works on `NaiveDate`, so a
//! day is always a calendar day regardless of daylight-saving rules.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::NoteError;

static WEEKS_PLUS_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*[+ ]\s*(\d+)$").expect("weeks+days pattern compiles")
});

static WEEKS_SEMANAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*s(?:emanas?)?\s*(\d+)?\s*d?").expect("weeks-s pattern compiles")
});

static WEEKS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(\d+)?$").expect("bare weeks pattern compiles"));

/// Calendar date of `ts` on a clock running at `offset`.
pub fn normalize_to_calendar_date(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Whole calendar days from `b` to `a` (negative when `a` precedes `b`).
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    a.signed_duration_since(b).num_days()
}

/// `date` shifted by `days`; `None` only when leaving chrono's calendar range.
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}

/// Formats a day count as `WsDd` (`280` → `40s0d`). Negative counts render empty.
pub fn format_weeks_days(total_days: i64) -> String {
    if total_days < 0 {
        return String::new();
    }
    format!("{}s{}d", total_days / 7, total_days % 7)
}

/// Parses free-text gestational age into total days.
///
/// Accepted forms, first match wins: `40+2` (or `40 2`), `40s2d` / `40 semanas 2d`
/// / `40s`, and a bare `40`.
pub fn parse_gestational_age_text(text: &str) -> Option<u32> {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    let captures = WEEKS_PLUS_DAYS
        .captures(&normalized)
        .or_else(|| WEEKS_SEMANAS.captures(&normalized))
        .or_else(|| WEEKS_ONLY.captures(&normalized))?;

    let weeks: u32 = captures.get(1)?.as_str().parse().ok()?;
    let days: u32 = match captures.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    weeks.checked_mul(7)?.checked_add(days)
}

/// `DD/MM/YYYY`.
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `DD/MM/YY`, as printed on the paper admission form.
pub fn format_date_br_short(date: NaiveDate) -> String {
    date.format("%d/%m/%y").to_string()
}

/// `HH:MM de DD/MM`.
pub fn format_time_date_br(at: NaiveDateTime) -> String {
    at.format("%H:%M de %d/%m").to_string()
}

/// Reads a form date (`YYYY-MM-DD`). Full RFC 3339 timestamps are accepted and
/// reduced to their calendar date on the clinic clock at `offset`.
pub fn parse_form_date(value: &str, offset: FixedOffset) -> Result<NaiveDate, NoteError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NoteError::InsufficientData("empty date".to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| {
            DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| normalize_to_calendar_date(dt.with_timezone(&Utc), offset))
        })
        .map_err(|_| NoteError::UnparsableInput(format!("date {trimmed:?}")))
}

/// Reads a `datetime-local` form value (`YYYY-MM-DDTHH:MM[:SS]`).
pub fn parse_form_datetime(value: &str) -> Result<NaiveDateTime, NoteError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NoteError::InsufficientData("empty datetime".to_string()));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| NoteError::UnparsableInput(format!("datetime {trimmed:?}")))
}

/// A gestational age in whole days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct GestationalAge(u32);

impl GestationalAge {
    pub fn from_days(days: u32) -> Self {
        Self(days)
    }

    pub fn total_days(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GestationalAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_weeks_days(i64::from(self.0)))
    }
}

impl FromStr for GestationalAge {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_gestational_age_text(s)
            .map(Self)
            .ok_or_else(|| NoteError::UnparsableInput(format!("gestational age {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn format_and_parse_agree_for_every_weekday() {
        for weeks in [0u32, 1, 12, 37, 40, 42] {
            for days in 0..7u32 {
                let total = weeks * 7 + days;
                let text = format_weeks_days(i64::from(total));
                assert_eq!(parse_gestational_age_text(&text), Some(total), "{text}");
            }
        }
    }

    #[test]
    fn parses_each_grammar() {
        assert_eq!(parse_gestational_age_text("40+2"), Some(282));
        assert_eq!(parse_gestational_age_text(" 40 + 2 "), Some(282));
        assert_eq!(parse_gestational_age_text("40 2"), Some(282));
        assert_eq!(parse_gestational_age_text("39s5d"), Some(278));
        assert_eq!(parse_gestational_age_text("39 semanas 5d"), Some(278));
        assert_eq!(parse_gestational_age_text("12 Semana"), Some(84));
        assert_eq!(parse_gestational_age_text("39S"), Some(273));
        assert_eq!(parse_gestational_age_text("40"), Some(280));
    }

    #[test]
    fn rejects_unparsable_text() {
        assert_eq!(parse_gestational_age_text(""), None);
        assert_eq!(parse_gestational_age_text("   "), None);
        assert_eq!(parse_gestational_age_text("quarenta"), None);
        assert_eq!(parse_gestational_age_text("s5d"), None);
        assert!("abc".parse::<GestationalAge>().is_err());
    }

    #[test]
    fn negative_counts_format_empty() {
        assert_eq!(format_weeks_days(-1), "");
        assert_eq!(format_weeks_days(0), "0s0d");
        assert_eq!(format_weeks_days(280), "40s0d");
    }

    #[test]
    fn add_days_inverts_days_between() {
        let base = date(2024, 2, 27);
        for n in [-400i64, -30, -1, 0, 1, 2, 29, 280, 365] {
            let shifted = add_days(base, n).unwrap();
            assert_eq!(days_between(shifted, base), n);
        }
    }

    #[test]
    fn days_between_is_plain_calendar_difference() {
        assert_eq!(days_between(date(2024, 3, 1), date(2024, 2, 28)), 2);
        assert_eq!(days_between(date(2024, 2, 28), date(2024, 3, 1)), -2);
        assert_eq!(days_between(date(2024, 3, 1), date(2024, 3, 1)), 0);
    }

    #[test]
    fn normalizes_instants_on_the_clinic_clock() {
        let offset = brasilia();
        let late = Utc.with_ymd_and_hms(2024, 5, 10, 2, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 5, 10, 3, 0, 0).unwrap();
        assert_eq!(normalize_to_calendar_date(late, offset), date(2024, 5, 9));
        assert_eq!(normalize_to_calendar_date(after, offset), date(2024, 5, 10));
    }

    fn brasilia() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    #[test]
    fn parses_form_dates() {
        let offset = brasilia();
        assert_eq!(parse_form_date("2024-01-15", offset).unwrap(), date(2024, 1, 15));
        assert_eq!(
            parse_form_date("2024-01-15T23:30:00Z", offset).unwrap(),
            date(2024, 1, 15)
        );
        assert!(matches!(
            parse_form_date("", offset),
            Err(NoteError::InsufficientData(_))
        ));
        assert!(matches!(
            parse_form_date("15/01/2024", offset),
            Err(NoteError::UnparsableInput(_))
        ));
        let at = parse_form_datetime("2024-05-10T08:05").unwrap();
        assert_eq!(format_time_date_br(at), "08:05 de 10/05");
    }

    #[test]
    fn form_timestamps_use_the_clinic_calendar() {
        let offset = brasilia();
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 1, 0, 0).unwrap();
        let parsed = parse_form_date("2024-01-15T01:00:00Z", offset).unwrap();
        assert_eq!(parsed, date(2024, 1, 14));
        assert_eq!(parsed, normalize_to_calendar_date(instant, offset));
    }

    #[test]
    fn brazilian_date_formats() {
        assert_eq!(format_date_br(date(2024, 1, 5)), "05/01/2024");
        assert_eq!(format_date_br_short(date(2024, 1, 5)), "05/01/24");
    }

    #[test]
    fn gestational_age_accessors() {
        let age: GestationalAge = "39+5".parse().unwrap();
        assert_eq!(age.total_days(), 278);
        assert_eq!(age.to_string(), "39s5d");
        assert_eq!(GestationalAge::from_days(280).to_string(), "40s0d");
    }
}
