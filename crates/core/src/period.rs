//! Date ranges and named period presets.
//!
//! Pure calendar logic with no storage access. All ranges are inclusive of
//! both endpoints. Week boundaries depend on a configurable first day of
//! week; month and year boundaries are calendar boundaries.

use chrono::{Datelike, Days, Months, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Date;

// ---------------------------------------------------------------------------
// DateRange
// ---------------------------------------------------------------------------

/// An inclusive `[from, to]` calendar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Date,
    pub to: Date,
}

impl DateRange {
    /// Build a range, rejecting `from > to`.
    pub fn new(from: Date, to: Date) -> Result<Self, CoreError> {
        if from > to {
            return Err(CoreError::Validation(format!(
                "range start {from} is after range end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// A single-day range.
    pub fn day(date: Date) -> Self {
        Self {
            from: date,
            to: date,
        }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.from <= date && date <= self.to
    }

    /// Number of calendar days covered, counting both endpoints.
    pub fn len_days(&self) -> u64 {
        (self.to - self.from).num_days() as u64 + 1
    }

    /// Reject ranges longer than `max_days`.
    pub fn ensure_max_days(&self, max_days: u64) -> Result<(), CoreError> {
        let days = self.len_days();
        if days > max_days {
            return Err(CoreError::Validation(format!(
                "date range spans {days} days; the maximum is {max_days}"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Week start
// ---------------------------------------------------------------------------

/// Locale-dependent first day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" => Ok(Self::Monday),
            "sunday" => Ok(Self::Sunday),
            other => Err(CoreError::Validation(format!(
                "Invalid week start '{other}'. Must be one of: monday, sunday"
            ))),
        }
    }

    fn weekday(self) -> Weekday {
        match self {
            Self::Monday => Weekday::Mon,
            Self::Sunday => Weekday::Sun,
        }
    }

    /// The first day of the week containing `date`. Fails when that day
    /// precedes the earliest representable date.
    pub fn week_start_of(self, date: Date) -> Result<Date, CoreError> {
        let offset = (7 + date.weekday().num_days_from_monday()
            - self.weekday().num_days_from_monday())
            % 7;
        sub_days(date, u64::from(offset))
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Calendar-relative period shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PeriodPreset {
    Today,
    Yesterday,
    #[serde(rename = "last7days")]
    Last7Days,
    #[serde(rename = "last30days")]
    Last30Days,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    ThisYear,
    LastYear,
}

impl PeriodPreset {
    pub const ALL: [PeriodPreset; 10] = [
        Self::Today,
        Self::Yesterday,
        Self::Last7Days,
        Self::Last30Days,
        Self::ThisWeek,
        Self::LastWeek,
        Self::ThisMonth,
        Self::LastMonth,
        Self::ThisYear,
        Self::LastYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Last7Days => "last7days",
            Self::Last30Days => "last30days",
            Self::ThisWeek => "thisWeek",
            Self::LastWeek => "lastWeek",
            Self::ThisMonth => "thisMonth",
            Self::LastMonth => "lastMonth",
            Self::ThisYear => "thisYear",
            Self::LastYear => "lastYear",
        }
    }

    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|p| p.as_str()).collect();
                CoreError::Validation(format!(
                    "Unknown period preset '{s}'. Must be one of: {}",
                    names.join(", ")
                ))
            })
    }
}

/// Resolve a preset relative to `today`.
pub fn resolve_preset(
    preset: PeriodPreset,
    today: Date,
    week_start: WeekStart,
) -> Result<DateRange, CoreError> {
    let range = match preset {
        PeriodPreset::Today => DateRange::day(today),
        PeriodPreset::Yesterday => DateRange::day(sub_days(today, 1)?),
        PeriodPreset::Last7Days => DateRange::new(sub_days(today, 6)?, today)?,
        PeriodPreset::Last30Days => DateRange::new(sub_days(today, 29)?, today)?,
        PeriodPreset::ThisWeek => {
            let start = week_start.week_start_of(today)?;
            DateRange::new(start, add_days(start, 6)?)?
        }
        PeriodPreset::LastWeek => {
            let start = sub_days(week_start.week_start_of(today)?, 7)?;
            DateRange::new(start, add_days(start, 6)?)?
        }
        PeriodPreset::ThisMonth => month_range(today)?,
        PeriodPreset::LastMonth => {
            let prev = first_of_month(today)?
                .checked_sub_months(Months::new(1))
                .ok_or_else(out_of_range)?;
            month_range(prev)?
        }
        PeriodPreset::ThisYear => year_range(today.year())?,
        PeriodPreset::LastYear => year_range(today.year() - 1)?,
    };
    Ok(range)
}

// ---------------------------------------------------------------------------
// Shift
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftDirection {
    Backward,
    Forward,
}

/// Move a range by its own inclusive length, preserving that length.
///
/// Consecutive shifts tile the calendar without overlap: `today` shifted
/// backward is `yesterday`, a 7-day window moves by 7 days.
pub fn shift(range: DateRange, direction: ShiftDirection) -> Result<DateRange, CoreError> {
    let len = range.len_days();
    let (from, to) = match direction {
        ShiftDirection::Forward => (add_days(range.from, len)?, add_days(range.to, len)?),
        ShiftDirection::Backward => (sub_days(range.from, len)?, sub_days(range.to, len)?),
    };
    DateRange::new(from, to)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn out_of_range() -> CoreError {
    CoreError::Validation("date arithmetic left the representable range".into())
}

fn add_days(date: Date, n: u64) -> Result<Date, CoreError> {
    date.checked_add_days(Days::new(n)).ok_or_else(out_of_range)
}

fn sub_days(date: Date, n: u64) -> Result<Date, CoreError> {
    date.checked_sub_days(Days::new(n)).ok_or_else(out_of_range)
}

fn first_of_month(date: Date) -> Result<Date, CoreError> {
    date.with_day(1).ok_or_else(out_of_range)
}

fn month_range(date: Date) -> Result<DateRange, CoreError> {
    let first = first_of_month(date)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(out_of_range)?;
    DateRange::new(first, last)
}

fn year_range(year: i32) -> Result<DateRange, CoreError> {
    let from = Date::from_ymd_opt(year, 1, 1).ok_or_else(out_of_range)?;
    let to = Date::from_ymd_opt(year, 12, 31).ok_or_else(out_of_range)?;
    DateRange::new(from, to)
}
