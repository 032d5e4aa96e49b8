//! Shared query parameter types for API handlers.
//!
//! Range-scoped endpoints accept either an explicit `from`/`to` pair or a
//! named `preset`, optionally anchored with `today`.

use chrono::Utc;
use rollbook_core::error::CoreError;
use rollbook_core::period::{resolve_preset, DateRange, PeriodPreset, WeekStart};
use rollbook_core::scope::RoomFilter;
use rollbook_core::types::{Date, DbId};
use serde::Deserialize;

/// `?room_id=&from=&to=&preset=&today=`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RangeParams {
    /// Absent means every room the caller is authorized for.
    pub room_id: Option<DbId>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub preset: Option<String>,
    /// Anchor for presets; defaults to the current UTC date.
    pub today: Option<Date>,
}

impl RangeParams {
    pub fn room_filter(&self) -> RoomFilter {
        RoomFilter::from_optional(self.room_id)
    }

    /// Resolve to a concrete inclusive range.
    ///
    /// Exactly one of `preset` or the `from`/`to` pair must be given.
    pub fn resolve(&self, week_start: WeekStart) -> Result<DateRange, CoreError> {
        match (&self.preset, self.from, self.to) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(CoreError::Validation(
                "Use either preset or from/to, not both".into(),
            )),
            (Some(preset), None, None) => {
                let preset = PeriodPreset::from_str_value(preset)?;
                resolve_preset(preset, self.today.unwrap_or_else(today), week_start)
            }
            (None, Some(from), Some(to)) => DateRange::new(from, to),
            (None, _, _) => Err(CoreError::Validation(
                "Either preset or both from and to are required".into(),
            )),
        }
    }
}

/// `?q=&limit=`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<i64>,
}

/// `?room_id=`
#[derive(Debug, Deserialize)]
pub struct RoomParams {
    pub room_id: Option<DbId>,
}

/// `?today=`
#[derive(Debug, Deserialize)]
pub struct TodayParams {
    pub today: Option<Date>,
}

/// Current UTC calendar date.
pub fn today() -> Date {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn explicit_range_resolves() {
        let params = RangeParams {
            from: Some(d(2024, 1, 10)),
            to: Some(d(2024, 1, 11)),
            ..Default::default()
        };
        let range = params.resolve(WeekStart::Monday).unwrap();
        assert_eq!(range.len_days(), 2);
    }

    #[test]
    fn preset_uses_today_anchor() {
        let params = RangeParams {
            preset: Some("today".into()),
            today: Some(d(2024, 3, 5)),
            ..Default::default()
        };
        assert_eq!(params.resolve(WeekStart::Monday).unwrap(), DateRange::day(d(2024, 3, 5)));
    }

    #[test]
    fn preset_and_bounds_are_exclusive() {
        let params = RangeParams {
            preset: Some("today".into()),
            from: Some(d(2024, 3, 5)),
            ..Default::default()
        };
        assert_matches!(params.resolve(WeekStart::Monday), Err(CoreError::Validation(_)));
    }

    #[test]
    fn half_open_bounds_are_rejected() {
        let params = RangeParams {
            from: Some(d(2024, 3, 5)),
            ..Default::default()
        };
        assert_matches!(params.resolve(WeekStart::Monday), Err(CoreError::Validation(_)));
    }
}
