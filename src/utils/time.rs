use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// A day (`YYYY-MM-DD`) or a whole month (`YYYY-MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSelector {
    Day(NaiveDate),
    Month { year: i32, month: u32 },
}

impl DateSelector {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(DateSelector::Day(date));
        }
        parse_month(raw).map(|(year, month)| DateSelector::Month { year, month })
    }

    pub fn first_day(&self) -> NaiveDate {
        match *self {
            DateSelector::Day(date) => date,
            // month validated by `parse_month`
            DateSelector::Month { year, month } => {
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
            }
        }
    }

    /// Day after the last covered day.
    pub fn end_exclusive(&self) -> NaiveDate {
        match *self {
            DateSelector::Day(date) => date.succ_opt().unwrap_or(NaiveDate::MAX),
            DateSelector::Month { year, month } => first_of_next_month(year, month),
        }
    }

    /// `[start, end)` as datetimes, ready to bind against a DATETIME column.
    pub fn datetime_range(&self) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.first_day().and_time(NaiveTime::MIN),
            self.end_exclusive().and_time(NaiveTime::MIN),
        )
    }
}

/// Parses `YYYY-MM`.
pub fn parse_month(raw: &str) -> Option<(i32, u32)> {
    let (year, month) = raw.trim().split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

fn first_of_next_month(year: i32, month: u32) -> NaiveDate {
    let (y, m) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(NaiveDate::MAX)
}

/// Every date of a month, in order.
pub fn month_days(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect()
}

/// Parses a device timestamp. Accepts `YYYY-MM-DD HH:MM:SS`, ISO-8601 with a
/// `T` (optionally fractional) and RFC3339; offsets are dropped and the wall
/// clock time kept.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Whole minutes from `from` to `to`, zero if `to` is not later.
pub fn minutes_between(from: NaiveTime, to: NaiveTime) -> i64 {
    (to - from).max(Duration::zero()).num_minutes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn selector_parses_day_and_month() {
        assert_eq!(
            DateSelector::parse("2024-09-05"),
            Some(DateSelector::Day(date(2024, 9, 5)))
        );
        assert_eq!(
            DateSelector::parse("2024-09"),
            Some(DateSelector::Month { year: 2024, month: 9 })
        );
        assert_eq!(DateSelector::parse("2024-13"), None);
        assert_eq!(DateSelector::parse("2024-9"), None);
        assert_eq!(DateSelector::parse("yesterday"), None);
    }

    #[test]
    fn month_range_crosses_year_boundary() {
        let dec = DateSelector::Month { year: 2024, month: 12 };
        let (start, end) = dec.datetime_range();
        assert_eq!(start, date(2024, 12, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, date(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn day_range_is_one_day() {
        let (start, end) = DateSelector::Day(date(2024, 2, 29)).datetime_range();
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn month_days_handles_leap_years() {
        assert_eq!(month_days(2024, 2).len(), 29);
        assert_eq!(month_days(2023, 2).len(), 28);
        assert_eq!(month_days(2024, 12).last(), Some(&date(2024, 12, 31)));
        assert!(month_days(2024, 13).is_empty());
    }

    #[test]
    fn parses_device_timestamps() {
        let expected = date(2024, 9, 5).and_hms_opt(9, 7, 30).unwrap();
        assert_eq!(parse_datetime("2024-09-05 09:07:30"), Some(expected));
        assert_eq!(parse_datetime("2024-09-05T09:07:30"), Some(expected));
        assert_eq!(parse_datetime("2024-09-05T09:07:30+05:00"), Some(expected));
        assert_eq!(
            parse_datetime("2024-09-05T09:07:30.250").map(|dt| dt.date()),
            Some(date(2024, 9, 5))
        );
        assert_eq!(parse_datetime("05.09.2024 09:07"), None);
    }

    #[test]
    fn parses_schedule_times() {
        assert_eq!(parse_time("9:00"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_time("18:30:15"), NaiveTime::from_hms_opt(18, 30, 15));
        assert_eq!(parse_time("25:00"), None);
    }

    #[test]
    fn minutes_between_never_negative() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let late = NaiveTime::from_hms_opt(9, 17, 59).unwrap();
        assert_eq!(minutes_between(nine, late), 17);
        assert_eq!(minutes_between(late, nine), 0);
    }
}
