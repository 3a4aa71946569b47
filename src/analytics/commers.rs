//! On-time / late / absent classification of employees against their
//! working graphic.

use crate::model::working_graphic::{Day, Weekday};
use crate::utils::time::minutes_between;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommerStatus {
    OnTime,
    Late,
    Absent,
    /// Not scheduled to work that day
    DayOff,
}

/// Days of each working graphic, keyed by graphic id.
pub type Schedules = HashMap<u64, Arc<Vec<Day>>>;

/// Scheduled window of one weekday.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shift {
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
}

/// Working shift for `date`, or `None` if the day is not a work day.
pub fn shift_for(days: &[Day], date: NaiveDate) -> Option<Shift> {
    let weekday = Weekday::from(date.weekday());
    days.iter()
        .find(|d| d.weekday() == Some(weekday) && d.is_work_day)
        .map(|d| Shift {
            time_in: d.time_in,
            time_out: d.time_out,
        })
}

/// Classifies the first arrival of a day against the shift.
///
/// Returns the status and, for late arrivals, the minutes past `time_in`.
pub fn classify(
    shift: Option<Shift>,
    first_arrival: Option<NaiveTime>,
    grace: Duration,
) -> (CommerStatus, Option<i64>) {
    let Some(shift) = shift else {
        return (CommerStatus::DayOff, None);
    };
    let Some(arrival) = first_arrival else {
        return (CommerStatus::Absent, None);
    };
    let Some(time_in) = shift.time_in else {
        return (CommerStatus::OnTime, None);
    };

    // `overflowing_add_signed` wraps past midnight; a wrapped deadline means
    // the whole rest of the day is within grace.
    let (deadline, wrapped) = time_in.overflowing_add_signed(grace);
    if wrapped != 0 || arrival <= deadline {
        (CommerStatus::OnTime, None)
    } else {
        (CommerStatus::Late, Some(minutes_between(time_in, arrival)))
    }
}

/// Employee as seen by the commers report.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RosterEntry {
    pub employee_id: u64,
    pub name: String,
    pub position: Option<String>,
    pub working_graphic_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CommerEntry {
    pub employee_id: u64,
    pub name: String,
    #[schema(nullable = true)]
    pub position: Option<String>,
    #[schema(value_type = Option<String>, example = "09:04:12", nullable = true)]
    pub arrival: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "09:00:00", nullable = true)]
    pub time_in: Option<NaiveTime>,
    #[schema(nullable = true)]
    pub late_minutes: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayCommers {
    /// Employees expected at work that day
    pub scheduled: usize,
    pub on_time: Vec<CommerEntry>,
    pub late: Vec<CommerEntry>,
    pub absent: Vec<CommerEntry>,
    pub day_off: Vec<CommerEntry>,
}

/// Classifies every employee of the roster for one date.
///
/// `arrivals` holds the earliest check-in of each employee on that date.
pub fn day_commers(
    date: NaiveDate,
    roster: &[RosterEntry],
    schedules: &Schedules,
    arrivals: &HashMap<u64, NaiveTime>,
    grace: Duration,
) -> DayCommers {
    let mut out = DayCommers::default();

    for employee in roster {
        let shift = employee
            .working_graphic_id
            .and_then(|id| schedules.get(&id))
            .and_then(|days| shift_for(days, date));
        let arrival = arrivals.get(&employee.employee_id).copied();
        let (status, late_minutes) = classify(shift, arrival, grace);

        let entry = CommerEntry {
            employee_id: employee.employee_id,
            name: employee.name.clone(),
            position: employee.position.clone(),
            arrival,
            time_in: shift.and_then(|s| s.time_in),
            late_minutes,
        };

        match status {
            CommerStatus::OnTime => out.on_time.push(entry),
            CommerStatus::Late => out.late.push(entry),
            CommerStatus::Absent => out.absent.push(entry),
            CommerStatus::DayOff => out.day_off.push(entry),
        }
    }

    out.scheduled = out.on_time.len() + out.late.len() + out.absent.len();
    out
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthStats {
    pub scheduled_days: u32,
    pub on_time: u32,
    pub late: u32,
    pub absent: u32,
    pub on_time_percentage: f64,
    pub late_percentage: f64,
    pub absent_percentage: f64,
}

impl MonthStats {
    pub fn record(&mut self, status: CommerStatus) {
        match status {
            CommerStatus::OnTime => self.on_time += 1,
            CommerStatus::Late => self.late += 1,
            CommerStatus::Absent => self.absent += 1,
            CommerStatus::DayOff => return,
        }
        self.scheduled_days += 1;
    }

    pub fn merge(&mut self, other: &MonthStats) {
        self.scheduled_days += other.scheduled_days;
        self.on_time += other.on_time;
        self.late += other.late;
        self.absent += other.absent;
    }

    /// Fills the percentage fields from the counters.
    pub fn finish(mut self) -> Self {
        self.on_time_percentage = percentage(self.on_time, self.scheduled_days);
        self.late_percentage = percentage(self.late, self.scheduled_days);
        self.absent_percentage = percentage(self.absent, self.scheduled_days);
        self
    }
}

/// `part / whole * 100`, rounded to two decimals; zero for an empty whole.
pub fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 10_000.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeMonth {
    pub employee_id: u64,
    pub name: String,
    #[schema(nullable = true)]
    pub position: Option<String>,
    pub stats: MonthStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthCommers {
    pub employees: Vec<EmployeeMonth>,
    pub totals: MonthStats,
}

/// Aggregates daily classifications over `days`.
///
/// `arrivals` is keyed by `(employee_id, date)`. Days after `through` are
/// skipped so that future days do not count as absences.
pub fn month_commers(
    days: &[NaiveDate],
    through: NaiveDate,
    roster: &[RosterEntry],
    schedules: &Schedules,
    arrivals: &HashMap<(u64, NaiveDate), NaiveTime>,
    grace: Duration,
) -> MonthCommers {
    let mut totals = MonthStats::default();

    let employees = roster
        .iter()
        .map(|employee| {
            let graphic = employee
                .working_graphic_id
                .and_then(|id| schedules.get(&id))
                .map(|days| days.as_slice());

            let mut stats = MonthStats::default();
            for &date in days.iter().filter(|d| **d <= through) {
                let shift = graphic.and_then(|g| shift_for(g, date));
                let arrival = arrivals.get(&(employee.employee_id, date)).copied();
                stats.record(classify(shift, arrival, grace).0);
            }
            totals.merge(&stats);

            EmployeeMonth {
                employee_id: employee.employee_id,
                name: employee.name.clone(),
                position: employee.position.clone(),
                stats: stats.finish(),
            }
        })
        .collect();

    MonthCommers {
        employees,
        totals: totals.finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        // September 2024 starts on a Sunday
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn day(graphic: u64, name: &str, work: bool, time_in: Option<NaiveTime>) -> Day {
        Day {
            id: 0,
            working_graphic_id: graphic,
            day: name.to_string(),
            time_in,
            time_out: time_in.map(|_| t(18, 0)),
            is_work_day: work,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    /// Monday-Friday 09:00-18:00, weekend off.
    fn office_week(graphic: u64) -> Vec<Day> {
        let mut days: Vec<Day> = ["monday", "tuesday", "wednesday", "thursday", "friday"]
            .iter()
            .map(|d| day(graphic, d, true, Some(t(9, 0))))
            .collect();
        days.push(day(graphic, "saturday", false, None));
        days
    }

    fn roster() -> Vec<RosterEntry> {
        vec![
            RosterEntry {
                employee_id: 1,
                name: "Aziz".into(),
                position: Some("Cashier".into()),
                working_graphic_id: Some(10),
            },
            RosterEntry {
                employee_id: 2,
                name: "Dilnoza".into(),
                position: None,
                working_graphic_id: Some(10),
            },
            RosterEntry {
                employee_id: 3,
                name: "Timur".into(),
                position: None,
                working_graphic_id: None,
            },
        ]
    }

    #[test]
    fn classify_covers_every_branch() {
        let shift = Some(Shift {
            time_in: Some(t(9, 0)),
            time_out: Some(t(18, 0)),
        });
        let none = Duration::zero();

        assert_eq!(classify(None, Some(t(9, 0)), none), (CommerStatus::DayOff, None));
        assert_eq!(classify(shift, None, none), (CommerStatus::Absent, None));
        assert_eq!(classify(shift, Some(t(8, 55)), none), (CommerStatus::OnTime, None));
        assert_eq!(classify(shift, Some(t(9, 0)), none), (CommerStatus::OnTime, None));
        assert_eq!(
            classify(shift, Some(t(9, 25)), none),
            (CommerStatus::Late, Some(25))
        );
    }

    #[test]
    fn grace_period_extends_on_time_window() {
        let shift = Some(Shift {
            time_in: Some(t(9, 0)),
            time_out: None,
        });
        let grace = Duration::minutes(10);

        assert_eq!(classify(shift, Some(t(9, 10)), grace).0, CommerStatus::OnTime);
        assert_eq!(
            classify(shift, Some(t(9, 11)), grace),
            (CommerStatus::Late, Some(11))
        );
    }

    #[test]
    fn work_day_without_start_accepts_any_arrival() {
        let shift = Some(Shift {
            time_in: None,
            time_out: None,
        });
        assert_eq!(
            classify(shift, Some(t(23, 59)), Duration::zero()).0,
            CommerStatus::OnTime
        );
    }

    #[test]
    fn shift_lookup_uses_weekday_and_work_flag() {
        let days = office_week(10);
        // 2024-09-02 Monday, 2024-09-07 Saturday (off), 2024-09-08 Sunday (missing)
        assert_eq!(shift_for(&days, date(2)).and_then(|s| s.time_in), Some(t(9, 0)));
        assert_eq!(shift_for(&days, date(7)), None);
        assert_eq!(shift_for(&days, date(8)), None);
    }

    #[test]
    fn day_commers_splits_roster() {
        let schedules = HashMap::from([(10u64, Arc::new(office_week(10)))]);
        let arrivals = HashMap::from([(1u64, t(9, 20)), (3u64, t(8, 0))]);

        let report = day_commers(date(2), &roster(), &schedules, &arrivals, Duration::zero());

        assert_eq!(report.scheduled, 2);
        assert_eq!(report.late.len(), 1);
        assert_eq!(report.late[0].employee_id, 1);
        assert_eq!(report.late[0].late_minutes, Some(20));
        assert_eq!(report.absent.len(), 1);
        assert_eq!(report.absent[0].employee_id, 2);
        // no working graphic: not scheduled even though a check-in exists
        assert_eq!(report.day_off.len(), 1);
        assert_eq!(report.day_off[0].arrival, Some(t(8, 0)));
        assert!(report.on_time.is_empty());
    }

    #[test]
    fn month_commers_counts_only_scheduled_past_days() {
        let schedules = HashMap::from([(10u64, Arc::new(office_week(10)))]);
        // Mon 2 .. Fri 6 are work days; 7 and 8 are off
        let days: Vec<NaiveDate> = (2..=8).map(date).collect();
        let arrivals = HashMap::from([
            ((1u64, date(2)), t(8, 50)),
            ((1u64, date(3)), t(9, 30)),
            ((1u64, date(4)), t(9, 0)),
            ((2u64, date(2)), t(8, 59)),
        ]);

        // Only up to Thursday has happened
        let report = month_commers(
            &days,
            date(5),
            &roster(),
            &schedules,
            &arrivals,
            Duration::zero(),
        );

        let aziz = &report.employees[0].stats;
        assert_eq!(aziz.scheduled_days, 4);
        assert_eq!((aziz.on_time, aziz.late, aziz.absent), (2, 1, 1));
        assert_eq!(aziz.on_time_percentage, 50.0);
        assert_eq!(aziz.late_percentage, 25.0);

        let dilnoza = &report.employees[1].stats;
        assert_eq!((dilnoza.on_time, dilnoza.absent), (1, 3));

        let timur = &report.employees[2].stats;
        assert_eq!(timur.scheduled_days, 0);
        assert_eq!(timur.on_time_percentage, 0.0);

        assert_eq!(report.totals.scheduled_days, 8);
        assert_eq!(report.totals.on_time, 3);
        assert_eq!(report.totals.on_time_percentage, 37.5);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(CommerStatus::OnTime.as_ref(), "on_time");
        assert_eq!(
            serde_json::to_value(CommerStatus::DayOff).unwrap(),
            serde_json::json!("day_off")
        );
    }
}
