//! Walk-in client aggregation for one day.

use crate::model::client::{ClientStatus, ClientVisit};
use crate::model::daily_report::TimeSlot;
use chrono::{NaiveTime, Timelike};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DailyAggregate {
    pub clients: Vec<u64>,
    pub gender: BTreeMap<String, u32>,
    pub age: BTreeMap<String, u32>,
    pub total_new_clients: u32,
    pub total_regular_clients: u32,
    pub time_slots: Vec<TimeSlot>,
    pub male_percentage: f64,
    pub female_percentage: f64,
}

/// Label of the half-hour slot a time falls into: `:00`-`:29` belong to
/// `HH:30`, `:30`-`:59` to the next hour's `:00` (23:45 -> `00:00`).
pub fn time_slot(time: NaiveTime) -> String {
    if time.minute() >= 30 {
        format!("{:02}:00", (time.hour() + 1) % 24)
    } else {
        format!("{:02}:30", time.hour())
    }
}

/// Aggregates the visits of a day. Each client is counted once, using the
/// earliest of their visits.
pub fn aggregate(visits: &[ClientVisit]) -> DailyAggregate {
    let mut ordered: Vec<&ClientVisit> = visits.iter().collect();
    ordered.sort_by_key(|v| (v.time, v.id));

    let mut seen = HashSet::new();
    let mut report = DailyAggregate::default();
    let mut slots: BTreeMap<String, TimeSlot> = BTreeMap::new();
    let (mut males, mut females) = (0u32, 0u32);

    for visit in ordered {
        if !seen.insert(visit.client_id) {
            continue;
        }
        report.clients.push(visit.client_id);

        if visit.client_status.parse::<ClientStatus>() == Ok(ClientStatus::Regular) {
            report.total_regular_clients += 1;
        } else {
            report.total_new_clients += 1;
        }

        *report.gender.entry(visit.gender.clone()).or_insert(0) += 1;
        *report.age.entry(visit.age.to_string()).or_insert(0) += 1;

        let label = time_slot(visit.time.time());
        let slot = slots.entry(label.clone()).or_insert_with(|| TimeSlot {
            time: label,
            male_count: 0,
            female_count: 0,
            client_count: 0,
        });
        slot.client_count += 1;

        match visit.gender.to_lowercase().as_str() {
            "male" => {
                males += 1;
                slot.male_count += 1;
            }
            "female" => {
                females += 1;
                slot.female_count += 1;
            }
            _ => {}
        }
    }

    let counted = males + females;
    if counted > 0 {
        report.male_percentage = males as f64 / counted as f64 * 100.0;
        report.female_percentage = females as f64 / counted as f64 * 100.0;
    }
    report.time_slots = slots.into_values().collect();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn visit(id: u64, client_id: u64, gender: &str, age: u32, status: &str, hms: (u32, u32)) -> ClientVisit {
        ClientVisit {
            id,
            client_id,
            camera_id: 1,
            gender: gender.to_string(),
            age,
            client_status: status.to_string(),
            time: NaiveDate::from_ymd_opt(2024, 9, 5)
                .unwrap()
                .and_hms_opt(hms.0, hms.1, 0)
                .unwrap(),
        }
    }

    #[test]
    fn slot_labels() {
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(time_slot(at(10, 0)), "10:30");
        assert_eq!(time_slot(at(10, 29)), "10:30");
        assert_eq!(time_slot(at(10, 30)), "11:00");
        assert_eq!(time_slot(at(23, 45)), "00:00");
    }

    #[test]
    fn counts_each_client_once() {
        let visits = vec![
            visit(2, 501, "male", 30, "new", (10, 40)),
            visit(1, 501, "male", 30, "new", (10, 5)),
            visit(3, 502, "Female", 24, "regular", (10, 10)),
            visit(4, 503, "female", 24, "new", (14, 50)),
        ];

        let report = aggregate(&visits);

        assert_eq!(report.clients, vec![501, 502, 503]);
        assert_eq!(report.total_new_clients, 2);
        assert_eq!(report.total_regular_clients, 1);
        assert_eq!(report.age.get("24"), Some(&2));
        assert_eq!(report.age.get("30"), Some(&1));
        // raw gender strings are kept as buckets
        assert_eq!(report.gender.get("Female"), Some(&1));
        assert_eq!(report.gender.get("female"), Some(&1));
    }

    #[test]
    fn builds_sorted_time_slots() {
        let visits = vec![
            visit(1, 1, "male", 30, "new", (14, 50)),
            visit(2, 2, "female", 30, "new", (10, 5)),
            visit(3, 3, "male", 30, "new", (10, 20)),
        ];

        let report = aggregate(&visits);

        assert_eq!(
            report.time_slots,
            vec![
                TimeSlot {
                    time: "10:30".into(),
                    male_count: 1,
                    female_count: 1,
                    client_count: 2
                },
                TimeSlot {
                    time: "15:00".into(),
                    male_count: 1,
                    female_count: 0,
                    client_count: 1
                },
            ]
        );
    }

    #[test]
    fn percentages_ignore_unknown_gender() {
        let visits = vec![
            visit(1, 1, "male", 30, "new", (9, 0)),
            visit(2, 2, "male", 30, "new", (9, 0)),
            visit(3, 3, "female", 30, "new", (9, 0)),
            visit(4, 4, "unknown", 30, "new", (9, 0)),
        ];

        let report = aggregate(&visits);

        assert!((report.male_percentage - 66.666).abs() < 0.01);
        assert!((report.female_percentage - 33.333).abs() < 0.01);
        assert_eq!(report.time_slots[0].client_count, 4);
    }

    #[test]
    fn empty_day_is_all_zero() {
        let report = aggregate(&[]);
        assert_eq!(report, DailyAggregate::default());
    }
}
