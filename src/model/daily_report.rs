use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeSlot {
    #[schema(example = "10:30")]
    pub time: String,
    pub male_count: u32,
    pub female_count: u32,
    pub client_count: u32,
}

#[derive(Debug, sqlx::FromRow)]
pub struct DailyReportRow {
    pub id: u64,
    pub date: NaiveDate,
    pub clients: Json<Vec<u64>>,
    pub gender: Json<BTreeMap<String, u32>>,
    pub age: Json<BTreeMap<String, u32>>,
    pub total_new_clients: u32,
    pub total_regular_clients: u32,
    pub time_slots: Json<Vec<TimeSlot>>,
    pub male_percentage: f64,
    pub female_percentage: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "date": "2024-09-05",
    "clients": [501, 502],
    "gender": {"male": 1, "female": 1},
    "age": {"27": 1, "34": 1},
    "total_new_clients": 1,
    "total_regular_clients": 1,
    "time_slots": [{"time": "10:30", "male_count": 1, "female_count": 1, "client_count": 2}],
    "male_percentage": 50.0,
    "female_percentage": 50.0,
    "created_at": "2024-09-05T10:20:00",
    "updated_at": "2024-09-05T10:20:00"
}))]
pub struct DailyReport {
    pub id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub clients: Vec<u64>,
    pub gender: BTreeMap<String, u32>,
    pub age: BTreeMap<String, u32>,
    pub total_new_clients: u32,
    pub total_regular_clients: u32,
    pub time_slots: Vec<TimeSlot>,
    pub male_percentage: f64,
    pub female_percentage: f64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

impl From<DailyReportRow> for DailyReport {
    fn from(row: DailyReportRow) -> Self {
        Self {
            id: row.id,
            date: row.date,
            clients: row.clients.0,
            gender: row.gender.0,
            age: row.age.0,
            total_new_clients: row.total_new_clients,
            total_regular_clients: row.total_regular_clients,
            time_slots: row.time_slots.0,
            male_percentage: row.male_percentage,
            female_percentage: row.female_percentage,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
