use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Client {
    /// Identifier assigned by the recognition device
    #[schema(example = 501)]
    pub id: u64,
    #[schema(example = "male")]
    pub gender: String,
    #[schema(example = 34)]
    pub age: u32,
    #[schema(example = "0.93")]
    pub score: String,
    #[schema(example = "regular")]
    pub client_status: String,
    #[schema(example = 2)]
    pub camera_id: u64,
    /// Time of the last visit
    #[schema(value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ClientVisit {
    pub id: u64,
    pub client_id: u64,
    pub camera_id: u64,
    pub gender: String,
    pub age: u32,
    pub client_status: String,
    #[schema(value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ClientStatus {
    New,
    Regular,
}
