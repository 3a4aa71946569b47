use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Filial 1",
        "address": "123 Dosnazarov street",
        "phone_number": "+998612223344",
        "device_id": 1,
        "created_at": "2024-07-25T12:00:00",
        "updated_at": "2024-07-25T12:00:00"
    })
)]
pub struct Filial {
    pub id: u64,
    pub name: String,
    pub address: String,
    pub phone_number: Option<String>,
    /// Recognition device installed at the filial
    pub device_id: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}
