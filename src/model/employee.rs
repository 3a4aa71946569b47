use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Aziz Karimov",
        "phone_number": "+998901234567",
        "position_id": 3,
        "filial_id": 1,
        "working_graphic_id": 2,
        "created_at": "2024-07-25T12:00:00",
        "updated_at": "2024-07-25T12:00:00"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Aziz Karimov")]
    pub name: String,

    #[schema(example = "+998901234567")]
    pub phone_number: String,

    #[schema(example = 3)]
    pub position_id: u64,

    #[schema(example = 1, nullable = true)]
    pub filial_id: Option<u64>,

    #[schema(example = 2, nullable = true)]
    pub working_graphic_id: Option<u64>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}
