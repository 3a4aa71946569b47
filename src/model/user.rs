use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User row without the password hash.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Aziz Karimov")]
    pub name: String,
    #[schema(example = "aziz@company.uz")]
    pub email: String,
    #[schema(example = "+998901234567")]
    pub phone_number: String,
    #[schema(example = 3)]
    pub role_id: u8,
    #[schema(example = 12, nullable = true)]
    pub employee_id: Option<u64>,
    pub is_active: bool,
    #[schema(value_type = Option<String>, format = "date-time", nullable = true)]
    pub last_login_at: Option<NaiveDateTime>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

pub const USER_COLUMNS: &str = "id, name, email, phone_number, role_id, employee_id, is_active, last_login_at, created_at, updated_at";
