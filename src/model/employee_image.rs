use crate::utils::file_storage::public_url;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeImage {
    pub id: u64,
    pub employee_id: u64,
    /// Path relative to the storage root
    pub image_url: String,
    pub device_id: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Image as returned to clients, with an absolute URL.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeeImageView {
    #[schema(example = 4)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "http://localhost:8080/storage/users/1/images/4f1c2a.jpg")]
    pub image_url: String,
    #[schema(example = 0)]
    pub device_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

impl EmployeeImage {
    pub fn into_view(self, base_url: &str) -> EmployeeImageView {
        EmployeeImageView {
            id: self.id,
            employee_id: self.employee_id,
            image_url: public_url(base_url, &self.image_url),
            device_id: self.device_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
