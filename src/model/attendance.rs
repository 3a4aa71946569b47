use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single recognition event of an employee at a camera.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    pub camera_id: u64,
    pub score: String,
    pub time: NaiveDateTime,
    pub file_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Attendance joined with the names of its employee, position and filial.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceJoined {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub main_image: Option<String>,
    pub position_id: u64,
    pub position_name: String,
    pub filial_id: Option<u64>,
    pub filial_name: Option<String>,
    pub score: String,
    pub time: NaiveDateTime,
    pub file_path: Option<String>,
    pub camera_id: u64,
    pub created_at: NaiveDateTime,
}

pub const ATTENDANCE_JOINED_SELECT: &str = r#"
    SELECT
        a.id,
        a.employee_id,
        e.name AS employee_name,
        (SELECT ei.image_url FROM employee_images ei
         WHERE ei.employee_id = e.id ORDER BY ei.id LIMIT 1) AS main_image,
        e.position_id,
        p.name AS position_name,
        e.filial_id,
        f.name AS filial_name,
        a.score,
        a.time,
        a.file_path,
        a.camera_id,
        a.created_at
    FROM attendances a
    JOIN employees e ON e.id = a.employee_id
    JOIN positions p ON p.id = e.position_id
    LEFT JOIN filials f ON f.id = e.filial_id
"#;

pub const ATTENDANCE_JOINED_FROM: &str = r#"
    FROM attendances a
    JOIN employees e ON e.id = a.employee_id
"#;
