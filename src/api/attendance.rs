use crate::{
    api::{NamedRef, employee::employee_month},
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, db_error},
    model::attendance::{
        ATTENDANCE_JOINED_FROM, ATTENDANCE_JOINED_SELECT, Attendance, AttendanceJoined,
    },
    utils::{
        db_utils::{Filter, SqlValue},
        file_storage::{self, ImageKind, public_url},
        pagination::Page,
        time::{DateSelector, parse_datetime},
    },
};
use actix_multipart::form::{MultipartForm, bytes::Bytes as FileBytes, text::Text};
use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

/// Check-in pushed by a recognition device.
#[derive(MultipartForm)]
pub struct AttendanceUpload {
    /// Employee id as known to the device
    pub person_id: Text<u64>,
    pub camera_id: Text<u64>,
    pub time: Text<String>,
    pub score: Text<String>,
    pub file: FileBytes,
}

/// Documentation shape of `AttendanceUpload`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AttendanceUploadForm {
    #[schema(example = 12)]
    person_id: u64,
    #[schema(example = 3)]
    camera_id: u64,
    #[schema(example = "2024-09-05 08:57:41")]
    time: String,
    #[schema(example = "0.97")]
    score: String,
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    pub employee: NamedRef,
    #[schema(nullable = true)]
    pub main_image: Option<String>,
    pub position: NamedRef,
    #[schema(nullable = true)]
    pub filial: Option<NamedRef>,
    #[schema(example = "0.97")]
    pub score: String,
    #[schema(value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
    #[schema(nullable = true)]
    pub attendance_image: Option<String>,
    #[schema(example = 3)]
    pub camera_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

impl AttendanceRecord {
    fn from_joined(row: AttendanceJoined, base_url: &str) -> Self {
        Self {
            id: row.id,
            employee: NamedRef {
                id: row.employee_id,
                name: row.employee_name,
            },
            main_image: row.main_image.map(|p| public_url(base_url, &p)),
            position: NamedRef {
                id: row.position_id,
                name: row.position_name,
            },
            filial: row
                .filial_id
                .zip(row.filial_name)
                .map(|(id, name)| NamedRef { id, name }),
            score: row.score,
            time: row.time,
            attendance_image: row.file_path.map(|p| public_url(base_url, &p)),
            camera_id: row.camera_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AttendanceQuery {
    pub employee_id: Option<u64>,
    /// `YYYY-MM-DD` or `YYYY-MM`
    pub date: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    #[schema(example = true)]
    pub success: bool,
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Narrows attendance queries; every field is optional.
#[derive(Debug, Default)]
pub struct AttendanceScope {
    pub employee_id: Option<u64>,
    pub filial_id: Option<u64>,
    pub dates: Option<DateSelector>,
}

impl AttendanceScope {
    fn filter(&self) -> Filter {
        let mut filter = Filter::default();
        if let Some(employee_id) = self.employee_id {
            filter.push("a.employee_id = ?", [SqlValue::U64(employee_id)]);
        }
        if let Some(filial_id) = self.filial_id {
            filter.push("e.filial_id = ?", [SqlValue::U64(filial_id)]);
        }
        if let Some(dates) = self.dates {
            let (start, end) = dates.datetime_range();
            filter.push(
                "a.time >= ? AND a.time < ?",
                [SqlValue::DateTime(start), SqlValue::DateTime(end)],
            );
        }
        filter
    }
}

/// Parses an optional `date` query value.
pub fn parse_dates(raw: Option<&str>) -> Result<Option<DateSelector>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            DateSelector::parse(s)
                .ok_or_else(|| ApiError::bad_request("Date must be YYYY-MM-DD or YYYY-MM"))
        })
        .transpose()
}

/// Page of attendance records in `scope`, newest first, with the total count.
pub async fn fetch_records(
    pool: &MySqlPool,
    base_url: &str,
    scope: &AttendanceScope,
    page: Page,
) -> Result<(i64, Vec<AttendanceRecord>), ApiError> {
    let filter = scope.filter();
    let where_clause = filter.where_clause();

    let count_sql = format!("SELECT COUNT(*) {ATTENDANCE_JOINED_FROM} {where_clause}");
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool)
        .await
        .map_err(db_error("Failed to count attendance"))?;

    let data_sql = format!(
        "{ATTENDANCE_JOINED_SELECT} {where_clause} ORDER BY a.time DESC, a.id DESC LIMIT ? OFFSET ?"
    );
    debug!(?scope, page = page.page, "Fetching attendance");

    let rows = filter
        .bind_as(sqlx::query_as::<_, AttendanceJoined>(&data_sql))
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to fetch attendance"))?;

    let records = rows
        .into_iter()
        .map(|row| AttendanceRecord::from_joined(row, base_url))
        .collect();
    Ok((total, records))
}

/// Device check-in
#[utoipa::path(
    post,
    path = "/api/v1/attendance",
    request_body(content = AttendanceUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Check-in stored", body = Object, example = json!({
            "message": "Attendance recorded", "id": 1
        })),
        (status = 400, description = "Invalid time or file"),
        (status = 403, description = "Devices and admins only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(
    name = "attendance_ingest",
    skip(auth, pool, config, form),
    fields(person_id = %form.0.person_id.0, camera_id = %form.0.camera_id.0)
)]
pub async fn create_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    form: MultipartForm<AttendanceUpload>,
) -> Result<HttpResponse, ApiError> {
    auth.require_device_or_admin()?;
    let form = form.0;

    let employee_id = form.person_id.0;
    let camera_id = form.camera_id.0;
    let time = parse_datetime(&form.time.0)
        .ok_or_else(|| ApiError::bad_request("Invalid time, expected YYYY-MM-DD HH:MM:SS"))?;
    let score = form.score.0;

    let relative = file_storage::save_image(
        &config.storage_dir,
        employee_id,
        ImageKind::Attendance,
        form.file.file_name.as_deref(),
        form.file.data,
    )
    .await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO attendances (employee_id, camera_id, score, time, file_path)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(camera_id)
    .bind(score.trim())
    .bind(time)
    .bind(&relative)
    .execute(pool.get_ref())
    .await;

    match inserted {
        Ok(result) => {
            let id = result.last_insert_id();
            info!(attendance_id = id, employee_id, %time, "Attendance recorded");
            Ok(HttpResponse::Created().json(json!({
                "message": "Attendance recorded",
                "id": id
            })))
        }
        Err(e) => {
            file_storage::remove_file(&config.storage_dir, &relative).await;
            match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    warn!(employee_id, "Check-in for unknown employee");
                    Err(ApiError::not_found("Employee not found"))
                }
                _ => Err(db_error("Failed to record attendance")(e)),
            }
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance", body = AttendanceListResponse),
        (status = 400, description = "Date must be YYYY-MM-DD or YYYY-MM")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let scope = AttendanceScope {
        employee_id: query.employee_id,
        filial_id: None,
        dates: parse_dates(query.date.as_deref())?,
    };
    let page = Page::new(query.page, query.per_page);

    let (total, data) = fetch_records(pool.get_ref(), &config.base_url, &scope, page).await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        success: true,
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance/{id}",
    params(("id", Path, description = "Attendance ID")),
    responses(
        (status = 200, description = "Attendance found", body = AttendanceRecord),
        (status = 404, description = "Attendance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn get_attendance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let sql = format!("{ATTENDANCE_JOINED_SELECT} WHERE a.id = ?");
    let row = sqlx::query_as::<_, AttendanceJoined>(&sql)
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch attendance"))?
        .ok_or_else(|| ApiError::not_found("Attendance not found"))?;

    Ok(HttpResponse::Ok().json(AttendanceRecord::from_joined(row, &config.base_url)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/attendance/{id}",
    params(("id", Path, description = "Attendance ID")),
    responses(
        (status = 200, description = "Attendance deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Attendance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let attendance = sqlx::query_as::<_, Attendance>("SELECT * FROM attendances WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch attendance"))?
        .ok_or_else(|| ApiError::not_found("Attendance not found"))?;

    sqlx::query("DELETE FROM attendances WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete attendance"))?;

    if let Some(path) = &attendance.file_path {
        file_storage::remove_file(&config.storage_dir, path).await;
    }

    info!(attendance_id = id, employee_id = attendance.employee_id, "Attendance deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/// Own monthly attendance of the calling user
#[utoipa::path(
    get,
    path = "/api/v1/me/attendance/{month}",
    params(("month", Path, description = "Month as YYYY-MM", example = "2024-09")),
    responses(
        (status = 200, description = "Monthly attendance", body = crate::api::employee::EmployeeMonthView),
        (status = 400, description = "Month must be YYYY-MM"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = auth.require_employee()?;
    let view = employee_month(pool.get_ref(), &config, employee_id, &path).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_util::{bearer, config, lazy_pool, multipart};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use chrono::NaiveDate;

    #[test]
    fn scope_builds_filters_in_order() {
        let scope = AttendanceScope {
            employee_id: Some(4),
            filial_id: Some(2),
            dates: DateSelector::parse("2024-09"),
        };
        let filter = scope.filter();
        assert_eq!(
            filter.where_clause(),
            "WHERE a.employee_id = ? AND e.filial_id = ? AND a.time >= ? AND a.time < ?"
        );
        assert_eq!(AttendanceScope::default().filter().where_clause(), "");
    }

    #[test]
    fn date_query_accepts_day_and_month() {
        assert_eq!(
            parse_dates(Some("2024-09-05")).unwrap(),
            Some(DateSelector::Day(NaiveDate::from_ymd_opt(2024, 9, 5).unwrap()))
        );
        assert!(matches!(
            parse_dates(Some("2024-09")).unwrap(),
            Some(DateSelector::Month { year: 2024, month: 9 })
        ));
        assert_eq!(parse_dates(None).unwrap(), None);
        assert_eq!(parse_dates(Some(" ")).unwrap(), None);
        assert!(parse_dates(Some("05.09.2024")).is_err());
    }

    #[test]
    fn joined_rows_get_public_urls() {
        let ts = NaiveDate::from_ymd_opt(2024, 9, 5)
            .unwrap()
            .and_hms_opt(8, 57, 0)
            .unwrap();
        let record = AttendanceRecord::from_joined(
            AttendanceJoined {
                id: 1,
                employee_id: 7,
                employee_name: "Aziz".into(),
                main_image: Some("users/7/images/a.jpg".into()),
                position_id: 2,
                position_name: "Cashier".into(),
                filial_id: None,
                filial_name: None,
                score: "0.97".into(),
                time: ts,
                file_path: Some("users/7/attendance/b.jpg".into()),
                camera_id: 3,
                created_at: ts,
            },
            "http://cdn.local",
        );

        assert_eq!(
            record.attendance_image.as_deref(),
            Some("http://cdn.local/storage/users/7/attendance/b.jpg")
        );
        assert_eq!(
            record.main_image.as_deref(),
            Some("http://cdn.local/storage/users/7/images/a.jpg")
        );
        assert!(record.filial.is_none());
    }

    async fn post_checkin(role: Role, time: &str) -> StatusCode {
        let config = config();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(file_storage::upload_config(config.max_upload_bytes))
                .app_data(web::Data::new(config))
                .route("/attendance", web::post().to(create_attendance)),
        )
        .await;

        let (content_type, body) = multipart(&[
            ("person_id", None, b"7"),
            ("camera_id", None, b"3"),
            ("time", None, time.as_bytes()),
            ("score", None, b"0.97"),
            ("file", Some("snap.jpg"), b"\xff\xd8\xff"),
        ]);
        let req = actix_test::TestRequest::post()
            .uri("/attendance")
            .insert_header(bearer(role, None))
            .insert_header(content_type)
            .set_payload(body)
            .to_request();
        actix_test::call_service(&app, req).await.status()
    }

    #[actix_web::test]
    async fn only_devices_and_admins_push_checkins() {
        assert_eq!(
            post_checkin(Role::Hr, "2024-09-05 08:57:41").await,
            StatusCode::FORBIDDEN
        );
    }

    #[actix_web::test]
    async fn unparsable_device_time_is_rejected() {
        assert_eq!(
            post_checkin(Role::System, "yesterday morning").await,
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn me_requires_linked_employee() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/me/attendance/{month}", web::get().to(my_attendance)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/me/attendance/2024-09")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
