use crate::{
    analytics::commers::{CommerStatus, MonthStats, classify, shift_for},
    api::unique_ids,
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, db_error},
    model::{
        employee::Employee,
        employee_image::{EmployeeImage, EmployeeImageView},
        filial::Filial,
        position::Position,
        role::Role,
        working_graphic::{Day, Weekday, WorkingGraphic},
    },
    utils::{
        db_utils::{
            Column, ColumnKind, Filter, SqlValue, build_update_sql, execute_update,
            fetch_where_in, like_pattern,
        },
        file_storage,
        pagination::Page,
        schedule_cache,
        time::{month_days, parse_month},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE: [Column; 5] = [
    Column::new("name", ColumnKind::RequiredText),
    Column::new("phone_number", ColumnKind::RequiredText),
    Column::new("position_id", ColumnKind::Id),
    Column::new("filial_id", ColumnKind::NullableId),
    Column::new("working_graphic_id", ColumnKind::NullableId),
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
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
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub filial_id: Option<u64>,
    pub position_id: Option<u64>,
    pub working_graphic_id: Option<u64>,
    /// Matches name or phone number
    pub search: Option<String>,
}

/// Working graphic of an employee with its days keyed by weekday.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeeGraphic {
    #[schema(example = 2)]
    pub id: u64,
    #[schema(example = "Day shift")]
    pub name: String,
    #[schema(value_type = Object, example = json!({
        "monday": {"id": 1, "day": "monday", "time_in": "09:00:00", "time_out": "18:00:00", "is_work_day": true}
    }))]
    pub days: BTreeMap<Weekday, Day>,
}

/// Employee with its related records resolved.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeeDetails {
    #[serde(flatten)]
    pub employee: Employee,
    #[schema(nullable = true)]
    pub position: Option<Position>,
    #[schema(nullable = true)]
    pub filial: Option<Filial>,
    #[schema(nullable = true)]
    pub working_graphic: Option<EmployeeGraphic>,
    pub images: Vec<EmployeeImageView>,
    /// URL of the first uploaded image
    #[schema(nullable = true)]
    pub main_image: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<EmployeeDetails>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

/// One calendar day of the monthly attendance view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceDay {
    #[schema(value_type = String, format = "date", example = "2024-09-02")]
    pub date: NaiveDate,
    pub weekday: Weekday,
    #[schema(value_type = Option<String>, example = "09:00:00", nullable = true)]
    pub time_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "18:00:00", nullable = true)]
    pub time_out: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "08:57:41", nullable = true)]
    pub first_arrival: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "18:03:12", nullable = true)]
    pub last_event: Option<NaiveTime>,
    #[schema(example = 2)]
    pub events: u32,
    pub status: CommerStatus,
    #[schema(nullable = true)]
    pub late_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeeMonthView {
    pub employee: EmployeeDetails,
    #[schema(example = "2024-09")]
    pub month: String,
    /// Days of the month up to today
    pub days: Vec<AttendanceDay>,
    pub stats: MonthStats,
}

/// Resolves positions, filials, working graphics and images of `employees`,
/// loading each kind of related record with a single query.
pub async fn expand_employees(
    pool: &MySqlPool,
    base_url: &str,
    employees: Vec<Employee>,
) -> Result<Vec<EmployeeDetails>, ApiError> {
    if employees.is_empty() {
        return Ok(Vec::new());
    }

    let position_ids = unique_ids(employees.iter().map(|e| e.position_id));
    let filial_ids = unique_ids(employees.iter().filter_map(|e| e.filial_id));
    let graphic_ids = unique_ids(employees.iter().filter_map(|e| e.working_graphic_id));
    let employee_ids = unique_ids(employees.iter().map(|e| e.id));

    let positions: HashMap<u64, Position> =
        fetch_where_in::<Position>(pool, "SELECT * FROM positions", "id", &position_ids, "")
            .await
            .map_err(db_error("Failed to fetch positions"))?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

    let filials: HashMap<u64, Filial> =
        fetch_where_in::<Filial>(pool, "SELECT * FROM filials", "id", &filial_ids, "")
            .await
            .map_err(db_error("Failed to fetch filials"))?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

    let graphics: HashMap<u64, WorkingGraphic> = fetch_where_in::<WorkingGraphic>(
        pool,
        "SELECT * FROM working_graphics",
        "id",
        &graphic_ids,
        "",
    )
    .await
    .map_err(db_error("Failed to fetch working graphics"))?
    .into_iter()
    .map(|g| (g.id, g))
    .collect();

    let schedules = schedule_cache::days_for(pool, &graphic_ids)
        .await
        .map_err(db_error("Failed to fetch working days"))?;

    let mut images: HashMap<u64, Vec<EmployeeImageView>> = HashMap::new();
    for image in fetch_where_in::<EmployeeImage>(
        pool,
        "SELECT * FROM employee_images",
        "employee_id",
        &employee_ids,
        "ORDER BY id",
    )
    .await
    .map_err(db_error("Failed to fetch employee images"))?
    {
        images
            .entry(image.employee_id)
            .or_default()
            .push(image.into_view(base_url));
    }

    debug!(
        employees = employees.len(),
        positions = positions.len(),
        filials = filials.len(),
        graphics = graphics.len(),
        "Expanded employees"
    );

    Ok(employees
        .into_iter()
        .map(|employee| {
            let working_graphic = employee
                .working_graphic_id
                .and_then(|id| graphics.get(&id))
                .map(|graphic| EmployeeGraphic {
                    id: graphic.id,
                    name: graphic.name.clone(),
                    days: schedules
                        .get(&graphic.id)
                        .map(|days| {
                            days.iter()
                                .filter_map(|d| d.weekday().map(|w| (w, d.clone())))
                                .collect()
                        })
                        .unwrap_or_default(),
                });
            let images = images.remove(&employee.id).unwrap_or_default();

            EmployeeDetails {
                position: positions.get(&employee.position_id).cloned(),
                filial: employee.filial_id.and_then(|id| filials.get(&id)).cloned(),
                working_graphic,
                main_image: images.first().map(|i| i.image_url.clone()),
                images,
                employee,
            }
        })
        .collect())
}

pub async fn fetch_employee(pool: &MySqlPool, id: u64) -> Result<Employee, ApiError> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error("Failed to fetch employee"))?
        .ok_or_else(|| ApiError::not_found("Employee not found"))
}

async fn fetch_details(
    pool: &MySqlPool,
    base_url: &str,
    id: u64,
) -> Result<EmployeeDetails, ApiError> {
    let employee = fetch_employee(pool, id).await?;
    expand_employees(pool, base_url, vec![employee])
        .await?
        .pop()
        .ok_or(ApiError::Internal)
}

/// Builds the day-by-day attendance of one employee for `days`.
///
/// `events` must be sorted by time. Days after `through` are left out.
pub fn month_timeline(
    days: &[NaiveDate],
    through: NaiveDate,
    schedule: &[Day],
    events: &[NaiveDateTime],
    grace: Duration,
) -> (Vec<AttendanceDay>, MonthStats) {
    let mut by_date: BTreeMap<NaiveDate, Vec<NaiveTime>> = BTreeMap::new();
    for event in events {
        by_date.entry(event.date()).or_default().push(event.time());
    }

    let mut stats = MonthStats::default();
    let timeline = days
        .iter()
        .filter(|d| **d <= through)
        .map(|&date| {
            let shift = shift_for(schedule, date);
            let times = by_date.get(&date);
            let first_arrival = times.and_then(|t| t.first()).copied();
            let (status, late_minutes) = classify(shift, first_arrival, grace);
            stats.record(status);

            AttendanceDay {
                date,
                weekday: Weekday::from(date.weekday()),
                time_in: shift.and_then(|s| s.time_in),
                time_out: shift.and_then(|s| s.time_out),
                first_arrival,
                last_event: times.and_then(|t| t.last()).copied(),
                events: times.map_or(0, |t| t.len() as u32),
                status,
                late_minutes,
            }
        })
        .collect();

    (timeline, stats.finish())
}

/// Monthly attendance of one employee (`month` as `YYYY-MM`).
pub async fn employee_month(
    pool: &MySqlPool,
    config: &Config,
    employee_id: u64,
    month: &str,
) -> Result<EmployeeMonthView, ApiError> {
    let (year, month_num) =
        parse_month(month).ok_or_else(|| ApiError::bad_request("Month must be YYYY-MM"))?;

    let details = fetch_details(pool, &config.base_url, employee_id).await?;

    let days = month_days(year, month_num);
    let (Some(first), Some(last)) = (days.first(), days.last()) else {
        return Err(ApiError::bad_request("Month must be YYYY-MM"));
    };

    let events = sqlx::query_scalar::<_, NaiveDateTime>(
        r#"
        SELECT time FROM attendances
        WHERE employee_id = ? AND time >= ? AND time < ?
        ORDER BY time
        "#,
    )
    .bind(employee_id)
    .bind(first.and_time(NaiveTime::MIN))
    .bind(last.succ_opt().unwrap_or(*last).and_time(NaiveTime::MIN))
    .fetch_all(pool)
    .await
    .map_err(db_error("Failed to fetch attendance"))?;

    let schedule = match details.employee.working_graphic_id {
        Some(graphic_id) => schedule_cache::days_for(pool, &[graphic_id])
            .await
            .map_err(db_error("Failed to fetch working days"))?
            .remove(&graphic_id),
        None => None,
    };
    let schedule: &[Day] = schedule.as_deref().map(Vec::as_slice).unwrap_or(&[]);

    let today = Local::now().date_naive();
    let (timeline, stats) = month_timeline(
        &days,
        today,
        schedule,
        &events,
        Duration::minutes(config.late_grace_minutes),
    );

    Ok(EmployeeMonthView {
        employee: details,
        month: format!("{year:04}-{month_num:02}"),
        days: timeline,
        stats,
    })
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = EmployeeDetails),
        (status = 400, description = "Validation failed or referenced record missing", body = Object, example = json!({
            "message": "Name must not be empty"
        })),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    let phone_number = payload.phone_number.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name must not be empty"));
    }
    if phone_number.is_empty() {
        return Err(ApiError::bad_request("Phone number must not be empty"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO employees (name, phone_number, position_id, filial_id, working_graphic_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(name)
    .bind(phone_number)
    .bind(payload.position_id)
    .bind(payload.filial_id)
    .bind(payload.working_graphic_id)
    .execute(pool.get_ref())
    .await
    .map_err(db_error("Failed to create employee"))?;

    let id = result.last_insert_id();
    info!(employee_id = id, created_by = auth.user_id, "Employee created");

    let details = fetch_details(pool.get_ref(), &config.base_url, id).await?;
    Ok(HttpResponse::Created().json(details))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);

    // ---------- build WHERE clause dynamically ----------
    let mut filter = Filter::default();
    if let Some(filial_id) = query.filial_id {
        filter.push("filial_id = ?", [SqlValue::U64(filial_id)]);
    }
    if let Some(position_id) = query.position_id {
        filter.push("position_id = ?", [SqlValue::U64(position_id)]);
    }
    if let Some(graphic_id) = query.working_graphic_id {
        filter.push("working_graphic_id = ?", [SqlValue::U64(graphic_id)]);
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let like = like_pattern(search);
        filter.push(
            "(name LIKE ? OR phone_number LIKE ?)",
            [SqlValue::String(like.clone()), SqlValue::String(like)],
        );
    }
    let where_clause = filter.where_clause();

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
    debug!(sql = %count_sql, ?filter, "Counting employees");

    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count employees"))?;

    // ---------- data query ----------
    let data_sql =
        format!("SELECT * FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?");
    debug!(sql = %data_sql, page = page.page, per_page = page.per_page, "Fetching employees");

    let employees = filter
        .bind_as(sqlx::query_as::<_, Employee>(&data_sql))
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch employees"))?;

    let data = expand_employees(pool.get_ref(), &config.base_url, employees).await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = EmployeeDetails),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let details = fetch_details(pool.get_ref(), &config.base_url, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body(content = Object, example = json!({"filial_id": 2, "working_graphic_id": null})),
    responses(
        (status = 200, description = "Employee updated", body = EmployeeDetails),
        (status = 400, description = "Invalid field or referenced record missing"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let update = build_update_sql("employees", &body, &UPDATABLE, "id", employee_id)?;

    execute_update(pool.get_ref(), update)
        .await
        .map_err(db_error("Failed to update employee"))?;

    info!(employee_id, updated_by = auth.user_id, "Employee updated");
    let details = fetch_details(pool.get_ref(), &config.base_url, employee_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete employee"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    // images and attendance rows are gone with the cascade; their files follow
    file_storage::remove_employee_dir(&config.storage_dir, employee_id).await;

    info!(employee_id, deleted_by = auth.user_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/attendance/{month}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("month", Path, description = "Month as YYYY-MM", example = "2024-09")
    ),
    responses(
        (status = 200, description = "Monthly attendance", body = EmployeeMonthView),
        (status = 400, description = "Month must be YYYY-MM"),
        (status = 403, description = "Employees may only view themselves"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn employee_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<(u64, String)>,
) -> Result<HttpResponse, ApiError> {
    let (employee_id, month) = path.into_inner();

    if auth.role == Role::Employee && auth.employee_id != Some(employee_id) {
        return Err(ApiError::forbidden("You can only view your own attendance"));
    }

    let view = employee_month(pool.get_ref(), &config, employee_id, &month).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{bearer, config, lazy_pool};
    use actix_web::{App, http::StatusCode, test as actix_test};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        date(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn workday(day: &str, h: u32) -> Day {
        let ts = at(1, 0, 0);
        Day {
            id: 1,
            working_graphic_id: 1,
            day: day.into(),
            time_in: NaiveTime::from_hms_opt(h, 0, 0),
            time_out: NaiveTime::from_hms_opt(18, 0, 0),
            is_work_day: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn timeline_classifies_each_day_until_through() {
        // 2024-09-02 is a Monday
        let schedule = vec![workday("monday", 9), workday("tuesday", 9)];
        let days = month_days(2024, 9);
        let events = vec![at(2, 8, 55), at(2, 18, 5), at(3, 9, 20)];

        let (timeline, stats) =
            month_timeline(&days, date(10), &schedule, &events, Duration::zero());

        assert_eq!(timeline.len(), 10);

        let monday = &timeline[1];
        assert_eq!(monday.status, CommerStatus::OnTime);
        assert_eq!(monday.events, 2);
        assert_eq!(monday.last_event, NaiveTime::from_hms_opt(18, 5, 0));

        let tuesday = &timeline[2];
        assert_eq!(tuesday.status, CommerStatus::Late);
        assert_eq!(tuesday.late_minutes, Some(20));

        // Monday the 9th has no events
        assert_eq!(timeline[8].status, CommerStatus::Absent);
        assert_eq!(timeline[0].status, CommerStatus::DayOff);

        assert_eq!(stats.scheduled_days, 4);
        assert_eq!(stats.on_time, 1);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.absent, 2);
        assert_eq!(stats.absent_percentage, 50.0);
    }

    #[test]
    fn timeline_without_schedule_is_all_days_off() {
        let days = month_days(2024, 9);
        let (timeline, stats) =
            month_timeline(&days, date(30), &[], &[at(2, 9, 0)], Duration::zero());

        assert_eq!(timeline.len(), 30);
        assert!(timeline.iter().all(|d| d.status == CommerStatus::DayOff));
        assert_eq!(stats.scheduled_days, 0);
        assert_eq!(stats.on_time_percentage, 0.0);
    }

    #[actix_web::test]
    async fn employees_cannot_view_colleagues() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route(
                    "/employees/{id}/attendance/{month}",
                    web::get().to(employee_attendance),
                ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/employees/8/attendance/2024-09")
            .insert_header(bearer(Role::Employee, Some(7)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn bad_month_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route(
                    "/employees/{id}/attendance/{month}",
                    web::get().to(employee_attendance),
                ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/employees/7/attendance/2024-13")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn create_requires_a_name() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/employees", web::post().to(create_employee)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/employees")
            .insert_header(bearer(Role::Admin, None))
            .set_json(json!({"name": " ", "phone_number": "+998", "position_id": 1}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
