use crate::{
    analytics::commers::{DayCommers, MonthCommers, RosterEntry, day_commers, month_commers},
    api::{
        NamedRef,
        attendance::{AttendanceListResponse, AttendanceScope, fetch_records, parse_dates},
        employee::{EmployeeGraphic, EmployeeDetails, expand_employees},
        unique_ids,
    },
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, db_error},
    model::{employee::Employee, filial::Filial},
    utils::{
        db_utils::{
            Column, ColumnKind, Filter, SqlValue, build_update_sql, execute_update,
            fetch_where_in, placeholders,
        },
        pagination::PageQuery,
        schedule_cache,
        time::{DateSelector, month_days, parse_month},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::{debug, info};
use utoipa::ToSchema;

const UPDATABLE: [Column; 4] = [
    Column::new("name", ColumnKind::RequiredText),
    Column::new("address", ColumnKind::RequiredText),
    Column::new("phone_number", ColumnKind::Text),
    Column::new("device_id", ColumnKind::NullableId),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateFilial {
    #[schema(example = "Filial 1")]
    pub name: String,
    #[schema(example = "123 Dosnazarov street")]
    pub address: String,
    #[schema(example = "+998612223344", nullable = true)]
    pub phone_number: Option<String>,
    #[schema(example = 1, nullable = true)]
    pub device_id: Option<u64>,
}

/// Employee as listed under its filial.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FilialEmployee {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = "Aziz Karimov")]
    pub name: String,
    #[schema(example = "+998901234567")]
    pub phone_number: String,
    #[schema(nullable = true)]
    pub position: Option<NamedRef>,
    #[schema(nullable = true)]
    pub working_graphic: Option<EmployeeGraphic>,
    #[schema(nullable = true)]
    pub main_image: Option<String>,
}

impl From<EmployeeDetails> for FilialEmployee {
    fn from(details: EmployeeDetails) -> Self {
        Self {
            id: details.employee.id,
            name: details.employee.name,
            phone_number: details.employee.phone_number,
            position: details.position.map(|p| NamedRef {
                id: p.id,
                name: p.name,
            }),
            working_graphic: details.working_graphic,
            main_image: details.main_image,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilialView {
    #[serde(flatten)]
    pub filial: Filial,
    #[schema(example = 8)]
    pub total_emp: usize,
    pub employees: Vec<FilialEmployee>,
}

#[derive(Serialize, ToSchema)]
pub struct FilialListResponse {
    pub data: Vec<FilialView>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 2)]
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FilialRef {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Filial 1")]
    pub name: String,
    #[schema(example = "123 Dosnazarov street")]
    pub address: String,
}

impl From<&Filial> for FilialRef {
    fn from(filial: &Filial) -> Self {
        Self {
            id: filial.id,
            name: filial.name.clone(),
            address: filial.address.clone(),
        }
    }
}

/// On-time / late / absent split of one filial for one day.
#[derive(Debug, Serialize, ToSchema)]
pub struct FilialDayCommers {
    #[schema(value_type = String, format = "date", example = "2024-09-05")]
    pub date: NaiveDate,
    pub filial: FilialRef,
    #[schema(example = 8)]
    pub total_emp: usize,
    #[serde(flatten)]
    pub commers: DayCommers,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FilialMonthCommers {
    #[schema(example = "2024-09")]
    pub month: String,
    pub filial: FilialRef,
    #[schema(example = 8)]
    pub total_emp: usize,
    #[serde(flatten)]
    pub commers: MonthCommers,
}

/// Roster row tagged with the filial it belongs to.
#[derive(sqlx::FromRow)]
struct FilialRosterRow {
    filial_id: u64,
    #[sqlx(flatten)]
    entry: RosterEntry,
}

const ROSTER_SELECT: &str = r#"
    SELECT e.filial_id, e.id AS employee_id, e.name, p.name AS position, e.working_graphic_id
    FROM employees e
    LEFT JOIN positions p ON p.id = e.position_id
"#;

async fn fetch_filial(pool: &MySqlPool, id: u64) -> Result<Filial, ApiError> {
    sqlx::query_as::<_, Filial>("SELECT * FROM filials WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error("Failed to fetch filial"))?
        .ok_or_else(|| ApiError::not_found("Filial not found"))
}

/// Attaches the expanded employees of every filial.
async fn with_employees(
    pool: &MySqlPool,
    base_url: &str,
    filials: Vec<Filial>,
) -> Result<Vec<FilialView>, ApiError> {
    let filial_ids = unique_ids(filials.iter().map(|f| f.id));
    let employees = fetch_where_in::<Employee>(
        pool,
        "SELECT * FROM employees",
        "filial_id",
        &filial_ids,
        "ORDER BY id",
    )
    .await
    .map_err(db_error("Failed to fetch filial employees"))?;

    let mut grouped: HashMap<u64, Vec<FilialEmployee>> = HashMap::new();
    for details in expand_employees(pool, base_url, employees).await? {
        if let Some(filial_id) = details.employee.filial_id {
            grouped.entry(filial_id).or_default().push(details.into());
        }
    }

    Ok(filials
        .into_iter()
        .map(|filial| {
            let employees = grouped.remove(&filial.id).unwrap_or_default();
            FilialView {
                total_emp: employees.len(),
                employees,
                filial,
            }
        })
        .collect())
}

async fn fetch_view(pool: &MySqlPool, base_url: &str, id: u64) -> Result<FilialView, ApiError> {
    let filial = fetch_filial(pool, id).await?;
    with_employees(pool, base_url, vec![filial])
        .await?
        .pop()
        .ok_or(ApiError::Internal)
}

fn parse_day(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Date must be YYYY-MM-DD"))
}

/// A day that has already started; later days cannot be classified yet.
fn past_day(raw: &str, today: NaiveDate) -> Result<NaiveDate, ApiError> {
    let date = parse_day(raw)?;
    if date > today {
        return Err(ApiError::bad_request("Date must not be in the future"));
    }
    Ok(date)
}

/// Roster of one filial, or of every filial when `filial_id` is `None`.
async fn load_roster(
    pool: &MySqlPool,
    filial_id: Option<u64>,
) -> Result<Vec<FilialRosterRow>, ApiError> {
    let mut filter = Filter::default();
    match filial_id {
        Some(id) => filter.push("e.filial_id = ?", [SqlValue::U64(id)]),
        None => filter.push("e.filial_id IS NOT NULL", []),
    }
    let sql = format!("{ROSTER_SELECT} {} ORDER BY e.id", filter.where_clause());

    filter
        .bind_as(sqlx::query_as::<_, FilialRosterRow>(&sql))
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to fetch roster"))
}

/// Earliest check-in per employee within `[start, end)`, per calendar day.
async fn load_arrivals(
    pool: &MySqlPool,
    employee_ids: &[u64],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<(u64, NaiveDate, NaiveDateTime)>, ApiError> {
    if employee_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut filter = Filter::default();
    filter.push(
        &format!("employee_id IN ({})", placeholders(employee_ids.len())),
        employee_ids.iter().map(|id| SqlValue::U64(*id)),
    );
    filter.push(
        "time >= ? AND time < ?",
        [SqlValue::DateTime(start), SqlValue::DateTime(end)],
    );

    let sql = format!(
        "SELECT employee_id, DATE(time) AS day, MIN(time) AS arrival FROM attendances {} \
         GROUP BY employee_id, DATE(time)",
        filter.where_clause()
    );

    filter
        .bind_as(sqlx::query_as::<_, (u64, NaiveDate, NaiveDateTime)>(&sql))
        .fetch_all(pool)
        .await
        .map_err(db_error("Failed to fetch arrivals"))
}

/// Daily commers of the given filials, computed from one roster and one
/// arrivals query.
async fn day_report(
    pool: &MySqlPool,
    config: &Config,
    filials: &[Filial],
    filial_id: Option<u64>,
    date: NaiveDate,
) -> Result<Vec<FilialDayCommers>, ApiError> {
    let roster = load_roster(pool, filial_id).await?;

    let employee_ids = unique_ids(roster.iter().map(|r| r.entry.employee_id));
    let graphic_ids = unique_ids(roster.iter().filter_map(|r| r.entry.working_graphic_id));

    let schedules = schedule_cache::days_for(pool, &graphic_ids)
        .await
        .map_err(db_error("Failed to fetch working days"))?;

    let (start, end) = DateSelector::Day(date).datetime_range();
    let arrivals: HashMap<u64, _> = load_arrivals(pool, &employee_ids, start, end)
        .await?
        .into_iter()
        .map(|(employee_id, _, arrival)| (employee_id, arrival.time()))
        .collect();

    let mut by_filial: HashMap<u64, Vec<RosterEntry>> = HashMap::new();
    for row in roster {
        by_filial.entry(row.filial_id).or_default().push(row.entry);
    }

    let grace = Duration::minutes(config.late_grace_minutes);
    debug!(%date, filials = filials.len(), arrivals = arrivals.len(), "Computing day commers");

    Ok(filials
        .iter()
        .map(|filial| {
            let roster = by_filial.remove(&filial.id).unwrap_or_default();
            FilialDayCommers {
                date,
                filial: filial.into(),
                total_emp: roster.len(),
                commers: day_commers(date, &roster, &schedules, &arrivals, grace),
            }
        })
        .collect())
}

/// Create Filial
#[utoipa::path(
    post,
    path = "/api/v1/filials",
    request_body = CreateFilial,
    responses(
        (status = 201, description = "Filial created", body = FilialView),
        (status = 400, description = "Name or address is empty"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Filial",
    security(("bearer_auth" = []))
)]
pub async fn create_filial(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateFilial>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    let address = payload.address.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name must not be empty"));
    }
    if address.is_empty() {
        return Err(ApiError::bad_request("Address must not be empty"));
    }

    let result = sqlx::query(
        "INSERT INTO filials (name, address, phone_number, device_id) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(address)
    .bind(payload.phone_number.as_deref().map(str::trim))
    .bind(payload.device_id)
    .execute(pool.get_ref())
    .await
    .map_err(db_error("Failed to create filial"))?;

    let id = result.last_insert_id();
    info!(filial_id = id, created_by = auth.user_id, "Filial created");

    let view = fetch_view(pool.get_ref(), &config.base_url, id).await?;
    Ok(HttpResponse::Created().json(view))
}

#[utoipa::path(
    get,
    path = "/api/v1/filials",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated filial list", body = FilialListResponse)
    ),
    tag = "Filial",
    security(("bearer_auth" = []))
)]
pub async fn list_filials(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page();

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM filials")
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count filials"))?;

    let filials =
        sqlx::query_as::<_, Filial>("SELECT * FROM filials ORDER BY id LIMIT ? OFFSET ?")
            .bind(page.per_page)
            .bind(page.offset)
            .fetch_all(pool.get_ref())
            .await
            .map_err(db_error("Failed to fetch filials"))?;

    let data = with_employees(pool.get_ref(), &config.base_url, filials).await?;

    Ok(HttpResponse::Ok().json(FilialListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/filials/{id}",
    params(("id", Path, description = "Filial ID")),
    responses(
        (status = 200, description = "Filial found", body = FilialView),
        (status = 404, description = "Filial not found")
    ),
    tag = "Filial",
    security(("bearer_auth" = []))
)]
pub async fn get_filial(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let view = fetch_view(pool.get_ref(), &config.base_url, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    put,
    path = "/api/v1/filials/{id}",
    params(("id", Path, description = "Filial ID")),
    request_body(content = Object, example = json!({"address": "45 Amir Temur street", "device_id": 2})),
    responses(
        (status = 200, description = "Filial updated", body = FilialView),
        (status = 400, description = "Invalid field"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Filial not found")
    ),
    tag = "Filial",
    security(("bearer_auth" = []))
)]
pub async fn update_filial(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let filial_id = path.into_inner();

    let update = build_update_sql("filials", &body, &UPDATABLE, "id", filial_id)?;
    fetch_filial(pool.get_ref(), filial_id).await?;

    execute_update(pool.get_ref(), update)
        .await
        .map_err(db_error("Failed to update filial"))?;

    info!(filial_id, updated_by = auth.user_id, "Filial updated");
    let view = fetch_view(pool.get_ref(), &config.base_url, filial_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/filials/{id}",
    params(("id", Path, description = "Filial ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Filial not found")
    ),
    tag = "Filial",
    security(("bearer_auth" = []))
)]
pub async fn delete_filial(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let filial_id = path.into_inner();

    // employees stay, with filial_id set to NULL by the foreign key
    let result = sqlx::query("DELETE FROM filials WHERE id = ?")
        .bind(filial_id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete filial"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Filial not found"));
    }

    info!(filial_id, deleted_by = auth.user_id, "Filial deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/// Attendance of a filial's employees on a day or month
#[utoipa::path(
    get,
    path = "/api/v1/filials/{id}/attendance/{date}",
    params(
        ("id", Path, description = "Filial ID"),
        ("date", Path, description = "YYYY-MM-DD or YYYY-MM", example = "2024-09-05"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Attendance records, newest first", body = AttendanceListResponse),
        (status = 400, description = "Unparsable date"),
        (status = 404, description = "Filial not found")
    ),
    tag = "Filial",
    security(("bearer_auth" = []))
)]
pub async fn filial_attendance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<(u64, String)>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let (filial_id, date) = path.into_inner();
    let dates = parse_dates(Some(&date))?;
    let page = query.page();

    fetch_filial(pool.get_ref(), filial_id).await?;

    let scope = AttendanceScope {
        filial_id: Some(filial_id),
        dates,
        ..Default::default()
    };
    let (total, data) = fetch_records(pool.get_ref(), &config.base_url, &scope, page).await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        success: true,
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Daily commers of one filial
#[utoipa::path(
    get,
    path = "/api/v1/filials/{id}/commers/{date}",
    params(
        ("id", Path, description = "Filial ID"),
        ("date", Path, description = "YYYY-MM-DD, not in the future", example = "2024-09-05")
    ),
    responses(
        (status = 200, description = "Employees split by arrival status", body = FilialDayCommers),
        (status = 400, description = "Unparsable or future date"),
        (status = 404, description = "Filial not found")
    ),
    tag = "Commers",
    security(("bearer_auth" = []))
)]
pub async fn filial_day_commers(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<(u64, String)>,
) -> Result<HttpResponse, ApiError> {
    let (filial_id, date) = path.into_inner();
    let date = past_day(&date, Local::now().date_naive())?;

    let filial = fetch_filial(pool.get_ref(), filial_id).await?;
    let report = day_report(pool.get_ref(), &config, &[filial], Some(filial_id), date)
        .await?
        .pop()
        .ok_or(ApiError::Internal)?;

    Ok(HttpResponse::Ok().json(report))
}

/// Daily commers of every filial
#[utoipa::path(
    get,
    path = "/api/v1/filials/commers/{date}",
    params(("date", Path, description = "YYYY-MM-DD, not in the future", example = "2024-09-05")),
    responses(
        (status = 200, description = "One entry per filial", body = [FilialDayCommers]),
        (status = 400, description = "Unparsable or future date"),
        (status = 404, description = "No filial exists")
    ),
    tag = "Commers",
    security(("bearer_auth" = []))
)]
pub async fn all_day_commers(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let date = past_day(&path, Local::now().date_naive())?;

    let filials = sqlx::query_as::<_, Filial>("SELECT * FROM filials ORDER BY id")
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch filials"))?;
    if filials.is_empty() {
        return Err(ApiError::not_found("No filials found"));
    }

    let reports = day_report(pool.get_ref(), &config, &filials, None, date).await?;
    Ok(HttpResponse::Ok().json(reports))
}

/// Monthly commers of one filial
#[utoipa::path(
    get,
    path = "/api/v1/filials/{id}/commers/monthly/{month}",
    params(
        ("id", Path, description = "Filial ID"),
        ("month", Path, description = "Month as YYYY-MM", example = "2024-09")
    ),
    responses(
        (status = 200, description = "Per-employee month statistics and filial totals", body = FilialMonthCommers),
        (status = 400, description = "Month must be YYYY-MM"),
        (status = 404, description = "Filial not found")
    ),
    tag = "Commers",
    security(("bearer_auth" = []))
)]
pub async fn filial_month_commers(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<(u64, String)>,
) -> Result<HttpResponse, ApiError> {
    let (filial_id, month) = path.into_inner();
    let (year, month_num) =
        parse_month(&month).ok_or_else(|| ApiError::bad_request("Month must be YYYY-MM"))?;

    let filial = fetch_filial(pool.get_ref(), filial_id).await?;
    let roster: Vec<RosterEntry> = load_roster(pool.get_ref(), Some(filial_id))
        .await?
        .into_iter()
        .map(|row| row.entry)
        .collect();

    let employee_ids = unique_ids(roster.iter().map(|r| r.employee_id));
    let graphic_ids = unique_ids(roster.iter().filter_map(|r| r.working_graphic_id));
    let schedules = schedule_cache::days_for(pool.get_ref(), &graphic_ids)
        .await
        .map_err(db_error("Failed to fetch working days"))?;

    let (start, end) = DateSelector::Month {
        year,
        month: month_num,
    }
    .datetime_range();
    let arrivals: HashMap<(u64, NaiveDate), _> =
        load_arrivals(pool.get_ref(), &employee_ids, start, end)
            .await?
            .into_iter()
            .map(|(employee_id, day, arrival)| ((employee_id, day), arrival.time()))
            .collect();

    let commers = month_commers(
        &month_days(year, month_num),
        Local::now().date_naive(),
        &roster,
        &schedules,
        &arrivals,
        Duration::minutes(config.late_grace_minutes),
    );

    Ok(HttpResponse::Ok().json(FilialMonthCommers {
        month: format!("{year:04}-{month_num:02}"),
        filial: (&filial).into(),
        total_emp: roster.len(),
        commers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{position::Position, role::Role};
    use crate::test_util::{bearer, config, lazy_pool};
    use actix_web::{App, http::StatusCode, test as actix_test};

    fn details(position: Option<Position>) -> EmployeeDetails {
        let ts = NaiveDateTime::default();
        EmployeeDetails {
            employee: Employee {
                id: 12,
                name: "Aziz".into(),
                phone_number: "+998901234567".into(),
                position_id: 3,
                filial_id: Some(1),
                working_graphic_id: None,
                created_at: ts,
                updated_at: ts,
            },
            position,
            filial: None,
            working_graphic: None,
            images: Vec::new(),
            main_image: Some("http://localhost:8080/storage/users/12/images/a.jpg".into()),
        }
    }

    #[test]
    fn employee_summary_keeps_position_reference() {
        let ts = NaiveDateTime::default();
        let summary = FilialEmployee::from(details(Some(Position {
            id: 3,
            name: "Cashier".into(),
            created_at: ts,
            updated_at: ts,
        })));

        assert_eq!(summary.id, 12);
        assert_eq!(
            summary.position,
            Some(NamedRef {
                id: 3,
                name: "Cashier".into()
            })
        );
        assert!(summary.main_image.is_some());
        assert!(FilialEmployee::from(details(None)).position.is_none());
    }

    #[test]
    fn future_days_are_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 5).unwrap();
        assert_eq!(past_day("2024-09-05", today).unwrap(), today);
        assert!(past_day("2024-09-04", today).is_ok());
        assert!(matches!(
            past_day("2024-09-06", today),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            past_day("05.09.2024", today),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[actix_web::test]
    async fn employees_cannot_create_filials() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/filials", web::post().to(create_filial)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/filials")
            .insert_header(bearer(Role::Employee, Some(1)))
            .set_json(json!({"name": "Filial 1", "address": "Street 1"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn blank_address_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/filials", web::post().to(create_filial)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/filials")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"name": "Filial 1", "address": "   "}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn attendance_rejects_unparsable_date() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/filials/{id}/attendance/{date}", web::get().to(filial_attendance)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/filials/1/attendance/yesterday")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn commers_reject_future_dates_and_bad_months() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/filials/commers/{date}", web::get().to(all_day_commers))
                .route(
                    "/filials/{id}/commers/monthly/{month}",
                    web::get().to(filial_month_commers),
                ),
        )
        .await;

        let tomorrow = Local::now().date_naive() + Duration::days(1);
        let req = actix_test::TestRequest::get()
            .uri(&format!("/filials/commers/{}", tomorrow.format("%Y-%m-%d")))
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::get()
            .uri("/filials/1/commers/monthly/2024-13")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
