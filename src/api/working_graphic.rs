use crate::{
    api::NamedRef,
    auth::auth::AuthUser,
    error::{ApiError, db_error},
    model::working_graphic::{Day, Weekday, WorkingGraphic},
    utils::{db_utils::fetch_where_in, pagination::PageQuery, schedule_cache, time::parse_time},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySql, MySqlPool, Transaction};
use std::collections::{BTreeMap, HashMap};
use strum::IntoEnumIterator;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DayInput {
    #[schema(example = "monday")]
    pub day: String,
    #[schema(example = "09:00", nullable = true)]
    pub time_in: Option<String>,
    #[schema(example = "18:00", nullable = true)]
    pub time_out: Option<String>,
    /// Defaults to true
    #[schema(example = true, nullable = true)]
    pub is_work_day: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateWorkingGraphic {
    #[schema(example = "Day shift")]
    pub name: String,
    pub days: Vec<DayInput>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateWorkingGraphic {
    #[schema(example = "Evening shift", nullable = true)]
    pub name: Option<String>,
    /// Replaces the whole week when present
    pub days: Option<Vec<DayInput>>,
}

#[derive(Serialize, ToSchema)]
pub struct WorkingGraphicDetails {
    #[serde(flatten)]
    pub graphic: WorkingGraphic,
    /// Ordered Monday first
    pub days: Vec<Day>,
    pub employees: Vec<NamedRef>,
}

#[derive(Serialize, ToSchema)]
pub struct WorkingGraphicListResponse {
    pub data: Vec<WorkingGraphicDetails>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 2)]
    pub total: i64,
}

/// One weekday of a schedule, validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaySchedule {
    pub weekday: Weekday,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub is_work_day: bool,
}

/// Validates the submitted days and expands them to a full week; weekdays
/// not mentioned become days off.
pub fn normalize_week(days: &[DayInput]) -> Result<Vec<DaySchedule>, ApiError> {
    let mut given: BTreeMap<Weekday, DaySchedule> = BTreeMap::new();

    for input in days {
        let weekday: Weekday = input
            .day
            .trim()
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Unknown day '{}'", input.day)))?;

        let time = |raw: &Option<String>, field: &str| -> Result<Option<NaiveTime>, ApiError> {
            match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                None => Ok(None),
                Some(s) => parse_time(s).map(Some).ok_or_else(|| {
                    ApiError::bad_request(format!("Invalid {field} '{s}' for {weekday}"))
                }),
            }
        };
        let time_in = time(&input.time_in, "time_in")?;
        let time_out = time(&input.time_out, "time_out")?;
        let is_work_day = input.is_work_day.unwrap_or(true);

        if let (true, Some(t_in), Some(t_out)) = (is_work_day, time_in, time_out) {
            if t_in >= t_out {
                return Err(ApiError::bad_request(format!(
                    "time_in must be before time_out on {weekday}"
                )));
            }
        }

        let schedule = DaySchedule {
            weekday,
            time_in,
            time_out,
            is_work_day,
        };
        if given.insert(weekday, schedule).is_some() {
            return Err(ApiError::bad_request(format!("Duplicate day '{weekday}'")));
        }
    }

    Ok(Weekday::iter()
        .map(|weekday| {
            given.get(&weekday).copied().unwrap_or(DaySchedule {
                weekday,
                time_in: None,
                time_out: None,
                is_work_day: false,
            })
        })
        .collect())
}

fn validate_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        Err(ApiError::bad_request("Name must not be empty"))
    } else {
        Ok(name)
    }
}

async fn insert_days(
    tx: &mut Transaction<'_, MySql>,
    graphic_id: u64,
    week: &[DaySchedule],
) -> Result<(), ApiError> {
    for day in week {
        sqlx::query(
            r#"
            INSERT INTO days (working_graphic_id, day, time_in, time_out, is_work_day)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(graphic_id)
        .bind(day.weekday.to_string())
        .bind(day.time_in)
        .bind(day.time_out)
        .bind(day.is_work_day)
        .execute(&mut **tx)
        .await
        .map_err(db_error("Failed to insert working day"))?;
    }
    Ok(())
}

/// Loads graphics together with their days and assigned employees.
async fn with_details(
    pool: &MySqlPool,
    graphics: Vec<WorkingGraphic>,
) -> Result<Vec<WorkingGraphicDetails>, ApiError> {
    let ids: Vec<u64> = graphics.iter().map(|g| g.id).collect();

    let schedules = schedule_cache::days_for(pool, &ids)
        .await
        .map_err(db_error("Failed to fetch working days"))?;

    let mut employees: HashMap<u64, Vec<NamedRef>> = HashMap::new();
    let rows: Vec<(u64, u64, String)> = fetch_where_in(
        pool,
        "SELECT working_graphic_id, id, name FROM employees",
        "working_graphic_id",
        &ids,
        "ORDER BY id",
    )
    .await
    .map_err(db_error("Failed to fetch graphic employees"))?;
    for (graphic_id, id, name) in rows {
        employees
            .entry(graphic_id)
            .or_default()
            .push(NamedRef { id, name });
    }

    Ok(graphics
        .into_iter()
        .map(|graphic| WorkingGraphicDetails {
            days: schedules
                .get(&graphic.id)
                .map(|days| Vec::clone(days))
                .unwrap_or_default(),
            employees: employees.remove(&graphic.id).unwrap_or_default(),
            graphic,
        })
        .collect())
}

async fn fetch_details(pool: &MySqlPool, id: u64) -> Result<WorkingGraphicDetails, ApiError> {
    let graphic = sqlx::query_as::<_, WorkingGraphic>("SELECT * FROM working_graphics WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error("Failed to fetch working graphic"))?
        .ok_or_else(|| ApiError::not_found("Working graphic not found"))?;

    with_details(pool, vec![graphic])
        .await?
        .pop()
        .ok_or(ApiError::Internal)
}

#[utoipa::path(
    post,
    path = "/api/v1/working-graphics",
    request_body = CreateWorkingGraphic,
    responses(
        (status = 201, description = "Working graphic created", body = WorkingGraphicDetails),
        (status = 400, description = "Invalid name or days"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "WorkingGraphic",
    security(("bearer_auth" = []))
)]
pub async fn create_working_graphic(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateWorkingGraphic>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let name = validate_name(&payload.name)?;
    let week = normalize_week(&payload.days)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start transaction"))?;

    let id = sqlx::query("INSERT INTO working_graphics (name) VALUES (?)")
        .bind(name)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to create working graphic"))?
        .last_insert_id();

    insert_days(&mut tx, id, &week).await?;

    tx.commit()
        .await
        .map_err(db_error("Failed to commit working graphic"))?;

    info!(working_graphic_id = id, "Working graphic created");
    let details = fetch_details(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(details))
}

#[utoipa::path(
    get,
    path = "/api/v1/working-graphics",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated working graphics", body = WorkingGraphicListResponse)
    ),
    tag = "WorkingGraphic",
    security(("bearer_auth" = []))
)]
pub async fn list_working_graphics(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page();

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM working_graphics")
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count working graphics"))?;

    let graphics = sqlx::query_as::<_, WorkingGraphic>(
        "SELECT * FROM working_graphics ORDER BY id LIMIT ? OFFSET ?",
    )
    .bind(page.per_page)
    .bind(page.offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch working graphics"))?;

    let data = with_details(pool.get_ref(), graphics).await?;

    Ok(HttpResponse::Ok().json(WorkingGraphicListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/working-graphics/{id}",
    params(("id", Path, description = "Working graphic ID")),
    responses(
        (status = 200, description = "Working graphic found", body = WorkingGraphicDetails),
        (status = 404, description = "Working graphic not found")
    ),
    tag = "WorkingGraphic",
    security(("bearer_auth" = []))
)]
pub async fn get_working_graphic(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let details = fetch_details(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

#[utoipa::path(
    put,
    path = "/api/v1/working-graphics/{id}",
    params(("id", Path, description = "Working graphic ID")),
    request_body = UpdateWorkingGraphic,
    responses(
        (status = 200, description = "Working graphic updated", body = WorkingGraphicDetails),
        (status = 400, description = "Invalid name or days"),
        (status = 404, description = "Working graphic not found")
    ),
    tag = "WorkingGraphic",
    security(("bearer_auth" = []))
)]
pub async fn update_working_graphic(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateWorkingGraphic>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let name = payload.name.as_deref().map(validate_name).transpose()?;
    let week = payload.days.as_deref().map(normalize_week).transpose()?;
    if name.is_none() && week.is_none() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start transaction"))?;

    let exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM working_graphics WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to lock working graphic"))?;
    if exists == 0 {
        return Err(ApiError::not_found("Working graphic not found"));
    }

    if let Some(name) = name {
        sqlx::query("UPDATE working_graphics SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to rename working graphic"))?;
    }

    if let Some(week) = &week {
        sqlx::query("DELETE FROM days WHERE working_graphic_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to clear working days"))?;
        insert_days(&mut tx, id, week).await?;
    }

    tx.commit()
        .await
        .map_err(db_error("Failed to commit working graphic"))?;
    schedule_cache::invalidate(id).await;

    info!(working_graphic_id = id, "Working graphic updated");
    let details = fetch_details(pool.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(details))
}

#[utoipa::path(
    delete,
    path = "/api/v1/working-graphics/{id}",
    params(("id", Path, description = "Working graphic ID")),
    responses(
        (status = 200, description = "Working graphic deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Working graphic not found")
    ),
    tag = "WorkingGraphic",
    security(("bearer_auth" = []))
)]
pub async fn delete_working_graphic(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let result = sqlx::query("DELETE FROM working_graphics WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete working graphic"))?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Working graphic not found"));
    }
    schedule_cache::invalidate(id).await;

    info!(working_graphic_id = id, "Working graphic deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
