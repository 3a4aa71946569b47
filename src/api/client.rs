use crate::{
    analytics::daily_report::aggregate,
    auth::auth::AuthUser,
    error::{ApiError, db_error},
    model::{
        client::{Client, ClientStatus, ClientVisit},
        daily_report::{DailyReport, DailyReportRow},
    },
    utils::{
        pagination::Page,
        time::{DateSelector, parse_datetime},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{Duration, NaiveDate};
use futures::lock::Mutex;
use moka::future::Cache;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sqlx::{MySqlPool, types::Json};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

/// Longest range a report query or rebuild may cover, in days.
const MAX_REPORT_DAYS: i64 = 366;

/// One lock per report date. A rebuild holds it from reading the visits
/// until the upsert lands, so an older snapshot never overwrites a newer one.
static REPORT_LOCKS: Lazy<Cache<NaiveDate, Arc<Mutex<()>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1_000)
        .time_to_idle(std::time::Duration::from_secs(600))
        .build()
});

async fn report_lock(date: NaiveDate) -> Arc<Mutex<()>> {
    REPORT_LOCKS
        .get_with(date, async { Arc::new(Mutex::new(())) })
        .await
}

/// Sighting of a walk-in client pushed by a recognition device.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClientSighting {
    /// Identifier assigned by the device
    #[schema(example = 501)]
    pub id: u64,
    #[schema(example = "male")]
    pub gender: String,
    #[schema(example = 34)]
    pub age: u32,
    #[schema(example = "0.93")]
    pub score: String,
    #[schema(example = 2)]
    pub camera_id: u64,
    #[schema(example = "2024-09-05 10:12:45")]
    pub time: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ClientQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// `new` or `regular`
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ClientListResponse {
    pub data: Vec<Client>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct ClientDetails {
    #[serde(flatten)]
    pub client: Client,
    /// Newest first
    pub visits: Vec<ClientVisit>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportRangeQuery {
    /// First day, `YYYY-MM-DD`
    pub start: String,
    /// Last day (inclusive); defaults to `start`
    pub end: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RebuildRequest {
    #[schema(example = "2024-09-01")]
    pub start: String,
    #[schema(example = "2024-09-30", nullable = true)]
    pub end: Option<String>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Date must be YYYY-MM-DD"))
}

/// Inclusive `[start, end]`, at most `MAX_REPORT_DAYS` long.
fn date_range(start: &str, end: Option<&str>) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let start = parse_date(start)?;
    let end = end.map(parse_date).transpose()?.unwrap_or(start);

    if end < start {
        return Err(ApiError::bad_request("End date must not be before start date"));
    }
    if (end - start).num_days() + 1 > MAX_REPORT_DAYS {
        return Err(ApiError::bad_request(format!(
            "Range must not exceed {MAX_REPORT_DAYS} days"
        )));
    }
    Ok((start, end))
}

/// Age kept for a returning client.
fn averaged_age(previous: u32, current: u32) -> u32 {
    ((u64::from(previous) + u64::from(current)) / 2) as u32
}

/// Recomputes the report of `date` from its visits and stores it.
pub async fn rebuild_report(pool: &MySqlPool, date: NaiveDate) -> Result<DailyReport, ApiError> {
    let lock = report_lock(date).await;
    let _guard = lock.lock().await;

    let (start, end) = DateSelector::Day(date).datetime_range();
    let visits = sqlx::query_as::<_, ClientVisit>(
        "SELECT * FROM client_visits WHERE time >= ? AND time < ? ORDER BY time, id",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
    .map_err(db_error("Failed to fetch client visits"))?;

    let report = aggregate(&visits);
    debug!(%date, visits = visits.len(), clients = report.clients.len(), "Aggregated client visits");

    sqlx::query(
        r#"
        INSERT INTO daily_reports
            (date, clients, gender, age, total_new_clients, total_regular_clients,
             time_slots, male_percentage, female_percentage)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            clients = VALUES(clients),
            gender = VALUES(gender),
            age = VALUES(age),
            total_new_clients = VALUES(total_new_clients),
            total_regular_clients = VALUES(total_regular_clients),
            time_slots = VALUES(time_slots),
            male_percentage = VALUES(male_percentage),
            female_percentage = VALUES(female_percentage)
        "#,
    )
    .bind(date)
    .bind(Json(&report.clients))
    .bind(Json(&report.gender))
    .bind(Json(&report.age))
    .bind(report.total_new_clients)
    .bind(report.total_regular_clients)
    .bind(Json(&report.time_slots))
    .bind(report.male_percentage)
    .bind(report.female_percentage)
    .execute(pool)
    .await
    .map_err(db_error("Failed to store daily report"))?;

    fetch_report(pool, date)
        .await?
        .ok_or(ApiError::Internal)
}

async fn fetch_report(pool: &MySqlPool, date: NaiveDate) -> Result<Option<DailyReport>, ApiError> {
    Ok(
        sqlx::query_as::<_, DailyReportRow>("SELECT * FROM daily_reports WHERE date = ?")
            .bind(date)
            .fetch_optional(pool)
            .await
            .map_err(db_error("Failed to fetch daily report"))?
            .map(DailyReport::from),
    )
}

/// Record Client Sighting
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    request_body = ClientSighting,
    responses(
        (status = 201, description = "Sighting stored", body = Client),
        (status = 400, description = "Invalid time"),
        (status = 403, description = "Devices and admins only")
    ),
    tag = "Client",
    security(("bearer_auth" = []))
)]
#[instrument(name = "client_sighting", skip(auth, pool, payload), fields(client_id = payload.id))]
pub async fn create_client(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ClientSighting>,
) -> Result<HttpResponse, ApiError> {
    auth.require_device_or_admin()?;

    let sighting = payload.into_inner();
    let time = parse_datetime(&sighting.time)
        .ok_or_else(|| ApiError::bad_request("Invalid time, expected YYYY-MM-DD HH:MM:SS"))?;
    let gender = sighting.gender.trim().to_string();

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start transaction"))?;

    let existing = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ? FOR UPDATE")
        .bind(sighting.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to fetch client"))?;

    let status = match existing {
        Some(client) => {
            sqlx::query(
                r#"
                UPDATE clients
                SET gender = ?, age = ?, score = ?, client_status = ?, camera_id = ?, time = ?
                WHERE id = ?
                "#,
            )
            .bind(&gender)
            .bind(averaged_age(client.age, sighting.age))
            .bind(&sighting.score)
            .bind(ClientStatus::Regular.as_ref())
            .bind(sighting.camera_id)
            .bind(time)
            .bind(sighting.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update client"))?;
            ClientStatus::Regular
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO clients (id, gender, age, score, client_status, camera_id, time)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(sighting.id)
            .bind(&gender)
            .bind(sighting.age)
            .bind(&sighting.score)
            .bind(ClientStatus::New.as_ref())
            .bind(sighting.camera_id)
            .bind(time)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to create client"))?;
            ClientStatus::New
        }
    };

    sqlx::query(
        r#"
        INSERT INTO client_visits (client_id, camera_id, gender, age, client_status, time)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sighting.id)
    .bind(sighting.camera_id)
    .bind(&gender)
    .bind(sighting.age)
    .bind(status.as_ref())
    .bind(time)
    .execute(&mut *tx)
    .await
    .map_err(db_error("Failed to record client visit"))?;

    tx.commit()
        .await
        .map_err(db_error("Failed to commit client sighting"))?;

    info!(%status, camera_id = sighting.camera_id, "Client sighting recorded");

    let date = time.date();
    let report_pool = pool.get_ref().clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = rebuild_report(&report_pool, date).await {
            warn!(%date, error = %e, "Failed to rebuild daily report");
        }
    });

    let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
        .bind(sighting.id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch client"))?;

    Ok(HttpResponse::Created().json(client))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients",
    params(ClientQuery),
    responses(
        (status = 200, description = "Paginated client list, latest visit first", body = ClientListResponse),
        (status = 400, description = "Unknown status")
    ),
    tag = "Client",
    security(("bearer_auth" = []))
)]
pub async fn list_clients(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ClientQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = Page::new(query.page, query.per_page);
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            ClientStatus::from_str(s.trim())
                .map_err(|_| ApiError::bad_request("Status must be 'new' or 'regular'"))
        })
        .transpose()?;

    let (total, data) = match status {
        Some(status) => {
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM clients WHERE client_status = ?",
            )
            .bind(status.as_ref())
            .fetch_one(pool.get_ref())
            .await
            .map_err(db_error("Failed to count clients"))?;

            let data = sqlx::query_as::<_, Client>(
                "SELECT * FROM clients WHERE client_status = ? ORDER BY time DESC, id DESC LIMIT ? OFFSET ?",
            )
            .bind(status.as_ref())
            .bind(page.per_page)
            .bind(page.offset)
            .fetch_all(pool.get_ref())
            .await
            .map_err(db_error("Failed to fetch clients"))?;
            (total, data)
        }
        None => {
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
                .fetch_one(pool.get_ref())
                .await
                .map_err(db_error("Failed to count clients"))?;

            let data = sqlx::query_as::<_, Client>(
                "SELECT * FROM clients ORDER BY time DESC, id DESC LIMIT ? OFFSET ?",
            )
            .bind(page.per_page)
            .bind(page.offset)
            .fetch_all(pool.get_ref())
            .await
            .map_err(db_error("Failed to fetch clients"))?;
            (total, data)
        }
    };

    Ok(HttpResponse::Ok().json(ClientListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    params(("id", Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client with its visits", body = ClientDetails),
        (status = 404, description = "Client not found")
    ),
    tag = "Client",
    security(("bearer_auth" = []))
)]
pub async fn get_client(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let client_id = path.into_inner();

    let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
        .bind(client_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch client"))?
        .ok_or_else(|| ApiError::not_found("Client not found"))?;

    let visits = sqlx::query_as::<_, ClientVisit>(
        "SELECT * FROM client_visits WHERE client_id = ? ORDER BY time DESC, id DESC",
    )
    .bind(client_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch client visits"))?;

    Ok(HttpResponse::Ok().json(ClientDetails { client, visits }))
}

/// Daily Client Report
#[utoipa::path(
    get,
    path = "/api/v1/clients/reports/{date}",
    params(("date", Path, description = "YYYY-MM-DD", example = "2024-09-05")),
    responses(
        (status = 200, description = "Stored report of the day", body = DailyReport),
        (status = 400, description = "Date must be YYYY-MM-DD"),
        (status = 404, description = "No report for this date")
    ),
    tag = "DailyReport",
    security(("bearer_auth" = []))
)]
pub async fn get_daily_report(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let date = parse_date(&path)?;

    let report = fetch_report(pool.get_ref(), date)
        .await?
        .ok_or_else(|| ApiError::not_found("No report for this date"))?;

    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    get,
    path = "/api/v1/clients/reports",
    params(ReportRangeQuery),
    responses(
        (status = 200, description = "Stored reports in the range, by date", body = [DailyReport]),
        (status = 400, description = "Invalid range")
    ),
    tag = "DailyReport",
    security(("bearer_auth" = []))
)]
pub async fn list_daily_reports(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportRangeQuery>,
) -> Result<HttpResponse, ApiError> {
    let (start, end) = date_range(&query.start, query.end.as_deref())?;

    let reports: Vec<DailyReport> = sqlx::query_as::<_, DailyReportRow>(
        "SELECT * FROM daily_reports WHERE date BETWEEN ? AND ? ORDER BY date",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch daily reports"))?
    .into_iter()
    .map(DailyReport::from)
    .collect();

    Ok(HttpResponse::Ok().json(reports))
}

/// Rebuild Daily Reports
#[utoipa::path(
    post,
    path = "/api/v1/clients/reports/rebuild",
    request_body = RebuildRequest,
    responses(
        (status = 200, description = "Rebuilt reports, by date", body = [DailyReport]),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "DailyReport",
    security(("bearer_auth" = []))
)]
pub async fn rebuild_daily_reports(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RebuildRequest>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let (start, end) = date_range(&payload.start, payload.end.as_deref())?;

    let mut reports = Vec::new();
    let mut date = start;
    while date <= end {
        reports.push(rebuild_report(pool.get_ref(), date).await?);
        date += Duration::days(1);
    }

    info!(%start, %end, rebuilt = reports.len(), requested_by = auth.user_id, "Daily reports rebuilt");
    Ok(HttpResponse::Ok().json(reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_util::{bearer, config, lazy_pool};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use serde_json::json;

    #[test]
    fn ranges_are_inclusive_and_bounded() {
        let (start, end) = date_range("2024-09-01", None).unwrap();
        assert_eq!(start, end);

        // 2024 is a leap year: Jan 1 .. Dec 31 is exactly 366 days
        assert!(date_range("2024-01-01", Some("2024-12-31")).is_ok());
        assert!(date_range("2024-01-01", Some("2025-01-01")).is_err());
        assert!(date_range("2024-09-05", Some("2024-09-04")).is_err());
        assert!(date_range("05/09/2024", None).is_err());
    }

    #[actix_web::test]
    async fn rebuilds_of_one_date_run_one_at_a_time() {
        let day = NaiveDate::from_ymd_opt(2024, 9, 5).unwrap();
        let other = NaiveDate::from_ymd_opt(2024, 9, 6).unwrap();

        let first = report_lock(day).await;
        let held = first.lock().await;

        let same = report_lock(day).await;
        assert!(Arc::ptr_eq(&first, &same));
        assert!(same.try_lock().is_none());
        assert!(report_lock(other).await.try_lock().is_some());

        drop(held);
        assert!(same.try_lock().is_some());
    }

    #[test]
    fn returning_client_age_is_averaged() {
        assert_eq!(averaged_age(30, 34), 32);
        assert_eq!(averaged_age(30, 33), 31);
        assert_eq!(averaged_age(u32::MAX, u32::MAX), u32::MAX);
    }

    #[actix_web::test]
    async fn only_devices_record_sightings() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/clients", web::post().to(create_client)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/clients")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({
                "id": 501, "gender": "male", "age": 30, "score": "0.9",
                "camera_id": 1, "time": "2024-09-05 10:00:00"
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn sighting_with_bad_time_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/clients", web::post().to(create_client)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/clients")
            .insert_header(bearer(Role::System, None))
            .set_json(json!({
                "id": 501, "gender": "male", "age": 30, "score": "0.9",
                "camera_id": 1, "time": "yesterday"
            }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_status_filter_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/clients", web::get().to(list_clients)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/clients?status=vip")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn rebuild_rejects_oversized_range() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/clients/reports/rebuild", web::post().to(rebuild_daily_reports)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/clients/reports/rebuild")
            .insert_header(bearer(Role::Admin, None))
            .set_json(json!({"start": "2023-01-01", "end": "2024-12-31"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
