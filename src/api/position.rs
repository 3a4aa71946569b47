use crate::{
    auth::auth::AuthUser,
    error::{ApiError, db_error},
    model::position::Position,
    utils::{
        db_utils::{Column, ColumnKind, build_update_sql, execute_update},
        pagination::PageQuery,
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

const UPDATABLE: [Column; 1] = [Column::new("name", ColumnKind::RequiredText)];

#[derive(Deserialize, ToSchema)]
pub struct CreatePosition {
    #[schema(example = "Cashier")]
    pub name: String,
}

#[derive(Serialize, ToSchema, sqlx::FromRow)]
pub struct PositionWithCount {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub position: Position,
    #[schema(example = 4)]
    pub employee_count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct PositionListResponse {
    pub data: Vec<PositionWithCount>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

const SELECT_WITH_COUNT: &str = r#"
    SELECT p.id, p.name, p.created_at, p.updated_at, COUNT(e.id) AS employee_count
    FROM positions p
    LEFT JOIN employees e ON e.position_id = p.id
"#;

async fn fetch_position(pool: &MySqlPool, id: u64) -> Result<PositionWithCount, ApiError> {
    let sql = format!("{SELECT_WITH_COUNT} WHERE p.id = ? GROUP BY p.id");
    sqlx::query_as::<_, PositionWithCount>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error("Failed to fetch position"))?
        .ok_or_else(|| ApiError::not_found("Position not found"))
}

/// Create Position
#[utoipa::path(
    post,
    path = "/api/v1/positions",
    request_body = CreatePosition,
    responses(
        (status = 201, description = "Position created", body = PositionWithCount),
        (status = 400, description = "Name is empty"),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn create_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePosition>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name must not be empty"));
    }

    let result = sqlx::query("INSERT INTO positions (name) VALUES (?)")
        .bind(name)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to create position"))?;

    let position = fetch_position(pool.get_ref(), result.last_insert_id()).await?;
    info!(position_id = position.position.id, "Position created");

    Ok(HttpResponse::Created().json(position))
}

#[utoipa::path(
    get,
    path = "/api/v1/positions",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated position list", body = PositionListResponse)
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn list_positions(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page();

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM positions")
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count positions"))?;

    let sql = format!("{SELECT_WITH_COUNT} GROUP BY p.id ORDER BY p.id LIMIT ? OFFSET ?");
    let data = sqlx::query_as::<_, PositionWithCount>(&sql)
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch positions"))?;

    Ok(HttpResponse::Ok().json(PositionListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/positions/{id}",
    params(("id", Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position found", body = PositionWithCount),
        (status = 404, description = "Position not found")
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn get_position(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let position = fetch_position(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(position))
}

#[utoipa::path(
    put,
    path = "/api/v1/positions/{id}",
    params(("id", Path, description = "Position ID")),
    request_body(content = Object, example = json!({"name": "Senior cashier"})),
    responses(
        (status = 200, description = "Position updated", body = PositionWithCount),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Position not found")
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn update_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let update = build_update_sql("positions", &body, &UPDATABLE, "id", id)?;
    execute_update(pool.get_ref(), update)
        .await
        .map_err(db_error("Failed to update position"))?;

    // rows_affected is 0 for an unchanged row, so existence is checked here
    let position = fetch_position(pool.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(position))
}

#[utoipa::path(
    delete,
    path = "/api/v1/positions/{id}",
    params(("id", Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Position not found"),
        (status = 409, description = "Employees still hold this position")
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn delete_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let id = path.into_inner();

    let in_use =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE position_id = ?")
            .bind(id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(db_error("Failed to check position usage"))?;
    if in_use > 0 {
        return Err(ApiError::conflict(format!(
            "Position is assigned to {in_use} employee(s)"
        )));
    }

    let result = sqlx::query("DELETE FROM positions WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                ApiError::conflict("Position is assigned to employees")
            }
            _ => db_error("Failed to delete position")(e),
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Position not found"));
    }

    info!(position_id = id, "Position deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_util::{bearer, config, lazy_pool};
    use actix_web::{App, http::StatusCode, test as actix_test};

    #[actix_web::test]
    async fn employees_cannot_create_positions() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/positions", web::post().to(create_position)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/positions")
            .insert_header(bearer(Role::Employee, Some(3)))
            .set_json(json!({"name": "Cashier"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn blank_name_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/positions", web::post().to(create_position)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/positions")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"name": "   "}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_update_field_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/positions/{id}", web::put().to(update_position)),
        )
        .await;

        let req = actix_test::TestRequest::put()
            .uri("/positions/1")
            .insert_header(bearer(Role::Admin, None))
            .set_json(json!({"created_at": "2020-01-01"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn reads_require_a_token() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/positions", web::get().to(list_positions)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/positions").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
