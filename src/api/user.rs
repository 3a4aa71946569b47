use crate::{
    auth::{
        auth::AuthUser,
        handlers::{NewUser, insert_user},
        password::{MIN_PASSWORD_LEN, hash_password},
    },
    error::{ApiError, db_error},
    model::{
        role::Role,
        user::{USER_COLUMNS, User},
    },
    utils::{
        db_utils::{Column, ColumnKind, build_update_from_map, execute_update},
        email_index,
        pagination::PageQuery,
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

const UPDATABLE: [Column; 7] = [
    Column::new("name", ColumnKind::RequiredText),
    Column::new("email", ColumnKind::RequiredText),
    Column::new("phone_number", ColumnKind::Text),
    Column::new("password", ColumnKind::RequiredText),
    Column::new("role_id", ColumnKind::Int),
    Column::new("employee_id", ColumnKind::NullableId),
    Column::new("is_active", ColumnKind::Bool),
];

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Dilnoza HR")]
    pub name: String,
    #[schema(example = "hr@company.uz", format = "email")]
    pub email: String,
    #[schema(example = "+998901112233")]
    pub phone_number: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    /// 1 Admin, 2 Hr, 3 Employee, 4 System, 5 ApiUser
    #[schema(example = 2)]
    pub role_id: u8,
    #[schema(example = 12, nullable = true)]
    pub employee_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

async fn fetch_user(pool: &MySqlPool, id: u64) -> Result<User, ApiError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error("Failed to fetch user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

fn parse_role(role_id: i64) -> Result<Role, ApiError> {
    u8::try_from(role_id)
        .ok()
        .and_then(Role::from_id)
        .ok_or_else(|| ApiError::bad_request("Unknown role_id"))
}

/// Validates the special fields of a user patch and rewrites them into
/// their stored form: email normalised, password hashed.
///
/// Returns the patch and the new email, if one is being set.
fn prepare_patch(mut patch: Map<String, Value>) -> Result<(Map<String, Value>, Option<String>), ApiError> {
    let mut new_email = None;

    if let Some(value) = patch.get("email") {
        let email = value
            .as_str()
            .map(email_index::normalize)
            .filter(|e| email_index::is_valid(e))
            .ok_or_else(|| ApiError::bad_request("Invalid email"))?;
        patch.insert("email".into(), Value::String(email.clone()));
        new_email = Some(email);
    }

    if let Some(value) = patch.get("password") {
        let password = value
            .as_str()
            .filter(|p| p.chars().count() >= MIN_PASSWORD_LEN)
            .ok_or_else(|| {
                ApiError::bad_request(format!(
                    "Password must be at least {MIN_PASSWORD_LEN} characters"
                ))
            })?;
        let hashed = hash_password(password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            ApiError::Internal
        })?;
        patch.insert("password".into(), Value::String(hashed));
    }

    if let Some(value) = patch.get("role_id") {
        let role_id = value
            .as_i64()
            .ok_or_else(|| ApiError::bad_request("Unknown role_id"))?;
        parse_role(role_id)?;
    }

    Ok((patch, new_email))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Email already registered")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let role = parse_role(payload.role_id.into())?;
    let mut new_user = NewUser::validate(
        &payload.name,
        &payload.email,
        &payload.phone_number,
        &payload.password,
        role,
    )?;
    new_user.employee_id = payload.employee_id;

    let id = insert_user(pool.get_ref(), new_user).await?;
    info!(user_id = id, created_by = auth.user_id, "User created");

    let user = fetch_user(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(user))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 403, description = "Admin only")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let page = query.page();

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count users"))?;

    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT ? OFFSET ?");
    let data = sqlx::query_as::<_, User>(&sql)
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch users"))?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let user = fetch_user(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "User ID")),
    request_body(content = Object, example = json!({"role_id": 2, "is_active": true})),
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid field"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let id = path.into_inner();

    let Value::Object(patch) = body.into_inner() else {
        return Err(ApiError::bad_request("Payload must be a JSON object"));
    };
    let (patch, new_email) = prepare_patch(patch)?;
    let update = build_update_from_map("users", &patch, &UPDATABLE, "id", id)?;

    let current = fetch_user(pool.get_ref(), id).await?;

    execute_update(pool.get_ref(), update)
        .await
        .map_err(db_error("Failed to update user"))?;

    if let Some(email) = new_email.filter(|e| *e != current.email) {
        email_index::remove(&current.email);
        email_index::insert(&email);
    }

    info!(user_id = id, updated_by = auth.user_id, "User updated");
    let user = fetch_user(pool.get_ref(), id).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;
    let id = path.into_inner();

    if id == auth.user_id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let user = fetch_user(pool.get_ref(), id).await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete user"))?;

    email_index::remove(&user.email);
    info!(user_id = id, deleted_by = auth.user_id, "User deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{bearer, config, lazy_pool};
    use actix_web::{App, http::StatusCode, test as actix_test};

    #[test]
    fn patch_normalizes_email_and_hashes_password() {
        let patch = json!({"email": " New@Company.UZ ", "password": "another-pass"});
        let Value::Object(patch) = patch else { unreachable!() };

        let (patch, email) = prepare_patch(patch).unwrap();
        assert_eq!(email.as_deref(), Some("new@company.uz"));
        assert_eq!(patch["email"], "new@company.uz");
        assert!(patch["password"].as_str().unwrap().starts_with("$argon2"));
    }

    #[test]
    fn patch_rejects_bad_role_and_short_password() {
        let Value::Object(bad_role) = json!({"role_id": 9}) else { unreachable!() };
        assert!(prepare_patch(bad_role).is_err());

        let Value::Object(short) = json!({"password": "short"}) else { unreachable!() };
        assert!(prepare_patch(short).is_err());
    }

    #[actix_web::test]
    async fn hr_cannot_manage_users() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/users", web::get().to(list_users)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/users")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn admin_cannot_delete_self() {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::new(config()))
                .route("/users/{id}", web::delete().to(delete_user)),
        )
        .await;

        // the test token carries user_id 1
        let req = actix_test::TestRequest::delete()
            .uri("/users/1")
            .insert_header(bearer(Role::Admin, None))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
