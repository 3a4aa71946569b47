use crate::{
    api::employee::fetch_employee,
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, db_error},
    model::employee_image::{EmployeeImage, EmployeeImageView},
    utils::{
        file_storage::{self, ImageKind},
        pagination::PageQuery,
    },
};
use actix_multipart::form::{MultipartForm, bytes::Bytes as FileBytes, text::Text};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(MultipartForm)]
pub struct ImageUpload {
    pub file: FileBytes,
    pub device_id: Option<Text<u64>>,
}

/// Documentation shape of `ImageUpload`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    #[schema(example = 1, nullable = true)]
    device_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct ImageListResponse {
    pub data: Vec<EmployeeImageView>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 5)]
    pub total: i64,
}

async fn fetch_image(
    pool: &MySqlPool,
    employee_id: u64,
    image_id: u64,
) -> Result<EmployeeImage, ApiError> {
    sqlx::query_as::<_, EmployeeImage>(
        "SELECT * FROM employee_images WHERE id = ? AND employee_id = ?",
    )
    .bind(image_id)
    .bind(employee_id)
    .fetch_optional(pool)
    .await
    .map_err(db_error("Failed to fetch image"))?
    .ok_or_else(|| ApiError::not_found("Image not found"))
}

#[utoipa::path(
    post,
    path = "/api/v1/employees/{employee_id}/images",
    params(("employee_id", Path, description = "Employee ID")),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = EmployeeImageView),
        (status = 400, description = "Missing, empty or non-image file"),
        (status = 404, description = "Employee not found"),
        (status = 413, description = "File too large")
    ),
    tag = "EmployeeImage",
    security(("bearer_auth" = []))
)]
pub async fn upload_image(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    MultipartForm(form): MultipartForm<ImageUpload>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    file_storage::validate_upload(form.file.file_name.as_deref(), &form.file.data)?;
    fetch_employee(pool.get_ref(), employee_id).await?;

    let relative = file_storage::save_image(
        &config.storage_dir,
        employee_id,
        ImageKind::Profile,
        form.file.file_name.as_deref(),
        form.file.data,
    )
    .await?;

    let device_id = form.device_id.map(|d| d.0).unwrap_or(0);
    let inserted = sqlx::query(
        "INSERT INTO employee_images (employee_id, image_url, device_id) VALUES (?, ?, ?)",
    )
    .bind(employee_id)
    .bind(&relative)
    .bind(device_id)
    .execute(pool.get_ref())
    .await;

    let image_id = match inserted {
        Ok(result) => result.last_insert_id(),
        Err(e) => {
            file_storage::remove_file(&config.storage_dir, &relative).await;
            return Err(match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    ApiError::not_found("Employee not found")
                }
                _ => db_error("Failed to store image")(e),
            });
        }
    };

    info!(employee_id, image_id, "Employee image stored");
    let image = fetch_image(pool.get_ref(), employee_id, image_id).await?;
    Ok(HttpResponse::Created().json(image.into_view(&config.base_url)))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/images",
    params(PageQuery),
    responses(
        (status = 200, description = "All images, newest first", body = ImageListResponse)
    ),
    tag = "EmployeeImage",
    security(("bearer_auth" = []))
)]
pub async fn list_all_images(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page();

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employee_images")
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count images"))?;

    let data = sqlx::query_as::<_, EmployeeImage>(
        "SELECT * FROM employee_images ORDER BY id DESC LIMIT ? OFFSET ?",
    )
    .bind(page.per_page)
    .bind(page.offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch images"))?
    .into_iter()
    .map(|image| image.into_view(&config.base_url))
    .collect();

    Ok(HttpResponse::Ok().json(ImageListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/images",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Images of the employee", body = [EmployeeImageView]),
        (status = 404, description = "Employee not found")
    ),
    tag = "EmployeeImage",
    security(("bearer_auth" = []))
)]
pub async fn list_employee_images(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = path.into_inner();
    fetch_employee(pool.get_ref(), employee_id).await?;

    let images: Vec<EmployeeImageView> = sqlx::query_as::<_, EmployeeImage>(
        "SELECT * FROM employee_images WHERE employee_id = ? ORDER BY id",
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch images"))?
    .into_iter()
    .map(|image| image.into_view(&config.base_url))
    .collect();

    Ok(HttpResponse::Ok().json(images))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/images/{image_id}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("image_id", Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image found", body = EmployeeImageView),
        (status = 404, description = "Image not found")
    ),
    tag = "EmployeeImage",
    security(("bearer_auth" = []))
)]
pub async fn get_image(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse, ApiError> {
    let (employee_id, image_id) = path.into_inner();
    let image = fetch_image(pool.get_ref(), employee_id, image_id).await?;
    Ok(HttpResponse::Ok().json(image.into_view(&config.base_url)))
}

#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}/images/{image_id}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("image_id", Path, description = "Image ID")
    ),
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image replaced", body = EmployeeImageView),
        (status = 400, description = "Missing, empty or non-image file"),
        (status = 404, description = "Image not found")
    ),
    tag = "EmployeeImage",
    security(("bearer_auth" = []))
)]
pub async fn replace_image(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<(u64, u64)>,
    MultipartForm(form): MultipartForm<ImageUpload>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let (employee_id, image_id) = path.into_inner();

    file_storage::validate_upload(form.file.file_name.as_deref(), &form.file.data)?;
    let old = fetch_image(pool.get_ref(), employee_id, image_id).await?;

    let relative = file_storage::save_image(
        &config.storage_dir,
        employee_id,
        ImageKind::Profile,
        form.file.file_name.as_deref(),
        form.file.data,
    )
    .await?;

    let device_id = form
        .device_id
        .map(|d| d.0)
        .unwrap_or(old.device_id);
    let updated = sqlx::query(
        "UPDATE employee_images SET image_url = ?, device_id = ? WHERE id = ?",
    )
    .bind(&relative)
    .bind(device_id)
    .bind(image_id)
    .execute(pool.get_ref())
    .await;

    if let Err(e) = updated {
        file_storage::remove_file(&config.storage_dir, &relative).await;
        return Err(db_error("Failed to replace image")(e));
    }

    file_storage::remove_file(&config.storage_dir, &old.image_url).await;

    info!(employee_id, image_id, "Employee image replaced");
    let image = fetch_image(pool.get_ref(), employee_id, image_id).await?;
    Ok(HttpResponse::Ok().json(image.into_view(&config.base_url)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}/images/{image_id}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("image_id", Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Image not found")
    ),
    tag = "EmployeeImage",
    security(("bearer_auth" = []))
)]
pub async fn delete_image(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse, ApiError> {
    auth.require_hr_or_admin()?;
    let (employee_id, image_id) = path.into_inner();

    let image = fetch_image(pool.get_ref(), employee_id, image_id).await?;

    sqlx::query("DELETE FROM employee_images WHERE id = ?")
        .bind(image_id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete image"))?;

    file_storage::remove_file(&config.storage_dir, &image.image_url).await;

    info!(employee_id, image_id, "Employee image deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
