use crate::error::ApiError;
use actix_multipart::form::MultipartFormConfig;
use actix_web::{
    ResponseError,
    http::StatusCode,
    web::{self, Bytes},
};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use uuid::Uuid;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

/// Which folder of an employee's directory a file belongs to.
#[derive(Debug, Clone, Copy)]
pub enum ImageKind {
    Profile,
    Attendance,
}

impl ImageKind {
    fn folder(self) -> &'static str {
        match self {
            ImageKind::Profile => "images",
            ImageKind::Attendance => "attendance",
        }
    }
}

/// Lower-cased extension of an uploaded file name, if it is an allowed image type.
pub fn image_extension(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Relative directory holding everything stored for an employee.
pub fn employee_dir(employee_id: u64) -> String {
    format!("users/{employee_id}")
}

/// Relative path for a new file; the name is generated, only the extension
/// comes from the client.
pub fn new_relative_path(employee_id: u64, kind: ImageKind, ext: &str) -> String {
    format!(
        "{}/{}/{}.{}",
        employee_dir(employee_id),
        kind.folder(),
        Uuid::new_v4().to_simple(),
        ext
    )
}

/// Public URL of a stored path.
pub fn public_url(base_url: &str, relative: &str) -> String {
    format!("{}/storage/{}", base_url.trim_end_matches('/'), relative)
}

/// Rejects empty uploads and files that are not images.
pub fn validate_upload(file_name: Option<&str>, data: &Bytes) -> Result<String, ApiError> {
    if data.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    image_extension(file_name).ok_or_else(|| {
        ApiError::bad_request(format!(
            "Unsupported file type. Allowed: {}",
            IMAGE_EXTENSIONS.join(", ")
        ))
    })
}

/// Multipart limits for image uploads; errors render like every other
/// `ApiError`.
pub fn upload_config(max_upload_bytes: usize) -> MultipartFormConfig {
    MultipartFormConfig::default()
        .memory_limit(max_upload_bytes)
        // room for the text fields next to the file
        .total_limit(max_upload_bytes + 64 * 1024)
        .error_handler(|err, _req| {
            let api_error = if err.status_code() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge("Uploaded file is too large".into())
            } else {
                ApiError::bad_request(err.to_string())
            };
            api_error.into()
        })
}

fn absolute(storage_dir: &str, relative: &str) -> PathBuf {
    Path::new(storage_dir).join(relative)
}

/// Validates and writes an uploaded image, returning its relative path.
pub async fn save_image(
    storage_dir: &str,
    employee_id: u64,
    kind: ImageKind,
    file_name: Option<&str>,
    data: Bytes,
) -> Result<String, ApiError> {
    let ext = validate_upload(file_name, &data)?;

    let relative = new_relative_path(employee_id, kind, &ext);
    let path = absolute(storage_dir, &relative);
    debug!(path = %path.display(), bytes = data.len(), "Storing image");

    web::block(move || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &data)
    })
    .await?
    .map_err(|e| {
        error!(error = %e, "Failed to write image");
        ApiError::Internal
    })?;

    Ok(relative)
}

/// Best-effort removal of a stored file; a missing file is not an error.
pub async fn remove_file(storage_dir: &str, relative: &str) {
    let path = absolute(storage_dir, relative);
    if let Err(e) = remove_quietly(move || std::fs::remove_file(&path)).await {
        warn!(error = %e, relative, "Failed to remove stored file");
    }
}

/// Best-effort removal of an employee's whole storage directory.
pub async fn remove_employee_dir(storage_dir: &str, employee_id: u64) {
    let path = absolute(storage_dir, &employee_dir(employee_id));
    if let Err(e) = remove_quietly(move || std::fs::remove_dir_all(&path)).await {
        warn!(error = %e, employee_id, "Failed to remove employee storage");
    }
}

async fn remove_quietly<F>(remove: F) -> std::io::Result<()>
where
    F: FnOnce() -> std::io::Result<()> + Send + 'static,
{
    let result = web::block(move || match remove() {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
    .await;

    match result {
        Ok(inner) => inner,
        Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_image_extensions() {
        assert_eq!(image_extension(Some("face.JPG")), Some("jpg".into()));
        assert_eq!(image_extension(Some("scan.webp")), Some("webp".into()));
        assert_eq!(image_extension(Some("run.sh")), None);
        assert_eq!(image_extension(Some("noext")), None);
        assert_eq!(image_extension(None), None);
    }

    #[test]
    fn generated_paths_ignore_client_names() {
        let path = new_relative_path(42, ImageKind::Attendance, "png");
        assert!(path.starts_with("users/42/attendance/"));
        assert!(path.ends_with(".png"));
        assert!(!path.contains(".."));
    }

    #[test]
    fn public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("http://cdn.local/", "users/1/images/a.jpg"),
            "http://cdn.local/storage/users/1/images/a.jpg"
        );
    }

    #[actix_web::test]
    async fn saves_and_removes_files() {
        let dir = std::env::temp_dir().join(format!("hr-storage-{}", Uuid::new_v4().to_simple()));
        let root = dir.to_string_lossy().to_string();

        let relative = save_image(
            &root,
            7,
            ImageKind::Profile,
            Some("me.png"),
            Bytes::from_static(b"\x89PNG"),
        )
        .await
        .unwrap();

        let stored = dir.join(&relative);
        assert_eq!(std::fs::read(&stored).unwrap(), b"\x89PNG");

        remove_file(&root, &relative).await;
        assert!(!stored.exists());

        remove_employee_dir(&root, 7).await;
        assert!(!dir.join("users/7").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[actix_web::test]
    async fn rejects_empty_and_unsupported_uploads() {
        let root = std::env::temp_dir().to_string_lossy().to_string();

        let empty = save_image(&root, 1, ImageKind::Profile, Some("a.jpg"), Bytes::new()).await;
        assert!(matches!(empty, Err(ApiError::BadRequest(_))));

        let exe = save_image(
            &root,
            1,
            ImageKind::Profile,
            Some("a.exe"),
            Bytes::from_static(b"MZ"),
        )
        .await;
        assert!(matches!(exe, Err(ApiError::BadRequest(_))));
    }
}
