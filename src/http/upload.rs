use super::{ApiError, AppState};
use crate::backend::Backend;
use crate::configuration::Configuration;
use crate::types::UploadResponse;
use axum::extract::{Multipart, State};
use axum::{http::StatusCode, response::IntoResponse, Json};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::info;

pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;
/// Leaves room for the multipart framing around a maximum size image.
pub const BODY_LIMIT: usize = MAX_IMAGE_SIZE + 64 * 1024;

const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

lazy_static! {
    static ref UNSAFE_CHARACTERS: Regex = Regex::new(r"[^A-Za-z0-9._-]").unwrap();
}

/// Strips directories and anything outside `[A-Za-z0-9._-]`. Returns `None`
/// if nothing usable is left.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw).file_name()?.to_str()?;
    let name = UNSAFE_CHARACTERS.replace_all(name, "_");
    let name = name.trim_start_matches('.');
    (!name.is_empty()).then(|| name.to_string())
}

pub async fn upload_image<B: Backend, C: Configuration>(
    State(state): State<AppState<B, C>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !ALLOWED_TYPES.contains(&content_type.as_str()) {
            return Err(ApiError::BadRequest(
                "Please select a valid image file (JPEG, PNG, GIF, WebP).".into(),
            ));
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or_default())
            .ok_or_else(|| ApiError::BadRequest("The uploaded file has no usable name.".into()))?;

        let data = field.bytes().await.map_err(|err| {
            ApiError::BadRequest(format!("Failed to read upload: {}", err.body_text()))
        })?;
        if data.len() > MAX_IMAGE_SIZE {
            return Err(ApiError::BadRequest("File size must be less than 5MB.".into()));
        }

        let upload_dir = state.configuration.upload_dir();
        fs::create_dir_all(&upload_dir)
            .await
            .map_err(|err| ApiError::Internal(format!("Failed to create upload directory: {err}")))?;
        fs::write(upload_dir.join(&file_name), &data)
            .await
            .map_err(|err| ApiError::Internal(format!("Failed to store {file_name}: {err}")))?;

        info!(file_name, size = data.len(), "Image uploaded");
        return Ok((StatusCode::CREATED, Json(UploadResponse { file_name })));
    }

    Err(ApiError::BadRequest("Please select a valid file.".into()))
}
