use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::params::parse_object_id;
use crate::app::AppState;
use crate::auth::ServiceAuth;
use crate::db::models::Media;
use crate::error::AppError;
use crate::media::hooks::UploadedFile;
use crate::media::service::{MediaPatch, NewMedia};

/// The fields of a media create/update form.
#[derive(Debug, Default)]
struct MediaForm {
    alt: Option<String>,
    file: Option<UploadedFile>,
}

/// Read the `alt` and `file` fields of a multipart form; other fields are ignored.
async fn read_media_form(mut multipart: Multipart) -> Result<MediaForm, AppError> {
    let mut form = MediaForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "alt" => {
                let alt = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read alt text: {e}")))?;
                form.alt = Some(alt);
            }
            "file" => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;

                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            _ => continue,
        }
    }

    Ok(form)
}

/// Axum handler for `POST /api/media`.
///
/// Accepts a multipart form with an `alt` text field and a `file` field.
pub async fn create_media_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Media>), AppError> {
    let form = read_media_form(multipart).await?;

    let media = state
        .media_service
        .create(NewMedia {
            alt: form.alt.unwrap_or_default(),
            file: form.file,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(media)))
}

/// Axum handler for `GET /api/media`.
pub async fn list_media_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Media>>, AppError> {
    Ok(Json(state.media_service.list().await?))
}

/// Axum handler for `GET /api/media/{id}`.
pub async fn get_media_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Media>, AppError> {
    let id = parse_object_id(&id)?;
    Ok(Json(state.media_service.get(&id).await?))
}

/// Axum handler for `PATCH /api/media/{id}`.
///
/// Both `alt` and `file` are optional. A replacement file is never uploaded
/// to the CDN.
pub async fn update_media_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Media>, AppError> {
    let id = parse_object_id(&id)?;
    let form = read_media_form(multipart).await?;

    let media = state
        .media_service
        .update(&id, MediaPatch { alt: form.alt }, form.file)
        .await?;

    Ok(Json(media))
}

/// Axum handler for `DELETE /api/media/{id}`. Returns the deleted record.
pub async fn delete_media_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Media>, AppError> {
    let id = parse_object_id(&id)?;
    Ok(Json(state.media_service.delete(&id).await?))
}
