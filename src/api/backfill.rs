use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::app::AppState;
use crate::auth::ServiceAuth;
use crate::db::models::BackfillResponse;
use crate::media::backfill::copy_remote_urls;

/// Axum handler for `GET /fix-media`.
///
/// Copies each record's `cloudinaryUrl` into `url`. Any failure answers 500
/// with the error text; records already rewritten stay rewritten.
pub async fn fix_media_handler(_auth: ServiceAuth, State(state): State<AppState>) -> Response {
    match copy_remote_urls(state.media_repo.as_ref()).await {
        Ok(report) => Json(BackfillResponse::from(report)).into_response(),
        Err(e) => {
            tracing::error!("Media URL backfill failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
