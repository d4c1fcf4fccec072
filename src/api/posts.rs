use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{SubsecRound, Utc};

use crate::api::params::{parse_object_id, parse_optional_id};
use crate::app::AppState;
use crate::auth::ServiceAuth;
use crate::db::models::{Post, PostInput, PostStatus};
use crate::error::AppError;
use crate::rendering::rich_text::{flatten_with_limits, STORAGE_LIMITS};

/// Validate a create request and turn it into a storable post.
///
/// Rich-text content is flattened once here so that documents exceeding the
/// traversal limits are rejected before they are stored.
pub fn build_post(input: PostInput) -> Result<Post, AppError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title cannot be empty".into()));
    }

    let slug = input.slug.trim().to_string();
    if slug.is_empty() {
        return Err(AppError::BadRequest("Slug cannot be empty".into()));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::BadRequest(format!(
            "Invalid slug '{slug}'. Use letters, digits, '-' and '_' only"
        )));
    }

    if let Some(content) = input.content.as_ref() {
        flatten_with_limits(content.get("root"), STORAGE_LIMITS)
            .map_err(|e| AppError::BadRequest(format!("Invalid content: {e}")))?;
    }

    let tags = input
        .tags
        .iter()
        .map(|id| parse_object_id(id))
        .collect::<Result<Vec<_>, _>>()?;

    // Whole seconds keep the stored strings fixed-width and sortable.
    let published_at = match (input.status, input.published_at) {
        (PostStatus::Published, None) => Some(Utc::now()),
        (_, published_at) => published_at,
    }
    .map(|date| date.trunc_subsecs(0));

    let now = Utc::now();
    Ok(Post {
        id: None,
        title,
        slug,
        content: input.content,
        excerpt: input.excerpt,
        author: parse_optional_id(input.author.as_deref())?,
        featured_image: parse_optional_id(input.featured_image.as_deref())?,
        category: parse_optional_id(input.category.as_deref())?,
        tags,
        status: input.status,
        published_at,
        created_at: now,
        updated_at: now,
    })
}

/// Axum handler for `POST /api/posts`.
pub async fn create_post_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Json(input): Json<PostInput>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = state.post_repo.insert(build_post(input)?).await?;
    tracing::info!(slug = %post.slug, status = ?post.status, "Post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Axum handler for `GET /api/posts`: published posts, newest first.
pub async fn list_posts_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.post_repo.list_published(None).await?))
}

/// Axum handler for `GET /api/posts/{id}`, drafts included.
pub async fn get_post_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let id = parse_object_id(&id)?;
    let post = state
        .post_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post '{id}' not found")))?;

    Ok(Json(post))
}

/// Axum handler for `DELETE /api/posts/{id}`. Returns the deleted post.
pub async fn delete_post_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    let id = parse_object_id(&id)?;
    let post = state
        .post_repo
        .delete(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post '{id}' not found")))?;

    Ok(Json(post))
}
