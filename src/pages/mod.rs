//! Public, server-rendered pages.

pub mod view;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;

use crate::app::AppState;
use crate::error::AppError;

/// Axum handler for `GET /`: the hero and the most recent published post.
pub async fn home_handler(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let posts = state.post_repo.list_published(Some(1)).await?;
    let cards = state.resolver().cards(&posts).await?;

    let html = state.pages.render("home.html", &json!({ "posts": cards }))?;
    Ok(Html(html))
}

/// Axum handler for `GET /blog`: every published post, newest first.
pub async fn blog_list_handler(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let posts = state.post_repo.list_published(None).await?;
    let cards = state.resolver().cards(&posts).await?;

    let html = state
        .pages
        .render("blog_list.html", &json!({ "posts": cards }))?;
    Ok(Html(html))
}

/// Axum handler for `GET /blog/{slug}`.
///
/// Drafts and unknown slugs get the 404 page.
pub async fn blog_post_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let Some(post) = state.post_repo.find_published_by_slug(&slug).await? else {
        return not_found_page(&state);
    };

    let page = state.resolver().page(&post).await?;
    let html = state.pages.render("blog_post.html", &json!({ "post": page }))?;
    Ok(Html(html).into_response())
}

/// Router fallback: the 404 page.
pub async fn not_found_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    not_found_page(&state)
}

fn not_found_page(state: &AppState) -> Result<Response, AppError> {
    let html = state.pages.render("not_found.html", &json!({}))?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}
