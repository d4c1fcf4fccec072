use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::auth::ServiceAuth;
use crate::db::models::{Author, AuthorInput, Term, TermInput, TermKind};
use crate::error::AppError;

/// Lower-case, dash-separated slug of a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn build_term(input: TermInput) -> Result<Term, AppError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name cannot be empty".into()));
    }

    let slug = match input.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => slugify(&name),
    };

    Ok(Term {
        id: None,
        name,
        slug,
    })
}

async fn create_term(
    state: &AppState,
    kind: TermKind,
    input: TermInput,
) -> Result<(StatusCode, Json<Term>), AppError> {
    let term = state.term_repo.insert(kind, build_term(input)?).await?;
    Ok((StatusCode::CREATED, Json(term)))
}

/// Axum handler for `POST /api/authors`.
pub async fn create_author_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Json(input): Json<AuthorInput>,
) -> Result<(StatusCode, Json<Author>), AppError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name cannot be empty".into()));
    }

    let author = state
        .author_repo
        .insert(Author {
            id: None,
            name,
            email: input.email,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(author)))
}

/// Axum handler for `GET /api/authors`.
pub async fn list_authors_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Author>>, AppError> {
    Ok(Json(state.author_repo.list().await?))
}

/// Axum handler for `POST /api/categories`.
pub async fn create_category_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Json(input): Json<TermInput>,
) -> Result<(StatusCode, Json<Term>), AppError> {
    create_term(&state, TermKind::Category, input).await
}

/// Axum handler for `GET /api/categories`.
pub async fn list_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Term>>, AppError> {
    Ok(Json(state.term_repo.list(TermKind::Category).await?))
}

/// Axum handler for `POST /api/tags`.
pub async fn create_tag_handler(
    _auth: ServiceAuth,
    State(state): State<AppState>,
    Json(input): Json<TermInput>,
) -> Result<(StatusCode, Json<Term>), AppError> {
    create_term(&state, TermKind::Tag, input).await
}

/// Axum handler for `GET /api/tags`.
pub async fn list_tags_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Term>>, AppError> {
    Ok(Json(state.term_repo.list(TermKind::Tag).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Rust & WebAssembly"), "rust-webassembly");
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_build_term_slug() {
        let term = build_term(TermInput {
            name: "Async Rust".to_string(),
            slug: None,
        })
        .unwrap();
        assert_eq!(term.slug, "async-rust");

        let term = build_term(TermInput {
            name: "Async Rust".to_string(),
            slug: Some("async".to_string()),
        })
        .unwrap();
        assert_eq!(term.slug, "async");
    }

    #[test]
    fn test_build_term_requires_name() {
        let err = build_term(TermInput {
            name: " ".to_string(),
            slug: None,
        })
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
