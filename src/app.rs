use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::db::author_repository::{AuthorRepository, MongoAuthorRepository};
use crate::db::media_repository::{MediaRepository, MongoMediaRepository};
use crate::db::post_repository::{MongoPostRepository, PostRepository};
use crate::db::term_repository::{MongoTermRepository, TermRepository};
use crate::error::AppError;
use crate::media::hooks::MediaSync;
use crate::media::service::MediaService;
use crate::pages;
use crate::pages::view::PostResolver;
use crate::rendering::templates::PageRenderer;
use crate::storage::cloudinary::AssetStore;
use crate::storage::local::{LocalMediaStore, MEDIA_URL_PREFIX};

/// The content collections.
#[derive(Clone)]
pub struct Repositories {
    pub posts: Arc<dyn PostRepository>,
    pub media: Arc<dyn MediaRepository>,
    pub authors: Arc<dyn AuthorRepository>,
    pub terms: Arc<dyn TermRepository>,
}

impl Repositories {
    /// MongoDB-backed collections in the given database.
    pub fn mongo(db: &mongodb::Database) -> Self {
        Self {
            posts: Arc::new(MongoPostRepository::new(db)),
            media: Arc::new(MongoMediaRepository::new(db)),
            authors: Arc::new(MongoAuthorRepository::new(db)),
            terms: Arc::new(MongoTermRepository::new(db)),
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub post_repo: Arc<dyn PostRepository>,
    pub media_repo: Arc<dyn MediaRepository>,
    pub author_repo: Arc<dyn AuthorRepository>,
    pub term_repo: Arc<dyn TermRepository>,
    pub media_service: Arc<MediaService>,
    pub pages: Arc<PageRenderer>,
    pub service_token: String,
}

impl AppState {
    /// Wire the collections, the media hooks and the page renderer together.
    ///
    /// The asset store is injected so that tests and alternative CDNs can
    /// replace it.
    pub fn new(
        repos: Repositories,
        assets: Arc<dyn AssetStore>,
        local: LocalMediaStore,
        cloudinary_folder: &str,
        service_token: String,
    ) -> Result<Self, AppError> {
        let sync = MediaSync::new(assets, local.clone(), cloudinary_folder);
        let media_service = MediaService::new(repos.media.clone(), local, sync);

        Ok(Self {
            post_repo: repos.posts,
            media_repo: repos.media,
            author_repo: repos.authors,
            term_repo: repos.terms,
            media_service: Arc::new(media_service),
            pages: Arc::new(PageRenderer::new()?),
            service_token,
        })
    }

    pub fn resolver(&self) -> PostResolver<'_> {
        PostResolver {
            authors: self.author_repo.as_ref(),
            media: self.media_repo.as_ref(),
            terms: self.term_repo.as_ref(),
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState, local: &LocalMediaStore, max_upload_bytes: usize) -> Router {
    Router::new()
        // Pages
        .route("/", get(pages::home_handler))
        .route("/blog", get(pages::blog_list_handler))
        .route("/blog/{slug}", get(pages::blog_post_handler))
        // Media
        .route(
            "/api/media",
            get(api::media::list_media_handler).post(api::media::create_media_handler),
        )
        .route(
            "/api/media/{id}",
            get(api::media::get_media_handler)
                .patch(api::media::update_media_handler)
                .delete(api::media::delete_media_handler),
        )
        .route("/fix-media", get(api::backfill::fix_media_handler))
        // Posts and taxonomies
        .route(
            "/api/posts",
            get(api::posts::list_posts_handler).post(api::posts::create_post_handler),
        )
        .route(
            "/api/posts/{id}",
            get(api::posts::get_post_handler).delete(api::posts::delete_post_handler),
        )
        .route(
            "/api/authors",
            get(api::collections::list_authors_handler)
                .post(api::collections::create_author_handler),
        )
        .route(
            "/api/categories",
            get(api::collections::list_categories_handler)
                .post(api::collections::create_category_handler),
        )
        .route(
            "/api/tags",
            get(api::collections::list_tags_handler).post(api::collections::create_tag_handler),
        )
        // Local copies of uploads
        .nest_service(MEDIA_URL_PREFIX, ServeDir::new(local.root()))
        .fallback(pages::not_found_handler)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
