pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod pages;
pub mod db {
    pub mod author_repository;
    pub mod media_repository;
    pub mod models;
    pub mod post_repository;
    pub mod term_repository;
}
pub mod storage {
    pub mod cloudinary;
    pub mod local;
}
pub mod media {
    pub mod backfill;
    pub mod hooks;
    pub mod service;
}
pub mod rendering {
    pub mod rich_text;
    pub mod templates;
}
pub mod api {
    pub mod backfill;
    pub mod collections;
    pub mod errors;
    pub mod media;
    pub mod params;
    pub mod posts;
}
