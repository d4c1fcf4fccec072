//! Post view models with their relationships expanded.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::author_repository::AuthorRepository;
use crate::db::media_repository::MediaRepository;
use crate::db::models::{Post, TermKind};
use crate::db::term_repository::TermRepository;
use crate::error::AppError;
use crate::rendering::rich_text::display_text;

/// Author name shown when a post has none.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedImage {
    pub url: String,
    pub alt: String,
}

/// A post as shown in the home and blog list grids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub author_name: String,
    pub featured_image: Option<FeaturedImage>,
    pub published: Option<String>,
}

/// A post as shown on its own page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPage {
    pub title: String,
    pub author_name: String,
    pub published: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub featured_image: Option<FeaturedImage>,
    /// Flattened rich text, or the empty-content placeholder.
    pub body: String,
}

/// `M/D/YYYY`, the way the site prints dates.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%-m/%-d/%Y").to_string()
}

/// Expands post relationships (author, featured image, category, tags).
pub struct PostResolver<'a> {
    pub authors: &'a dyn AuthorRepository,
    pub media: &'a dyn MediaRepository,
    pub terms: &'a dyn TermRepository,
}

impl PostResolver<'_> {
    async fn author_name(&self, post: &Post) -> Result<String, AppError> {
        let name = match post.author.as_ref() {
            Some(id) => self.authors.find_by_id(id).await?.map(|a| a.name),
            None => None,
        };
        Ok(name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()))
    }

    /// The featured image, when it resolves to a media record with a URL.
    async fn featured_image(&self, post: &Post, alt_fallback: &str) -> Result<Option<FeaturedImage>, AppError> {
        let Some(id) = post.featured_image.as_ref() else {
            return Ok(None);
        };

        Ok(self.media.find_by_id(id).await?.and_then(|media| {
            let url = media.url.filter(|u| !u.is_empty())?;
            let alt = if media.alt.is_empty() {
                alt_fallback.to_string()
            } else {
                media.alt
            };
            Some(FeaturedImage { url, alt })
        }))
    }

    pub async fn card(&self, post: &Post) -> Result<PostCard, AppError> {
        Ok(PostCard {
            slug: post.slug.clone(),
            title: post.title.clone(),
            excerpt: post.excerpt.clone().filter(|e| !e.trim().is_empty()),
            author_name: self.author_name(post).await?,
            featured_image: self.featured_image(post, &post.title).await?,
            published: post.published_at.as_ref().map(format_date),
        })
    }

    pub async fn cards(&self, posts: &[Post]) -> Result<Vec<PostCard>, AppError> {
        let mut cards = Vec::with_capacity(posts.len());
        for post in posts {
            cards.push(self.card(post).await?);
        }
        Ok(cards)
    }

    pub async fn page(&self, post: &Post) -> Result<PostPage, AppError> {
        let category = match post.category {
            Some(id) => self
                .terms
                .find_by_ids(TermKind::Category, &[id])
                .await?
                .into_iter()
                .next()
                .map(|t| t.name),
            None => None,
        };

        let tags = self
            .terms
            .find_by_ids(TermKind::Tag, &post.tags)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect();

        Ok(PostPage {
            title: post.title.clone(),
            author_name: self.author_name(post).await?,
            published: post.published_at.as_ref().map(format_date),
            category,
            tags,
            featured_image: self.featured_image(post, "").await?,
            body: display_text(post.content.as_ref())?,
        })
    }
}
