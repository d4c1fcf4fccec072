use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A media record stored in the `media` collection.
///
/// Field names are camelCase so that records written by earlier CMS
/// deployments deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Alternative text, required on every record.
    pub alt: String,
    /// Name of the file stored in the local media directory.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// URL used by the display layer: the CDN URL once uploaded,
    /// the local `/media/...` path otherwise.
    #[serde(default)]
    pub url: Option<String>,
    /// Remote asset identifier, set only by a successful upload.
    #[serde(default)]
    pub cloudinary_public_id: Option<String>,
    /// Remote secure URL, set only by a successful upload.
    #[serde(default)]
    pub cloudinary_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Publication state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

/// A blog post stored in the `posts` collection.
///
/// Relationships hold the referenced documents' ids; the page layer
/// expands them before rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: String,
    /// Rich-text document of the shape `{ "root": <node> }`.
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub author: Option<ObjectId>,
    #[serde(default)]
    pub featured_image: Option<ObjectId>,
    #[serde(default)]
    pub category: Option<ObjectId>,
    #[serde(default)]
    pub tags: Vec<ObjectId>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post author stored in the `authors` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A category or tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub slug: String,
}

/// The two taxonomies a post can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Category,
    Tag,
}

impl TermKind {
    /// Name of the MongoDB collection holding terms of this kind.
    pub fn collection_name(self) -> &'static str {
        match self {
            TermKind::Category => "categories",
            TermKind::Tag => "tags",
        }
    }
}

/// The request payload for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// The request payload for creating an author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The request payload for creating a category or tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// The response of the media URL backfill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillResponse {
    pub message: String,
    pub matched: u64,
}
