use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::models::Post;
use crate::error::AppError;

/// Repository trait for blog posts.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post and return it with its assigned id.
    async fn insert(&self, post: Post) -> Result<Post, AppError>;

    /// Find a post by id, regardless of status.
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Post>, AppError>;

    /// Published posts, most recently published first.
    async fn list_published(&self, limit: Option<i64>) -> Result<Vec<Post>, AppError>;

    /// The published post with the given slug.
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError>;

    /// Remove a post and return what was removed.
    async fn delete(&self, id: &ObjectId) -> Result<Option<Post>, AppError>;
}

/// MongoDB implementation of the PostRepository.
pub struct MongoPostRepository {
    collection: mongodb::Collection<Post>,
}

impl MongoPostRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("posts"),
        }
    }
}

#[async_trait]
impl PostRepository for MongoPostRepository {
    async fn insert(&self, mut post: Post) -> Result<Post, AppError> {
        let result = self
            .collection
            .insert_one(&post)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        post.id = result.inserted_id.as_object_id();
        Ok(post)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Post>, AppError> {
        use bson::doc;

        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list_published(&self, limit: Option<i64>) -> Result<Vec<Post>, AppError> {
        use bson::doc;
        use futures::TryStreamExt;
        use mongodb::options::FindOptions;

        // publishedAt is an RFC 3339 UTC string truncated to whole seconds on write,
        // so every value has the same shape and sorts chronologically.
        let options = FindOptions::builder()
            .sort(doc! { "publishedAt": -1, "_id": -1 })
            .limit(limit)
            .build();

        let mut cursor = self
            .collection
            .find(doc! { "status": "published" })
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut posts = Vec::new();
        while let Some(post) = cursor
            .try_next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            posts.push(post);
        }

        Ok(posts)
    }

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError> {
        use bson::doc;

        self.collection
            .find_one(doc! { "slug": slug, "status": "published" })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete(&self, id: &ObjectId) -> Result<Option<Post>, AppError> {
        use bson::doc;

        self.collection
            .find_one_and_delete(doc! { "_id": id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
