use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::models::Author;
use crate::error::AppError;

/// Repository trait for post authors.
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn insert(&self, author: Author) -> Result<Author, AppError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Author>, AppError>;

    /// All authors sorted by name.
    async fn list(&self) -> Result<Vec<Author>, AppError>;
}

/// MongoDB implementation of the AuthorRepository.
pub struct MongoAuthorRepository {
    collection: mongodb::Collection<Author>,
}

impl MongoAuthorRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("authors"),
        }
    }
}

#[async_trait]
impl AuthorRepository for MongoAuthorRepository {
    async fn insert(&self, mut author: Author) -> Result<Author, AppError> {
        let result = self
            .collection
            .insert_one(&author)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        author.id = result.inserted_id.as_object_id();
        Ok(author)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Author>, AppError> {
        use bson::doc;

        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<Author>, AppError> {
        use bson::doc;
        use futures::TryStreamExt;
        use mongodb::options::FindOptions;

        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();

        let mut cursor = self
            .collection
            .find(doc! {})
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut authors = Vec::new();
        while let Some(author) = cursor
            .try_next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            authors.push(author);
        }

        Ok(authors)
    }
}
