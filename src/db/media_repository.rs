use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::models::Media;
use crate::error::AppError;

/// Repository trait for media records.
///
/// This trait allows mocking the database layer in tests.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Insert a new record and return it with its assigned id.
    async fn insert(&self, media: Media) -> Result<Media, AppError>;

    /// Find a record by id.
    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Media>, AppError>;

    /// List all records, newest first.
    async fn list(&self) -> Result<Vec<Media>, AppError>;

    /// Replace a stored record (matched by id).
    async fn replace(&self, media: &Media) -> Result<(), AppError>;

    /// Remove a record and return what was removed.
    async fn delete(&self, id: &ObjectId) -> Result<Option<Media>, AppError>;

    /// Records that carry a non-null `cloudinaryUrl`.
    async fn find_with_remote_url(&self) -> Result<Vec<Media>, AppError>;

    /// Overwrite the display `url` of one record. Returns whether it changed.
    async fn set_url(&self, id: &ObjectId, url: &str) -> Result<bool, AppError>;
}

/// MongoDB implementation of the MediaRepository.
pub struct MongoMediaRepository {
    collection: mongodb::Collection<Media>,
}

impl MongoMediaRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("media"),
        }
    }

    async fn collect(
        &self,
        filter: bson::Document,
        sort: bson::Document,
    ) -> Result<Vec<Media>, AppError> {
        use futures::TryStreamExt;
        use mongodb::options::FindOptions;

        let options = FindOptions::builder().sort(sort).build();

        let mut cursor = self
            .collection
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut records = Vec::new();
        while let Some(media) = cursor
            .try_next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            records.push(media);
        }

        Ok(records)
    }
}

#[async_trait]
impl MediaRepository for MongoMediaRepository {
    async fn insert(&self, mut media: Media) -> Result<Media, AppError> {
        let result = self
            .collection
            .insert_one(&media)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        media.id = result.inserted_id.as_object_id();
        Ok(media)
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Media>, AppError> {
        use bson::doc;

        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<Media>, AppError> {
        use bson::doc;

        self.collect(doc! {}, doc! { "createdAt": -1, "_id": -1 }).await
    }

    async fn replace(&self, media: &Media) -> Result<(), AppError> {
        use bson::doc;

        let id = media
            .id
            .ok_or_else(|| AppError::Internal("Cannot replace a media record without id".into()))?;

        self.collection
            .replace_one(doc! { "_id": id }, media)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> Result<Option<Media>, AppError> {
        use bson::doc;

        self.collection
            .find_one_and_delete(doc! { "_id": id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_with_remote_url(&self) -> Result<Vec<Media>, AppError> {
        use bson::doc;

        let filter = doc! {
            "cloudinaryUrl": { "$exists": true, "$ne": null }
        };

        self.collect(filter, doc! { "_id": 1 }).await
    }

    async fn set_url(&self, id: &ObjectId, url: &str) -> Result<bool, AppError> {
        use bson::doc;

        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "url": url, "updatedAt": chrono::Utc::now().to_rfc3339() } },
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.modified_count > 0)
    }
}
