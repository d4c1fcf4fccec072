use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Utc;

use crate::db::media_repository::MediaRepository;
use crate::db::models::Media;
use crate::error::AppError;
use crate::media::hooks::{MediaSync, Operation, UploadedFile};
use crate::storage::local::LocalMediaStore;

/// Input for a new media record.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub alt: String,
    pub file: Option<UploadedFile>,
}

/// Fields that may change on an existing media record.
#[derive(Debug, Clone, Default)]
pub struct MediaPatch {
    pub alt: Option<String>,
}

/// The `media` collection: persistence plus its lifecycle hooks.
pub struct MediaService {
    repo: Arc<dyn MediaRepository>,
    local: LocalMediaStore,
    sync: MediaSync,
}

impl MediaService {
    pub fn new(repo: Arc<dyn MediaRepository>, local: LocalMediaStore, sync: MediaSync) -> Self {
        Self { repo, local, sync }
    }

    pub async fn get(&self, id: &ObjectId) -> Result<Media, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media '{id}' not found")))
    }

    pub async fn list(&self) -> Result<Vec<Media>, AppError> {
        self.repo.list().await
    }

    /// Store the file locally, run the upload hook, then insert the record.
    ///
    /// If the insert fails, the delete hook is run on the in-flight record so
    /// that the local file and any uploaded asset do not outlive it.
    pub async fn create(&self, input: NewMedia) -> Result<Media, AppError> {
        let alt = validate_alt(&input.alt)?;
        let file = input
            .file
            .ok_or_else(|| AppError::BadRequest("A file is required to create media".into()))?;

        let filename = self.local.save(&file.filename, &file.data).await?;
        let now = Utc::now();
        let record = Media {
            id: None,
            alt,
            url: Some(self.local.public_url(&filename)),
            filename: Some(filename),
            mime_type: Some(file.content_type.clone()),
            filesize: Some(file.data.len() as u64),
            width: None,
            height: None,
            cloudinary_public_id: None,
            cloudinary_url: None,
            created_at: now,
            updated_at: now,
        };

        let record = self
            .sync
            .before_change(Operation::Create, Some(&file), record)
            .await;

        match self.repo.insert(record.clone()).await {
            Ok(stored) => {
                tracing::info!(
                    id = ?stored.id,
                    url = ?stored.url,
                    "Media record created"
                );
                Ok(stored)
            }
            Err(e) => {
                tracing::warn!("Media insert failed, cleaning up uploaded copies: {e}");
                self.sync.after_delete(&record).await;
                Err(e)
            }
        }
    }

    /// Apply a patch and an optional replacement file.
    ///
    /// The upload hook runs with [`Operation::Update`] and therefore never
    /// uploads: a replacement file only refreshes the local copy, and `url`
    /// follows it only while the record has no remote asset.
    pub async fn update(
        &self,
        id: &ObjectId,
        patch: MediaPatch,
        file: Option<UploadedFile>,
    ) -> Result<Media, AppError> {
        let mut record = self.get(id).await?;

        if let Some(alt) = patch.alt.as_deref() {
            record.alt = validate_alt(alt)?;
        }

        let previous_file = record.filename.clone();
        let mut saved_file = None;
        if let Some(file) = file.as_ref() {
            let filename = self.local.save(&file.filename, &file.data).await?;
            if record.cloudinary_public_id.is_none() {
                record.url = Some(self.local.public_url(&filename));
            }
            record.filename = Some(filename.clone());
            record.mime_type = Some(file.content_type.clone());
            record.filesize = Some(file.data.len() as u64);
            saved_file = Some(filename);
        }

        let mut record = self
            .sync
            .before_change(Operation::Update, file.as_ref(), record)
            .await;
        record.updated_at = Utc::now();

        if let Err(e) = self.repo.replace(&record).await {
            // The stored record still points at the previous file.
            if let Some(saved) = saved_file {
                let _ = self.local.remove(&saved).await;
            }
            return Err(e);
        }

        if saved_file.is_some() {
            if let Some(previous) = previous_file {
                let _ = self.local.remove(&previous).await;
            }
        }

        Ok(record)
    }

    /// Remove the record, then run the delete hook. Returns the removed record.
    pub async fn delete(&self, id: &ObjectId) -> Result<Media, AppError> {
        let removed = self
            .repo
            .delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media '{id}' not found")))?;

        self.sync.after_delete(&removed).await;
        tracing::info!(id = %id, "Media record deleted");

        Ok(removed)
    }
}

fn validate_alt(alt: &str) -> Result<String, AppError> {
    let alt = alt.trim();
    if alt.is_empty() {
        return Err(AppError::BadRequest("Alt text cannot be empty".into()));
    }
    Ok(alt.to_string())
}
