//! Lifecycle hooks that mirror media binaries to the CDN.
//!
//! Both hooks are best-effort. A remote failure is logged and never reaches
//! the caller, so content writes go through during a CDN outage. What is left
//! behind in that case:
//!
//! - a failed upload keeps the record on its local `/media/...` URL; the
//!   upload is not retried later, since updates never upload,
//! - a failed destroy leaves an orphaned asset on the CDN.

use std::sync::Arc;

use crate::db::models::Media;
use crate::error::AppError;
use crate::storage::cloudinary::{derive_public_id, AssetStore, UploadOptions, UploadedAsset};
use crate::storage::local::LocalMediaStore;

/// The content-store operation a write hook runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
}

/// A binary attached to a create or update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Keeps media records in sync with their CDN counterparts.
pub struct MediaSync {
    assets: Arc<dyn AssetStore>,
    local: LocalMediaStore,
    folder: String,
}

impl MediaSync {
    pub fn new(assets: Arc<dyn AssetStore>, local: LocalMediaStore, folder: impl Into<String>) -> Self {
        Self {
            assets,
            local,
            folder: folder.into(),
        }
    }

    /// Pre-commit hook, run on the in-flight record before it is persisted.
    ///
    /// Uploads only on create, with a file attached, and when the record has
    /// no remote id yet (a retried create must not upload twice).
    pub async fn before_change(
        &self,
        operation: Operation,
        file: Option<&UploadedFile>,
        mut data: Media,
    ) -> Media {
        if operation != Operation::Create || data.cloudinary_public_id.is_some() {
            return data;
        }
        let Some(file) = file else {
            return data;
        };

        match self.upload(file).await {
            Ok(asset) => {
                tracing::info!(
                    public_id = %asset.public_id,
                    "Cloudinary upload successful: {}",
                    asset.secure_url
                );
                apply_upload(&mut data, asset);
            }
            Err(e) => {
                tracing::error!(filename = %file.filename, "Cloudinary upload failed: {e}");
            }
        }

        data
    }

    /// Post-delete hook, run after the record has been removed.
    ///
    /// Remote and local cleanup run concurrently and neither outcome affects
    /// the other.
    pub async fn after_delete(&self, doc: &Media) {
        let remote = async {
            let Some(public_id) = doc.cloudinary_public_id.as_deref() else {
                return;
            };
            match self.assets.destroy(public_id).await {
                Ok(()) => {
                    tracing::info!("Successfully deleted {public_id} from Cloudinary");
                }
                Err(e) => {
                    tracing::error!(public_id, "Failed to delete from Cloudinary: {e}");
                }
            }
        };

        let local = async {
            if let Some(filename) = doc.filename.as_deref() {
                // A missing or undeletable local copy is not an error here.
                let _ = self.local.remove(filename).await;
            }
        };

        tokio::join!(remote, local);
    }

    async fn upload(&self, file: &UploadedFile) -> Result<UploadedAsset, AppError> {
        let public_id = derive_public_id(&file.filename, chrono::Utc::now().timestamp_millis());
        let options = UploadOptions::new(self.folder.clone(), public_id);

        self.assets
            .upload(file.data.clone(), &file.filename, &options)
            .await
    }
}

/// Point the record at the uploaded asset.
fn apply_upload(data: &mut Media, asset: UploadedAsset) {
    data.url = Some(asset.secure_url.clone());
    data.cloudinary_url = Some(asset.secure_url);
    data.cloudinary_public_id = Some(asset.public_id);
    if asset.width.is_some() {
        data.width = asset.width;
    }
    if asset.height.is_some() {
        data.height = asset.height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::cloudinary::MockAssetStore;
    use chrono::Utc;

    fn local_record(filename: &str) -> Media {
        Media {
            id: None,
            alt: "A cat".to_string(),
            filename: Some(filename.to_string()),
            mime_type: Some("image/png".to_string()),
            filesize: Some(4),
            width: None,
            height: None,
            url: Some(format!("/media/{filename}")),
            cloudinary_public_id: None,
            cloudinary_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn png(filename: &str) -> UploadedFile {
        UploadedFile {
            filename: filename.to_string(),
            content_type: "image/png".to_string(),
            data: b"meow".to_vec(),
        }
    }

    fn uploaded(public_id: &str) -> UploadedAsset {
        UploadedAsset {
            secure_url: format!("https://res.cloudinary.com/demo/image/upload/{public_id}.png"),
            public_id: public_id.to_string(),
            width: Some(640),
            height: Some(480),
            format: Some("png".to_string()),
        }
    }

    fn sync_with(assets: MockAssetStore, local: LocalMediaStore) -> MediaSync {
        MediaSync::new(Arc::new(assets), local, "payload-media")
    }

    #[tokio::test]
    async fn test_create_uploads_once_and_updates_record() {
        let mut assets = MockAssetStore::new();
        assets
            .expect_upload()
            .withf(|data, filename, options| {
                data.as_slice() == b"meow"
                    && filename == "My Cat.png"
                    && options.folder == "payload-media"
                    && options.resource_type == "auto"
                    && options.public_id.starts_with("my_cat_")
                    && !options.overwrite
                    && options.invalidate
            })
            .times(1)
            .returning(|_, _, options| Ok(uploaded(&format!("payload-media/{}", options.public_id))));
        assets.expect_destroy().never();

        let sync = sync_with(assets, LocalMediaStore::new("unused"));
        let file = png("My Cat.png");

        let record = sync
            .before_change(Operation::Create, Some(&file), local_record("My_Cat.png"))
            .await;

        let remote_url = record.cloudinary_url.clone().unwrap();
        assert_eq!(record.url.as_deref(), Some(remote_url.as_str()));
        assert!(record
            .cloudinary_public_id
            .as_deref()
            .unwrap()
            .starts_with("payload-media/my_cat_"));
        assert_eq!(record.width, Some(640));
        assert_eq!(record.height, Some(480));
    }

    #[tokio::test]
    async fn test_update_never_uploads() {
        let mut assets = MockAssetStore::new();
        assets.expect_upload().never();

        let sync = sync_with(assets, LocalMediaStore::new("unused"));
        let file = png("cat.png");
        let before = local_record("cat.png");

        let after = sync
            .before_change(Operation::Update, Some(&file), before.clone())
            .await;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_create_without_file_does_nothing() {
        let mut assets = MockAssetStore::new();
        assets.expect_upload().never();

        let sync = sync_with(assets, LocalMediaStore::new("unused"));
        let before = local_record("cat.png");

        let after = sync.before_change(Operation::Create, None, before.clone()).await;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_existing_remote_id_skips_upload() {
        let mut assets = MockAssetStore::new();
        assets.expect_upload().never();

        let sync = sync_with(assets, LocalMediaStore::new("unused"));
        let mut before = local_record("cat.png");
        before.cloudinary_public_id = Some("payload-media/cat_1".to_string());

        let after = sync
            .before_change(Operation::Create, Some(&png("cat.png")), before.clone())
            .await;
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_local_fallback() {
        let mut assets = MockAssetStore::new();
        assets
            .expect_upload()
            .times(1)
            .returning(|_, _, _| Err(AppError::Storage("connection refused".into())));

        let sync = sync_with(assets, LocalMediaStore::new("unused"));
        let before = local_record("cat.png");

        let after = sync
            .before_change(Operation::Create, Some(&png("cat.png")), before.clone())
            .await;

        assert_eq!(after, before);
        assert_eq!(after.cloudinary_url, None);
        assert_eq!(after.cloudinary_public_id, None);
        assert_eq!(after.url.as_deref(), Some("/media/cat.png"));
    }

    #[tokio::test]
    async fn test_upload_without_dimensions_keeps_existing() {
        let mut assets = MockAssetStore::new();
        assets.expect_upload().times(1).returning(|_, _, _| {
            Ok(UploadedAsset {
                secure_url: "https://res.cloudinary.com/demo/raw/upload/doc.pdf".to_string(),
                public_id: "payload-media/doc_1".to_string(),
                width: None,
                height: None,
                format: None,
            })
        });

        let sync = sync_with(assets, LocalMediaStore::new("unused"));
        let mut before = local_record("doc.pdf");
        before.width = Some(10);

        let after = sync
            .before_change(Operation::Create, Some(&png("doc.pdf")), before)
            .await;
        assert_eq!(after.width, Some(10));
        assert_eq!(after.height, None);
    }

    #[tokio::test]
    async fn test_delete_destroys_remote_and_local() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalMediaStore::new(dir.path());
        let filename = local.save("cat.png", b"meow").await.unwrap();

        let mut assets = MockAssetStore::new();
        assets
            .expect_destroy()
            .withf(|public_id| public_id == "payload-media/cat_1")
            .times(1)
            .returning(|_| Ok(()));

        let sync = sync_with(assets, local);
        let mut doc = local_record(&filename);
        doc.cloudinary_public_id = Some("payload-media/cat_1".to_string());

        sync.after_delete(&doc).await;
        assert!(!dir.path().join(&filename).exists());
    }

    #[tokio::test]
    async fn test_delete_without_remote_id_skips_remote() {
        let dir = tempfile::tempdir().unwrap();
        let mut assets = MockAssetStore::new();
        assets.expect_destroy().never();

        let sync = sync_with(assets, LocalMediaStore::new(dir.path()));
        sync.after_delete(&local_record("missing.png")).await;
    }

    #[tokio::test]
    async fn test_delete_failures_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalMediaStore::new(dir.path());
        let filename = local.save("cat.png", b"meow").await.unwrap();

        let mut assets = MockAssetStore::new();
        assets
            .expect_destroy()
            .times(1)
            .returning(|_| Err(AppError::Storage("503".into())));

        let sync = sync_with(assets, local);
        let mut doc = local_record(&filename);
        doc.cloudinary_public_id = Some("payload-media/cat_1".to_string());

        sync.after_delete(&doc).await;

        // Local cleanup is independent of the remote failure.
        assert!(!dir.path().join(&filename).exists());
    }
}
