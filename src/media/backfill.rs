use crate::db::media_repository::MediaRepository;
use crate::db::models::BackfillResponse;
use crate::error::AppError;

/// Outcome of a backfill run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackfillReport {
    /// Records carrying a `cloudinaryUrl`.
    pub matched: u64,
    /// Records whose `url` was rewritten.
    pub updated: u64,
}

impl From<BackfillReport> for BackfillResponse {
    fn from(report: BackfillReport) -> Self {
        BackfillResponse {
            message: format!("Updated {} media records", report.updated),
            matched: report.matched,
        }
    }
}

/// Copy `cloudinaryUrl` into `url` for every record that has one.
///
/// Records are handled one at a time; the first error aborts the run and
/// whatever was written before it stays written.
pub async fn copy_remote_urls(repo: &dyn MediaRepository) -> Result<BackfillReport, AppError> {
    let candidates = repo.find_with_remote_url().await?;
    let mut report = BackfillReport {
        matched: candidates.len() as u64,
        updated: 0,
    };

    for media in candidates {
        let (Some(id), Some(remote_url)) = (media.id, media.cloudinary_url.as_deref()) else {
            continue;
        };
        if media.url.as_deref() == Some(remote_url) {
            continue;
        }

        if repo.set_url(&id, remote_url).await? {
            report.updated += 1;
        }
    }

    tracing::info!(
        matched = report.matched,
        updated = report.updated,
        "Media URL backfill finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Media;
    use async_trait::async_trait;
    use bson::oid::ObjectId;
    use chrono::Utc;
    use std::sync::Mutex;

    struct MockRepo {
        records: Mutex<Vec<Media>>,
        fail_after: Option<usize>,
        writes: Mutex<usize>,
    }

    impl MockRepo {
        fn with(records: Vec<Media>) -> Self {
            Self {
                records: Mutex::new(records),
                fail_after: None,
                writes: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaRepository for MockRepo {
        async fn insert(&self, media: Media) -> Result<Media, AppError> {
            Ok(media)
        }

        async fn find_by_id(&self, _id: &ObjectId) -> Result<Option<Media>, AppError> {
            Ok(None)
        }

        async fn list(&self) -> Result<Vec<Media>, AppError> {
            Ok(self.records.lock().unwrap().clone())
        }

        async fn replace(&self, _media: &Media) -> Result<(), AppError> {
            Ok(())
        }

        async fn delete(&self, _id: &ObjectId) -> Result<Option<Media>, AppError> {
            Ok(None)
        }

        async fn find_with_remote_url(&self) -> Result<Vec<Media>, AppError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.cloudinary_url.is_some())
                .cloned()
                .collect())
        }

        async fn set_url(&self, id: &ObjectId, url: &str) -> Result<bool, AppError> {
            let mut writes = self.writes.lock().unwrap();
            if self.fail_after == Some(*writes) {
                return Err(AppError::Database("connection reset".into()));
            }
            *writes += 1;

            let mut records = self.records.lock().unwrap();
            let media = records.iter_mut().find(|m| m.id.as_ref() == Some(id));
            Ok(media
                .map(|m| {
                    m.url = Some(url.to_string());
                })
                .is_some())
        }
    }

    fn media(url: Option<&str>, remote: Option<&str>) -> Media {
        Media {
            id: Some(ObjectId::new()),
            alt: "alt".to_string(),
            filename: None,
            mime_type: None,
            filesize: None,
            width: None,
            height: None,
            url: url.map(String::from),
            cloudinary_public_id: None,
            cloudinary_url: remote.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_copies_remote_urls() {
        let repo = MockRepo::with(vec![
            media(Some("/media/a.png"), Some("https://cdn/a.png")),
            media(Some("https://cdn/b.png"), Some("https://cdn/b.png")),
            media(Some("/media/c.png"), None),
            media(None, Some("https://cdn/d.png")),
        ]);

        let report = copy_remote_urls(&repo).await.unwrap();
        assert_eq!(report, BackfillReport { matched: 3, updated: 2 });

        let records = repo.records.lock().unwrap();
        assert_eq!(records[0].url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(records[2].url.as_deref(), Some("/media/c.png"));
        assert_eq!(records[3].url.as_deref(), Some("https://cdn/d.png"));
    }

    #[tokio::test]
    async fn test_error_aborts_and_keeps_progress() {
        let mut repo = MockRepo::with(vec![
            media(None, Some("https://cdn/a.png")),
            media(None, Some("https://cdn/b.png")),
        ]);
        repo.fail_after = Some(1);

        let err = copy_remote_urls(&repo).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let records = repo.records.lock().unwrap();
        assert_eq!(records[0].url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(records[1].url, None);
    }

    #[test]
    fn test_response_message() {
        let response = BackfillResponse::from(BackfillReport { matched: 5, updated: 3 });
        assert_eq!(response.message, "Updated 3 media records");
        assert_eq!(response.matched, 5);
    }
}
