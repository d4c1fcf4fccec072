use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::AppError;

/// URL prefix under which the media directory is served.
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Give up on finding a free name after this many collisions.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Uploaded binaries kept on the local filesystem.
///
/// Every upload is written here first; the stored file is what `url` points
/// at whenever the CDN upload has not succeeded.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the media directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to create media directory '{}': {e}",
                self.root.display()
            ))
        })
    }

    /// Store `data` under a free name derived from `filename` and return that name.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<String, AppError> {
        self.ensure_root().await?;

        let base = sanitize_filename(filename);
        let (stem, ext) = split_extension(&base);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                base.clone()
            } else {
                format!("{stem}-{attempt}{ext}")
            };

            let path = self.root.join(&candidate);
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match file {
                Ok(file) => {
                    write_or_discard(file, &path, data).await?;
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(AppError::Storage(format!(
                        "Failed to create '{}': {e}",
                        path.display()
                    )))
                }
            }
        }

        Err(AppError::Storage(format!(
            "No free file name for '{base}' after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }

    /// Delete a stored file. A file that is already gone counts as deleted.
    pub async fn remove(&self, filename: &str) -> std::io::Result<()> {
        let Some(name) = Path::new(filename).file_name() else {
            return Ok(());
        };

        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// The locally served URL of a stored file.
    pub fn public_url(&self, filename: &str) -> String {
        format!("{MEDIA_URL_PREFIX}/{filename}")
    }
}

/// Write `data` through `writer`; on failure delete the partially written `path`.
async fn write_or_discard<W: AsyncWrite + Unpin>(
    mut writer: W,
    path: &Path,
    data: &[u8],
) -> Result<(), AppError> {
    let written: std::io::Result<()> = async {
        writer.write_all(data).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(writer);
        let _ = tokio::fs::remove_file(path).await;
        return Err(AppError::Storage(format!(
            "Failed to write '{}': {e}",
            path.display()
        )));
    }

    Ok(())
}

/// Reduce an uploaded file name to a safe single path component.
fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();

    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload.bin".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Split `name.ext` into (`name`, `.ext`); names without an extension get an empty one.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}
