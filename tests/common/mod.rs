use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;

use blogger::app::{router, AppState, Repositories};
use blogger::error::AppError;
use blogger::storage::cloudinary::{AssetStore, UploadOptions, UploadedAsset};
use blogger::storage::local::LocalMediaStore;

pub const TOKEN: &str = "test-token";

/// In-process stand-in for the CDN.
///
/// Records every call so tests can assert which hooks ran.
#[derive(Default)]
pub struct FakeAssetStore {
    pub fail_uploads: bool,
    pub uploads: AtomicUsize,
    pub destroyed: Mutex<Vec<String>>,
}

impl FakeAssetStore {
    pub fn failing() -> Self {
        Self {
            fail_uploads: true,
            ..Default::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for FakeAssetStore {
    async fn upload(
        &self,
        _data: Vec<u8>,
        _filename: &str,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, AppError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads {
            return Err(AppError::Storage("CDN unavailable".into()));
        }

        let public_id = format!("{}/{}", options.folder, options.public_id);
        Ok(UploadedAsset {
            secure_url: format!("https://res.cloudinary.test/demo/image/upload/{public_id}.png"),
            public_id,
            width: Some(1),
            height: Some(1),
            format: Some("png".to_string()),
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

/// A MongoDB container, a temporary media directory and the full router.
///
/// The container is stopped and the directory removed when this is dropped.
pub struct TestEnv {
    _mongo: ContainerAsync<Mongo>,
    _media_dir: tempfile::TempDir,
    pub media_root: PathBuf,
    pub router: Router,
    pub repos: Repositories,
    pub assets: Arc<FakeAssetStore>,
}

impl TestEnv {
    /// Start with a CDN that accepts every upload.
    pub async fn start() -> Self {
        Self::with_assets(FakeAssetStore::default()).await
    }

    pub async fn with_assets(assets: FakeAssetStore) -> Self {
        let mongo_container = Mongo::default()
            .start()
            .await
            .expect("Failed to start MongoDB container");
        let mongo_port = mongo_container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");
        let mongo_uri = format!("mongodb://127.0.0.1:{}", mongo_port);
        let mongo_client = mongodb::Client::with_uri_str(&mongo_uri)
            .await
            .expect("Failed to connect to MongoDB");
        let repos = Repositories::mongo(&mongo_client.database("blogger_test"));

        let media_dir = tempfile::tempdir().expect("Failed to create media dir");
        let local = LocalMediaStore::new(media_dir.path());
        let assets = Arc::new(assets);

        let state = AppState::new(
            repos.clone(),
            assets.clone(),
            local.clone(),
            "payload-media",
            TOKEN.to_string(),
        )
        .expect("Failed to build AppState");
        let router = router(state, &local, 10 * 1024 * 1024);

        Self {
            media_root: media_dir.path().to_path_buf(),
            _mongo: mongo_container,
            _media_dir: media_dir,
            router,
            repos,
            assets,
        }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .expect_success_by_default()
            .build(self.router.clone())
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .build(self.router.clone())
    }

    /// Number of files currently in the media directory.
    pub fn local_file_count(&self) -> usize {
        std::fs::read_dir(&self.media_root)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// A minimal 1x1 PNG.
pub fn png_bytes() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, // bit depth, color type, CRC
        0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT chunk
        0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, // compressed data
        0x00, 0x02, 0x00, 0x01, 0xE2, 0x21, 0xBC, 0x33, // CRC
        0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND chunk
        0xAE, 0x42, 0x60, 0x82,
    ]
}

/// Helper: create a media record via the API.
pub async fn create_media(
    server: &axum_test::TestServer,
    alt: &str,
    filename: &str,
) -> axum_test::TestResponse {
    use axum_test::multipart::{MultipartForm, Part};

    let form = MultipartForm::new().add_text("alt", alt.to_string()).add_part(
        "file",
        Part::bytes(png_bytes())
            .file_name(filename.to_string())
            .mime_type("image/png"),
    );

    server
        .post("/api/media")
        .authorization_bearer(TOKEN)
        .multipart(form)
        .await
}

/// Helper: create a post via the API.
pub async fn create_post(
    server: &axum_test::TestServer,
    body: serde_json::Value,
) -> axum_test::TestResponse {
    server
        .post("/api/posts")
        .authorization_bearer(TOKEN)
        .json(&body)
        .await
}
