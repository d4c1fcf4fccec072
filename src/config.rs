use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::error::AppError;
use crate::storage::cloudinary::{CloudinaryConfig, SignatureAlgorithm};

/// Runtime configuration.
///
/// Read from an optional `blogger.{toml,yaml,json}` file, then overridden by
/// environment variables (`MONGODB_URI`, `CLOUDINARY_API_KEY`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_database")]
    pub mongodb_database: String,
    /// Bearer token required by the write API.
    #[serde(default = "default_service_token")]
    pub service_token: String,
    /// Directory holding the local copies of uploads.
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub cloudinary_cloud_name: String,
    #[serde(default)]
    pub cloudinary_api_key: String,
    #[serde(default)]
    pub cloudinary_api_secret: String,
    #[serde(default = "default_cloudinary_folder")]
    pub cloudinary_folder: String,
    #[serde(default = "default_cloudinary_api_base")]
    pub cloudinary_api_base: String,
    /// `sha1` unless the Cloudinary account requires `sha256`.
    #[serde(default)]
    pub cloudinary_signature_algorithm: SignatureAlgorithm,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_mongodb_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongodb_database() -> String {
    "blogger".to_string()
}

fn default_service_token() -> String {
    "dev-token".to_string()
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("media")
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_cloudinary_folder() -> String {
    "payload-media".to_string()
}

fn default_cloudinary_api_base() -> String {
    "https://api.cloudinary.com".to_string()
}

impl AppConfig {
    /// Load from the named config file (extension optional, file optional)
    /// and the process environment.
    pub fn load(file: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(config::Environment::default())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to read configuration: {e}")))?;

        Self::from_config(config)
    }

    /// Deserialize from an already assembled configuration.
    pub fn from_config(config: config::Config) -> Result<Self, AppError> {
        config
            .try_deserialize()
            .map_err(|e| AppError::Internal(format!("Invalid configuration: {e}")))
    }

    /// The MongoDB URI without its credentials, for logging.
    pub fn mongodb_uri_redacted(&self) -> String {
        redact_credentials(&self.mongodb_uri)
    }

    /// Credentials for the CDN client.
    pub fn cloudinary(&self) -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: self.cloudinary_cloud_name.clone(),
            api_key: self.cloudinary_api_key.clone(),
            api_secret: self.cloudinary_api_secret.clone(),
            api_base: self.cloudinary_api_base.clone(),
            signature_algorithm: self.cloudinary_signature_algorithm,
        }
    }
}

fn redact_credentials(uri: &str) -> String {
    if let Ok(mut url) = Url::parse(uri) {
        if url.set_username("").is_ok() && url.set_password(None).is_ok() {
            return url.to_string();
        }
    }

    // Multi-host URIs are not valid URLs.
    match uri.split_once("://") {
        Some((scheme, rest)) => match rest.rsplit_once('@') {
            Some((_, hosts)) => format!("{scheme}://{hosts}"),
            None => uri.to_string(),
        },
        None => uri.to_string(),
    }
}
