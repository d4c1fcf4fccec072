use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::AppError;

/// Parameters that Cloudinary leaves out of the request signature.
const UNSIGNED_PARAMS: &[&str] = &[
    "file",
    "api_key",
    "resource_type",
    "cloud_name",
    "signature_algorithm",
];

/// Options for a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Destination folder on the CDN.
    pub folder: String,
    /// `auto` lets Cloudinary detect image/video/raw.
    pub resource_type: String,
    /// Explicit object key within the folder.
    pub public_id: String,
    pub overwrite: bool,
    /// Invalidate CDN caches for the key on success.
    pub invalidate: bool,
}

impl UploadOptions {
    /// Options for a new, never-overwriting upload with CDN invalidation.
    pub fn new(folder: impl Into<String>, public_id: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            resource_type: "auto".to_string(),
            public_id: public_id.into(),
            overwrite: false,
            invalidate: true,
        }
    }
}

/// What the asset store returns for a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedAsset {
    pub secure_url: String,
    pub public_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Trait for the remote asset store (CDN).
///
/// Abstracted as a trait so hooks can be tested without network access.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload a binary under the given options.
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, AppError>;

    /// Delete a remote asset by its public id.
    async fn destroy(&self, public_id: &str) -> Result<(), AppError>;
}

/// Derive the object key for an uploaded file.
///
/// The extension is dropped, every character outside `[A-Za-z0-9_-]` becomes
/// an underscore, the result is lower-cased and `_<timestamp_millis>` is
/// appended. The timestamp only makes collisions unlikely; uploads also ask
/// the store not to overwrite.
///
/// Characters are replaced one Unicode scalar value at a time, so an emoji
/// becomes a single underscore.
pub fn derive_public_id(filename: &str, timestamp_millis: i64) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !ext.contains('/') => stem,
        _ => filename,
    };

    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    format!("{sanitized}_{timestamp_millis}")
}

/// The `k=v&k=v` string Cloudinary signs: signed parameters sorted by name,
/// empty values skipped.
pub fn string_to_sign(params: &[(&str, String)]) -> String {
    let mut signed: Vec<&(&str, String)> = params
        .iter()
        .filter(|(key, value)| !UNSIGNED_PARAMS.contains(key) && !value.is_empty())
        .collect();
    signed.sort_by(|a, b| a.0.cmp(b.0));

    signed
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Digest used for request signatures.
///
/// Cloudinary accounts accept SHA-1 unless configured for SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

fn hex_digest<D: Digest>(payload: &str, api_secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Request signature, lower-case hex.
pub fn sign(params: &[(&str, String)], api_secret: &str, algorithm: SignatureAlgorithm) -> String {
    let payload = string_to_sign(params);
    match algorithm {
        SignatureAlgorithm::Sha1 => hex_digest::<Sha1>(&payload, api_secret),
        SignatureAlgorithm::Sha256 => hex_digest::<Sha256>(&payload, api_secret),
    }
}

/// Credentials and endpoint of a Cloudinary account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Root of the REST API, e.g. `https://api.cloudinary.com`.
    pub api_base: String,
    pub signature_algorithm: SignatureAlgorithm,
}

impl CloudinaryConfig {
    /// Whether all three credentials are present.
    pub fn is_complete(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary implementation of AssetStore over its REST upload API.
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
    api_base: Url,
}

impl CloudinaryClient {
    /// Create a client with explicit credentials.
    pub fn new(config: CloudinaryConfig) -> Result<Self, AppError> {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Create with an explicit HTTP client (useful for testing / DI).
    pub fn with_http_client(
        config: CloudinaryConfig,
        http: reqwest::Client,
    ) -> Result<Self, AppError> {
        let api_base = Url::parse(&config.api_base).map_err(|e| {
            AppError::Internal(format!("Invalid Cloudinary API base '{}': {e}", config.api_base))
        })?;

        Ok(Self {
            http,
            config,
            api_base,
        })
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> Result<Url, AppError> {
        let path = format!(
            "v1_1/{}/{}/{}",
            self.config.cloud_name, resource_type, action
        );
        self.api_base
            .join(&path)
            .map_err(|e| AppError::Internal(format!("Invalid Cloudinary endpoint '{path}': {e}")))
    }

    /// Append the api key, signature and algorithm to a set of parameters.
    fn signed(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let algorithm = self.config.signature_algorithm;
        let signature = sign(&params, &self.config.api_secret, algorithm);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        if algorithm == SignatureAlgorithm::Sha256 {
            params.push(("signature_algorithm", "sha256".to_string()));
        }
        params
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
        action: &str,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(AppError::Storage(format!(
                "Cloudinary {action} failed ({status}): {message}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Storage(format!("Invalid Cloudinary {action} response: {e}")))
    }
}

#[async_trait]
impl AssetStore for CloudinaryClient {
    async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, AppError> {
        let url = self.endpoint(&options.resource_type, "upload")?;
        let timestamp = chrono::Utc::now().timestamp();

        let params = self.signed(vec![
            ("folder", options.folder.clone()),
            ("public_id", options.public_id.clone()),
            ("overwrite", options.overwrite.to_string()),
            ("invalidate", options.invalidate.to_string()),
            ("timestamp", timestamp.to_string()),
        ]);

        let mut form = reqwest::multipart::Form::new();
        for (key, value) in params {
            form = form.text(key, value);
        }
        form = form.part(
            "file",
            reqwest::multipart::Part::bytes(data).file_name(filename.to_string()),
        );

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Cloudinary upload request failed: {e}")))?;

        Self::read_json::<UploadedAsset>(response, "upload").await
    }

    async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
        let url = self.endpoint("image", "destroy")?;
        let timestamp = chrono::Utc::now().timestamp();

        let params = self.signed(vec![
            ("public_id", public_id.to_string()),
            ("invalidate", "true".to_string()),
            ("timestamp", timestamp.to_string()),
        ]);

        let response = self
            .http
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Cloudinary destroy request failed: {e}")))?;

        let body = Self::read_json::<DestroyResponse>(response, "destroy").await?;
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(AppError::Storage(format!(
                "Cloudinary destroy of '{public_id}' returned '{other}'"
            ))),
        }
    }
}
