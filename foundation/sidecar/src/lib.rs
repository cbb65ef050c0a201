//! # replit-sidecar
//!
//! Client for the local Replit sidecar. The sidecar knows which bucket belongs to the
//! current Repl and brokers the credentials used to talk to Google Cloud Storage.
//!
//! ```
//! use replit_sidecar::Sidecar;
//!
//! async fn run() {
//!     let bucket_id = Sidecar::default().default_bucket_id().await.unwrap();
//! }
//! ```
use std::time::Duration;

use reqwest::header::{HeaderValue, USER_AGENT};
use serde_json::Value;

pub mod credentials;

use crate::credentials::ExternalAccountCredentials;

pub const SIDECAR_ENDPOINT: &str = "http://0.0.0.0:1106";
pub const DEFAULT_BUCKET_PATH: &str = "/object-storage/default-bucket";
pub const CREDENTIAL_PATH: &str = "/credential";
pub const TOKEN_PATH: &str = "/token";

const BUCKET_ID_FIELD: &str = "bucketId";
const SIDECAR_USER_AGENT: &str = "replit-object-storage-rust/1.0";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to fetch default bucket, errorcode: {0}, make sure you're running on Replit")]
    InvalidResponse(u16),
    #[error("Failed to fetch default bucket, make sure you're running on Replit")]
    MalformedResponse,
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
}

/// Handle to a sidecar listening on `endpoint`.
#[derive(Clone, Debug)]
pub struct Sidecar {
    endpoint: String,
    http: reqwest::Client,
}

impl Default for Sidecar {
    fn default() -> Self {
        Self::new(SIDECAR_ENDPOINT)
    }
}

impl Sidecar {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: default_http_client(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn default_bucket_url(&self) -> String {
        format!("{}{}", self.endpoint, DEFAULT_BUCKET_PATH)
    }

    pub fn credential_url(&self) -> String {
        format!("{}{}", self.endpoint, CREDENTIAL_PATH)
    }

    pub fn token_url(&self) -> String {
        format!("{}{}", self.endpoint, TOKEN_PATH)
    }

    /// The external account descriptor pointing at this sidecar's credential and token endpoints.
    pub fn credentials(&self) -> ExternalAccountCredentials {
        ExternalAccountCredentials::new(self.credential_url(), self.token_url())
    }

    /// Fetches the id of the bucket the sidecar assigns to this environment.
    ///
    /// A single request is made; failures are returned as-is without retrying.
    pub async fn default_bucket_id(&self) -> Result<String, Error> {
        let url = self.default_bucket_url();
        tracing::trace!("fetching default bucket from {url}");
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, HeaderValue::from_static(SIDECAR_USER_AGENT))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::InvalidResponse(status.as_u16()));
        }
        let body = response.bytes().await?;
        parse_bucket_id(&body)
    }
}

fn parse_bucket_id(body: &[u8]) -> Result<String, Error> {
    let value: Value = serde_json::from_slice(body).map_err(|_| Error::MalformedResponse)?;
    match value.get(BUCKET_ID_FIELD) {
        Some(Value::String(id)) => Ok(id.clone()),
        _ => Err(Error::MalformedResponse),
    }
}

fn default_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .unwrap_or_default()
}
