use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::http::Escape;

const OCTET_STREAM: &str = "application/octet-stream";

/// Request message for a simple media upload.
#[derive(Clone, PartialEq, Eq, serde::Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UploadObjectRequest {
    #[serde(skip_serializing)]
    pub bucket: String,
    /// Name of the object to create or overwrite.
    pub name: String,
    /// Stored as the object's Content-Encoding, `gzip` for compressed payloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
}

pub(crate) fn build(
    base_url: &str,
    client: &Client,
    req: &UploadObjectRequest,
    body: impl Into<reqwest::Body>,
) -> RequestBuilder {
    let url = format!("{}/b/{}/o?uploadType=media", base_url, req.bucket.escape());
    client
        .post(url)
        .query(&req)
        .header(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM))
        .body(body)
}
