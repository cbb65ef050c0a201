//! The seam between [`Client`](crate::client::Client) and the storage provider.
//!
//! The client only ever talks to a bucket through [`ObjectBackend`]. Google Cloud Storage is
//! the production implementation, [`MemoryBackend`] keeps everything in process.
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};

use crate::options::{DeleteOptions, DownloadOptions, StorageObject};

mod gcs;
mod memory;

pub use memory::MemoryBackend;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Chunks of object content.
pub type ByteStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// Content handed to [`ObjectBackend::upload`].
pub enum Payload {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Payload {
    pub fn into_stream(self) -> ByteStream {
        match self {
            Payload::Bytes(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Payload::Stream(stream) => stream,
        }
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Bytes(bytes) => write!(f, "Payload::Bytes({} bytes)", bytes.len()),
            Payload::Stream(_) => write!(f, "Payload::Stream"),
        }
    }
}

impl From<Payload> for reqwest::Body {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Bytes(bytes) => reqwest::Body::from(bytes),
            Payload::Stream(stream) => reqwest::Body::wrap_stream(stream),
        }
    }
}

/// One page of a listing request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListPageRequest {
    pub prefix: Option<String>,
    pub match_glob: Option<String>,
    pub start_offset: Option<String>,
    pub end_offset: Option<String>,
    /// Preferred number of objects in the page. Backends may return fewer.
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<StorageObject>,
    /// Present when more objects follow.
    pub next_page_token: Option<String>,
}

/// Object operations against a named bucket.
///
/// Failures are returned as boxed errors and normalized by the caller. Implementations
/// report a missing object with an error that carries status `404`, preferably an
/// [`ErrorResponse`](crate::http::error::ErrorResponse).
#[async_trait]
pub trait ObjectBackend: Send + Sync + Debug {
    /// Copies `source` to `destination` within the bucket, overwriting the destination.
    async fn copy(&self, bucket: &str, source: &str, destination: &str) -> Result<(), BoxError>;

    /// Deletes the object, honoring the generation preconditions in `options`.
    async fn delete(&self, bucket: &str, object: &str, options: &DeleteOptions) -> Result<(), BoxError>;

    /// Opens the object for reading. Must fail before returning when the object is missing.
    async fn download(&self, bucket: &str, object: &str, options: &DownloadOptions) -> Result<ByteStream, BoxError>;

    async fn exists(&self, bucket: &str, object: &str) -> Result<bool, BoxError>;

    async fn list(&self, bucket: &str, request: &ListPageRequest) -> Result<ListPage, BoxError>;

    /// Creates or overwrites the object. `content_encoding` is stored as object metadata.
    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        payload: Payload,
        content_encoding: Option<&str>,
    ) -> Result<(), BoxError>;
}
