use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_compression::tokio::bufread::GzipDecoder;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use glob::{MatchOptions, Pattern};
use tokio::io::AsyncReadExt;

use crate::backend::{BoxError, ByteStream, ListPage, ListPageRequest, ObjectBackend, Payload};
use crate::http::error::ErrorResponse;
use crate::options::{DeleteOptions, DownloadOptions, StorageObject};

const DEFAULT_PAGE_SIZE: u32 = 1000;
const GZIP: &str = "gzip";

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    content_encoding: Option<String>,
    generation: i64,
    metageneration: i64,
}

/// An in-process bucket store that mimics the behavior of the storage service.
///
/// Objects are listed in lexicographic order, writes bump the generation, missing objects
/// fail with `404`, failed preconditions with `412`, and gzip-encoded objects are decompressed
/// on download unless raw bytes are requested.
#[derive(Debug)]
pub struct MemoryBackend {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    next_generation: AtomicI64,
    page_size: u32,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            buckets: RwLock::new(BTreeMap::new()),
            next_generation: AtomicI64::new(1),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn not_found(bucket: &str, object: &str) -> BoxError {
    Box::new(ErrorResponse::new(404, format!("No such object: {bucket}/{object}")))
}

fn precondition_failed() -> BoxError {
    Box::new(ErrorResponse::new(
        412,
        "At least one of the pre-conditions you specified did not hold.",
    ))
}

fn preconditions_hold(object: &StoredObject, options: &DeleteOptions) -> bool {
    options.if_generation_match.is_none_or(|g| g == object.generation)
        && options.if_generation_not_match.is_none_or(|g| g != object.generation)
        && options.if_metageneration_match.is_none_or(|m| m == object.metageneration)
        && options.if_metageneration_not_match.is_none_or(|m| m != object.metageneration)
}

async fn gunzip(data: &[u8]) -> Result<Bytes, BoxError> {
    let mut decoder = GzipDecoder::new(data);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).await?;
    Ok(decoded.into())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of objects returned per listing page.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Generation of the live object, `None` when it does not exist.
    pub fn generation(&self, bucket: &str, object: &str) -> Option<i64> {
        self.get(bucket, object).map(|o| o.generation)
    }

    fn get(&self, bucket: &str, object: &str) -> Option<StoredObject> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets.get(bucket).and_then(|objects| objects.get(object)).cloned()
    }

    fn put(&self, bucket: &str, object: &str, data: Bytes, content_encoding: Option<String>) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        buckets.entry(bucket.to_string()).or_default().insert(
            object.to_string(),
            StoredObject {
                data,
                content_encoding,
                generation,
                metageneration: 1,
            },
        );
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn copy(&self, bucket: &str, source: &str, destination: &str) -> Result<(), BoxError> {
        let stored = self.get(bucket, source).ok_or_else(|| not_found(bucket, source))?;
        self.put(bucket, destination, stored.data, stored.content_encoding);
        Ok(())
    }

    async fn delete(&self, bucket: &str, object: &str, options: &DeleteOptions) -> Result<(), BoxError> {
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        let objects = buckets.get_mut(bucket).ok_or_else(|| not_found(bucket, object))?;
        let stored = objects.get(object).ok_or_else(|| not_found(bucket, object))?;
        if !preconditions_hold(stored, options) {
            return Err(precondition_failed());
        }
        objects.remove(object);
        Ok(())
    }

    async fn download(&self, bucket: &str, object: &str, options: &DownloadOptions) -> Result<ByteStream, BoxError> {
        let stored = self.get(bucket, object).ok_or_else(|| not_found(bucket, object))?;
        let data = match stored.content_encoding.as_deref() {
            Some(GZIP) if options.decompress => gunzip(&stored.data).await?,
            _ => stored.data,
        };
        Ok(stream::once(async move { Ok(data) }).boxed())
    }

    async fn exists(&self, bucket: &str, object: &str) -> Result<bool, BoxError> {
        Ok(self.get(bucket, object).is_some())
    }

    async fn list(&self, bucket: &str, request: &ListPageRequest) -> Result<ListPage, BoxError> {
        let pattern = match &request.match_glob {
            Some(glob) => Some(Pattern::new(glob).map_err(|e| -> BoxError {
                Box::new(ErrorResponse::new(400, format!("Invalid glob: {e}")))
            })?),
            None => None,
        };
        let page_size = request.page_size.unwrap_or(self.page_size).clamp(1, self.page_size) as usize;

        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        let mut names = buckets
            .get(bucket)
            .into_iter()
            .flat_map(|objects| objects.keys())
            .filter(|name| request.prefix.as_ref().is_none_or(|p| name.starts_with(p.as_str())))
            .filter(|name| request.start_offset.as_ref().is_none_or(|s| name.as_str() >= s.as_str()))
            .filter(|name| request.end_offset.as_ref().is_none_or(|e| name.as_str() < e.as_str()))
            .filter(|name| request.page_token.as_ref().is_none_or(|t| name.as_str() > t.as_str()))
            .filter(|name| pattern.as_ref().is_none_or(|p| p.matches_with(name, GLOB_OPTIONS)));

        let objects: Vec<StorageObject> = names.by_ref().take(page_size).map(StorageObject::new).collect();
        let next_page_token = match names.next() {
            Some(_) => objects.last().map(|o| o.name.clone()),
            None => None,
        };
        Ok(ListPage {
            objects,
            next_page_token,
        })
    }

    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        payload: Payload,
        content_encoding: Option<&str>,
    ) -> Result<(), BoxError> {
        let chunks: Vec<Bytes> = payload.into_stream().try_collect().await?;
        self.put(bucket, object, chunks.concat().into(), content_encoding.map(str::to_string));
        Ok(())
    }
}
