use std::io;
use std::sync::Arc;

use async_compression::tokio::bufread::GzipEncoder;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use tokio_util::io::{ReaderStream, StreamReader};

use crate::backend::{BoxError, ListPageRequest, ObjectBackend, Payload};
use crate::error::{RequestError, Result};
use crate::options::{DeleteOptions, DownloadOptions, ListOptions, StorageObject, UploadOptions};

const GZIP: &str = "gzip";

/// A resolved bucket. Every call goes to the backend and comes back normalized.
#[derive(Clone, Debug)]
pub(crate) struct Bucket {
    name: String,
    backend: Arc<dyn ObjectBackend>,
}

impl Bucket {
    pub fn new(name: impl Into<String>, backend: Arc<dyn ObjectBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn copy(&self, source: &str, destination: &str) -> Result<()> {
        self.backend
            .copy(&self.name, source, destination)
            .await
            .map_err(RequestError::from_provider)
    }

    pub async fn delete(&self, object: &str, options: &DeleteOptions) -> Result<()> {
        match self.backend.delete(&self.name, object, options).await {
            Ok(()) => Ok(()),
            Err(e) => match RequestError::from_provider(e) {
                e if e.is_not_found() && options.ignore_not_found => {
                    tracing::trace!("ignoring missing object {}/{}", self.name, object);
                    Ok(())
                }
                e => Err(e),
            },
        }
    }

    pub async fn download(
        &self,
        object: &str,
        options: &DownloadOptions,
    ) -> Result<BoxStream<'static, Result<Bytes>>> {
        let stream = self
            .backend
            .download(&self.name, object, options)
            .await
            .map_err(RequestError::from_provider)?;
        Ok(stream.map_err(RequestError::from_provider).boxed())
    }

    pub async fn exists(&self, object: &str) -> Result<bool> {
        self.backend
            .exists(&self.name, object)
            .await
            .map_err(RequestError::from_provider)
    }

    /// Follows page tokens until the listing is exhausted or `max_results` objects are collected.
    pub async fn list(&self, options: &ListOptions) -> Result<Vec<StorageObject>> {
        let mut request = ListPageRequest {
            prefix: options.prefix.clone(),
            match_glob: options.match_glob.clone(),
            start_offset: options.start_offset.clone(),
            end_offset: options.end_offset.clone(),
            ..Default::default()
        };
        let mut objects = vec![];
        loop {
            if let Some(max) = options.max_results {
                let remaining = (max as usize).saturating_sub(objects.len());
                if remaining == 0 {
                    break;
                }
                request.page_size = Some(remaining as u32);
            }
            let page = self
                .backend
                .list(&self.name, &request)
                .await
                .map_err(RequestError::from_provider)?;
            objects.extend(page.objects);
            match page.next_page_token {
                Some(token) => request.page_token = Some(token),
                None => break,
            }
        }
        if let Some(max) = options.max_results {
            objects.truncate(max as usize);
        }
        Ok(objects)
    }

    pub async fn upload(&self, object: &str, payload: Payload, options: &UploadOptions) -> Result<()> {
        let (payload, content_encoding) = if options.compress {
            (gzip(payload), Some(GZIP))
        } else {
            (payload, None)
        };
        self.backend
            .upload(&self.name, object, payload, content_encoding)
            .await
            .map_err(RequestError::from_provider)
    }
}

fn gzip(payload: Payload) -> Payload {
    let reader = StreamReader::new(payload.into_stream().map_err(io::Error::other));
    let encoded = ReaderStream::new(GzipEncoder::new(reader)).map_err(BoxError::from);
    Payload::Stream(encoded.boxed())
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use bytes::Bytes;
    use futures_util::TryStreamExt;

    use crate::backend::{MemoryBackend, Payload};
    use crate::bucket::Bucket;
    use crate::options::{DeleteOptions, DownloadOptions, ListOptions, StorageObject, UploadOptions};

    fn bucket(backend: MemoryBackend) -> Bucket {
        Bucket::new("bucket", Arc::new(backend))
    }

    async fn download(bucket: &Bucket, object: &str, options: &DownloadOptions) -> Vec<u8> {
        let chunks: Vec<Bytes> = bucket.download(object, options).await.unwrap().try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_delete_ignore_not_found() {
        let bucket = bucket(MemoryBackend::new());
        let err = bucket.delete("missing", &DeleteOptions::default()).await.unwrap_err();
        assert!(err.is_not_found());
        bucket
            .delete("missing", &DeleteOptions::default().ignore_not_found())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_ignore_not_found_keeps_other_errors() {
        let bucket = bucket(MemoryBackend::new());
        let payload = Payload::Bytes(Bytes::from_static(b"data"));
        bucket.upload("a.txt", payload, &UploadOptions::default()).await.unwrap();
        let options = DeleteOptions::default().ignore_not_found().with_if_generation_match(-1);
        let err = bucket.delete("a.txt", &options).await.unwrap_err();
        assert_eq!(err.status_code, Some(412));
    }

    #[tokio::test]
    async fn test_list_max_results_across_pages() {
        let bucket = bucket(MemoryBackend::new().with_page_size(2));
        for name in ["a", "b", "c", "d", "e"] {
            let payload = Payload::Bytes(Bytes::from_static(b"data"));
            bucket.upload(name, payload, &UploadOptions::default()).await.unwrap();
        }

        let all = bucket.list(&ListOptions::default()).await.unwrap();
        assert_eq!(all.len(), 5);

        let limited = bucket.list(&ListOptions::default().with_max_results(3)).await.unwrap();
        assert_eq!(limited, vec![StorageObject::new("a"), StorageObject::new("b"), StorageObject::new("c")]);

        let none = bucket.list(&ListOptions::default().with_max_results(0)).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_upload_compressed() {
        let bucket = bucket(MemoryBackend::new());
        let content = "Hello World! ".repeat(64);
        let payload = Payload::Bytes(Bytes::from(content.clone()));
        bucket.upload("a.txt", payload, &UploadOptions::compressed()).await.unwrap();

        let raw = download(&bucket, "a.txt", &DownloadOptions::raw()).await;
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert!(raw.len() < content.len());

        let decoded = download(&bucket, "a.txt", &DownloadOptions::default()).await;
        assert_eq!(decoded, content.as_bytes());
    }
}
