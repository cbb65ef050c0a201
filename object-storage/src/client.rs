use std::fmt::{Debug, Formatter};
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use futures_util::stream::{self, BoxStream, StreamExt, TryStream, TryStreamExt};
use reqwest_middleware::ClientWithMiddleware;
use replit_sidecar::Sidecar;
use token_source::{TokenSource, TokenSourceProvider};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::backend::{BoxError, ObjectBackend, Payload};
use crate::bucket::Bucket;
use crate::error::{RequestError, Result, StreamRequestError};
use crate::http::storage_client::StorageClient;
use crate::options::{DeleteOptions, DownloadOptions, ListOptions, StorageObject, UploadOptions};
use crate::resolver::BucketResolver;

pub const STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

const INIT_ERROR_PREFIX: &str = "Error during client initialization: ";

/// Object content delivered chunk by chunk. Every failure, including initialization
/// failures, arrives as an item.
pub type ObjectStream = BoxStream<'static, std::result::Result<Bytes, StreamRequestError>>;

pub struct ClientConfig {
    /// Bucket to use. Resolved through `resolver` when absent.
    pub bucket_id: Option<String>,
    pub sidecar_endpoint: String,
    pub storage_endpoint: String,
    pub http: Option<ClientWithMiddleware>,
    /// Overrides the sidecar credentials.
    pub token_source_provider: Option<Box<dyn TokenSourceProvider>>,
    pub anonymous: bool,
    /// Replaces Google Cloud Storage entirely.
    pub backend: Option<Arc<dyn ObjectBackend>>,
    /// Replaces the sidecar lookup of the default bucket.
    pub resolver: Option<Arc<dyn BucketResolver>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bucket_id: None,
            sidecar_endpoint: replit_sidecar::SIDECAR_ENDPOINT.to_string(),
            storage_endpoint: STORAGE_ENDPOINT.to_string(),
            http: None,
            token_source_provider: None,
            anonymous: false,
            backend: None,
            resolver: None,
        }
    }
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("bucket_id", &self.bucket_id)
            .field("sidecar_endpoint", &self.sidecar_endpoint)
            .field("storage_endpoint", &self.storage_endpoint)
            .field("token_source_provider", &self.token_source_provider)
            .field("anonymous", &self.anonymous)
            .field("backend", &self.backend)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl ClientConfig {
    pub fn with_bucket_id(mut self, bucket_id: impl Into<String>) -> Self {
        self.bucket_id = Some(bucket_id.into());
        self
    }

    pub fn with_sidecar_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.sidecar_endpoint = endpoint.into();
        self
    }

    pub fn with_storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.storage_endpoint = endpoint.into();
        self
    }

    pub fn with_http(mut self, http: ClientWithMiddleware) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_token_source_provider(mut self, provider: impl TokenSourceProvider + 'static) -> Self {
        self.token_source_provider = Some(Box::new(provider));
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self.token_source_provider = None;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn ObjectBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn BucketResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

#[cfg(feature = "auth")]
pub use google_cloud_auth;

#[cfg(feature = "auth")]
async fn sidecar_token_source(sidecar: &Sidecar) -> std::result::Result<Arc<dyn TokenSource>, BoxError> {
    let json = sidecar.credentials().to_json()?;
    let credentials = google_cloud_auth::credentials::CredentialsFile::new_from_str(&json).await?;
    let config = google_cloud_auth::project::Config::default().with_scopes(&crate::http::storage_client::SCOPES);
    let provider =
        google_cloud_auth::token::DefaultTokenSourceProvider::new_with_credentials(config, Box::new(credentials))
            .await?;
    Ok(provider.token_source())
}

#[cfg(not(feature = "auth"))]
async fn sidecar_token_source(_: &Sidecar) -> std::result::Result<Arc<dyn TokenSource>, BoxError> {
    Err("sidecar credentials require the auth feature".into())
}

type PendingBucket = Shared<BoxFuture<'static, Result<Bucket>>>;

#[derive(Clone)]
enum ClientState {
    Initializing(PendingBucket),
    Ready(Bucket),
    Error(String),
}

async fn resolve(config: ClientConfig) -> std::result::Result<Bucket, BoxError> {
    let ClientConfig {
        bucket_id,
        sidecar_endpoint,
        storage_endpoint,
        http,
        token_source_provider,
        anonymous,
        backend,
        resolver,
    } = config;
    let sidecar = Sidecar::new(sidecar_endpoint);

    let bucket_id = match (bucket_id, resolver) {
        (Some(bucket_id), _) => bucket_id,
        (None, Some(resolver)) => resolver.default_bucket_id().await?,
        (None, None) => BucketResolver::default_bucket_id(&sidecar).await?,
    };

    let backend: Arc<dyn ObjectBackend> = match backend {
        Some(backend) => backend,
        None => {
            let ts = if anonymous {
                tracing::trace!("Use anonymous access");
                None
            } else {
                match token_source_provider {
                    Some(tsp) => Some(tsp.token_source()),
                    None => Some(sidecar_token_source(&sidecar).await?),
                }
            };
            let http = http.unwrap_or_else(|| reqwest_middleware::ClientBuilder::new(reqwest::Client::default()).build());
            Arc::new(StorageClient::new(ts, &storage_endpoint, http))
        }
    };
    Ok(Bucket::new(bucket_id, backend))
}

async fn initialize(config: ClientConfig, state: Weak<RwLock<ClientState>>) -> Result<Bucket> {
    let result = match AssertUnwindSafe(resolve(config)).catch_unwind().await {
        Ok(Ok(bucket)) => Ok(bucket),
        Ok(Err(e)) => Err(RequestError::from_provider(e)),
        Err(_) => Err(RequestError::unknown()),
    }
    .map_err(|e| RequestError::new(format!("{INIT_ERROR_PREFIX}{}", e.message)));

    let next = match &result {
        Ok(bucket) => {
            tracing::debug!("object storage client ready: bucket={}", bucket.name());
            ClientState::Ready(bucket.clone())
        }
        Err(e) => {
            tracing::error!("{}", e.message);
            ClientState::Error(e.message.clone())
        }
    };
    if let Some(state) = state.upgrade() {
        *state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
    result
}

/// Client for a single bucket.
///
/// Construction never blocks: the bucket is resolved in the background and every operation
/// waits for it. Clones share the same resolution.
#[derive(Clone)]
pub struct Client {
    state: Arc<RwLock<ClientState>>,
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = match self.current() {
            ClientState::Initializing(_) => "Initializing".to_string(),
            ClientState::Ready(bucket) => format!("Ready({})", bucket.name()),
            ClientState::Error(message) => format!("Error({message})"),
        };
        f.debug_struct("Client").field("state", &state).finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Client {
    /// New client. Initialization starts on the current Tokio runtime when there is one,
    /// otherwise the first operation drives it.
    pub fn new(config: ClientConfig) -> Self {
        let mut pending = None;
        let state = Arc::new_cyclic(|state: &Weak<RwLock<ClientState>>| {
            let init = initialize(config, state.clone()).boxed().shared();
            pending = Some(init.clone());
            RwLock::new(ClientState::Initializing(init))
        });
        if let (Some(init), Ok(runtime)) = (pending, tokio::runtime::Handle::try_current()) {
            runtime.spawn(init);
        }
        Self { state }
    }

    pub fn with_bucket_id(bucket_id: impl Into<String>) -> Self {
        Self::new(ClientConfig::default().with_bucket_id(bucket_id))
    }

    fn current(&self) -> ClientState {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn bucket(&self) -> Result<Bucket> {
        match self.current() {
            ClientState::Ready(bucket) => Ok(bucket),
            ClientState::Error(message) => Err(RequestError::new(message)),
            ClientState::Initializing(pending) => pending.await,
        }
    }

    /// Copies an object within the bucket, overwriting `destination`.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn copy(&self, source: &str, destination: &str) -> Result<()> {
        self.bucket().await?.copy(source, destination).await
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn delete(&self, object: &str, options: &DeleteOptions) -> Result<()> {
        self.bucket().await?.delete(object, options).await
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn download_as_bytes(&self, object: &str, options: &DownloadOptions) -> Result<Bytes> {
        let stream = self.bucket().await?.download(object, options).await?;
        let chunks: Vec<Bytes> = stream.try_collect().await?;
        Ok(chunks.concat().into())
    }

    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn download_as_text(&self, object: &str, options: &DownloadOptions) -> Result<String> {
        let bytes = self.download_as_bytes(object, options).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes the object to `path`. Nothing is left locally when the download fails.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn download_to_filename(
        &self,
        object: &str,
        path: impl AsRef<Path>,
        options: &DownloadOptions,
    ) -> Result<()> {
        let path = path.as_ref();
        let mut stream = self.bucket().await?.download(object, options).await?;
        let mut file = tokio::fs::File::create(path).await?;
        let written = async {
            while let Some(chunk) = stream.try_next().await? {
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<(), RequestError>(())
        }
        .await;
        if written.is_err() {
            drop(file);
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::trace!("failed to remove partial download {}: {e}", path.display());
            }
        }
        written
    }

    /// Streams the object. Returns immediately; the bucket is resolved on first poll.
    pub fn download_as_stream(&self, object: &str, options: &DownloadOptions) -> ObjectStream {
        let client = self.clone();
        let object = object.to_string();
        let options = options.clone();
        stream::once(async move { client.bucket().await?.download(&object, &options).await })
            .try_flatten()
            .map_err(StreamRequestError::from)
            .boxed()
    }

    /// A missing object is reported as `false`, not as an error.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn exists(&self, object: &str) -> Result<bool> {
        self.bucket().await?.exists(object).await
    }

    /// Lists the objects of the bucket in lexicographic order, following every page.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn list(&self, options: &ListOptions) -> Result<Vec<StorageObject>> {
        self.bucket().await?.list(options).await
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn upload_from_bytes(
        &self,
        object: &str,
        content: impl Into<Bytes>,
        options: &UploadOptions,
    ) -> Result<()> {
        let payload = Payload::Bytes(content.into());
        self.bucket().await?.upload(object, payload, options).await
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn upload_from_text(
        &self,
        object: &str,
        content: impl Into<String>,
        options: &UploadOptions,
    ) -> Result<()> {
        self.upload_from_bytes(object, content.into(), options).await
    }

    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn upload_from_filename(
        &self,
        object: &str,
        path: impl AsRef<Path>,
        options: &UploadOptions,
    ) -> Result<()> {
        let bucket = self.bucket().await?;
        let file = tokio::fs::File::open(path.as_ref()).await?;
        let payload = Payload::Stream(ReaderStream::new(file).map_err(BoxError::from).boxed());
        bucket.upload(object, payload, options).await
    }

    /// Uploads everything `stream` yields. A failing stream aborts the upload.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn upload_from_stream<S>(
        &self,
        object: &str,
        stream: S,
        options: &UploadOptions,
    ) -> std::result::Result<(), StreamRequestError>
    where
        S: TryStream + Send + 'static,
        S::Ok: Into<Bytes>,
        S::Error: Into<BoxError>,
    {
        let chunks = stream
            .map_ok(|chunk| -> Bytes { chunk.into() })
            .map_err(|e| -> BoxError { e.into() });
        let payload = Payload::Stream(chunks.boxed());
        let bucket = self.bucket().await?;
        Ok(bucket.upload(object, payload, options).await?)
    }
}

#[cfg(test)]
mod test {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use bytes::Bytes;
    use futures_util::future::join_all;
    use futures_util::{stream, StreamExt, TryStreamExt};
    use serde_json::json;

    use crate::backend::{BoxError, ByteStream, ListPage, ListPageRequest, MemoryBackend, ObjectBackend, Payload};
    use crate::client::{Client, ClientConfig};
    use crate::error::RequestError;
    use crate::http::storage_client::test::http_client;
    use crate::options::{DeleteOptions, DownloadOptions, ListOptions, StorageObject, UploadOptions};
    use crate::resolver::BucketResolver;

    #[ctor::ctor]
    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    #[derive(Debug)]
    struct CountingResolver {
        calls: AtomicUsize,
        result: Result<String, String>,
    }

    impl CountingResolver {
        fn new(result: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: result.map(str::to_string).map_err(str::to_string),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BucketResolver for CountingResolver {
        async fn default_bucket_id(&self) -> Result<String, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.result.clone().map_err(BoxError::from)
        }
    }

    fn client(backend: &Arc<MemoryBackend>) -> Client {
        Client::new(
            ClientConfig::default()
                .with_bucket_id("test-bucket")
                .with_backend(backend.clone()),
        )
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_scenario() {
        let client = client(&Arc::new(MemoryBackend::new()));
        let options = UploadOptions::default();
        client.upload_from_text("dir/a.txt", "Hello World!", &options).await.unwrap();
        client.upload_from_text("other/b.txt", "Hello World!", &options).await.unwrap();

        let text = client.download_as_text("dir/a.txt", &DownloadOptions::default()).await.unwrap();
        assert_eq!(text, "Hello World!");

        let objects = client.list(&ListOptions::default().with_prefix("dir")).await.unwrap();
        assert_eq!(objects, vec![StorageObject::new("dir/a.txt")]);

        client.delete("dir/a.txt", &DeleteOptions::default()).await.unwrap();
        assert!(!client.exists("dir/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_resolution() {
        let resolver = CountingResolver::new(Ok("resolved-bucket"));
        let backend = Arc::new(MemoryBackend::new());
        let client = Client::new(
            ClientConfig::default()
                .with_resolver(resolver.clone())
                .with_backend(backend.clone()),
        );

        let uploads = (0..10).map(|i| {
            let client = client.clone();
            async move {
                client
                    .upload_from_bytes(&format!("object-{i}"), Bytes::from_static(b"data"), &UploadOptions::default())
                    .await
            }
        });
        for result in join_all(uploads).await {
            result.unwrap();
        }
        assert_eq!(resolver.calls(), 1);
        assert!(backend.generation("resolved-bucket", "object-0").is_some());

        assert!(client.exists("object-9").await.unwrap());
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_initialization_failure_is_sticky() {
        let resolver = CountingResolver::new(Err("sidecar unreachable"));
        let client = Client::new(
            ClientConfig::default()
                .with_resolver(resolver.clone())
                .with_backend(Arc::new(MemoryBackend::new())),
        );

        let expected = RequestError::new("Error during client initialization: sidecar unreachable");
        let results = join_all((0..5).map(|_| client.exists("a.txt"))).await;
        for result in results {
            assert_eq!(result.unwrap_err(), expected);
        }
        assert_eq!(client.list(&ListOptions::default()).await.unwrap_err(), expected);
        assert_eq!(resolver.calls(), 1);

        let err = client
            .download_as_stream("a.txt", &DownloadOptions::default())
            .try_next()
            .await
            .unwrap_err();
        assert_eq!(err.into_request_error(), expected);
    }

    #[derive(Debug)]
    struct PanickingResolver;

    #[async_trait]
    impl BucketResolver for PanickingResolver {
        async fn default_bucket_id(&self) -> Result<String, BoxError> {
            panic!("resolver bug")
        }
    }

    #[tokio::test]
    async fn test_initialization_panic() {
        let client = Client::new(
            ClientConfig::default()
                .with_resolver(Arc::new(PanickingResolver))
                .with_backend(Arc::new(MemoryBackend::new())),
        );
        let err = client.exists("a.txt").await.unwrap_err();
        assert_eq!(err.message, "Error during client initialization: Unknown error");
        assert_eq!(client.exists("a.txt").await.unwrap_err(), err);
    }

    #[tokio::test]
    async fn test_explicit_bucket_skips_resolver() {
        let resolver = CountingResolver::new(Err("sidecar unreachable"));
        let backend = Arc::new(MemoryBackend::new());
        let client = Client::new(
            ClientConfig::default()
                .with_bucket_id("explicit")
                .with_resolver(resolver.clone())
                .with_backend(backend.clone()),
        );
        client.upload_from_text("a.txt", "x", &UploadOptions::default()).await.unwrap();
        assert!(backend.generation("explicit", "a.txt").is_some());
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_sidecar_resolution() {
        let router = Router::new().route(
            "/object-storage/default-bucket",
            get(|| async { Json(json!({"bucketId": "replit-objstore-1234"})) }),
        );
        let backend = Arc::new(MemoryBackend::new());
        let client = Client::new(
            ClientConfig::default()
                .with_sidecar_endpoint(serve(router).await)
                .with_backend(backend.clone()),
        );
        client.upload_from_text("a.txt", "x", &UploadOptions::default()).await.unwrap();
        assert!(backend.generation("replit-objstore-1234", "a.txt").is_some());
    }

    #[tokio::test]
    async fn test_sidecar_failure() {
        let router = Router::new().route(
            "/object-storage/default-bucket",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let client = Client::new(
            ClientConfig::default()
                .with_sidecar_endpoint(serve(router).await)
                .with_backend(Arc::new(MemoryBackend::new())),
        );
        let err = client.exists("a.txt").await.unwrap_err();
        assert_eq!(
            err.message,
            "Error during client initialization: Failed to fetch default bucket, errorcode: 503, make sure you're running on Replit"
        );
        assert_eq!(err.status_code, None);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let client = client(&Arc::new(MemoryBackend::new()));
        let err = client.delete("bad-object-1", &DeleteOptions::default()).await.unwrap_err();
        assert_eq!(err.status_code, Some(404));
        client
            .delete("bad-object-1", &DeleteOptions::default().ignore_not_found())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_copy() {
        let client = client(&Arc::new(MemoryBackend::new()));
        client.upload_from_text("a.txt", "Hello World!", &UploadOptions::default()).await.unwrap();
        client.copy("a.txt", "b.txt").await.unwrap();
        assert!(client.exists("a.txt").await.unwrap());
        let copied = client.download_as_text("b.txt", &DownloadOptions::default()).await.unwrap();
        assert_eq!(copied, "Hello World!");

        let err = client.copy("bad-object-1", "c.txt").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!client.exists("c.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_download_missing() {
        let client = client(&Arc::new(MemoryBackend::new()));
        let options = DownloadOptions::default();
        assert!(client.download_as_bytes("bad-object-1", &options).await.unwrap_err().is_not_found());
        assert!(client.download_as_text("bad-object-1", &options).await.unwrap_err().is_not_found());

        let err = client
            .download_as_stream("bad-object-1", &options)
            .try_next()
            .await
            .unwrap_err();
        assert_eq!(err.request_error().status_code, Some(404));
        assert!(err.to_string().starts_with("404: "));
    }

    #[tokio::test]
    async fn test_download_as_stream() {
        let client = client(&Arc::new(MemoryBackend::new()));
        client.upload_from_text("a.txt", "Hello World!", &UploadOptions::default()).await.unwrap();
        let chunks: Vec<Bytes> = client
            .download_as_stream("a.txt", &DownloadOptions::default())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), b"Hello World!");
    }

    #[tokio::test]
    async fn test_download_as_text_lossy() {
        let client = client(&Arc::new(MemoryBackend::new()));
        let content = Bytes::from_static(&[b'o', b'k', 0xff]);
        client.upload_from_bytes("a.bin", content, &UploadOptions::default()).await.unwrap();
        let text = client.download_as_text("a.bin", &DownloadOptions::default()).await.unwrap();
        assert_eq!(text, "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_list_options() {
        let client = client(&Arc::new(MemoryBackend::new().with_page_size(2)));
        for name in ["dir/a.txt", "dir/b.txt", "dir/c.json", "dir/d.txt", "x.txt"] {
            client.upload_from_text(name, "x", &UploadOptions::default()).await.unwrap();
        }

        let names = |objects: Vec<StorageObject>| objects.into_iter().map(|o| o.name).collect::<Vec<_>>();

        let all = client.list(&ListOptions::default()).await.unwrap();
        assert_eq!(names(all), vec!["dir/a.txt", "dir/b.txt", "dir/c.json", "dir/d.txt", "x.txt"]);

        let options = ListOptions::default().with_prefix("dir/").with_max_results(3);
        let limited = client.list(&options).await.unwrap();
        assert_eq!(names(limited), vec!["dir/a.txt", "dir/b.txt", "dir/c.json"]);

        let globbed = client.list(&ListOptions::default().with_match_glob("dir/*.txt")).await.unwrap();
        assert_eq!(names(globbed), vec!["dir/a.txt", "dir/b.txt", "dir/d.txt"]);

        let range = ListOptions::default().with_start_offset("dir/b").with_end_offset("dir/d");
        let ranged = client.list(&range).await.unwrap();
        assert_eq!(names(ranged), vec!["dir/b.txt", "dir/c.json"]);
    }

    #[tokio::test]
    async fn test_filename_round_trip() {
        let client = client(&Arc::new(MemoryBackend::new()));
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        tokio::fs::write(&source, "Hello World!").await.unwrap();

        client.upload_from_filename("a.txt", &source, &UploadOptions::default()).await.unwrap();
        let destination = dir.path().join("destination.txt");
        client.download_to_filename("a.txt", &destination, &DownloadOptions::default()).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&destination).await.unwrap(), "Hello World!");

        let missing = dir.path().join("missing.txt");
        let err = client
            .download_to_filename("bad-object-1", &missing, &DownloadOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!missing.exists());

        let err = client
            .upload_from_filename("b.txt", dir.path().join("nope.txt"), &UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code, None);
        assert!(!client.exists("b.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_from_stream() {
        let client = client(&Arc::new(MemoryBackend::new()));
        let chunks = stream::iter(vec![Ok::<_, io::Error>("Hello "), Ok("World!")]);
        client.upload_from_stream("a.txt", chunks, &UploadOptions::default()).await.unwrap();
        let text = client.download_as_text("a.txt", &DownloadOptions::default()).await.unwrap();
        assert_eq!(text, "Hello World!");

        let failing = stream::iter(vec![Ok("Hello "), Err(io::Error::other("broken pipe"))]);
        let err = client
            .upload_from_stream("b.txt", failing, &UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "broken pipe");
        assert!(!client.exists("b.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_from_stream_failure_over_http() {
        let router = Router::new().route(
            "/upload/storage/v1/b/{bucket}/o",
            post(|body: Bytes| async move { Json(json!({"name": "b.txt", "size": body.len().to_string()})) }),
        );
        let client = Client::new(
            ClientConfig::default()
                .with_bucket_id("test-bucket")
                .with_storage_endpoint(serve(router).await)
                .with_http(http_client())
                .anonymous(),
        );
        let failing = stream::iter(vec![Ok("Hello "), Err(io::Error::other("broken pipe"))]);
        let err = client
            .upload_from_stream("b.txt", failing, &UploadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "broken pipe");
        assert_eq!(err.request_error().status_code, None);
    }

    #[derive(Debug)]
    struct TruncatingBackend;

    #[async_trait]
    impl ObjectBackend for TruncatingBackend {
        async fn copy(&self, _: &str, _: &str, _: &str) -> Result<(), BoxError> {
            Err("unsupported".into())
        }

        async fn delete(&self, _: &str, _: &str, _: &DeleteOptions) -> Result<(), BoxError> {
            Err("unsupported".into())
        }

        async fn download(&self, _: &str, _: &str, _: &DownloadOptions) -> Result<ByteStream, BoxError> {
            let chunks = vec![Ok(Bytes::from_static(b"Hello ")), Err(BoxError::from("connection reset"))];
            Ok(stream::iter(chunks).boxed())
        }

        async fn exists(&self, _: &str, _: &str) -> Result<bool, BoxError> {
            Ok(true)
        }

        async fn list(&self, _: &str, _: &ListPageRequest) -> Result<ListPage, BoxError> {
            Ok(ListPage::default())
        }

        async fn upload(&self, _: &str, _: &str, _: Payload, _: Option<&str>) -> Result<(), BoxError> {
            Err("unsupported".into())
        }
    }

    #[tokio::test]
    async fn test_download_to_filename_interrupted() {
        let client = Client::new(
            ClientConfig::default()
                .with_bucket_id("test-bucket")
                .with_backend(Arc::new(TruncatingBackend)),
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let err = client
            .download_to_filename("a.txt", &path, &DownloadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, RequestError::new("connection reset"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_upload_compressed() {
        let client = client(&Arc::new(MemoryBackend::new()));
        let chunks = stream::iter(vec!["Hello ", "World!"]).map(Ok::<_, io::Error>);
        client.upload_from_stream("a.txt", chunks, &UploadOptions::compressed()).await.unwrap();

        let text = client.download_as_text("a.txt", &DownloadOptions::default()).await.unwrap();
        assert_eq!(text, "Hello World!");

        let raw = client.download_as_bytes("a.txt", &DownloadOptions::raw()).await.unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    }

    #[tokio::test]
    async fn test_anonymous_storage_endpoint() {
        let router = Router::new().route(
            "/storage/v1/b/{bucket}/o/{object}",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"error": {"code": 404, "message": "No such object: test-bucket/a.txt"}})),
                )
            }),
        );
        let client = Client::new(
            ClientConfig::default()
                .with_bucket_id("test-bucket")
                .with_storage_endpoint(serve(router).await)
                .with_http(http_client())
                .anonymous(),
        );
        assert!(!client.exists("a.txt").await.unwrap());
        let err = client.download_as_bytes("a.txt", &DownloadOptions::default()).await.unwrap_err();
        assert_eq!(err, RequestError::with_status("No such object: test-bucket/a.txt", 404));
    }

    #[test]
    fn test_without_runtime() {
        let backend = Arc::new(MemoryBackend::new());
        let client = client(&backend);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            client.upload_from_text("a.txt", "x", &UploadOptions::default()).await.unwrap();
            assert!(client.exists("a.txt").await.unwrap());
        });
        assert!(format!("{client:?}").contains("Ready(test-bucket)"));
    }
}
