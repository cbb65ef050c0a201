use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};
use token_source::TokenSource;

use crate::http::objects::copy::CopyObjectRequest;
use crate::http::objects::delete::DeleteObjectRequest;
use crate::http::objects::get::GetObjectRequest;
use crate::http::objects::list::{ListObjectsRequest, ListObjectsResponse};
use crate::http::objects::upload::UploadObjectRequest;
use crate::http::objects::{copy, delete, download, get, list, upload, Object};
use crate::http::{check_response_status, Error};

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/devstorage.full_control",
];

/// Minimal client for the object endpoints of the GCS JSON API.
#[derive(Clone)]
pub struct StorageClient {
    ts: Option<Arc<dyn TokenSource>>,
    v1_endpoint: String,
    v1_upload_endpoint: String,
    http: Client,
}

impl Debug for StorageClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("v1_endpoint", &self.v1_endpoint)
            .field("anonymous", &self.ts.is_none())
            .finish()
    }
}

impl StorageClient {
    pub fn new(ts: Option<Arc<dyn TokenSource>>, endpoint: &str, http: Client) -> Self {
        let endpoint = endpoint.trim_end_matches('/');
        Self {
            ts,
            v1_endpoint: format!("{endpoint}/storage/v1"),
            v1_upload_endpoint: format!("{endpoint}/upload/storage/v1"),
            http,
        }
    }

    /// Gets the object metadata.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn get_object(&self, req: &GetObjectRequest) -> Result<Object, Error> {
        let builder = get::build(self.v1_endpoint.as_str(), &self.http, req);
        self.send(builder).await
    }

    /// Lists one page of objects.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn list_objects(&self, req: &ListObjectsRequest) -> Result<ListObjectsResponse, Error> {
        let builder = list::build(self.v1_endpoint.as_str(), &self.http, req);
        self.send(builder).await
    }

    /// Deletes the object.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn delete_object(&self, req: &DeleteObjectRequest) -> Result<(), Error> {
        let builder = delete::build(self.v1_endpoint.as_str(), &self.http, req);
        self.send_get_empty(builder).await
    }

    /// Copies the object, overwriting the destination.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn copy_object(&self, req: &CopyObjectRequest) -> Result<Object, Error> {
        let builder = copy::build(self.v1_endpoint.as_str(), &self.http, req);
        self.send(builder).await
    }

    /// Download the object content as a stream of chunks.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn download_streamed_object(
        &self,
        req: &GetObjectRequest,
        raw: bool,
    ) -> Result<impl Stream<Item = Result<Bytes, Error>> + Send + 'static, Error> {
        let builder = download::build(self.v1_endpoint.as_str(), &self.http, req, raw);
        let request = self.with_headers(builder).await?;
        let response = check_response_status(request.send().await?).await?;
        Ok(response.bytes_stream().map_err(Error::from))
    }

    /// Uploads the object with a single media request.
    #[cfg_attr(feature = "trace", tracing::instrument(skip_all))]
    pub async fn upload_object(
        &self,
        req: &UploadObjectRequest,
        body: impl Into<reqwest::Body>,
    ) -> Result<Object, Error> {
        let builder = upload::build(self.v1_upload_endpoint.as_str(), &self.http, req, body);
        self.send(builder).await
    }

    async fn with_headers(&self, builder: RequestBuilder) -> Result<RequestBuilder, Error> {
        let builder = builder
            .header("X-Goog-Api-Client", "rust")
            .header(reqwest::header::USER_AGENT, "replit-object-storage");
        match &self.ts {
            Some(ts) => {
                let token = ts.token().await.map_err(Error::TokenSource)?;
                Ok(builder.header(reqwest::header::AUTHORIZATION, token))
            }
            None => Ok(builder),
        }
    }

    async fn send<T: for<'de> serde::Deserialize<'de>>(&self, builder: RequestBuilder) -> Result<T, Error> {
        let request = self.with_headers(builder).await?;
        let response = check_response_status(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_get_empty(&self, builder: RequestBuilder) -> Result<(), Error> {
        let request = self.with_headers(builder).await?;
        check_response_status(request.send().await?).await?;
        Ok(())
    }
}
