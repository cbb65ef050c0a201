use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};

use crate::backend::{BoxError, ByteStream, ListPage, ListPageRequest, ObjectBackend, Payload};
use crate::http::objects::copy::CopyObjectRequest;
use crate::http::objects::delete::DeleteObjectRequest;
use crate::http::objects::get::GetObjectRequest;
use crate::http::objects::list::ListObjectsRequest;
use crate::http::objects::upload::UploadObjectRequest;
use crate::http::storage_client::StorageClient;
use crate::options::{DeleteOptions, DownloadOptions, StorageObject};

fn object_request(bucket: &str, object: &str) -> GetObjectRequest {
    GetObjectRequest {
        bucket: bucket.to_string(),
        object: object.to_string(),
    }
}

#[async_trait]
impl ObjectBackend for StorageClient {
    async fn copy(&self, bucket: &str, source: &str, destination: &str) -> Result<(), BoxError> {
        let req = CopyObjectRequest {
            source_bucket: bucket.to_string(),
            source_object: source.to_string(),
            destination_bucket: bucket.to_string(),
            destination_object: destination.to_string(),
        };
        self.copy_object(&req).await?;
        Ok(())
    }

    async fn delete(&self, bucket: &str, object: &str, options: &DeleteOptions) -> Result<(), BoxError> {
        let req = DeleteObjectRequest {
            bucket: bucket.to_string(),
            object: object.to_string(),
            if_generation_match: options.if_generation_match,
            if_generation_not_match: options.if_generation_not_match,
            if_metageneration_match: options.if_metageneration_match,
            if_metageneration_not_match: options.if_metageneration_not_match,
        };
        Ok(self.delete_object(&req).await?)
    }

    async fn download(&self, bucket: &str, object: &str, options: &DownloadOptions) -> Result<ByteStream, BoxError> {
        let stream = self
            .download_streamed_object(&object_request(bucket, object), !options.decompress)
            .await?;
        Ok(stream.map_err(BoxError::from).boxed())
    }

    async fn exists(&self, bucket: &str, object: &str) -> Result<bool, BoxError> {
        match self.get_object(&object_request(bucket, object)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, bucket: &str, request: &ListPageRequest) -> Result<ListPage, BoxError> {
        let req = ListObjectsRequest {
            bucket: bucket.to_string(),
            end_offset: request.end_offset.clone(),
            max_results: request.page_size,
            page_token: request.page_token.clone(),
            prefix: request.prefix.clone(),
            start_offset: request.start_offset.clone(),
            versions: Some(false),
            match_glob: request.match_glob.clone(),
        };
        let response = self.list_objects(&req).await?;
        let objects = response
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|object| StorageObject::new(object.name))
            .collect();
        Ok(ListPage {
            objects,
            next_page_token: response.next_page_token,
        })
    }

    async fn upload(
        &self,
        bucket: &str,
        object: &str,
        payload: Payload,
        content_encoding: Option<&str>,
    ) -> Result<(), BoxError> {
        let req = UploadObjectRequest {
            bucket: bucket.to_string(),
            name: object.to_string(),
            content_encoding: content_encoding.map(str::to_string),
        };
        self.upload_object(&req, payload).await?;
        Ok(())
    }
}
