use std::fmt::Debug;

use async_trait::async_trait;
use replit_sidecar::Sidecar;

use crate::backend::BoxError;

/// Finds the bucket a [`Client`](crate::client::Client) uses when no bucket id is configured.
#[async_trait]
pub trait BucketResolver: Send + Sync + Debug {
    async fn default_bucket_id(&self) -> Result<String, BoxError>;
}

#[async_trait]
impl BucketResolver for Sidecar {
    async fn default_bucket_id(&self) -> Result<String, BoxError> {
        Ok(Sidecar::default_bucket_id(self).await?)
    }
}
