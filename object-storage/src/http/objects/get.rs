use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::http::Escape;

/// Request message for GetObject.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct GetObjectRequest {
    /// Required. Name of the bucket in which the object resides.
    pub bucket: String,
    /// Required. Name of the object.
    pub object: String,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &GetObjectRequest) -> RequestBuilder {
    let url = format!("{}/b/{}/o/{}", base_url, req.bucket.escape(), req.object.escape());
    client.get(url)
}
