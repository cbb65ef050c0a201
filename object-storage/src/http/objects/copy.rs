use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::http::Escape;

/// Request message for CopyObject.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CopyObjectRequest {
    pub source_bucket: String,
    pub source_object: String,
    pub destination_bucket: String,
    pub destination_object: String,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &CopyObjectRequest) -> RequestBuilder {
    let url = format!(
        "{}/b/{}/o/{}/copyTo/b/{}/o/{}",
        base_url,
        req.source_bucket.escape(),
        req.source_object.escape(),
        req.destination_bucket.escape(),
        req.destination_object.escape()
    );
    // the service rejects a bodiless POST, the metadata is inherited from the source.
    client.post(url).json(&serde_json::Map::new())
}
