use reqwest::header::{HeaderValue, ACCEPT_ENCODING};
use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::http::objects::get::GetObjectRequest;
use crate::http::Escape;

/// Builds a media download.
///
/// Objects stored with `Content-Encoding: gzip` are decompressed by the service unless `raw` is
/// set, in which case the stored bytes are returned untouched.
pub(crate) fn build(base_url: &str, client: &Client, req: &GetObjectRequest, raw: bool) -> RequestBuilder {
    let url = format!("{}/b/{}/o/{}?alt=media", base_url, req.bucket.escape(), req.object.escape());
    let builder = client.get(url);
    if raw {
        builder.header(ACCEPT_ENCODING, HeaderValue::from_static("gzip"))
    } else {
        builder
    }
}
