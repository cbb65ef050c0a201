use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::http::objects::Object;
use crate::http::Escape;

/// Request message for ListObjects.
#[derive(Clone, PartialEq, Eq, serde::Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsRequest {
    /// Name of the bucket in which to look for objects.
    #[serde(skip_serializing)]
    pub bucket: String,
    /// Filter results to objects whose names are lexicographically before endOffset.
    /// If startOffset is also set, the objects listed have names between startOffset
    /// (inclusive) and endOffset (exclusive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<String>,
    /// Maximum number of entries in items[] to return in a single page of responses.
    /// The service may return fewer results than maxResults so the presence of
    /// nextPageToken should always be checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    /// A previously-returned page token representing part of the larger set of results to view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
    /// Filter results to include only objects whose names begin with this prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Filter results to objects whose names are lexicographically equal to or after startOffset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<String>,
    /// If true, lists all versions of an object as distinct results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<bool>,
    /// Filter results to objects and prefixes that match this glob pattern.
    /// For more information, see [List objects and prefixes using glob](<https://cloud.google.com/storage/docs/json_api/v1/objects/list#list-objects-and-prefixes-using-glob>)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_glob: Option<String>,
}

/// The result of a call to Objects.ListObjects
#[derive(Clone, PartialEq, Eq, serde::Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsResponse {
    /// The list of items.
    pub items: Option<Vec<Object>>,
    /// The continuation token, used to page through large result sets. Provide
    /// this value in a subsequent request to return the next page of results.
    pub next_page_token: Option<String>,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &ListObjectsRequest) -> RequestBuilder {
    let url = format!("{}/b/{}/o", base_url, req.bucket.escape());
    client.get(url).query(&req)
}
