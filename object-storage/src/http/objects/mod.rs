pub mod copy;
pub mod delete;
pub mod download;
pub mod get;
pub mod list;
pub mod upload;

/// Object metadata, trimmed to the fields this crate reads.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// The name of the object.
    pub name: String,
    /// The name of the bucket containing this object.
    #[serde(default)]
    pub bucket: String,
    /// The content generation of this object. Used for object versioning.
    #[serde(default, deserialize_with = "crate::http::from_str_option")]
    pub generation: Option<i64>,
    /// The version of the metadata for this object at this generation.
    #[serde(default, deserialize_with = "crate::http::from_str_option")]
    pub metageneration: Option<i64>,
    /// Content-Length of the object data in bytes.
    #[serde(default, deserialize_with = "crate::http::from_str_option")]
    pub size: Option<u64>,
    /// Content-Type of the object data.
    pub content_type: Option<String>,
    /// Content-Encoding of the object data, `gzip` for compressed uploads.
    pub content_encoding: Option<String>,
}
