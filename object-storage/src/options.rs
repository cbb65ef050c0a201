/// Metadata for an object returned by [`list`](crate::client::Client::list).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageObject {
    /// The name of the object, including its full path.
    pub name: String,
}

impl StorageObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Succeed without effect when the object does not exist.
    pub ignore_not_found: bool,
    pub if_generation_match: Option<i64>,
    pub if_generation_not_match: Option<i64>,
    pub if_metageneration_match: Option<i64>,
    pub if_metageneration_not_match: Option<i64>,
}

impl DeleteOptions {
    pub fn ignore_not_found(mut self) -> Self {
        self.ignore_not_found = true;
        self
    }

    pub fn with_if_generation_match(mut self, generation: i64) -> Self {
        self.if_generation_match = Some(generation);
        self
    }

    pub fn with_if_generation_not_match(mut self, generation: i64) -> Self {
        self.if_generation_not_match = Some(generation);
        self
    }

    pub fn with_if_metageneration_match(mut self, metageneration: i64) -> Self {
        self.if_metageneration_match = Some(metageneration);
        self
    }

    pub fn with_if_metageneration_not_match(mut self, metageneration: i64) -> Self {
        self.if_metageneration_not_match = Some(metageneration);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Serve objects uploaded with `compress` decompressed. When false the stored gzip bytes
    /// are returned as they are.
    pub decompress: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self { decompress: true }
    }
}

impl DownloadOptions {
    pub fn raw() -> Self {
        Self { decompress: false }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only list objects whose names begin with this prefix.
    pub prefix: Option<String>,
    /// Only list objects whose names match this glob, e.g. `**.txt`.
    pub match_glob: Option<String>,
    /// Upper bound on the total number of objects returned across all pages.
    pub max_results: Option<u32>,
    /// Only list objects whose names are lexicographically at or after this value.
    pub start_offset: Option<String>,
    /// Only list objects whose names are lexicographically before this value.
    pub end_offset: Option<String>,
}

impl ListOptions {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_match_glob(mut self, glob: impl Into<String>) -> Self {
        self.match_glob = Some(glob.into());
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_start_offset(mut self, offset: impl Into<String>) -> Self {
        self.start_offset = Some(offset.into());
        self
    }

    pub fn with_end_offset(mut self, offset: impl Into<String>) -> Self {
        self.end_offset = Some(offset.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Gzip the content on the way up and store it with `Content-Encoding: gzip`.
    pub compress: bool,
}

impl UploadOptions {
    pub fn compressed() -> Self {
        Self { compress: true }
    }
}
