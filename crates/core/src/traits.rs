//! ObjectStore trait definition
//!
//! This trait defines the object-store operations the browser needs. It keeps
//! the core independent of the S3 SDK; the `mys3-s3` crate implements it and
//! tests substitute a mock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::Result;

/// Delimiter grouping keys into folders
pub const DELIMITER: &str = "/";

/// Entries requested per listing page
pub const PAGE_SIZE: i32 = 100;

/// Default lifetime of a presigned download URL
pub const DEFAULT_DOWNLOAD_EXPIRY: Duration = Duration::from_secs(3600);

/// Content type used when an upload does not specify one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Upload progress callback, called with a percentage
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// A bucket visible to a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<Timestamp>,

    /// Region the bucket lives in, which may differ from the credential's
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Bucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creation_date: None,
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// A common prefix shown as a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Full prefix including the trailing delimiter
    pub prefix: String,

    /// Prefix relative to the current folder, without the trailing delimiter
    pub display_name: String,
}

/// An object shown as a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,

    /// Key relative to the current folder
    pub display_name: String,

    pub size: i64,

    pub size_human: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

/// Object as returned by the wire listing, before mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<Timestamp>,
}

impl RawObject {
    pub fn new(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
        }
    }
}

/// One page of a delimited listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPage {
    pub folders: Vec<Folder>,
    pub objects: Vec<ObjectEntry>,

    /// Continuation token for the next page, if the listing was truncated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl ListingPage {
    /// Map a raw delimited listing of `prefix` into folders and objects.
    ///
    /// The object whose key equals `prefix` is the folder's own marker and
    /// is not listed. Order is preserved.
    pub fn from_raw<P, O>(
        prefix: &str,
        common_prefixes: P,
        contents: O,
        next_token: Option<String>,
    ) -> Self
    where
        P: IntoIterator<Item = String>,
        O: IntoIterator<Item = RawObject>,
    {
        let folders = common_prefixes
            .into_iter()
            .map(|folder_prefix| {
                let relative = folder_prefix.strip_prefix(prefix).unwrap_or(&folder_prefix);
                let display_name = relative
                    .strip_suffix(DELIMITER)
                    .unwrap_or(relative)
                    .to_string();
                Folder {
                    prefix: folder_prefix,
                    display_name,
                }
            })
            .collect();

        let objects = contents
            .into_iter()
            .filter(|obj| obj.key != prefix)
            .map(|obj| {
                let display_name = obj.key.strip_prefix(prefix).unwrap_or(&obj.key).to_string();
                ObjectEntry {
                    size_human: humansize::format_size(obj.size.max(0) as u64, humansize::BINARY),
                    display_name,
                    key: obj.key,
                    size: obj.size,
                    last_modified: obj.last_modified,
                }
            })
            .collect();

        Self {
            folders,
            objects,
            next_token: next_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Parameters of one listing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub bucket: String,

    /// Navigation prefix, empty or delimiter-terminated
    pub prefix: String,

    pub continuation_token: Option<String>,

    /// Bucket region; the credential's region is used when absent
    pub region: Option<String>,
}

/// A single object in a bucket, with the bucket's region if known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
    pub region: Option<String>,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, region: Option<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            region,
        }
    }
}

/// Key of the zero-byte object that marks a folder
pub fn folder_marker_key(prefix: &str) -> String {
    if prefix.ends_with(DELIMITER) {
        prefix.to_string()
    } else {
        format!("{prefix}{DELIMITER}")
    }
}

/// Trait for S3-compatible storage operations
///
/// Implementations are stateless with respect to browsing: every call names
/// the credential and, where relevant, the bucket's region. No call retries.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all buckets with each bucket's region resolved
    async fn list_buckets(&self, credential: &Credential) -> Result<Vec<Bucket>>;

    /// Look up the region a bucket lives in
    async fn bucket_region(&self, credential: &Credential, bucket: &str) -> Result<String>;

    /// List one page of folders and objects under a prefix
    async fn list_objects(
        &self,
        credential: &Credential,
        request: ListRequest,
    ) -> Result<ListingPage>;

    /// Upload an object, reporting 0 and then 100 percent
    async fn upload(
        &self,
        credential: &Credential,
        location: ObjectLocation,
        data: Vec<u8>,
        content_type: Option<String>,
        progress: Option<ProgressFn>,
    ) -> Result<()>;

    /// Delete a single object
    async fn delete_object(&self, credential: &Credential, location: ObjectLocation) -> Result<()>;

    /// Create a folder marker; the key is normalized to end with the delimiter
    async fn create_folder(
        &self,
        credential: &Credential,
        location: ObjectLocation,
    ) -> Result<()>;

    /// Presigned GET URL valid for `expires_in`
    async fn download_url(
        &self,
        credential: &Credential,
        location: ObjectLocation,
        expires_in: Duration,
    ) -> Result<String>;
}
