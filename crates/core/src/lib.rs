//! mys3-core: Core library for the mys3 S3 browser
//!
//! This crate provides the pieces that do not depend on a particular S3 SDK:
//! - Credential profiles and their persistent store, including migration of
//!   records written by older releases
//! - Key-value storage backends (JSON files, in-memory)
//! - The ObjectStore trait and listing types
//! - Browse state and the orchestrator tying it all together
//! - Configuration management

pub mod browse;
pub mod browser;
pub mod config;
pub mod credential;
pub mod credential_store;
pub mod error;
pub mod storage;
pub mod traits;

pub use browse::{Breadcrumb, BrowseState};
pub use browser::{Browser, BrowserEvent, normalize_prefix};
pub use config::{Config, ConfigManager};
pub use credential::{Credential, LegacyCredential};
pub use credential_store::{CredentialSlot, CredentialSnapshot, CredentialStore};
pub use error::{Error, Result};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use traits::{
    Bucket, Folder, ListRequest, ListingPage, ObjectEntry, ObjectLocation, ObjectStore,
    ProgressFn, RawObject,
};

#[cfg(any(test, feature = "mock"))]
pub use traits::MockObjectStore;
