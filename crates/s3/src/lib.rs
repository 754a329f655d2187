//! mys3-s3: S3 SDK adapter for the mys3 browser
//!
//! This crate provides the implementation of the ObjectStore trait
//! using the aws-sdk-s3 crate. It is the only crate that directly
//! depends on the AWS SDK.

pub mod client;

pub use client::{S3Client, classify_error, region_from_constraint};
