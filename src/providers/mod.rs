//! Remote object store access
//!
//! - `fetcher`: the `BlobFetcher` / `BlobReader` traits the download worker uses
//! - `s3_client`: S3 client construction
//! - `aws`: S3-backed fetcher
//! - `memory`: in-memory fetcher

pub mod aws;
pub mod fetcher;
pub mod memory;
pub mod s3_client;

pub use aws::{AwsConfig, S3Fetcher};
pub use fetcher::{BlobFetcher, BlobReader, FetchError, FetchResult, StoreCredentials};
pub use memory::{Fault, MemoryFetcher};
