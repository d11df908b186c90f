//! Blob fetcher seam between the download worker and a remote object store

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

pub type FetchError = Box<dyn std::error::Error + Send + Sync>;
pub type FetchResult<T> = Result<T, FetchError>;

/// Access keys supplied by the caller with each download request
#[derive(Clone)]
pub struct StoreCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl StoreCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// An open remote object, read chunk by chunk.
#[async_trait]
pub trait BlobReader: Send {
    /// Next chunk of the object body, or `None` once the body is exhausted.
    async fn next_chunk(&mut self) -> FetchResult<Option<Bytes>>;

    /// Finish the read. An error here means the body must not be trusted,
    /// even if every chunk was delivered.
    async fn close(&mut self) -> FetchResult<()>;
}

#[async_trait]
pub trait BlobFetcher: Send + Sync {
    async fn open_reader(
        &self,
        credentials: &StoreCredentials,
        bucket: &str,
        object_name: &str,
    ) -> FetchResult<Box<dyn BlobReader>>;
}
