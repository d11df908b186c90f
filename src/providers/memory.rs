//! In-memory object store used by tests in place of S3

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::fetcher::{BlobFetcher, BlobReader, FetchResult, StoreCredentials};

/// Chunk size handed out by [`MemoryReader`] (64 KB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Failure injected into reads of a stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The body fails once this many bytes have been delivered
    Transfer { after_bytes: usize },
    /// Every chunk is delivered but closing the reader fails
    Close,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    fault: Option<Fault>,
}

#[derive(Debug, Default)]
pub struct MemoryFetcher {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    credentials: Option<(String, String)>,
    opened: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any reader whose credentials do not match these keys.
    pub fn with_credentials(access_key: &str, secret_key: &str) -> Self {
        Self {
            credentials: Some((access_key.to_string(), secret_key.to_string())),
            ..Self::default()
        }
    }

    pub async fn insert(&self, bucket: &str, object_name: &str, data: impl Into<Bytes>) {
        self.insert_object(bucket, object_name, data.into(), None)
            .await;
    }

    pub async fn insert_faulty(
        &self,
        bucket: &str,
        object_name: &str,
        data: impl Into<Bytes>,
        fault: Fault,
    ) {
        self.insert_object(bucket, object_name, data.into(), Some(fault))
            .await;
    }

    async fn insert_object(
        &self,
        bucket: &str,
        object_name: &str,
        data: Bytes,
        fault: Option<Fault>,
    ) {
        let mut objects = self.objects.write().await;
        objects.insert(
            (bucket.to_string(), object_name.to_string()),
            StoredObject { data, fault },
        );
    }

    /// Number of `open_reader` calls seen so far, successful or not
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobFetcher for MemoryFetcher {
    async fn open_reader(
        &self,
        credentials: &StoreCredentials,
        bucket: &str,
        object_name: &str,
    ) -> FetchResult<Box<dyn BlobReader>> {
        self.opened.fetch_add(1, Ordering::SeqCst);

        if let Some((access_key, secret_key)) = &self.credentials {
            if credentials.access_key != *access_key || credentials.secret_key != *secret_key {
                return Err("AccessDenied: Access Denied".into());
            }
        }

        let objects = self.objects.read().await;
        let object = objects
            .get(&(bucket.to_string(), object_name.to_string()))
            .ok_or_else(|| {
                format!(
                    "NoSuchKey: The specified key does not exist. bucket={} key={}",
                    bucket, object_name
                )
            })?;

        Ok(Box::new(MemoryReader {
            data: object.data.clone(),
            position: 0,
            fault: object.fault,
        }))
    }
}

struct MemoryReader {
    data: Bytes,
    position: usize,
    fault: Option<Fault>,
}

#[async_trait]
impl BlobReader for MemoryReader {
    async fn next_chunk(&mut self) -> FetchResult<Option<Bytes>> {
        let mut end = (self.position + CHUNK_SIZE).min(self.data.len());
        if let Some(Fault::Transfer { after_bytes }) = self.fault {
            if self.position >= after_bytes {
                return Err(format!(
                    "connection reset after {} bytes",
                    self.position
                )
                .into());
            }
            end = end.min(after_bytes);
        }

        if self.position >= end {
            return Ok(None);
        }
        let chunk = self.data.slice(self.position..end);
        self.position = end;
        Ok(Some(chunk))
    }

    async fn close(&mut self) -> FetchResult<()> {
        if self.fault == Some(Fault::Close) {
            return Err("failed to finalize object read".into());
        }
        Ok(())
    }
}
