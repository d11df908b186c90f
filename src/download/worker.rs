//! Download worker - streams one remote object to a local file and reports to the registry

use log::{error, info, warn};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use super::registry::RegistryHandle;
use super::types::{DownloadFile, DownloadRequest, DownloadStatus};
use crate::error::DownloadError;
use crate::providers::BlobFetcher;

/// Write buffer size for downloads (2 MB) - reduces I/O operations
const WRITE_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Spawn a download task. The start is reported before the task exists, so a
/// status query sent after this returns sees at least `RUNNING`; the outcome
/// is only visible through the registry.
pub fn spawn_download_task(
    registry: RegistryHandle,
    fetcher: Arc<dyn BlobFetcher>,
    request: DownloadRequest,
) -> JoinHandle<()> {
    report_started(&registry, &request.id);
    tokio::spawn(async move {
        transfer(&registry, fetcher.as_ref(), request).await;
    })
}

/// Run one download to completion, reporting every state change.
pub async fn download(
    registry: &RegistryHandle,
    fetcher: &dyn BlobFetcher,
    request: DownloadRequest,
) {
    report_started(registry, &request.id);
    transfer(registry, fetcher, request).await;
}

fn report_started(registry: &RegistryHandle, id: &str) {
    registry.download_started(id);
    registry.status_changed(id, DownloadStatus::Running);
}

async fn transfer(
    registry: &RegistryHandle,
    fetcher: &dyn BlobFetcher,
    request: DownloadRequest,
) {
    match download_file_internal(fetcher, &request).await {
        Ok(bytes) => {
            info!(
                "download_done: {} wrote {} bytes of {}/{} to {}",
                request.id,
                bytes,
                request.bucket,
                request.object_name,
                request.local_path.display()
            );
            registry.file_produced(DownloadFile {
                id: request.id.clone(),
                object_name: request.object_name,
                local_path: request.local_path,
            });
            registry.status_changed(&request.id, DownloadStatus::Completed);
        }
        Err(e) => {
            error!(
                "download_failed: {} could not {} (s3 file {}, local file {}): {}",
                request.id,
                e.step(),
                request.object_name,
                request.local_path.display(),
                e
            );
            registry.status_changed(&request.id, DownloadStatus::Failed(e.to_string()));
        }
    }
}

/// Create the destination, then stream the object into it. Any failure after
/// the file exists removes it, so only complete files are ever reported.
async fn download_file_internal(
    fetcher: &dyn BlobFetcher,
    request: &DownloadRequest,
) -> Result<u64, DownloadError> {
    let mut file = File::create(&request.local_path)
        .await
        .map_err(DownloadError::CreateFile)?;

    let result = stream_to_file(fetcher, request, &mut file).await;
    if result.is_err() {
        drop(file);
        remove_partial_file(&request.id, &request.local_path).await;
    }
    result
}

async fn stream_to_file(
    fetcher: &dyn BlobFetcher,
    request: &DownloadRequest,
    file: &mut File,
) -> Result<u64, DownloadError> {
    let mut reader = fetcher
        .open_reader(&request.credentials, &request.bucket, &request.object_name)
        .await
        .map_err(DownloadError::OpenRemote)?;

    let mut written: u64 = 0;
    let mut write_buffer = Vec::with_capacity(WRITE_BUFFER_SIZE);

    while let Some(chunk) = reader.next_chunk().await.map_err(DownloadError::Transfer)? {
        write_buffer.extend_from_slice(&chunk);
        written += chunk.len() as u64;

        if write_buffer.len() >= WRITE_BUFFER_SIZE {
            file.write_all(&write_buffer)
                .await
                .map_err(DownloadError::WriteFile)?;
            write_buffer.clear();
        }
    }

    if !write_buffer.is_empty() {
        file.write_all(&write_buffer)
            .await
            .map_err(DownloadError::WriteFile)?;
    }

    // Ensure all data is written
    file.flush().await.map_err(DownloadError::WriteFile)?;

    reader.close().await.map_err(DownloadError::Finalize)?;

    Ok(written)
}

async fn remove_partial_file(id: &str, path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "download_cleanup: {} failed to remove partial file {}: {}",
            id,
            path.display(),
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::registry::{spawn_registry, RegistryConfig};
    use crate::providers::{Fault, MemoryFetcher, StoreCredentials};
    use std::path::PathBuf;

    fn request(id: &str, object_name: &str, local_path: PathBuf) -> DownloadRequest {
        DownloadRequest {
            id: id.to_string(),
            credentials: StoreCredentials::new("access", "secret"),
            bucket: "bucket".to_string(),
            object_name: object_name.to_string(),
            local_path,
        }
    }

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 256) as u8).collect()
    }

    #[tokio::test]
    async fn completed_download_writes_every_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let data = content(5 * 1024 * 1024 + 17);

        let fetcher = MemoryFetcher::new();
        fetcher.insert("bucket", "big.bin", data.clone()).await;
        let (registry, _task) = spawn_registry(RegistryConfig::default());

        download(&registry, &fetcher, request("job", "big.bin", path.clone())).await;

        assert_eq!(registry.status("job").await, "COMPLETED");
        assert_eq!(std::fs::read(&path).unwrap(), data);
        let artifact = registry.artifact("job").await.unwrap();
        assert_eq!(artifact.object_name, "big.bin");
        assert_eq!(artifact.local_path, path);
    }

    #[tokio::test]
    async fn missing_object_fails_and_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let fetcher = MemoryFetcher::new();
        let (registry, _task) = spawn_registry(RegistryConfig::default());

        download(&registry, &fetcher, request("job", "missing.bin", path.clone())).await;

        let status = registry.status("job").await;
        assert!(status.starts_with("FAILED NoSuchKey"), "{}", status);
        assert!(!path.exists());
        assert!(registry.artifact("job").await.is_none());
    }

    #[tokio::test]
    async fn interrupted_transfer_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let fetcher = MemoryFetcher::new();
        fetcher
            .insert_faulty(
                "bucket",
                "flaky.bin",
                content(3 * 1024 * 1024),
                Fault::Transfer {
                    after_bytes: 2 * 1024 * 1024 + 5,
                },
            )
            .await;
        let (registry, _task) = spawn_registry(RegistryConfig::default());

        download(&registry, &fetcher, request("job", "flaky.bin", path.clone())).await;

        let status = registry.status("job").await;
        assert!(status.starts_with("FAILED connection reset"), "{}", status);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn close_failure_after_full_copy_is_still_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let fetcher = MemoryFetcher::new();
        fetcher
            .insert_faulty("bucket", "object.bin", content(1024), Fault::Close)
            .await;
        let (registry, _task) = spawn_registry(RegistryConfig::default());

        download(&registry, &fetcher, request("job", "object.bin", path.clone())).await;

        assert_eq!(
            registry.status("job").await,
            "FAILED failed to finalize object read"
        );
        assert!(!path.exists());
        assert!(registry.artifact("job").await.is_none());
    }

    #[tokio::test]
    async fn unwritable_destination_fails_before_contacting_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("out.bin");

        let fetcher = MemoryFetcher::new();
        fetcher.insert("bucket", "object.bin", content(16)).await;
        let (registry, _task) = spawn_registry(RegistryConfig::default());

        download(&registry, &fetcher, request("job", "object.bin", path.clone())).await;

        let status = registry.status("job").await;
        assert!(status.starts_with("FAILED "), "{}", status);
        assert!(!path.exists());
        assert_eq!(fetcher.opened(), 0);
    }

    #[tokio::test]
    async fn spawned_download_is_running_before_the_task_is_polled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert("bucket", "object.bin", content(1024)).await;
        let (registry, _task) = spawn_registry(RegistryConfig::default());

        let handle = spawn_download_task(
            registry.clone(),
            fetcher,
            request("job", "object.bin", path.clone()),
        );
        assert_ne!(registry.status("job").await, "UNKNOWN");

        handle.await.unwrap();
        assert_eq!(registry.status("job").await, "COMPLETED");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn empty_object_completes_with_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");

        let fetcher = MemoryFetcher::new();
        fetcher.insert("bucket", "empty.bin", Vec::<u8>::new()).await;
        let (registry, _task) = spawn_registry(RegistryConfig::default());

        download(&registry, &fetcher, request("job", "empty.bin", path.clone())).await;

        assert_eq!(registry.status("job").await, "COMPLETED");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
