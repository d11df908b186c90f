//! Download HTTP commands

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Form, Router,
};
use log::{debug, info};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::registry::RegistryHandle;
use super::types::DownloadRequest;
use super::worker::spawn_download_task;
use crate::providers::{BlobFetcher, StoreCredentials};

/// Shared state behind every route
#[derive(Clone)]
pub struct AppState {
    pub registry: RegistryHandle,
    pub fetcher: Arc<dyn BlobFetcher>,
}

impl AppState {
    pub fn new(registry: RegistryHandle, fetcher: Arc<dyn BlobFetcher>) -> Self {
        Self { registry, fetcher }
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadInput {
    pub id: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
    pub s3_bucket: String,
    pub s3_filename: String,
    pub local_filepath: String,
}

impl From<DownloadInput> for DownloadRequest {
    fn from(input: DownloadInput) -> Self {
        DownloadRequest {
            id: input.id,
            credentials: StoreCredentials::new(input.s3_access_key, input.s3_secret_key),
            bucket: input.s3_bucket,
            object_name: input.s3_filename,
            local_path: PathBuf::from(input.local_filepath),
        }
    }
}

/// `/download` accepts the form on GET (query string) and POST (body);
/// `/download/{id}/status` returns the status text.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/download", get(start_download).post(start_download))
        .route("/download/{id}/status", get(download_status))
        .with_state(state)
}

/// Acknowledge immediately; the download runs on its own task.
async fn start_download(
    State(state): State<AppState>,
    Form(input): Form<DownloadInput>,
) -> StatusCode {
    if input.id.is_empty() {
        return StatusCode::BAD_REQUEST;
    }

    info!(
        "download_request: {} s3 file {}/{} -> {}",
        input.id, input.s3_bucket, input.s3_filename, input.local_filepath
    );

    spawn_download_task(state.registry.clone(), state.fetcher.clone(), input.into());
    StatusCode::OK
}

async fn download_status(State(state): State<AppState>, Path(id): Path<String>) -> String {
    let status = state.registry.status(&id).await;
    debug!("download_status_request: {} returning {}", id, status);
    status
}
