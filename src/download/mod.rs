//! Object download module with streaming, status tracking, and retention
//!
//! Provides download functionality for S3 objects with:
//! - Streaming downloads to local disk, one task per request
//! - A single registry task owning all per-request status
//! - Periodic purge of bookkeeping and files past the retention window
//! - HTTP commands to submit downloads and poll their status

pub mod commands;
pub mod registry;
mod types;
pub mod worker;

pub use registry::{spawn_registry, RegistryConfig, RegistryHandle};
pub use types::{DownloadFile, DownloadRequest, DownloadStatus, UNKNOWN_STATUS};
pub use worker::{download, spawn_download_task};
