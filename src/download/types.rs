//! Download status, artifact and request types

use std::fmt;
use std::path::PathBuf;

use crate::providers::StoreCredentials;

/// Status text returned for ids the registry has never seen or already purged
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Running,
    Completed,
    Failed(String),
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Running => write!(f, "RUNNING"),
            DownloadStatus::Completed => write!(f, "COMPLETED"),
            DownloadStatus::Failed(detail) => write!(f, "FAILED {}", detail),
        }
    }
}

/// A fully written local copy of a remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFile {
    pub id: String,
    pub object_name: String,
    pub local_path: PathBuf,
}

/// Everything a worker needs to fetch one object
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub id: String,
    pub credentials: StoreCredentials,
    pub bucket: String,
    pub object_name: String,
    pub local_path: PathBuf,
}
