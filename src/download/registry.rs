//! Request registry - the single owner of download bookkeeping
//!
//! Workers and the front end talk to the registry through a cloneable
//! [`RegistryHandle`]. Every report and query travels over one channel to a
//! background task, which is the only code that touches the maps. The same
//! task sweeps expired entries on a timer, but a pending message is always
//! handled before a sweep.

use chrono::Utc;
use log::{info, warn};
use std::collections::HashMap;
use std::io;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::types::{DownloadFile, DownloadStatus, UNKNOWN_STATUS};

/// How long bookkeeping and artifacts are kept (24 hours)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// How often expired entries are looked for (1 second)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

enum RegistryMessage {
    Started {
        id: String,
    },
    FileProduced(DownloadFile),
    StatusChanged {
        id: String,
        status: DownloadStatus,
    },
    Status {
        id: String,
        respond: oneshot::Sender<Option<DownloadStatus>>,
    },
    Artifact {
        id: String,
        respond: oneshot::Sender<Option<DownloadFile>>,
    },
}

impl std::fmt::Debug for RegistryMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryMessage::Started { id } => write!(f, "Started({})", id),
            RegistryMessage::FileProduced(file) => write!(f, "FileProduced({})", file.id),
            RegistryMessage::StatusChanged { id, status } => {
                write!(f, "StatusChanged({}, {})", id, status)
            }
            RegistryMessage::Status { id, .. } => write!(f, "Status({})", id),
            RegistryMessage::Artifact { id, .. } => write!(f, "Artifact({})", id),
        }
    }
}

/// Entry removed by a sweep
#[derive(Debug, PartialEq)]
struct Purged {
    id: String,
    file: Option<DownloadFile>,
}

#[derive(Debug, Default)]
struct RegistryState {
    started: HashMap<String, Instant>,
    files: HashMap<String, DownloadFile>,
    statuses: HashMap<String, DownloadStatus>,
}

impl RegistryState {
    /// Record first sight of `id`. Later calls keep the original start time.
    fn record_started(&mut self, id: String, now: Instant) -> bool {
        if self.started.contains_key(&id) {
            return false;
        }
        self.started.insert(id, now);
        true
    }

    fn record_file(&mut self, file: DownloadFile) {
        self.files.insert(file.id.clone(), file);
    }

    fn record_status(&mut self, id: String, status: DownloadStatus) {
        self.statuses.insert(id, status);
    }

    fn status(&self, id: &str) -> Option<&DownloadStatus> {
        self.statuses.get(id)
    }

    fn artifact(&self, id: &str) -> Option<&DownloadFile> {
        self.files.get(id)
    }

    /// Drop every entry started at least `retention` before `now`.
    fn take_expired(&mut self, now: Instant, retention: Duration) -> Vec<Purged> {
        let expired: Vec<String> = self
            .started
            .iter()
            .filter(|(_, started)| now.saturating_duration_since(**started) >= retention)
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .map(|id| {
                self.started.remove(&id);
                self.statuses.remove(&id);
                let file = self.files.remove(&id);
                Purged { id, file }
            })
            .collect()
    }

    fn apply(&mut self, message: RegistryMessage, now: Instant) {
        match message {
            RegistryMessage::Started { id } => {
                if self.record_started(id.clone(), now) {
                    info!("download_started: {} at {}", id, Utc::now().to_rfc3339());
                } else {
                    info!("download_restarted: {} keeps original start time", id);
                }
            }
            RegistryMessage::FileProduced(file) => {
                info!(
                    "download_file: {} local file {} created",
                    file.id,
                    file.local_path.display()
                );
                self.record_file(file);
            }
            RegistryMessage::StatusChanged { id, status } => {
                info!("download_status: {} -> {}", id, status);
                self.record_status(id, status);
            }
            RegistryMessage::Status { id, respond } => {
                let _ = respond.send(self.status(&id).cloned());
            }
            RegistryMessage::Artifact { id, respond } => {
                let _ = respond.send(self.artifact(&id).cloned());
            }
        }
    }
}

/// Cloneable handle to a running registry
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    sender: mpsc::UnboundedSender<RegistryMessage>,
}

impl RegistryHandle {
    pub fn download_started(&self, id: &str) {
        self.send(RegistryMessage::Started { id: id.to_string() });
    }

    pub fn file_produced(&self, file: DownloadFile) {
        self.send(RegistryMessage::FileProduced(file));
    }

    pub fn status_changed(&self, id: &str, status: DownloadStatus) {
        self.send(RegistryMessage::StatusChanged {
            id: id.to_string(),
            status,
        });
    }

    /// Latest status for `id`, or `None` if it was never seen or has been purged.
    pub async fn latest_status(&self, id: &str) -> Option<DownloadStatus> {
        let (respond, receive) = oneshot::channel();
        self.send(RegistryMessage::Status {
            id: id.to_string(),
            respond,
        });
        receive.await.ok().flatten()
    }

    /// Status text for `id` as served to callers.
    pub async fn status(&self, id: &str) -> String {
        match self.latest_status(id).await {
            Some(status) => status.to_string(),
            None => UNKNOWN_STATUS.to_string(),
        }
    }

    /// The completed artifact for `id`, if one is still tracked.
    pub async fn artifact(&self, id: &str) -> Option<DownloadFile> {
        let (respond, receive) = oneshot::channel();
        self.send(RegistryMessage::Artifact {
            id: id.to_string(),
            respond,
        });
        receive.await.ok().flatten()
    }

    fn send(&self, message: RegistryMessage) {
        if let Err(e) = self.sender.send(message) {
            warn!("registry_closed: dropping {:?}", e.0);
        }
    }
}

/// Start the registry task. It runs until every handle has been dropped.
pub fn spawn_registry(config: RegistryConfig) -> (RegistryHandle, JoinHandle<()>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_registry(config, receiver));
    (RegistryHandle { sender }, task)
}

async fn run_registry(
    config: RegistryConfig,
    mut receiver: mpsc::UnboundedReceiver<RegistryMessage>,
) {
    let mut state = RegistryState::default();
    let period = config.sweep_interval.max(Duration::from_millis(1));
    let mut sweep = tokio::time::interval(period);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "registry_started: retention={:?} sweep_interval={:?}",
        config.retention, config.sweep_interval
    );

    loop {
        tokio::select! {
            biased;
            message = receiver.recv() => match message {
                Some(message) => state.apply(message, Instant::now()),
                None => break,
            },
            _ = sweep.tick() => {
                let purged = state.take_expired(Instant::now(), config.retention);
                if !purged.is_empty() {
                    tokio::spawn(purge(purged));
                }
            }
        }
    }

    info!("registry_stopped");
}

/// Remove the files of purged entries. Runs off the registry task so file
/// deletion never holds up the message lane.
async fn purge(purged: Vec<Purged>) {
    for Purged { id, file } in purged {
        info!("download_purge: {} forgetting download", id);
        let Some(file) = file else {
            continue;
        };

        info!(
            "download_purge: {} removing stored file {}",
            id,
            file.local_path.display()
        );
        match tokio::fs::remove_file(&file.local_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "download_purge: {} failed to remove {}: {}",
                id,
                file.local_path.display(),
                e
            ),
        }
    }
}
