use clap::Parser;
use std::time::Duration;

use crate::download::RegistryConfig;
use crate::providers::AwsConfig;

/// Port the service listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8090;

/// Top-level configuration for the download service.
#[derive(Debug, Clone, Parser)]
#[command(name = "s3-download-manager")]
#[command(about = "Download S3 objects to local disk and report their status over HTTP")]
#[command(version)]
pub struct ServiceConfig {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "S3DL_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(long, env = "S3DL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds a download's status and file are kept after it starts.
    #[arg(long, env = "S3DL_RETENTION_SECS", default_value_t = 24 * 60 * 60)]
    pub retention_secs: u64,

    /// Milliseconds between sweeps for expired downloads.
    #[arg(long, env = "S3DL_SWEEP_INTERVAL_MS", default_value_t = 1000)]
    pub sweep_interval_ms: u64,

    #[arg(long, env = "S3DL_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Custom endpoint for S3-compatible stores, e.g. http://localhost:9000.
    #[arg(long, env = "S3DL_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    #[arg(long, env = "S3DL_FORCE_PATH_STYLE")]
    pub force_path_style: bool,
}

impl ServiceConfig {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            retention: Duration::from_secs(self.retention_secs),
            sweep_interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }

    pub fn aws_config(&self) -> AwsConfig {
        AwsConfig {
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
        }
    }
}
