//! Download S3 objects to local disk on request and track their status.
//!
//! - `download`: request registry, download worker, HTTP commands
//! - `providers`: remote object store access
//! - `config`: command line and environment configuration
//! - `error`: download failure type

pub mod config;
pub mod download;
pub mod error;
pub mod providers;
