use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::transcoder::TranscoderConfig;

/// Hard ceiling on files per batch.
pub const MAX_BATCH_SIZE: usize = 5;

/// Default per-file upload ceiling (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with a front-end bundle served as fallback (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Local storage for staged uploads and converted outputs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// How long completed jobs and stale uploads are kept, in seconds.
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
    /// Interval of the background cleanup sweep, in seconds (0 disables it).
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            retention_secs: default_retention(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("temp_uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("temp_outputs")
}

fn default_retention() -> u64 {
    3600 // 1 hour
}

fn default_cleanup_interval() -> u64 {
    600
}

/// Upload limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_file_size_bytes: default_max_file_size(),
        }
    }
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE_BYTES
}

/// Progress channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressConfig {
    /// Buffer of each per-job broadcast channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    64
}

/// Sanitized config for API responses (local paths hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub limits: LimitsConfig,
    pub retention_secs: u64,
    pub transcoder: SanitizedTranscoderConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub port: u16,
    pub serves_static: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTranscoderConfig {
    pub timeout_secs: u64,
    pub output_extension: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: SanitizedServerConfig {
                port: config.server.port,
                serves_static: config.server.static_dir.is_some(),
            },
            limits: config.limits.clone(),
            retention_secs: config.storage.retention_secs,
            transcoder: SanitizedTranscoderConfig {
                timeout_secs: config.transcoder.timeout_secs,
                output_extension: crate::transcoder::DOCX_EXTENSION.to_string(),
            },
        }
    }
}
