use serde::Deserialize;
use std::path::PathBuf;

/// App-level MQ configuration, shared by server and worker.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether MQ is enabled. Default: true.
    /// Note: Worker ignores this field (always requires MQ).
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue for judge jobs (server publishes, worker consumes). Default: "judge_jobs".
    #[serde(default = "default_mq_job_queue")]
    pub job_queue: String,
    /// Queue for judge updates (worker publishes, server consumes). Default: "judge_updates".
    #[serde(default = "default_mq_update_queue")]
    pub update_queue: String,
    /// Dead letter queue. Default: "judge_dlq".
    #[serde(default = "default_mq_dlq_queue")]
    pub dlq_queue: String,
}

fn default_mq_enabled() -> bool {
    true
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_job_queue() -> String {
    "judge_jobs".into()
}
fn default_mq_update_queue() -> String {
    "judge_updates".into()
}
fn default_mq_dlq_queue() -> String {
    "judge_dlq".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            job_queue: default_mq_job_queue(),
            update_queue: default_mq_update_queue(),
            dlq_queue: default_mq_dlq_queue(),
        }
    }
}

/// Blob store configuration, shared by server and worker. Both sides must
/// point at the same root for refs to resolve.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Root directory for the content-addressed store. Default: "data/blobs".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Maximum blob size in bytes. Default: 16 MiB.
    #[serde(default = "default_storage_max_bytes")]
    pub max_bytes: u64,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data/blobs")
}
fn default_storage_max_bytes() -> u64 {
    16 * 1024 * 1024
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_bytes: default_storage_max_bytes(),
        }
    }
}

/// Retry policy for MQ consumers.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RetryAppConfig {
    /// Maximum retries before dead-lettering. Default: 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Base backoff delay in milliseconds. Default: 1000.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Backoff cap in milliseconds. Default: 30000.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_max_retries() -> u8 {
    3
}
fn default_backoff_base_ms() -> u64 {
    1000
}
fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for RetryAppConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}
