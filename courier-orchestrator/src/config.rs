//! Orchestrator configuration
//!
//! Defines every tunable of a run: gateway location, bucket and queue names,
//! bootstrap inputs, poll and retry timing, and local output paths.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{OrchestratorError, Result};

/// Largest batch a queue receive may request
pub const MAX_RECEIVE_BATCH: usize = 10;

/// Orchestrator configuration
///
/// All timeouts and intervals are configurable so tests and slow
/// deployments can tune them independently.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cloud gateway base URL (e.g., "http://localhost:9000")
    pub gateway_url: String,

    /// Bucket holding inputs, summaries, stats and launch artifacts
    pub bucket: String,

    /// Queue the coordinator reads job announcements from
    pub intake_queue: String,

    /// Queue the coordinator posts completion signals to
    pub result_queue: String,

    /// Role tag identifying the coordinator node
    pub coordinator_tag: String,

    /// Directory holding the coordinator and worker launch artifacts
    pub artifact_dir: PathBuf,

    /// Script the coordinator node runs on first boot
    pub bootstrap_script: PathBuf,

    /// Items each worker handles, passed to a freshly launched coordinator
    pub tasks_per_worker: u32,

    /// Delay between result queue polls
    pub poll_interval: Duration,

    /// Messages requested per poll
    pub receive_batch: usize,

    /// Longest wait for the completion signal; `None` waits forever
    pub rendezvous_timeout: Option<Duration>,

    /// Foreign completion bodies remembered before the oldest is evicted
    pub dedup_capacity: usize,

    /// Summary reads attempted before giving up on a missing summary
    pub fetch_attempts: u32,

    /// Longest wait for the stats blob after completion
    pub stats_timeout: Duration,

    /// Key prefix of archived summaries
    pub archive_prefix: String,

    /// Local file receiving the run statistics
    pub stats_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:9000".to_string(),
            bucket: "courier-jobs".to_string(),
            intake_queue: "local_manager_queue".to_string(),
            result_queue: "manager_local_queue".to_string(),
            coordinator_tag: "coordinator".to_string(),
            artifact_dir: PathBuf::from("Resources"),
            bootstrap_script: PathBuf::from("Resources/manager.sh"),
            tasks_per_worker: 100,
            poll_interval: Duration::from_secs(1),
            receive_batch: MAX_RECEIVE_BATCH,
            rendezvous_timeout: Some(Duration::from_secs(3600)),
            dedup_capacity: 4096,
            fetch_attempts: 5,
            stats_timeout: Duration::from_secs(600),
            archive_prefix: "ZZZ_oldSummaries/".to_string(),
            stats_path: PathBuf::from("Stats"),
        }
    }
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Every variable is optional; missing or unparseable values keep the default.
    /// - COURIER_GATEWAY_URL
    /// - COURIER_BUCKET
    /// - COURIER_INTAKE_QUEUE, COURIER_RESULT_QUEUE
    /// - COURIER_COORDINATOR_TAG
    /// - COURIER_ARTIFACT_DIR, COURIER_BOOTSTRAP_SCRIPT
    /// - COURIER_TASKS_PER_WORKER
    /// - COURIER_POLL_INTERVAL_MS
    /// - COURIER_RECEIVE_BATCH
    /// - COURIER_RENDEZVOUS_TIMEOUT (seconds, 0 = wait forever)
    /// - COURIER_DEDUP_CAPACITY
    /// - COURIER_FETCH_ATTEMPTS
    /// - COURIER_STATS_TIMEOUT (seconds)
    /// - COURIER_ARCHIVE_PREFIX
    /// - COURIER_STATS_PATH
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let rendezvous_timeout = match env_parse::<u64>("COURIER_RENDEZVOUS_TIMEOUT") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.rendezvous_timeout,
        };

        Self {
            gateway_url: env_string("COURIER_GATEWAY_URL").unwrap_or(defaults.gateway_url),
            bucket: env_string("COURIER_BUCKET").unwrap_or(defaults.bucket),
            intake_queue: env_string("COURIER_INTAKE_QUEUE").unwrap_or(defaults.intake_queue),
            result_queue: env_string("COURIER_RESULT_QUEUE").unwrap_or(defaults.result_queue),
            coordinator_tag: env_string("COURIER_COORDINATOR_TAG")
                .unwrap_or(defaults.coordinator_tag),
            artifact_dir: env_string("COURIER_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            bootstrap_script: env_string("COURIER_BOOTSTRAP_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.bootstrap_script),
            tasks_per_worker: env_parse("COURIER_TASKS_PER_WORKER")
                .unwrap_or(defaults.tasks_per_worker),
            poll_interval: env_parse("COURIER_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            receive_batch: env_parse("COURIER_RECEIVE_BATCH").unwrap_or(defaults.receive_batch),
            rendezvous_timeout,
            dedup_capacity: env_parse("COURIER_DEDUP_CAPACITY")
                .unwrap_or(defaults.dedup_capacity),
            fetch_attempts: env_parse("COURIER_FETCH_ATTEMPTS").unwrap_or(defaults.fetch_attempts),
            stats_timeout: env_parse("COURIER_STATS_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.stats_timeout),
            archive_prefix: env_string("COURIER_ARCHIVE_PREFIX")
                .unwrap_or(defaults.archive_prefix),
            stats_path: env_string("COURIER_STATS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.stats_path),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.gateway_url.starts_with("http://") && !self.gateway_url.starts_with("https://")
        {
            return Err(invalid("gateway_url must start with http:// or https://"));
        }

        if self.bucket.is_empty() {
            return Err(invalid("bucket cannot be empty"));
        }

        if self.intake_queue.is_empty() || self.result_queue.is_empty() {
            return Err(invalid("queue names cannot be empty"));
        }

        if self.intake_queue == self.result_queue {
            return Err(invalid("intake and result queues must differ"));
        }

        if self.coordinator_tag.is_empty() {
            return Err(invalid("coordinator_tag cannot be empty"));
        }

        if self.tasks_per_worker == 0 {
            return Err(invalid("tasks_per_worker must be greater than 0"));
        }

        if self.poll_interval.is_zero() {
            return Err(invalid("poll_interval must be greater than 0"));
        }

        if self.receive_batch == 0 || self.receive_batch > MAX_RECEIVE_BATCH {
            return Err(invalid("receive_batch must be between 1 and 10"));
        }

        if self.dedup_capacity == 0 {
            return Err(invalid("dedup_capacity must be greater than 0"));
        }

        if self.fetch_attempts == 0 {
            return Err(invalid("fetch_attempts must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> OrchestratorError {
    OrchestratorError::Config(message.to_string())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|s| s.parse::<T>().ok())
}
