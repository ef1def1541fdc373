//! End-to-end run
//!
//! [`Orchestrator::run`] drives one job through every phase in order:
//! init, discovery/bootstrap, submit, rendezvous, retrieve, render and,
//! when requested, termination. Any fatal error aborts the run with its
//! phase attached; dropping the returned future cancels the run at its
//! current await point.

use chrono::{DateTime, Utc};
use courier_core::BackendError;
use courier_core::domain::CorrelationKey;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::{Channels, Collaborators};
use crate::error::{OrchestratorError, Phase, Result};
use crate::render::{render, write_document};
use crate::scheduler::{Rendezvous, RendezvousSettings};
use crate::service::{
    CoordinatorService, KeySource, Retriever, Submitter, TerminationHandler, write_stats,
};

/// What to run
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Local input file
    pub input: PathBuf,
    /// Where the rendered page is written
    pub output: PathBuf,
    /// Reclaim the coordinator once the job is done
    pub terminate: bool,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub key: CorrelationKey,
    pub coordinator_id: String,
    /// The coordinator was launched by this run
    pub launched: bool,
    /// Result queue polls until completion
    pub polls: u32,
    pub records: usize,
    pub skipped: usize,
    pub document: PathBuf,
    /// Set when stats were collected and written
    pub stats: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn stats_written(&self) -> bool {
        self.stats.is_some()
    }
}

pub struct Orchestrator {
    config: Config,
    collaborators: Collaborators,
    keys: Option<KeySource>,
}

impl Orchestrator {
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            keys: None,
        }
    }

    /// Replaces the random correlation key generator
    pub fn with_key_source(mut self, keys: KeySource) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves both queues and makes sure the bucket exists
    pub async fn init(&self) -> Result<Channels> {
        let queue = &self.collaborators.queue;
        let intake = queue
            .resolve_queue(&self.config.intake_queue)
            .await
            .map_err(|e| OrchestratorError::backend(Phase::Init, None, e))?;
        let results = queue
            .resolve_queue(&self.config.result_queue)
            .await
            .map_err(|e| OrchestratorError::backend(Phase::Init, None, e))?;

        match self.collaborators.blobs.create_bucket(&self.config.bucket).await {
            Ok(()) => info!("Created bucket {}", self.config.bucket),
            Err(e) if e.is_already_exists() => debug!("Bucket {} already exists", self.config.bucket),
            Err(e @ BackendError::Transport(_)) => {
                return Err(OrchestratorError::backend(Phase::Init, None, e));
            }
            Err(e) => warn!("Could not create bucket {}: {}", self.config.bucket, e),
        }

        debug!("Using intake queue {} and result queue {}", intake, results);
        Ok(Channels { intake, results })
    }

    /// Runs one job to completion
    pub async fn run(&self, request: RunRequest) -> Result<RunReport> {
        let started_at = Utc::now();
        let channels = self.init().await?;

        let coordinator = CoordinatorService::new(&self.collaborators, &self.config)
            .locate()
            .await?;

        let mut submitter = Submitter::new(&self.collaborators, &channels, &self.config);
        if let Some(keys) = &self.keys {
            submitter = submitter.with_key_source(keys.clone());
        }
        let job = submitter.submit(&request.input, request.terminate).await?;

        let completion = Rendezvous::new(
            self.collaborators.queue.clone(),
            channels.results.clone(),
            job.key.clone(),
            RendezvousSettings::from(&self.config),
        )
        .wait()
        .await?;

        let lines = Retriever::new(&self.collaborators, &self.config)
            .retrieve(&job.key)
            .await?;

        let document = render(&lines);
        write_document(&request.output, &document).await?;
        info!(
            "Wrote {} records for job {} to {}",
            document.records,
            job.key,
            request.output.display()
        );

        let stats = if job.terminate {
            let handler = TerminationHandler::new(&self.collaborators, &self.config);
            let data = handler.collect_stats(&job.key).await?;
            write_stats(&self.config.stats_path, &data).await?;
            handler.terminate(&job.key, &coordinator.id).await?;
            Some(self.config.stats_path.clone())
        } else {
            None
        };

        Ok(RunReport {
            key: job.key,
            coordinator_id: coordinator.id,
            launched: coordinator.launched,
            polls: completion.polls,
            records: document.records,
            skipped: document.skipped,
            document: request.output,
            stats,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
