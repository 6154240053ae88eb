//! The primary node's command table and its two non-command operations
//! (`enqueue`, `kill_job`) — the seam an out-of-scope HTTP tier calls
//! into.

use crate::config::PrimaryConfig;
use anyhow::Context;
use mr_broker::{Broker, EntityError, Store};
use mr_dispatch::CommandHandler;
use mr_proto::command::CommandName;
use mr_proto::{Command, Job, JobStatus, Node, NodeStatus};
use uuid::Uuid;

/// Exactly one of these is supplied to [`PrimaryHandler::enqueue`] — the
/// enum itself enforces "blob XOR url" rather than a runtime assertion on
/// two optional fields.
pub enum EnqueueSource {
    Bytes(Vec<u8>),
    Url(String),
}

pub struct PrimaryHandler {
    broker: Broker,
    jobs: Store<Job>,
    nodes: Store<Node>,
    config: PrimaryConfig,
    version: String,
}

impl PrimaryHandler {
    pub fn new(broker: Broker, config: PrimaryConfig) -> Self {
        let jobs = Store::new(&broker);
        let nodes = Store::new(&broker);
        PrimaryHandler {
            broker,
            jobs,
            nodes,
            config,
            version: mr_sdk::ModelRunnerPackage::VERSION.to_string(),
        }
    }

    /// The queue this node's dispatcher should consume (carries
    /// `COMPLETE_JOB`).
    pub fn completion_queue_name(&self) -> &str {
        &self.config.primary_url
    }

    /// The channels this node's dispatcher should subscribe to: its own
    /// control channel plus the all-nodes broadcast.
    pub fn control_channel_names(&self) -> Vec<String> {
        vec![self.config.primary_url.clone(), "nodes".to_string()]
    }

    /// Create `{data_dir}/{uuid}/`, write `input.zip` from either supplied
    /// bytes or a streamed remote fetch, claim the job for this primary,
    /// and push `PROCESS_JOB` onto the model's queue.
    pub async fn enqueue(&self, mut job: Job, source: EnqueueSource) -> anyhow::Result<Job> {
        let job_dir = self.config.data_dir.join(job.uuid.to_string());
        tokio::fs::create_dir_all(&job_dir)
            .await
            .with_context(|| format!("creating job directory {}", job_dir.display()))?;

        match source {
            EnqueueSource::Bytes(bytes) => {
                tokio::fs::write(job_dir.join("input.zip"), bytes)
                    .await
                    .context("writing input.zip from supplied bytes")?;
            }
            EnqueueSource::Url(url) => {
                mr_transfer::fetch(&url, &job_dir, Some("input.zip"))
                    .await
                    .context("fetching input.zip from source url")?;
            }
        }

        job.primary_url = Some(self.config.primary_url.clone());
        job.primary_data_dir = Some(self.config.data_dir.to_string_lossy().into_owned());
        job.status = JobStatus::Queued;

        self.jobs.set(&job).await.context("persisting queued job")?;
        self.broker
            .enqueue(&job.model, &Command::process_job(job.uuid))
            .await
            .context("enqueueing PROCESS_JOB")?;

        Ok(job)
    }

    /// Three-way dispatch by the job's current status.
    pub async fn kill_job(&self, job_uuid: Uuid) -> anyhow::Result<()> {
        let mut job = match self.jobs.get(&job_uuid.to_string()).await {
            Ok(job) => job,
            Err(EntityError::NotFound(_)) => {
                tracing::warn!(%job_uuid, "kill_job for unknown job, dropping");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        match job.status {
            JobStatus::Queued => {
                self.broker
                    .remove(&job.model, &Command::process_job(job_uuid))
                    .await
                    .context("removing queued PROCESS_JOB")?;
                job.status = JobStatus::Killed;
                self.jobs.set(&job).await.context("persisting killed job")?;
            }
            JobStatus::Running => {
                let worker_url = job
                    .worker_url
                    .clone()
                    .context("running job is missing worker_url")?;
                let channel = format!("{};{}", worker_url, job.model);
                self.broker
                    .publish(&channel, &Command::kill_job(job_uuid))
                    .await
                    .context("publishing KILL_JOB to worker channel")?;
                // The worker owns the subsequent state transition.
            }
            other => {
                tracing::info!(%job_uuid, status = ?other, "kill_job is a no-op for this status");
            }
        }
        Ok(())
    }

    /// `COMPLETE_JOB`: pull the log (and, if the worker reported
    /// `PROCESSED`, the output archive too), then flip to `COMPLETE` only
    /// in the `PROCESSED` case. `FAILED`/`KILLED` jobs keep their status —
    /// the primary is only fetching their log in that case, and the
    /// terminal status must still read `FAILED`/`KILLED` once the log
    /// exists.
    async fn complete_job(&self, job_uuid: Uuid) -> anyhow::Result<()> {
        let mut job = match self.jobs.get(&job_uuid.to_string()).await {
            Ok(job) => job,
            Err(EntityError::NotFound(_)) => {
                tracing::warn!(%job_uuid, "COMPLETE_JOB for unknown job, dropping");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let worker_url = job
            .worker_url
            .clone()
            .context("job has no worker_url at COMPLETE_JOB")?;
        let worker_data_dir = job
            .worker_data_dir
            .clone()
            .context("job has no worker_data_dir at COMPLETE_JOB")?;

        let primary_job_dir = self.config.data_dir.join(job_uuid.to_string());
        tokio::fs::create_dir_all(&primary_job_dir)
            .await
            .context("creating primary job directory")?;

        let log_url = worker_artifact_url(&worker_url, &worker_data_dir, job_uuid, "job_log.txt");
        mr_transfer::fetch(&log_url, &primary_job_dir, Some("job_log.txt"))
            .await
            .context("fetching job log from worker")?;

        if job.status == JobStatus::Processed {
            let output_url = worker_artifact_url(&worker_url, &worker_data_dir, job_uuid, "output.zip");
            mr_transfer::fetch(&output_url, &primary_job_dir, Some("output.zip"))
                .await
                .context("fetching output archive from worker")?;
            job.status = JobStatus::Complete;
        }

        job.on_primary = true;
        self.jobs.set(&job).await.context("persisting completed job")?;
        Ok(())
    }

    /// `UPDATE_STATUS`: write this primary's own heartbeat record.
    async fn update_status(&self) -> anyhow::Result<()> {
        let node = Node::primary(self.config.primary_url.clone(), self.version.clone(), NodeStatus::Waiting);
        self.nodes.set(&node).await.context("persisting primary node status")?;
        Ok(())
    }
}

fn worker_artifact_url(worker_url: &str, worker_data_dir: &str, job_uuid: Uuid, file_name: &str) -> String {
    format!("{worker_url}/{worker_data_dir}/{job_uuid}/{file_name}")
}

#[async_trait::async_trait]
impl CommandHandler for PrimaryHandler {
    fn handles(&self, name: &str) -> bool {
        matches!(
            CommandName::parse(name),
            Some(CommandName::CompleteJob) | Some(CommandName::UpdateStatus)
        )
    }

    async fn handle(&self, command: &Command) {
        match CommandName::parse(&command.command) {
            Some(CommandName::CompleteJob) => match command.job_uuid {
                Some(job_uuid) => {
                    if let Err(err) = self.complete_job(job_uuid).await {
                        tracing::warn!(%err, %job_uuid, "failed to process COMPLETE_JOB");
                    }
                }
                None => tracing::warn!("COMPLETE_JOB missing job_uuid, dropping"),
            },
            Some(CommandName::UpdateStatus) => {
                if let Err(err) = self.update_status().await {
                    tracing::warn!(%err, "failed to write primary node status");
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_artifact_url_joins_worker_url_data_dir_uuid_and_file_name() {
        let job_uuid = Uuid::nil();
        let url = worker_artifact_url("http://worker.example", "data", job_uuid, "output.zip");
        assert_eq!(url, format!("http://worker.example/data/{job_uuid}/output.zip"));
    }
}
