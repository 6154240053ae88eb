//! `Job`: one instance of running a model over an input archive.

use crate::dated::iso8601_micros;
use crate::entity::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the seven states a job passes through from creation to its
/// terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Created,
    Queued,
    Running,
    Processed,
    Complete,
    Failed,
    Killed,
}

impl JobStatus {
    /// `COMPLETE`, `FAILED`, `KILLED` are terminal; nothing transitions out
    /// of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed | JobStatus::Killed)
    }

    /// A job in this status must have `worker_url`/`worker_data_dir` set
    /// (the invariant from the data model table).
    pub fn requires_worker_claim(self) -> bool {
        matches!(
            self,
            JobStatus::Running | JobStatus::Processed | JobStatus::Failed | JobStatus::Killed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub uuid: Uuid,
    pub model: String,
    pub name: String,
    #[serde(with = "iso8601_micros")]
    pub created: DateTime<Utc>,
    pub status: JobStatus,
    pub primary_url: Option<String>,
    pub primary_data_dir: Option<String>,
    pub worker_url: Option<String>,
    pub worker_data_dir: Option<String>,
    pub on_primary: bool,
}

impl Job {
    /// A brand-new job: `CREATED`, nothing claimed, `on_primary = true`
    /// (its artifacts live wherever the web tier wrote `input.zip`, which
    /// this core treats as primary-owned from the start).
    pub fn new(model: impl Into<String>, name: impl Into<String>, created: DateTime<Utc>) -> Self {
        Job {
            uuid: Uuid::new_v4(),
            model: model.into(),
            name: name.into(),
            created,
            status: JobStatus::Created,
            primary_url: None,
            primary_data_dir: None,
            worker_url: None,
            worker_data_dir: None,
            on_primary: true,
        }
    }

    /// The node URL and data-dir component currently holding this job's
    /// artifacts of record, per `on_primary`.
    fn current_location(&self) -> (Option<&str>, Option<&str>) {
        if self.on_primary {
            (self.primary_url.as_deref(), self.primary_data_dir.as_deref())
        } else {
            (self.worker_url.as_deref(), self.worker_data_dir.as_deref())
        }
    }

    /// `{node_url}/{data_dir}/{uuid}/job_log.txt`, or `None` if the owning
    /// node isn't known yet.
    pub fn log_url(&self) -> Option<String> {
        let (url, dir) = self.current_location();
        Some(format!("{}/{}/{}/job_log.txt", url?, dir?, self.uuid))
    }

    /// `{node_url}/{data_dir}/{uuid}/output.zip`, or `None` if the owning
    /// node isn't known yet.
    pub fn download_url(&self) -> Option<String> {
        let (url, dir) = self.current_location();
        Some(format!("{}/{}/{}/output.zip", url?, dir?, self.uuid))
    }
}

impl Entity for Job {
    fn hash_name() -> &'static str {
        "jobs"
    }

    fn key(&self) -> String {
        self.uuid.to_string()
    }
}
