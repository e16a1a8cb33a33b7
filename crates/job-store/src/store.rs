use async_trait::async_trait;
use tokio::sync::mpsc;

use foreman_jobs_domain::{Job, JobStatus, TaskResult, Workflow};

use crate::error::JobStoreError;

/// Backlog stream handle. Jobs arrive incrementally from a snapshot-style
/// scan; the feeder stops when the receiver is dropped. Mid-scan store
/// failures arrive in-band as `Err` items.
pub type JobStream = mpsc::Receiver<Result<Job, JobStoreError>>;

/// Durable job/workflow store. Workers in separate processes share no
/// memory; all claim coordination is the atomicity of `acquire_job` at
/// this boundary.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Register workflow definitions. Rejects an empty name and a name
    /// already present (including duplicates within the batch); a
    /// rejected batch writes nothing. Returns the number inserted.
    async fn insert_workflows(&self, workflows: Vec<Workflow>) -> Result<usize, JobStoreError>;

    async fn get_workflow_by_name(&self, name: &str) -> Result<Workflow, JobStoreError>;

    /// Full snapshot of registered workflows.
    async fn get_workflows(&self) -> Result<Vec<Workflow>, JobStoreError>;

    /// Persist a job as pending. Assigns `id` and `insert_time` and
    /// returns the canonical stored form.
    async fn insert_job(&self, job: Job) -> Result<Job, JobStoreError>;

    /// Atomically transition the candidate from pending to processing.
    ///
    /// Under arbitrary concurrent invocation at most one caller observes
    /// `Some` for a given job; every other caller, and any caller whose
    /// candidate is missing or no longer pending, observes `None`. The
    /// returned job carries status processing, never a partial update.
    async fn acquire_job(&self, job: &Job) -> Result<Option<Job>, JobStoreError>;

    /// Append one result to the job. Order-preserving; does not disturb
    /// status or previously appended results.
    async fn update_job_add_result(
        &self,
        job: &Job,
        result: TaskResult,
    ) -> Result<(), JobStoreError>;

    /// Write the job's status. Callers are responsible for invoking this
    /// only at legal state-machine edges; implementations may reject
    /// illegal transitions with `InvalidStatus`.
    async fn update_job_status(&self, job: &Job, status: JobStatus) -> Result<(), JobStoreError>;

    async fn get_job_by_name_and_id(
        &self,
        workflow_name: &str,
        id: &str,
    ) -> Result<Job, JobStoreError>;

    /// Stream every stored job without materializing the backlog.
    async fn get_jobs(&self) -> Result<JobStream, JobStoreError>;

    // Health
    async fn ping(&self) -> Result<bool, JobStoreError>;

    async fn close(&self) -> Result<(), JobStoreError>;
}

#[derive(Debug, Clone)]
pub struct JobStoreConfig {
    pub url: String,
}
