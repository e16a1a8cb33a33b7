use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};

use async_trait::async_trait;

use foreman_job_store::{JobStoreError, JobStream};
use foreman_jobs_domain::{Job, JobStatus, TaskResult, Workflow};

const STREAM_BUFFER: usize = 16;

pub struct MemoryJobStore {
    inner: Arc<Mutex<Inner>>,
    closed: AtomicBool,
}

struct Inner {
    workflows: HashMap<String, Workflow>,
    workflow_order: Vec<String>,
    jobs: HashMap<String, Job>,
    /// Job ids in insertion order; the backlog scan yields in this order.
    job_order: Vec<String>,
}

impl MemoryJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                workflows: HashMap::new(),
                workflow_order: Vec::new(),
                jobs: HashMap::new(),
                job_order: Vec::new(),
            })),
            closed: AtomicBool::new(false),
        }
    }

    fn check_closed(&self) -> Result<(), JobStoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(JobStoreError::Other("store is closed".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

#[async_trait]
impl foreman_job_store::JobStore for MemoryJobStore {
    async fn insert_workflows(&self, workflows: Vec<Workflow>) -> Result<usize, JobStoreError> {
        self.check_closed()?;
        let mut inner = self.inner.lock().await;

        // Validate the whole batch before writing anything, so a rejected
        // batch leaves no partial state.
        let mut seen: Vec<&str> = Vec::with_capacity(workflows.len());
        for workflow in &workflows {
            if workflow.name.is_empty() {
                return Err(JobStoreError::MissingWorkflowName);
            }
            if inner.workflows.contains_key(&workflow.name)
                || seen.contains(&workflow.name.as_str())
            {
                return Err(JobStoreError::WorkflowAlreadyExists(workflow.name.clone()));
            }
            seen.push(&workflow.name);
        }

        let count = workflows.len();
        for workflow in workflows {
            inner.workflow_order.push(workflow.name.clone());
            inner.workflows.insert(workflow.name.clone(), workflow);
        }
        Ok(count)
    }

    async fn get_workflow_by_name(&self, name: &str) -> Result<Workflow, JobStoreError> {
        self.check_closed()?;
        let inner = self.inner.lock().await;
        inner
            .workflows
            .get(name)
            .cloned()
            .ok_or_else(|| JobStoreError::WorkflowNotFound(name.to_string()))
    }

    async fn get_workflows(&self) -> Result<Vec<Workflow>, JobStoreError> {
        self.check_closed()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .workflow_order
            .iter()
            .filter_map(|name| inner.workflows.get(name).cloned())
            .collect())
    }

    async fn insert_job(&self, mut job: Job) -> Result<Job, JobStoreError> {
        self.check_closed()?;
        job.id = ulid::Ulid::new().to_string();
        job.insert_time = now_millis();
        job.status = JobStatus::Pending;
        job.results.clear();

        let mut inner = self.inner.lock().await;
        inner.job_order.push(job.id.clone());
        inner.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn acquire_job(&self, job: &Job) -> Result<Option<Job>, JobStoreError> {
        self.check_closed()?;
        let mut inner = self.inner.lock().await;

        // Test-and-set under the store lock. A missing or non-pending
        // candidate is a claim-miss, not an error.
        let Some(stored) = inner.jobs.get_mut(&job.id) else {
            return Ok(None);
        };
        if stored.status != JobStatus::Pending {
            return Ok(None);
        }
        stored.status = JobStatus::Processing;
        Ok(Some(stored.clone()))
    }

    async fn update_job_add_result(
        &self,
        job: &Job,
        result: TaskResult,
    ) -> Result<(), JobStoreError> {
        self.check_closed()?;
        let mut inner = self.inner.lock().await;
        let stored = inner
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| JobStoreError::JobNotFound(job.id.clone()))?;
        stored.results.push(result);
        Ok(())
    }

    async fn update_job_status(&self, job: &Job, status: JobStatus) -> Result<(), JobStoreError> {
        self.check_closed()?;
        let mut inner = self.inner.lock().await;
        let stored = inner
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| JobStoreError::JobNotFound(job.id.clone()))?;
        stored.status = stored
            .status
            .transition_to(status)
            .map_err(|e| JobStoreError::InvalidStatus(e.to_string()))?;
        Ok(())
    }

    async fn get_job_by_name_and_id(
        &self,
        workflow_name: &str,
        id: &str,
    ) -> Result<Job, JobStoreError> {
        self.check_closed()?;
        let inner = self.inner.lock().await;
        inner
            .jobs
            .get(id)
            .filter(|job| job.workflow_name == workflow_name)
            .cloned()
            .ok_or_else(|| JobStoreError::JobNotFound(id.to_string()))
    }

    async fn get_jobs(&self) -> Result<JobStream, JobStoreError> {
        self.check_closed()?;

        // Snapshot ids under the lock, then feed the channel from a task
        // so a slow consumer never holds the store lock.
        let snapshot: Vec<Job> = {
            let inner = self.inner.lock().await;
            inner
                .job_order
                .iter()
                .filter_map(|id| inner.jobs.get(id).cloned())
                .collect()
        };

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            for job in snapshot {
                if tx.send(Ok(job)).await.is_err() {
                    // Receiver dropped; stop feeding.
                    return;
                }
            }
            tracing::debug!("backlog stream exhausted");
        });
        Ok(rx)
    }

    async fn ping(&self) -> Result<bool, JobStoreError> {
        Ok(true)
    }

    async fn close(&self) -> Result<(), JobStoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
