use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use foreman_job_store::{JobStoreConfig, JobStoreError, JobStream};
use foreman_jobs_domain::keys::{self, fields};
use foreman_jobs_domain::{Job, JobStatus, TaskResult, Workflow};

use crate::error::map_redis_err;

/// Claim is a single conditional status swap executed server-side, so
/// workers in separate processes coordinate without shared memory.
const ACQUIRE_SCRIPT: &str = r#"
local cur = redis.call('HGET', KEYS[1], ARGV[1])
if cur == ARGV[2] then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
    return 1
else
    return 0
end
"#;

const STREAM_BUFFER: usize = 16;
const SCAN_COUNT: usize = 100;

pub struct RedisJobStore {
    conn: redis::aio::ConnectionManager,
    closed: AtomicBool,
}

impl RedisJobStore {
    pub async fn connect(config: JobStoreConfig) -> Result<Self, JobStoreError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| JobStoreError::Connection(e.to_string()))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(|e| JobStoreError::Connection(e.to_string()))?;
        Ok(Self {
            conn,
            closed: AtomicBool::new(false),
        })
    }

    fn check_closed(&self) -> Result<(), JobStoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(JobStoreError::Other("store is closed".to_string()));
        }
        Ok(())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}

/// Read one job record (hash + results list). `None` when no record
/// exists under the id.
async fn load_job(
    conn: &mut redis::aio::ConnectionManager,
    id: &str,
) -> Result<Option<Job>, JobStoreError> {
    let record: HashMap<String, String> = redis::cmd("HGETALL")
        .arg(keys::job_key(id))
        .query_async(conn)
        .await
        .map_err(map_redis_err)?;
    if record.is_empty() {
        return Ok(None);
    }

    let field = |name: &str| {
        record
            .get(name)
            .cloned()
            .ok_or_else(|| JobStoreError::Other(format!("job {id} missing field {name}")))
    };

    let status_raw = field(fields::job::STATUS)?;
    let status_code: u8 = status_raw
        .parse()
        .map_err(|_| JobStoreError::InvalidStatus(status_raw.clone()))?;
    let status =
        JobStatus::from_code(status_code).map_err(|e| JobStoreError::InvalidStatus(e.to_string()))?;

    let input_parameters = serde_json::from_str(&field(fields::job::INPUT_PARAMETERS)?)?;
    let insert_time: u64 = field(fields::job::INSERT_TIME)?
        .parse()
        .map_err(|e| JobStoreError::Other(format!("job {id} bad insert_time: {e}")))?;

    let raw_results: Vec<String> = redis::cmd("LRANGE")
        .arg(keys::job_results_key(id))
        .arg(0)
        .arg(-1)
        .query_async(conn)
        .await
        .map_err(map_redis_err)?;
    let results = raw_results
        .iter()
        .map(|raw| serde_json::from_str::<TaskResult>(raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Job {
        id: field(fields::job::ID)?,
        workflow_name: field(fields::job::WORKFLOW_NAME)?,
        input_parameters,
        status,
        results,
        insert_time,
    }))
}

#[async_trait]
impl foreman_job_store::JobStore for RedisJobStore {
    async fn insert_workflows(&self, workflows: Vec<Workflow>) -> Result<usize, JobStoreError> {
        self.check_closed()?;

        // Reject bad input before touching the store.
        let mut seen: Vec<&str> = Vec::with_capacity(workflows.len());
        for workflow in &workflows {
            if workflow.name.is_empty() {
                return Err(JobStoreError::MissingWorkflowName);
            }
            if seen.contains(&workflow.name.as_str()) {
                return Err(JobStoreError::WorkflowAlreadyExists(workflow.name.clone()));
            }
            seen.push(&workflow.name);
        }

        let mut conn = self.conn.clone();
        let mut count = 0;
        for workflow in &workflows {
            let json = serde_json::to_string(workflow)?;
            // NX makes duplicate rejection atomic under concurrent inserts.
            let set: Option<String> = redis::cmd("SET")
                .arg(keys::workflow_key(&workflow.name))
                .arg(&json)
                .arg("NX")
                .query_async(&mut conn)
                .await
                .map_err(map_redis_err)?;
            if set.is_none() {
                return Err(JobStoreError::WorkflowAlreadyExists(workflow.name.clone()));
            }
            count += 1;
        }
        Ok(count)
    }

    async fn get_workflow_by_name(&self, name: &str) -> Result<Workflow, JobStoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        let json: Option<String> = redis::cmd("GET")
            .arg(keys::workflow_key(name))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        let Some(json) = json else {
            return Err(JobStoreError::WorkflowNotFound(name.to_string()));
        };
        Ok(serde_json::from_str(&json)?)
    }

    async fn get_workflows(&self) -> Result<Vec<Workflow>, JobStoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", keys::workflows_prefix());

        let mut workflows = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, found): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_err)?;

            for key in found {
                let json: Option<String> = redis::cmd("GET")
                    .arg(&key)
                    .query_async(&mut conn)
                    .await
                    .map_err(map_redis_err)?;
                if let Some(json) = json {
                    workflows.push(serde_json::from_str(&json)?);
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(workflows)
    }

    async fn insert_job(&self, mut job: Job) -> Result<Job, JobStoreError> {
        self.check_closed()?;
        job.id = ulid::Ulid::new().to_string();
        job.insert_time = now_millis();
        job.status = JobStatus::Pending;
        job.results.clear();

        let params_json = serde_json::to_string(&job.input_parameters)?;
        let mut conn = self.conn.clone();
        redis::cmd("HSET")
            .arg(keys::job_key(&job.id))
            .arg(fields::job::ID)
            .arg(&job.id)
            .arg(fields::job::WORKFLOW_NAME)
            .arg(&job.workflow_name)
            .arg(fields::job::INPUT_PARAMETERS)
            .arg(&params_json)
            .arg(fields::job::STATUS)
            .arg(i64::from(job.status.code()))
            .arg(fields::job::INSERT_TIME)
            .arg(job.insert_time)
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)?;

        Ok(job)
    }

    async fn acquire_job(&self, job: &Job) -> Result<Option<Job>, JobStoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();

        let claimed: i32 = redis::Script::new(ACQUIRE_SCRIPT)
            .key(keys::job_key(&job.id))
            .arg(fields::job::STATUS)
            .arg(JobStatus::Pending.code().to_string())
            .arg(JobStatus::Processing.code().to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        if claimed != 1 {
            return Ok(None);
        }

        load_job(&mut conn, &job.id).await
    }

    async fn update_job_add_result(
        &self,
        job: &Job,
        result: TaskResult,
    ) -> Result<(), JobStoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();

        let exists: i32 = redis::cmd("EXISTS")
            .arg(keys::job_key(&job.id))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        if exists == 0 {
            return Err(JobStoreError::JobNotFound(job.id.clone()));
        }

        let json = serde_json::to_string(&result)?;
        redis::cmd("RPUSH")
            .arg(keys::job_results_key(&job.id))
            .arg(&json)
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }

    async fn update_job_status(&self, job: &Job, status: JobStatus) -> Result<(), JobStoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();

        let exists: i32 = redis::cmd("EXISTS")
            .arg(keys::job_key(&job.id))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        if exists == 0 {
            return Err(JobStoreError::JobNotFound(job.id.clone()));
        }

        redis::cmd("HSET")
            .arg(keys::job_key(&job.id))
            .arg(fields::job::STATUS)
            .arg(i64::from(status.code()))
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(())
    }

    async fn get_job_by_name_and_id(
        &self,
        workflow_name: &str,
        id: &str,
    ) -> Result<Job, JobStoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        match load_job(&mut conn, id).await? {
            Some(job) if job.workflow_name == workflow_name => Ok(job),
            _ => Err(JobStoreError::JobNotFound(id.to_string())),
        }
    }

    async fn get_jobs(&self) -> Result<JobStream, JobStoreError> {
        self.check_closed()?;
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", keys::jobs_prefix());

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            let mut cursor: u64 = 0;
            loop {
                let scanned: Result<(u64, Vec<String>), _> = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query_async(&mut conn)
                    .await
                    .map_err(map_redis_err);
                let (next_cursor, found) = match scanned {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::warn!(error = %e, "backlog scan failed");
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };

                for key in found {
                    let Some(id) = key.strip_prefix(keys::jobs_prefix()) else {
                        continue;
                    };
                    let item = match load_job(&mut conn, id).await {
                        Ok(Some(job)) => Ok(job),
                        // Deleted between scan and read; skip.
                        Ok(None) => continue,
                        Err(e) => Err(e),
                    };
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() {
                        // Receiver dropped; stop scanning.
                        return;
                    }
                    if failed {
                        return;
                    }
                }

                cursor = next_cursor;
                if cursor == 0 {
                    break;
                }
            }
            tracing::debug!("backlog stream exhausted");
        });
        Ok(rx)
    }

    async fn ping(&self) -> Result<bool, JobStoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(pong == "PONG")
    }

    async fn close(&self) -> Result<(), JobStoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
