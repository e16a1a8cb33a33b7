use std::sync::Arc;

use foreman_job_store::{JobStore, JobStoreError};
use foreman_job_store_memory::MemoryJobStore;
use foreman_jobs_domain::{
    InputParameter, InputParameters, Job, JobStatus, TaskResult, TaskResultCli, TaskResultKind,
    TaskResultSmtp, Workflow,
};

fn workflow(name: &str, params: &[&str]) -> Workflow {
    Workflow {
        name: name.to_string(),
        input_parameters: params.iter().map(ToString::to_string).collect(),
    }
}

fn job(workflow_name: &str, params: &[(&str, &str)]) -> Job {
    let params: InputParameters = params
        .iter()
        .map(|(n, v)| InputParameter::new(*n, *v))
        .collect();
    Job::new(workflow_name, params)
}

fn cli_result(name: &str, command: &[&str], exit_code: i32) -> TaskResult {
    TaskResult {
        name: name.to_string(),
        success: exit_code == 0,
        kind: TaskResultKind::Cli(TaskResultCli {
            command: command.iter().map(ToString::to_string).collect(),
            output: String::new(),
            error: String::new(),
            exit_code,
        }),
    }
}

// --- Workflow registry ---

#[tokio::test]
async fn insert_and_get_workflow() {
    let store = MemoryJobStore::new();
    let count = store
        .insert_workflows(vec![workflow("w1", &["host"])])
        .await
        .unwrap();
    assert_eq!(count, 1);

    let got = store.get_workflow_by_name("w1").await.unwrap();
    assert_eq!(got.name, "w1");
    assert_eq!(got.input_parameters, vec!["host"]);
}

#[tokio::test]
async fn get_missing_workflow_is_not_found() {
    let store = MemoryJobStore::new();
    let err = store.get_workflow_by_name("nope").await.unwrap_err();
    assert!(matches!(err, JobStoreError::WorkflowNotFound(name) if name == "nope"));
}

#[tokio::test]
async fn duplicate_workflow_rejected() {
    let store = MemoryJobStore::new();
    store
        .insert_workflows(vec![workflow("w1", &[])])
        .await
        .unwrap();

    let err = store
        .insert_workflows(vec![workflow("w1", &[])])
        .await
        .unwrap_err();
    assert!(matches!(err, JobStoreError::WorkflowAlreadyExists(name) if name == "w1"));
}

#[tokio::test]
async fn empty_workflow_name_rejected() {
    let store = MemoryJobStore::new();
    let err = store
        .insert_workflows(vec![workflow("", &[])])
        .await
        .unwrap_err();
    assert!(matches!(err, JobStoreError::MissingWorkflowName));
}

#[tokio::test]
async fn rejected_batch_writes_nothing() {
    let store = MemoryJobStore::new();
    let err = store
        .insert_workflows(vec![workflow("w1", &[]), workflow("w1", &[])])
        .await
        .unwrap_err();
    assert!(matches!(err, JobStoreError::WorkflowAlreadyExists(_)));

    // The valid first entry must not have been persisted.
    assert!(store.get_workflow_by_name("w1").await.is_err());
    assert!(store.get_workflows().await.unwrap().is_empty());
}

#[tokio::test]
async fn get_workflows_returns_full_snapshot() {
    let store = MemoryJobStore::new();
    store
        .insert_workflows(vec![workflow("w1", &[]), workflow("w2", &["a"])])
        .await
        .unwrap();

    let all = store.get_workflows().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "w1");
    assert_eq!(all[1].name, "w2");
}

// --- Job lifecycle ---

#[tokio::test]
async fn insert_job_assigns_identity_and_pending_status() {
    let store = MemoryJobStore::new();
    let stored = store.insert_job(job("w1", &[("host", "x")])).await.unwrap();

    assert!(!stored.id.is_empty());
    assert!(stored.insert_time > 0);
    assert_eq!(stored.status, JobStatus::Pending);
    assert!(stored.results.is_empty());
}

#[tokio::test]
async fn end_to_end_job_execution() {
    let store = MemoryJobStore::new();
    store
        .insert_workflows(vec![workflow("w1", &["host"])])
        .await
        .unwrap();

    let candidate = job("w1", &[("host", "x")]);
    let definition = store.get_workflow_by_name("w1").await.unwrap();
    candidate.validate(&definition).unwrap();

    let stored = store.insert_job(candidate).await.unwrap();
    assert_eq!(stored.status, JobStatus::Pending);

    let claimed = store.acquire_job(&stored).await.unwrap().unwrap();
    assert_eq!(claimed.status, JobStatus::Processing);

    store
        .update_job_add_result(&claimed, cli_result("ping", &["ping", "x"], 0))
        .await
        .unwrap();
    store
        .update_job_status(&claimed, JobStatus::Done)
        .await
        .unwrap();

    let finished = store.get_job_by_name_and_id("w1", &stored.id).await.unwrap();
    assert_eq!(finished.status, JobStatus::Done);
    assert_eq!(finished.results.len(), 1);
    assert_eq!(finished.results[0].name, "ping");
    assert!(finished.results[0].success);
}

#[tokio::test]
async fn job_without_required_parameters_fails_validation() {
    let store = MemoryJobStore::new();
    store
        .insert_workflows(vec![workflow("w1", &["host"])])
        .await
        .unwrap();

    let definition = store.get_workflow_by_name("w1").await.unwrap();
    let err = job("w1", &[]).validate(&definition).unwrap_err();
    assert_eq!(err.missing_parameters().unwrap(), &["host".to_string()]);
}

// --- Claim protocol ---

#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() {
    let store = Arc::new(MemoryJobStore::new());
    let stored = store.insert_job(job("w1", &[])).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let candidate = stored.clone();
        handles.push(tokio::spawn(async move {
            store.acquire_job(&candidate).await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if let Some(claimed) = handle.await.unwrap() {
            assert_eq!(claimed.status, JobStatus::Processing);
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn acquire_of_non_pending_job_is_a_claim_miss() {
    let store = MemoryJobStore::new();
    let stored = store.insert_job(job("w1", &[])).await.unwrap();

    assert!(store.acquire_job(&stored).await.unwrap().is_some());
    // Already processing: second claim misses.
    assert!(store.acquire_job(&stored).await.unwrap().is_none());
}

#[tokio::test]
async fn acquire_of_missing_job_is_a_claim_miss() {
    let store = MemoryJobStore::new();
    let mut ghost = job("w1", &[]);
    ghost.id = "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string();
    assert!(store.acquire_job(&ghost).await.unwrap().is_none());
}

// --- Results and status ---

#[tokio::test]
async fn results_append_in_call_order() {
    let store = MemoryJobStore::new();
    let stored = store.insert_job(job("w1", &[])).await.unwrap();
    let claimed = store.acquire_job(&stored).await.unwrap().unwrap();

    store
        .update_job_add_result(&claimed, cli_result("first", &["true"], 0))
        .await
        .unwrap();
    let smtp = TaskResult {
        name: "second".to_string(),
        success: false,
        kind: TaskResultKind::Smtp(TaskResultSmtp {
            sender: "noreply@example.com".to_string(),
            recipients: vec!["ops@example.com".to_string()],
            message: "ping failed".to_string(),
            error: "connection refused".to_string(),
        }),
    };
    store.update_job_add_result(&claimed, smtp).await.unwrap();

    let got = store.get_job_by_name_and_id("w1", &stored.id).await.unwrap();
    assert_eq!(got.results.len(), 2);
    assert_eq!(got.results[0].name, "first");
    assert_eq!(got.results[1].name, "second");
    // Appending must not have disturbed the status.
    assert_eq!(got.status, JobStatus::Processing);
}

#[tokio::test]
async fn add_result_to_missing_job_is_not_found() {
    let store = MemoryJobStore::new();
    let mut ghost = job("w1", &[]);
    ghost.id = "missing".to_string();
    let err = store
        .update_job_add_result(&ghost, cli_result("x", &["true"], 0))
        .await
        .unwrap_err();
    assert!(matches!(err, JobStoreError::JobNotFound(_)));
}

#[tokio::test]
async fn illegal_status_transition_rejected() {
    let store = MemoryJobStore::new();
    let stored = store.insert_job(job("w1", &[])).await.unwrap();

    // pending -> done skips processing.
    let err = store
        .update_job_status(&stored, JobStatus::Done)
        .await
        .unwrap_err();
    assert!(matches!(err, JobStoreError::InvalidStatus(_)));

    let got = store.get_job_by_name_and_id("w1", &stored.id).await.unwrap();
    assert_eq!(got.status, JobStatus::Pending);
}

#[tokio::test]
async fn failure_path_round_trips() {
    let store = MemoryJobStore::new();
    let stored = store.insert_job(job("w1", &[])).await.unwrap();
    let claimed = store.acquire_job(&stored).await.unwrap().unwrap();

    store
        .update_job_status(&claimed, JobStatus::Failure)
        .await
        .unwrap();

    let got = store.get_job_by_name_and_id("w1", &stored.id).await.unwrap();
    assert_eq!(got.status, JobStatus::Failure);
    assert_eq!(serde_json::to_value(&got).unwrap()["status"], "failed");
}

// --- Lookups ---

#[tokio::test]
async fn lookup_with_wrong_workflow_name_is_not_found() {
    let store = MemoryJobStore::new();
    let stored = store.insert_job(job("w1", &[])).await.unwrap();

    let err = store
        .get_job_by_name_and_id("other", &stored.id)
        .await
        .unwrap_err();
    assert!(matches!(err, JobStoreError::JobNotFound(_)));
}

// --- Backlog streaming ---

#[tokio::test]
async fn get_jobs_streams_backlog_in_insertion_order() {
    let store = MemoryJobStore::new();
    let a = store.insert_job(job("w1", &[])).await.unwrap();
    let b = store.insert_job(job("w2", &[])).await.unwrap();
    let c = store.insert_job(job("w1", &[])).await.unwrap();

    let mut stream = store.get_jobs().await.unwrap();
    let mut ids = Vec::new();
    while let Some(item) = stream.recv().await {
        ids.push(item.unwrap().id);
    }
    assert_eq!(ids, vec![a.id, b.id, c.id]);
}

#[tokio::test]
async fn dropping_the_stream_stops_the_feeder() {
    let store = MemoryJobStore::new();
    for _ in 0..64 {
        store.insert_job(job("w1", &[])).await.unwrap();
    }

    let mut stream = store.get_jobs().await.unwrap();
    let first = stream.recv().await.unwrap().unwrap();
    assert!(!first.id.is_empty());
    drop(stream);
    // Nothing to assert beyond not hanging; the feeder exits on send error.
}

// --- Close semantics ---

#[tokio::test]
async fn close_prevents_operations() {
    let store = MemoryJobStore::new();
    store.close().await.unwrap();

    let result = store.get_workflows().await;
    assert!(result.is_err());
}
