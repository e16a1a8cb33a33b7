//! KV key builders and field name constants for job/workflow records.

/// Job record key: `foreman.state.jobs.{job_id}`
#[must_use]
pub fn job_key(job_id: &str) -> String {
    format!("foreman.state.jobs.{job_id}")
}

/// Job results list key: `foreman.state.results.{job_id}`
/// Kept outside the job record so appends stay order-preserving.
#[must_use]
pub fn job_results_key(job_id: &str) -> String {
    format!("foreman.state.results.{job_id}")
}

/// Workflow record key: `foreman.state.workflows.{name}`
#[must_use]
pub fn workflow_key(name: &str) -> String {
    format!("foreman.state.workflows.{name}")
}

/// Scan prefix for all job records.
#[must_use]
pub fn jobs_prefix() -> &'static str {
    "foreman.state.jobs."
}

/// Scan prefix for all workflow records.
#[must_use]
pub fn workflows_prefix() -> &'static str {
    "foreman.state.workflows."
}

/// Field name constants for type-safe KV access.
pub mod fields {
    pub mod job {
        pub const ID: &str = "id";
        pub const WORKFLOW_NAME: &str = "workflow_name";
        pub const INPUT_PARAMETERS: &str = "input_parameters";
        pub const STATUS: &str = "status";
        pub const INSERT_TIME: &str = "insert_time";
    }
}
