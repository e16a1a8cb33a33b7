use std::collections::HashMap;

use crate::error::JobsDomainError;
use crate::result::TaskResult;
use crate::status::JobStatus;
use crate::workflow::Workflow;

/// One execution of a workflow with concrete input parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Job {
    /// Assigned by the store at insertion. Empty on an unsaved job.
    pub id: String,
    /// Foreign reference to a workflow by name. Never reassigned.
    pub workflow_name: String,
    /// Supplied at creation, immutable thereafter.
    pub input_parameters: InputParameters,
    pub status: JobStatus,
    /// Append-only. Non-empty results imply the job has been claimed at
    /// least once; a never-processed job carries none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<TaskResult>,
    /// Epoch milliseconds, set once by the store at insertion.
    #[serde(default)]
    pub insert_time: u64,
}

impl Job {
    /// Build an unsaved pending job. The store assigns `id` and
    /// `insert_time` at insertion.
    pub fn new(workflow_name: impl Into<String>, input_parameters: InputParameters) -> Self {
        Self {
            id: String::new(),
            workflow_name: workflow_name.into(),
            input_parameters,
            status: JobStatus::Pending,
            results: Vec::new(),
            insert_time: 0,
        }
    }

    /// Check that every parameter the workflow requires is present.
    ///
    /// Collects all missing names, in the workflow's declared order. Extra
    /// parameters are tolerated; values are not inspected.
    pub fn validate(&self, workflow: &Workflow) -> Result<(), JobsDomainError> {
        let present = self.input_parameters.to_map();
        let missing: Vec<String> = workflow
            .input_parameters
            .iter()
            .filter(|name| !present.contains_key(name.as_str()))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(JobsDomainError::MissingParameters(missing))
        }
    }
}

/// A name/value pair attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InputParameter {
    pub name: String,
    pub value: String,
}

impl InputParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered parameter sequence. Names need not be unique in storage; the
/// map projection resolves duplicates last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct InputParameters(Vec<InputParameter>);

impl InputParameters {
    pub fn new(params: Vec<InputParameter>) -> Self {
        Self(params)
    }

    /// Project to a name -> value map. Later entries with a duplicate name
    /// overwrite earlier ones.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InputParameter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<InputParameter>> for InputParameters {
    fn from(params: Vec<InputParameter>) -> Self {
        Self(params)
    }
}

impl FromIterator<InputParameter> for InputParameters {
    fn from_iter<I: IntoIterator<Item = InputParameter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a InputParameters {
    type Item = &'a InputParameter;
    type IntoIter = std::slice::Iter<'a, InputParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
