use crate::error::JobsDomainError;

/// Outcome of one task execution, appended to a job's results.
///
/// The wire form carries a `type` token plus exactly one payload field
/// keyed by that token; the in-memory form makes that a structural
/// invariant through [`TaskResultKind`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(into = "TaskResultWire", try_from = "TaskResultWire")]
pub struct TaskResult {
    pub name: String,
    pub success: bool,
    pub kind: TaskResultKind,
}

/// Closed set of task outcome payloads. New task kinds get a new variant.
#[derive(Debug, Clone)]
pub enum TaskResultKind {
    Cli(TaskResultCli),
    HttpRequest(TaskResultHttpRequest),
    HttpResponse(TaskResultHttpResponse),
    Smtp(TaskResultSmtp),
}

impl TaskResultKind {
    /// Wire token carried in the `type` field.
    pub fn type_token(&self) -> &'static str {
        match self {
            Self::Cli(_) => "cli",
            Self::HttpRequest(_) => "httpRequest",
            Self::HttpResponse(_) => "httpResponse",
            Self::Smtp(_) => "smtp",
        }
    }
}

/// Command run, captured output, and exit status.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskResultCli {
    pub command: Vec<String>,
    pub output: String,
    pub error: String,
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
}

/// Request as sent. Headers are flattened lines, not a structured map.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskResultHttpRequest {
    pub uri: String,
    pub method: String,
    pub body: String,
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskResultHttpResponse {
    #[serde(rename = "statusCode")]
    pub status_code: i32,
    pub body: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskResultSmtp {
    pub sender: String,
    pub recipients: Vec<String>,
    pub message: String,
    pub error: String,
}

/// Persisted shape: the `type` token plus four optional payload fields,
/// of which exactly one must be populated.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct TaskResultWire {
    name: String,
    #[serde(rename = "type")]
    type_token: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cli: Option<TaskResultCli>,
    #[serde(default, rename = "httpRequest", skip_serializing_if = "Option::is_none")]
    http_request: Option<TaskResultHttpRequest>,
    #[serde(default, rename = "httpResponse", skip_serializing_if = "Option::is_none")]
    http_response: Option<TaskResultHttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    smtp: Option<TaskResultSmtp>,
}

impl From<TaskResult> for TaskResultWire {
    fn from(result: TaskResult) -> Self {
        let mut wire = Self {
            name: result.name,
            type_token: result.kind.type_token().to_string(),
            success: result.success,
            cli: None,
            http_request: None,
            http_response: None,
            smtp: None,
        };
        match result.kind {
            TaskResultKind::Cli(payload) => wire.cli = Some(payload),
            TaskResultKind::HttpRequest(payload) => wire.http_request = Some(payload),
            TaskResultKind::HttpResponse(payload) => wire.http_response = Some(payload),
            TaskResultKind::Smtp(payload) => wire.smtp = Some(payload),
        }
        wire
    }
}

impl TryFrom<TaskResultWire> for TaskResult {
    type Error = JobsDomainError;

    fn try_from(wire: TaskResultWire) -> Result<Self, Self::Error> {
        let populated = usize::from(wire.cli.is_some())
            + usize::from(wire.http_request.is_some())
            + usize::from(wire.http_response.is_some())
            + usize::from(wire.smtp.is_some());
        if populated != 1 {
            return Err(JobsDomainError::InvalidTaskResult(format!(
                "expected exactly one payload, found {populated}"
            )));
        }

        let kind = match wire.type_token.as_str() {
            "cli" => wire.cli.map(TaskResultKind::Cli),
            "httpRequest" => wire.http_request.map(TaskResultKind::HttpRequest),
            "httpResponse" => wire.http_response.map(TaskResultKind::HttpResponse),
            "smtp" => wire.smtp.map(TaskResultKind::Smtp),
            other => {
                return Err(JobsDomainError::InvalidTaskResult(format!(
                    "unknown type: {other}"
                )));
            }
        };
        let Some(kind) = kind else {
            return Err(JobsDomainError::InvalidTaskResult(format!(
                "payload does not match type: {}",
                wire.type_token
            )));
        };

        Ok(Self {
            name: wire.name,
            success: wire.success,
            kind,
        })
    }
}
