/// Errors for job domain validation.
#[derive(Debug, thiserror::Error)]
pub enum JobsDomainError {
    #[error("Missing input parameters: [{}]", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("invalid status code: {0}")]
    InvalidStatusCode(u8),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid task result: {0}")]
    InvalidTaskResult(String),
}

impl JobsDomainError {
    /// Names reported by a failed parameter validation, if any.
    pub fn missing_parameters(&self) -> Option<&[String]> {
        match self {
            Self::MissingParameters(names) => Some(names),
            _ => None,
        }
    }
}
