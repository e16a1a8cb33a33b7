use std::str::FromStr;

use crate::error::JobsDomainError;

/// Job-level state machine.
///
/// The integer discriminants are the codes persisted by the backing
/// stores; the string tokens are the external representation. Note the
/// asymmetry: `Failure` serializes as `"failed"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum JobStatus {
    Done = 0,
    Pending = 1,
    Processing = 2,
    Failure = 3,
}

impl JobStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Done)
                | (Self::Processing, Self::Failure)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failure)
    }

    pub fn transition_to(self, next: Self) -> Result<Self, JobsDomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(JobsDomainError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failure => "failed",
        }
    }

    /// Integer code used by the persisted representation.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a persisted integer code. Unknown codes are an error, never
    /// silently mapped to a default state.
    pub fn from_code(code: u8) -> Result<Self, JobsDomainError> {
        match code {
            0 => Ok(Self::Done),
            1 => Ok(Self::Pending),
            2 => Ok(Self::Processing),
            3 => Ok(Self::Failure),
            _ => Err(JobsDomainError::InvalidStatusCode(code)),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobsDomainError;

    /// Tokens are matched case-insensitively. An unknown token is a hard
    /// error and fails deserialization of whatever carries it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("pending") {
            Ok(Self::Pending)
        } else if s.eq_ignore_ascii_case("processing") {
            Ok(Self::Processing)
        } else if s.eq_ignore_ascii_case("done") {
            Ok(Self::Done)
        } else if s.eq_ignore_ascii_case("failed") {
            Ok(Self::Failure)
        } else {
            Err(JobsDomainError::InvalidStatus(s.to_string()))
        }
    }
}

impl TryFrom<String> for JobStatus {
    type Error = JobsDomainError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> String {
        status.as_str().to_string()
    }
}
