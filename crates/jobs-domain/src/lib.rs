pub mod error;
pub mod job;
pub mod keys;
pub mod result;
pub mod status;
pub mod workflow;

pub use error::JobsDomainError;
pub use job::{InputParameter, InputParameters, Job};
pub use result::{
    TaskResult, TaskResultCli, TaskResultHttpRequest, TaskResultHttpResponse, TaskResultKind,
    TaskResultSmtp,
};
pub use status::JobStatus;
pub use workflow::Workflow;
