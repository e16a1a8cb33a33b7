mod error;
mod store;

pub use error::JobStoreError;
pub use store::{JobStore, JobStoreConfig, JobStream};
