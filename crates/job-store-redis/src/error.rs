use foreman_job_store::JobStoreError;

#[allow(clippy::needless_pass_by_value)] // signature required for use with .map_err()
pub(crate) fn map_redis_err(e: redis::RedisError) -> JobStoreError {
    use redis::ErrorKind;
    match e.kind() {
        ErrorKind::IoError | ErrorKind::AuthenticationFailed => {
            JobStoreError::Connection(e.to_string())
        }
        _ => JobStoreError::Other(e.to_string()),
    }
}
