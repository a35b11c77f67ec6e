/// Errors from the scheduled-email store, independent of backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("no row with id {0}")]
    NotFound(String),
}
