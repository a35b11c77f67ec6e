/// Errors arising while orchestrating a run.
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    #[error("store error: {0}")]
    Store(#[from] cadence_store::StoreError),

    #[error("data source error: {0}")]
    DataSource(String),
}
