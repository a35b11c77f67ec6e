/// Errors arising while re-qualifying a scheduled email before send.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("store error: {0}")]
    Store(#[from] cadence_store::StoreError),

    #[error("data source error: {0}")]
    DataSource(String),
}
