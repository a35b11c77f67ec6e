/// Errors arising while dispatching a due scheduled email.
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("store error: {0}")]
    Store(#[from] cadence_store::StoreError),

    #[error("email error: {0}")]
    Email(#[from] cadence_email::EmailError),

    #[error("data source error: {0}")]
    DataSource(String),
}
