/// Errors arising while composing or dispatching an outbound email.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed template: {0}")]
    Template(String),
}
