/// Errors arising from constructing or validating domain types, as opposed
/// to errors from storage or network I/O (those live in their owning
/// crates: `cadence-store`, `cadence-email`, etc.).
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("malformed filter config: {0}")]
    InvalidFilter(String),
    #[error("account {account} has no sendable email address")]
    UnsendableAccount { account: crate::ids::AccountId },
}
