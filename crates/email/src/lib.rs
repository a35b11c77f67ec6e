pub mod backend;
pub mod compose;
pub mod config;
pub mod dryrun;
pub mod error;
pub mod merge_fields;
pub mod provider;
pub mod sendgrid;
pub mod types;

pub use backend::EmailBackend;
pub use compose::{ComposeInput, compose_email, uses_tracking_reply};
pub use config::EmailProviderConfig;
pub use error::EmailError;
pub use merge_fields::MergeContext;
pub use provider::EmailProvider;
pub use sendgrid::is_retryable_status;
pub use types::{EmailSendResult, OutboundEmail};
