use async_trait::async_trait;

use crate::error::EmailError;
use crate::types::{EmailSendResult, OutboundEmail};

/// Trait for pluggable outbound email delivery backends.
///
/// Implementations handle the actual transport (SendGrid REST, dry-run
/// logging) while [`crate::provider::EmailProvider`] picks which one to use.
#[async_trait]
pub trait EmailBackend: Send + Sync + std::fmt::Debug {
    /// Dispatch a fully composed message.
    async fn send(&self, message: &OutboundEmail) -> Result<EmailSendResult, EmailError>;

    /// Return the backend name (e.g. `"sendgrid"`, `"dry-run"`) for logging.
    fn backend_name(&self) -> &'static str;
}
