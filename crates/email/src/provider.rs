use crate::backend::EmailBackend;
use crate::config::EmailProviderConfig;
use crate::dryrun::DryRunBackend;
use crate::error::EmailError;
use crate::sendgrid::SendGridBackend;
use crate::types::{EmailSendResult, OutboundEmail};

/// Façade over the configured [`EmailBackend`] (§4.5 step 7).
///
/// Mirrors the teacher's `EmailProvider` wrapping a `Box<dyn EmailBackend>`;
/// which concrete backend gets boxed is chosen once at construction based on
/// whether a provider API key is configured.
#[derive(Debug)]
pub struct EmailProvider {
    backend: Box<dyn EmailBackend>,
}

impl EmailProvider {
    #[must_use]
    pub fn new(config: &EmailProviderConfig) -> Self {
        let backend: Box<dyn EmailBackend> = if let Some(api_key) = &config.api_key {
            Box::new(SendGridBackend::new(reqwest::Client::new(), config.base_url.clone(), api_key.clone()))
        } else {
            Box::new(DryRunBackend)
        };
        Self { backend }
    }

    #[must_use]
    pub fn with_backend(backend: Box<dyn EmailBackend>) -> Self {
        Self { backend }
    }

    #[tracing::instrument(skip_all, fields(backend = self.backend.backend_name(), to = %message.to_email))]
    pub async fn send(&self, message: &OutboundEmail) -> Result<EmailSendResult, EmailError> {
        self.backend.send(message).await
    }
}
