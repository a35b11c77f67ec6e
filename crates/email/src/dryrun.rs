use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::EmailBackend;
use crate::error::EmailError;
use crate::types::{EmailSendResult, OutboundEmail};

/// Backend used when no provider API key is configured (§4.5 closing
/// paragraph). Logs the message that would have been sent and returns a
/// synthetic id, so the rest of the pipeline (email-log, activity-log) runs
/// exactly as it would against a real provider.
#[derive(Debug, Default)]
pub struct DryRunBackend;

#[async_trait]
impl EmailBackend for DryRunBackend {
    async fn send(&self, message: &OutboundEmail) -> Result<EmailSendResult, EmailError> {
        tracing::info!(
            to = %message.to_email,
            subject = %message.subject,
            message_id = %message.message_id,
            "dry-run: not dispatching email"
        );
        Ok(EmailSendResult { provider_message_id: format!("dry-run-{}", Uuid::new_v4()) })
    }

    fn backend_name(&self) -> &'static str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn dry_run_returns_synthetic_id() {
        let backend = DryRunBackend;
        let message = OutboundEmail {
            from_email: "a@example.com".into(),
            from_name: "A".into(),
            to_email: "b@example.com".into(),
            to_name: "B".into(),
            subject: "hi".into(),
            html_body: "<p>hi</p>".into(),
            text_body: None,
            reply_to: "a@example.com".into(),
            message_id: "<id@example.com>".into(),
            custom_args: HashMap::new(),
            categories: vec![],
        };
        let result = backend.send(&message).await.unwrap();
        assert!(result.provider_message_id.starts_with("dry-run-"));
    }
}
