use async_trait::async_trait;
use serde_json::json;

use crate::backend::EmailBackend;
use crate::error::EmailError;
use crate::types::{EmailSendResult, OutboundEmail};

/// SendGrid v3 `/mail/send` backend (§4.5 step 7, §6).
///
/// Unlike the teacher's SMTP transport this talks a JSON REST API, so it
/// carries its own `reqwest::Client` rather than a `lettre` transport; see
/// `DESIGN.md` for why that dependency was swapped rather than kept.
#[derive(Debug)]
pub struct SendGridBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SendGridBackend {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }
}

#[async_trait]
impl EmailBackend for SendGridBackend {
    #[tracing::instrument(skip_all, fields(to = %message.to_email, message_id = %message.message_id))]
    async fn send(&self, message: &OutboundEmail) -> Result<EmailSendResult, EmailError> {
        let body = build_request_body(message);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status: status.as_u16(), body: body_text });
        }

        let provider_message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .unwrap_or_else(|| message.message_id.clone());

        Ok(EmailSendResult { provider_message_id })
    }

    fn backend_name(&self) -> &'static str {
        "sendgrid"
    }
}

/// Whether a provider HTTP error should be treated as retryable. SendGrid's
/// 4xx statuses are permanent rejections (malformed request, bad template)
/// except 429, which is a rate limit and clears on its own; 5xx is always
/// transient (§7, "Transient I/O").
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

fn build_request_body(message: &OutboundEmail) -> serde_json::Value {
    let mut personalization = json!({
        "to": [{ "email": message.to_email, "name": message.to_name }],
        "custom_args": message.custom_args,
    });
    if let Some(obj) = personalization.as_object_mut() {
        obj.insert(
            "headers".to_string(),
            json!({ "Message-ID": message.message_id }),
        );
    }

    json!({
        "personalizations": [personalization],
        "from": { "email": message.from_email, "name": message.from_name },
        "reply_to": { "email": message.reply_to },
        "subject": message.subject,
        "content": content_blocks(message),
        "categories": message.categories,
        "tracking_settings": {
            "click_tracking": { "enable": true },
            "open_tracking": { "enable": true },
            "subscription_tracking": { "enable": false },
        },
    })
}

fn content_blocks(message: &OutboundEmail) -> Vec<serde_json::Value> {
    let mut blocks = Vec::new();
    if let Some(text) = &message.text_body {
        blocks.push(json!({ "type": "text/plain", "value": text }));
    }
    blocks.push(json!({ "type": "text/html", "value": message.html_body }));
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn message() -> OutboundEmail {
        OutboundEmail {
            from_email: "agent@agency.com".into(),
            from_name: "Agency".into(),
            to_email: "jane@example.com".into(),
            to_name: "Jane Doe".into(),
            subject: "Hello".into(),
            html_body: "<p>hi</p>".into(),
            text_body: Some("hi".into()),
            reply_to: "agent@agency.com".into(),
            message_id: "<isg-1-2@agency.com>".into(),
            custom_args: HashMap::from([("scheduled_email_id".to_string(), "abc".to_string())]),
            categories: vec!["automation".into()],
        }
    }

    #[test]
    fn request_body_carries_custom_args_and_headers() {
        let body = build_request_body(&message());
        let personalization = &body["personalizations"][0];
        assert_eq!(personalization["custom_args"]["scheduled_email_id"], "abc");
        assert_eq!(personalization["headers"]["Message-ID"], "<isg-1-2@agency.com>");
        assert_eq!(body["tracking_settings"]["subscription_tracking"]["enable"], false);
    }

    #[test]
    fn content_blocks_include_text_and_html() {
        let blocks = content_blocks(&message());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "text/plain");
        assert_eq!(blocks[1]["type"], "text/html");
    }

    #[test]
    fn retryable_status_classification() {
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(422));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(200));
    }
}
