use std::collections::HashMap;

/// A fully composed, ready-to-dispatch outbound message (§4.5 steps 4-7).
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub from_email: String,
    pub from_name: String,
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
    pub reply_to: String,
    /// `Message-ID` header value, including angle brackets.
    pub message_id: String,
    pub custom_args: HashMap<String, String>,
    pub categories: Vec<String>,
}

/// Outcome of a successful dispatch to the provider.
#[derive(Debug, Clone)]
pub struct EmailSendResult {
    /// The provider's opaque id (its `X-Message-Id` response header), or a
    /// synthetic id when running in dry-run mode.
    pub provider_message_id: String,
}
