use std::fmt;

/// Configuration for the outbound email provider (§4.5, §4.8, §6).
///
/// When `api_key` is `None` the provider runs in dry-run mode: messages are
/// logged and marked sent with a synthetic id instead of being dispatched
/// (§4.5 closing paragraph), which lets staging environments exercise the
/// whole pipeline without real provider credentials.
#[derive(Clone)]
pub struct EmailProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub unsubscribe_url: String,
    pub star_rating_base_url: String,
    /// When set, and the owner has an active `email_provider_connections`
    /// row, the sender injects a tracking `reply-{emailLogId}@{reply_domain}`
    /// Reply-To instead of the default `from_email` (§4.5 step 6).
    pub reply_domain: Option<String>,
}

impl fmt::Debug for EmailProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("unsubscribe_url", &self.unsubscribe_url)
            .field("star_rating_base_url", &self.star_rating_base_url)
            .field("reply_domain", &self.reply_domain)
            .finish()
    }
}

impl Default for EmailProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.sendgrid.com/v3/mail/send".to_string(),
            unsubscribe_url: "https://app.example.com/unsubscribe".to_string(),
            star_rating_base_url: "https://app.example.com/star-rating".to_string(),
            reply_domain: None,
        }
    }
}

impl EmailProviderConfig {
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_unsubscribe_url(mut self, url: impl Into<String>) -> Self {
        self.unsubscribe_url = url.into();
        self
    }

    #[must_use]
    pub fn with_star_rating_base_url(mut self, url: impl Into<String>) -> Self {
        self.star_rating_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_reply_domain(mut self, domain: impl Into<String>) -> Self {
        self.reply_domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.api_key.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let config = EmailProviderConfig::default().with_api_key("sg-super-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sg-super-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn no_api_key_means_dry_run() {
        assert!(EmailProviderConfig::default().is_dry_run());
        assert!(!EmailProviderConfig::default().with_api_key("k").is_dry_run());
    }
}
