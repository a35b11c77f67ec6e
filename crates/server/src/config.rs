use cadence_email::EmailProviderConfig;
use cadence_reactor::ReactorConfig;
use cadence_sender::SenderConfig;
use cadence_verifier::VerifierConfig;
use serde::Deserialize;

/// Root TOML configuration shape (§4.8, §6 "Configuration").
///
/// Every section defaults to its `Default` impl, so an empty or missing
/// config file is valid, matching the teacher's `toml::from_str("")`
/// fallback.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub server: ServerSection,
    pub limits: LimitsSection,
    pub provider: ProviderSection,
    pub database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

/// Tunable run-sizing knobs (§4.8). `verification_window_hours` is accepted
/// for forward-compatibility but currently unused: the 24h lookahead window
/// is hardcoded in `ScheduledEmailStore::list_due_for_verification`
/// implementations rather than threaded through the verifier (see
/// `DESIGN.md`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    pub max_emails_per_run: usize,
    pub max_accounts_per_refresh: usize,
    pub dedup_window_days: i64,
    pub max_send_attempts: u32,
    pub verification_window_hours: i64,
    pub processing_reap_threshold_seconds: i64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_emails_per_run: 200,
            max_accounts_per_refresh: 1000,
            dedup_window_days: 7,
            max_send_attempts: 5,
            verification_window_hours: 24,
            processing_reap_threshold_seconds: 900,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub base_url: Option<String>,
    pub unsubscribe_url: Option<String>,
    pub star_rating_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub max_connections: Option<u32>,
}

impl CadenceConfig {
    #[must_use]
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            dedup_window_days: self.limits.dedup_window_days,
            batch_limit: self.limits.max_emails_per_run,
        }
    }

    #[must_use]
    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            max_emails_per_run: self.limits.max_emails_per_run,
            max_attempts: self.limits.max_send_attempts,
            dedup_window_days: self.limits.dedup_window_days,
        }
    }

    #[must_use]
    pub fn reactor_config(&self) -> ReactorConfig {
        ReactorConfig {
            max_accounts_per_refresh: self.limits.max_accounts_per_refresh,
            verifier: self.verifier_config(),
            sender: self.sender_config(),
        }
    }

    /// Build the email provider config from TOML defaults overlaid by
    /// environment variables that carry secrets (§4.8: provider API key,
    /// `REPLY_DOMAIN`, `UNSUBSCRIBE_URL`).
    #[must_use]
    pub fn email_provider_config(&self) -> EmailProviderConfig {
        let mut config = EmailProviderConfig::default();
        if let Some(base_url) = &self.provider.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(url) = &self.provider.unsubscribe_url {
            config = config.with_unsubscribe_url(url.clone());
        }
        if let Some(url) = &self.provider.star_rating_base_url {
            config = config.with_star_rating_base_url(url.clone());
        }
        if let Ok(url) = std::env::var("UNSUBSCRIBE_URL") {
            config = config.with_unsubscribe_url(url);
        }
        if let Ok(domain) = std::env::var("REPLY_DOMAIN") {
            config = config.with_reply_domain(domain);
        }
        if let Ok(key) = std::env::var("EMAIL_PROVIDER_API_KEY") {
            config = config.with_api_key(key);
        }
        config
    }

    #[must_use]
    pub fn geocoder_api_key(&self) -> Option<String> {
        std::env::var("GEOCODER_API_KEY").ok()
    }

    #[must_use]
    pub fn database_url(&self) -> Option<String> {
        std::env::var("DATABASE_URL").ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_all_defaults() {
        let config: CadenceConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.limits.max_emails_per_run, 200);
    }

    #[test]
    fn partial_toml_overrides_only_given_fields() {
        let config: CadenceConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [limits]
            max_emails_per_run = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.limits.max_emails_per_run, 50);
        assert_eq!(config.limits.max_accounts_per_refresh, 1000);
    }
}
