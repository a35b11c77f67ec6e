use cadence_sender::SenderConfig;
use cadence_verifier::VerifierConfig;

/// Tunables for one reactor run (§4.6, §4.8).
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    pub max_accounts_per_refresh: usize,
    pub verifier: VerifierConfig,
    pub sender: SenderConfig,
}

impl Default for ReactorConfig {
    fn default() -> Self {
        Self { max_accounts_per_refresh: 1000, verifier: VerifierConfig::default(), sender: SenderConfig::default() }
    }
}
