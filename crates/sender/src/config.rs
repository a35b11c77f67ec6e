/// Tunables for one send pass (§4.5, §4.8).
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub max_emails_per_run: usize,
    pub max_attempts: u32,
    pub dedup_window_days: i64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self { max_emails_per_run: 200, max_attempts: 5, dedup_window_days: 7 }
    }
}
