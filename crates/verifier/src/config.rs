/// Tunables for a verification pass (§4.4, §4.8).
///
/// The 24-hour `listDueForVerification` lookahead window itself is fixed by
/// the [`cadence_store::ScheduledEmailStore`] implementation rather than
/// threaded through here; see `DESIGN.md` for why.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Width of the template-level send dedup window, in days (§4.4 step 7).
    pub dedup_window_days: i64,
    /// Maximum rows pulled from the store per verification pass.
    pub batch_limit: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self { dedup_window_days: 7, batch_limit: 500 }
    }
}
