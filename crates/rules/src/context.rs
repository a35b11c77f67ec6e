use std::collections::HashMap;

use cadence_core::{AccountId, Policy};
use chrono::{DateTime, Utc};

use crate::geocoder::{GeocodeCache, LatLng};

/// Precomputed, batch-scoped data the evaluator consults instead of issuing
/// per-account, per-rule lookups (§4.1 "Compilation strategy").
pub struct EvalContext<'a> {
    pub now: DateTime<Utc>,
    pub policies_by_account: &'a HashMap<AccountId, Vec<Policy>>,
    /// Most recent `Sent/Delivered/Opened/Clicked` log timestamp per
    /// account. Absence means "never emailed".
    pub last_email_sent: &'a HashMap<AccountId, DateTime<Utc>>,
    pub geocodes: &'a GeocodeCache,
}

impl<'a> EvalContext<'a> {
    #[must_use]
    pub fn policies_for(&self, account_id: AccountId) -> &[Policy] {
        self.policies_by_account.get(&account_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn last_email_sent_for(&self, account_id: AccountId) -> Option<DateTime<Utc>> {
        self.last_email_sent.get(&account_id).copied()
    }

    #[must_use]
    pub fn geocode(&self, key: &str) -> Option<LatLng> {
        self.geocodes.get_cached(key).flatten()
    }
}
