use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, PolicyId};

/// Status of an insurance policy. Only `Active` policies drive date triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    Cancelled,
    Expired,
    Pending,
    Other(String),
}

impl PolicyStatus {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Pending => "pending",
            Self::Other(s) => s.as_str(),
        }
    }
}

/// An insurance policy attached to an [`Account`](crate::Account).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub account_id: AccountId,
    /// Line of business, e.g. `"Auto"`, `"Home"`, `"Umbrella"`.
    pub lob: String,
    pub status: PolicyStatus,
    pub effective_date: NaiveDate,
    pub expiration_date: NaiveDate,
    /// Human-readable term label, e.g. `"6 months"`.
    pub term: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_is_active() {
        assert!(PolicyStatus::Active.is_active());
        assert!(!PolicyStatus::Cancelled.is_active());
        assert!(!PolicyStatus::Other("lapsed".into()).is_active());
    }

    #[test]
    fn as_str_matches_lowercase_contract() {
        assert_eq!(PolicyStatus::Active.as_str(), "active");
        assert_eq!(PolicyStatus::Other("Renewed".into()).as_str(), "Renewed");
    }
}
