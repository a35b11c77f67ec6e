use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, OwnerId};

/// Validity of an account's contact email address, as last determined by an
/// (external) email-validation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailValidationStatus {
    Valid,
    Invalid,
    Risky,
    Unknown,
}

impl EmailValidationStatus {
    #[must_use]
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A customer/prospect record owned by an agency, targetable by automations.
///
/// Invariant: only accounts with a syntactically valid email, a `Valid`
/// [`EmailValidationStatus`], and `opted_out == false` may be scheduled or
/// sent to ([`Account::is_sendable`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: OwnerId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    /// Two-letter state/province code.
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub opted_out: bool,
    pub marketing_subscribed: bool,
    pub email_validation_status: EmailValidationStatus,
    pub status: String,
    pub survey_outcome: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Whether this account is syntactically and consensually eligible to
    /// receive marketing email right now. Does not check unsubscribe lists
    /// or per-template dedup -- those are checked separately by the verifier
    /// and sender against the store.
    #[must_use]
    pub fn is_sendable(&self) -> bool {
        !self.opted_out && self.email_validation_status.is_valid() && looks_like_email(&self.email)
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.clone(),
            (None, Some(l)) => l.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Minimal syntactic check: local-part `@` domain-part. The verifier and
/// sender re-check this at send time since account data can change between
/// planning and delivery.
#[must_use]
pub fn looks_like_email(s: &str) -> bool {
    let s = s.trim();
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_account() -> Account {
        Account {
            id: AccountId::new(),
            owner_id: OwnerId::new(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: "jane@example.com".into(),
            phone: None,
            address: None,
            city: Some("Austin".into()),
            state: Some("TX".into()),
            zip_code: Some("78701".into()),
            opted_out: false,
            marketing_subscribed: true,
            email_validation_status: EmailValidationStatus::Valid,
            status: "active".into(),
            survey_outcome: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn sendable_account_passes() {
        assert!(base_account().is_sendable());
    }

    #[test]
    fn opted_out_account_is_not_sendable() {
        let mut a = base_account();
        a.opted_out = true;
        assert!(!a.is_sendable());
    }

    #[test]
    fn invalid_email_status_is_not_sendable() {
        let mut a = base_account();
        a.email_validation_status = EmailValidationStatus::Invalid;
        assert!(!a.is_sendable());
    }

    #[test]
    fn malformed_email_is_not_sendable() {
        let mut a = base_account();
        a.email = "not-an-email".into();
        assert!(!a.is_sendable());
    }

    #[test]
    fn full_name_combinations() {
        let mut a = base_account();
        assert_eq!(a.full_name(), "Jane Doe");
        a.last_name = None;
        assert_eq!(a.full_name(), "Jane");
        a.first_name = None;
        assert_eq!(a.full_name(), "");
    }

    #[test]
    fn email_syntax_check() {
        assert!(looks_like_email("a@b.com"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.com"));
        assert!(!looks_like_email("ab.com"));
    }
}
