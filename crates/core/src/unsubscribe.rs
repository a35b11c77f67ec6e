use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A global, cross-owner unsubscribe record keyed by email address. Any
/// match is a hard stop at send time regardless of which automation or
/// owner is sending (§3, §4.4 step 5, §4.5 step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unsubscribe {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Unsubscribe {
    #[must_use]
    pub fn normalize(email: &str) -> String {
        email.trim().to_ascii_lowercase()
    }

    #[must_use]
    pub fn matches(&self, email: &str) -> bool {
        Self::normalize(&self.email) == Self::normalize(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_is_case_and_whitespace_insensitive() {
        let row = Unsubscribe { email: "Jane@Example.com".into(), created_at: Utc::now() };
        assert!(row.matches(" jane@example.com "));
        assert!(!row.matches("john@example.com"));
    }
}
