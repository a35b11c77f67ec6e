use serde::{Deserialize, Serialize};

use crate::ids::OwnerId;

/// Verification state of a [`SenderDomain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderDomainStatus {
    Verified,
    Pending,
    Failed,
}

/// An owner-owned, domain-authenticated sending domain. The sender (C5)
/// looks this up by exact match on the `from_email`'s domain to decide
/// whether a tracking Reply-To may be injected (§4.5 step 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderDomain {
    pub owner_id: OwnerId,
    pub domain: String,
    pub status: SenderDomainStatus,
    pub inbound_parse_enabled: bool,
    pub inbound_subdomain: Option<String>,
}

impl SenderDomain {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.status == SenderDomainStatus::Verified
    }

    /// Whether this domain record matches the domain portion of `email`,
    /// case-insensitively.
    #[must_use]
    pub fn matches_email_domain(&self, email: &str) -> bool {
        email
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(&self.domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SenderDomain {
        SenderDomain {
            owner_id: OwnerId::new(),
            domain: "example.com".into(),
            status: SenderDomainStatus::Verified,
            inbound_parse_enabled: true,
            inbound_subdomain: Some("reply".into()),
        }
    }

    #[test]
    fn domain_match_is_case_insensitive() {
        let domain = base();
        assert!(domain.matches_email_domain("agent@EXAMPLE.com"));
        assert!(!domain.matches_email_domain("agent@other.com"));
    }

    #[test]
    fn only_verified_status_is_verified() {
        let mut domain = base();
        assert!(domain.is_verified());
        domain.status = SenderDomainStatus::Pending;
        assert!(!domain.is_verified());
    }
}
