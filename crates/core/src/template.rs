use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OwnerId, TemplateId};

/// A reusable marketing-email template.
///
/// `default_key` lets a `send_email` workflow node reference a template by a
/// stable logical name (`"renewal_reminder"`) instead of a UUID, so an owner
/// can swap the underlying template without editing every automation that
/// uses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: TemplateId,
    pub owner_id: Option<OwnerId>,
    pub default_key: Option<String>,
    pub subject: String,
    pub body_html: String,
    pub body_text: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub created_at: DateTime<Utc>,
}

impl EmailTemplate {
    /// Whether this template can be matched by the logical key `key`.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        self.default_key.as_deref() == Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> EmailTemplate {
        EmailTemplate {
            id: TemplateId::new(),
            owner_id: None,
            default_key: Some("renewal_reminder".into()),
            subject: "Your policy renews soon".into(),
            body_html: "<p>Hi {{first_name}}</p>".into(),
            body_text: None,
            from_email: "noreply@example.com".into(),
            from_name: "Example Agency".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn matches_key_compares_default_key() {
        let t = base();
        assert!(t.matches_key("renewal_reminder"));
        assert!(!t.matches_key("other"));
    }

    #[test]
    fn no_key_never_matches() {
        let mut t = base();
        t.default_key = None;
        assert!(!t.matches_key("renewal_reminder"));
    }
}
