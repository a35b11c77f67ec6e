use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::OwnerId;

/// Per-owner sending identity and preferences, consulted by the sender (C5)
/// when composing an outbound message (§4.5 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub owner_id: OwnerId,
    pub from_email: String,
    pub from_name: String,
    pub reply_to_email: Option<String>,
    pub signature_html: Option<String>,
    pub agency_name: Option<String>,
    pub agency_address: Option<String>,
    pub agency_phone: Option<String>,
    pub agency_website: Option<String>,
    pub google_review_link: Option<String>,
    pub trial_start: Option<NaiveDate>,
    pub trial_end: Option<NaiveDate>,
    pub default_send_time: String,
    pub timezone: String,
    pub daily_send_limit: u32,
    #[serde(default)]
    pub preferences: Value,
}

impl UserSettings {
    /// The grey, centered agency info line appended below the signature,
    /// built from whichever of name/address/phone/website are present
    /// (§4.5 step 4: `parts.join(" | ")`).
    #[must_use]
    pub fn agency_info_line(&self) -> String {
        [
            self.agency_name.as_deref(),
            self.agency_address.as_deref(),
            self.agency_phone.as_deref(),
            self.agency_website.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> UserSettings {
        UserSettings {
            owner_id: OwnerId::new(),
            from_email: "agent@example.com".into(),
            from_name: "Example Agency".into(),
            reply_to_email: None,
            signature_html: None,
            agency_name: Some("Example Agency".into()),
            agency_address: Some("123 Main St".into()),
            agency_phone: None,
            agency_website: Some("https://example.com".into()),
            google_review_link: None,
            trial_start: None,
            trial_end: None,
            default_send_time: "09:00".into(),
            timezone: "America/Chicago".into(),
            daily_send_limit: 500,
            preferences: Value::Null,
        }
    }

    #[test]
    fn agency_info_line_skips_missing_parts() {
        let settings = base();
        assert_eq!(
            settings.agency_info_line(),
            "Example Agency | 123 Main St | https://example.com"
        );
    }

    #[test]
    fn agency_info_line_empty_when_nothing_set() {
        let mut settings = base();
        settings.agency_name = None;
        settings.agency_address = None;
        settings.agency_website = None;
        assert_eq!(settings.agency_info_line(), "");
    }
}
