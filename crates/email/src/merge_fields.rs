use std::collections::HashMap;
use std::sync::LazyLock;

use cadence_core::{Account, ScheduledEmailId};
use chrono::NaiveDate;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;

/// Matches `{{ placeholder }}`, tolerant of surrounding whitespace inside the
/// braces (§4.5 step 4). Matching is done case-insensitively against the
/// lowercased capture at lookup time rather than via an inline regex flag, so
/// the same compiled pattern serves every placeholder.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid regex"));

/// The fixed set of merge-field values available to a template render
/// (§4.5 step 4). Built once per send from the account, and rendered into
/// subject/HTML/text bodies.
#[derive(Debug, Clone)]
pub struct MergeContext {
    values: HashMap<String, String>,
}

impl MergeContext {
    #[must_use]
    pub fn build(
        account: &Account,
        scheduled_email_id: ScheduledEmailId,
        trigger_date: Option<NaiveDate>,
        star_rating_base_url: &str,
        company_name: &str,
    ) -> Self {
        let today = chrono::Utc::now().date_naive();
        let mut values = HashMap::new();

        let first_name = account.first_name.clone().unwrap_or_default();
        let last_name = account.last_name.clone().unwrap_or_default();
        let full_name = account.full_name();

        values.insert("first_name".to_string(), first_name);
        values.insert("last_name".to_string(), last_name);
        values.insert("full_name".to_string(), full_name.clone());
        values.insert("name".to_string(), full_name.clone());
        values.insert("recipient_name".to_string(), full_name);
        values.insert("company_name".to_string(), company_name.to_string());
        values.insert("email".to_string(), account.email.clone());
        values.insert("recipient_email".to_string(), account.email.clone());
        values.insert("phone".to_string(), account.phone.clone().unwrap_or_default());
        values.insert("address".to_string(), account.address.clone().unwrap_or_default());
        values.insert("city".to_string(), account.city.clone().unwrap_or_default());
        values.insert("state".to_string(), account.state.clone().unwrap_or_default());
        values.insert("zip".to_string(), account.zip_code.clone().unwrap_or_default());
        values.insert("postal_code".to_string(), account.zip_code.clone().unwrap_or_default());
        values.insert("today".to_string(), today.format("%Y-%m-%d").to_string());
        values.insert("current_year".to_string(), today.format("%Y").to_string());
        values.insert(
            "trigger_date".to_string(),
            trigger_date.map_or_else(String::new, |d| d.format("%Y-%m-%d").to_string()),
        );

        for rating in 1..=5 {
            let encoded_account = utf8_percent_encode(&account.id.to_string(), NON_ALPHANUMERIC);
            let url = format!(
                "{star_rating_base_url}?id={scheduled_email_id}&rating={rating}&account={encoded_account}"
            );
            values.insert(format!("rating_url_{rating}"), url);
        }

        Self { values }
    }

    /// Substitute every recognized placeholder in `template`. Unrecognized
    /// `{{...}}` spans are left untouched rather than blanked, since an
    /// author's typo shouldn't silently erase content.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let key = caps[1].to_ascii_lowercase();
                self.values.get(&key).cloned().unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{AccountId, EmailValidationStatus, OwnerId};

    fn account() -> Account {
        Account {
            id: AccountId::new(),
            owner_id: OwnerId::new(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: "jane@example.com".into(),
            phone: Some("555-0100".into()),
            address: None,
            city: Some("Austin".into()),
            state: Some("TX".into()),
            zip_code: Some("78701".into()),
            opted_out: false,
            marketing_subscribed: true,
            email_validation_status: EmailValidationStatus::Valid,
            status: "active".into(),
            survey_outcome: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn substitutes_known_placeholders() {
        let ctx = MergeContext::build(&account(), ScheduledEmailId::new(), None, "https://example.com/star", "Acme Insurance");
        let rendered = ctx.render("Hi {{first_name}}, you live in {{ city }}, {{State}}.");
        assert_eq!(rendered, "Hi Jane, you live in Austin, TX.");
    }

    #[test]
    fn is_case_insensitive_and_whitespace_tolerant() {
        let ctx = MergeContext::build(&account(), ScheduledEmailId::new(), None, "https://example.com/star", "Acme Insurance");
        assert_eq!(ctx.render("{{ EMAIL }}"), "jane@example.com");
        assert_eq!(ctx.render("{{email}}"), "jane@example.com");
    }

    #[test]
    fn unknown_placeholder_passes_through() {
        let ctx = MergeContext::build(&account(), ScheduledEmailId::new(), None, "https://example.com/star", "Acme Insurance");
        assert_eq!(ctx.render("{{not_a_field}}"), "{{not_a_field}}");
    }

    #[test]
    fn rating_urls_carry_distinct_ratings() {
        let ctx = MergeContext::build(&account(), ScheduledEmailId::new(), None, "https://example.com/star", "Acme Insurance");
        let one = ctx.render("{{rating_url_1}}");
        let five = ctx.render("{{rating_url_5}}");
        assert!(one.contains("rating=1"));
        assert!(five.contains("rating=5"));
        assert_ne!(one, five);
    }

    #[test]
    fn trigger_date_blank_when_absent() {
        let ctx = MergeContext::build(&account(), ScheduledEmailId::new(), None, "https://example.com/star", "Acme Insurance");
        assert_eq!(ctx.render("{{trigger_date}}"), "");
    }

    #[test]
    fn company_name_renders_from_agency_name() {
        let ctx = MergeContext::build(&account(), ScheduledEmailId::new(), None, "https://example.com/star", "Acme Insurance");
        assert_eq!(ctx.render("{{company_name}}"), "Acme Insurance");
    }

    #[test]
    fn company_name_blank_when_agency_name_unset() {
        let ctx = MergeContext::build(&account(), ScheduledEmailId::new(), None, "https://example.com/star", "");
        assert_eq!(ctx.render("{{company_name}}"), "");
    }
}
