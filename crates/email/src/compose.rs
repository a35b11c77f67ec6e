use std::collections::HashMap;

use cadence_core::{
    Account, AutomationId, EmailLogId, EmailTemplate, OwnerId, ScheduledEmailId, SenderDomain,
    UserSettings,
};
use chrono::NaiveDate;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::EmailProviderConfig;
use crate::merge_fields::MergeContext;
use crate::types::OutboundEmail;

/// Everything the composer needs to build one outbound message (§4.5 steps
/// 4-6). Bundled into a struct rather than threaded as loose arguments since
/// most fields come from different repositories (template, user settings,
/// sender domain) the sender has already fetched.
pub struct ComposeInput<'a> {
    pub scheduled_email_id: ScheduledEmailId,
    pub email_log_id: EmailLogId,
    pub automation_id: AutomationId,
    pub account: &'a Account,
    pub template: &'a EmailTemplate,
    pub user_settings: &'a UserSettings,
    pub sender_domain: Option<&'a SenderDomain>,
    pub trigger_date: Option<NaiveDate>,
    pub has_active_provider_connection: bool,
    pub config: &'a EmailProviderConfig,
}

/// Compose the final subject/body/headers for one send (§4.5 steps 4-6).
#[must_use]
pub fn compose_email(input: &ComposeInput<'_>) -> OutboundEmail {
    let ctx = MergeContext::build(
        input.account,
        input.scheduled_email_id,
        input.trigger_date,
        &input.config.star_rating_base_url,
        input.user_settings.agency_name.as_deref().unwrap_or_default(),
    );

    let subject = ctx.render(&input.template.subject);
    let rendered_html = ctx.render(&input.template.body_html);
    let rendered_text = input.template.body_text.as_deref().map(|t| ctx.render(t));

    let html_body = wrap_html(
        &rendered_html,
        input.user_settings,
        input.scheduled_email_id,
        input.account,
        &input.config.unsubscribe_url,
    );

    let from_domain = input
        .template
        .from_email
        .rsplit_once('@')
        .map_or("example.com", |(_, domain)| domain);
    let message_id =
        format!("<isg-{}-{}@{from_domain}>", input.email_log_id, chrono::Utc::now().timestamp_millis());

    let reply_to = choose_reply_to(input);

    let mut custom_args = HashMap::new();
    custom_args.insert("scheduled_email_id".to_string(), input.scheduled_email_id.to_string());
    custom_args.insert("automation_id".to_string(), input.automation_id.to_string());
    custom_args.insert("account_id".to_string(), input.account.id.to_string());
    custom_args.insert("owner_id".to_string(), input.user_settings.owner_id.to_string());
    custom_args.insert("email_log_id".to_string(), input.email_log_id.to_string());

    OutboundEmail {
        from_email: input.template.from_email.clone(),
        from_name: input.template.from_name.clone(),
        to_email: input.account.email.clone(),
        to_name: input.account.full_name(),
        subject,
        html_body,
        text_body: rendered_text,
        reply_to,
        message_id,
        custom_args,
        categories: vec!["automation".to_string(), format!("owner_{}", input.user_settings.owner_id)],
    }
}

/// Default Reply-To is the template's `from_email`; a tracking Reply-To is
/// substituted only when `REPLY_DOMAIN` is configured and the owner has an
/// active provider connection (§4.5 step 6).
fn choose_reply_to(input: &ComposeInput<'_>) -> String {
    match (&input.config.reply_domain, input.has_active_provider_connection) {
        (Some(domain), true) => format!("reply-{}@{domain}", input.email_log_id),
        _ => input
            .user_settings
            .reply_to_email
            .clone()
            .unwrap_or_else(|| input.template.from_email.clone()),
    }
}

/// Whether the composed message should be flagged `use_tracking_reply` on
/// its `email_log` row (§4.5 step 6, §3 "Email-log").
#[must_use]
pub fn uses_tracking_reply(config: &EmailProviderConfig, has_active_provider_connection: bool) -> bool {
    config.reply_domain.is_some() && has_active_provider_connection
}

/// Wrap the rendered body in a container, signature, agency info line, and
/// unsubscribe link (§4.5 step 4 closing paragraph).
fn wrap_html(
    body: &str,
    user_settings: &UserSettings,
    scheduled_email_id: ScheduledEmailId,
    account: &Account,
    unsubscribe_url: &str,
) -> String {
    let signature = user_settings.signature_html.as_deref().unwrap_or_default();
    let agency_line = user_settings.agency_info_line();
    let encoded_email = utf8_percent_encode(&account.email, NON_ALPHANUMERIC);

    let mut out = String::new();
    out.push_str("<div>");
    out.push_str(body);
    out.push_str("</div>");
    if !signature.is_empty() {
        out.push_str(signature);
    }
    if !agency_line.is_empty() {
        out.push_str(&format!(
            "<p style=\"color:#888888;text-align:center;\">{agency_line}</p>"
        ));
    }
    out.push_str(&format!(
        "<p style=\"text-align:center;\"><a href=\"{unsubscribe_url}?id={scheduled_email_id}&email={encoded_email}\">Unsubscribe</a></p>"
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{AccountId, EmailValidationStatus, TemplateId};

    fn account() -> Account {
        Account {
            id: AccountId::new(),
            owner_id: OwnerId::new(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: "jane@example.com".into(),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            opted_out: false,
            marketing_subscribed: true,
            email_validation_status: EmailValidationStatus::Valid,
            status: "active".into(),
            survey_outcome: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn template() -> EmailTemplate {
        EmailTemplate {
            id: TemplateId::new(),
            owner_id: None,
            default_key: Some("reminder".into()),
            subject: "Hi {{first_name}}".into(),
            body_html: "<p>Hello {{first_name}}</p>".into(),
            body_text: Some("Hello {{first_name}}".into()),
            from_email: "agent@agency.com".into(),
            from_name: "Agency".into(),
            created_at: chrono::Utc::now(),
        }
    }

    fn user_settings() -> UserSettings {
        UserSettings {
            owner_id: OwnerId::new(),
            from_email: "agent@agency.com".into(),
            from_name: "Agency".into(),
            reply_to_email: None,
            signature_html: Some("<p>Thanks, Agency</p>".into()),
            agency_name: Some("Agency".into()),
            agency_address: None,
            agency_phone: None,
            agency_website: None,
            google_review_link: None,
            trial_start: None,
            trial_end: None,
            default_send_time: "09:00".into(),
            timezone: "America/Chicago".into(),
            daily_send_limit: 500,
            preferences: serde_json::Value::Null,
        }
    }

    #[test]
    fn merge_fields_applied_to_subject_and_body() {
        let account = account();
        let template = template();
        let settings = user_settings();
        let config = EmailProviderConfig::default();
        let input = ComposeInput {
            scheduled_email_id: ScheduledEmailId::new(),
            email_log_id: EmailLogId::new(),
            automation_id: AutomationId::new(),
            account: &account,
            template: &template,
            user_settings: &settings,
            sender_domain: None,
            trigger_date: None,
            has_active_provider_connection: false,
            config: &config,
        };
        let out = compose_email(&input);
        assert_eq!(out.subject, "Hi Jane");
        assert!(out.html_body.contains("Hello Jane"));
        assert!(out.html_body.contains("Thanks, Agency"));
    }

    #[test]
    fn message_id_has_expected_shape() {
        let account = account();
        let template = template();
        let settings = user_settings();
        let config = EmailProviderConfig::default();
        let input = ComposeInput {
            scheduled_email_id: ScheduledEmailId::new(),
            email_log_id: EmailLogId::new(),
            automation_id: AutomationId::new(),
            account: &account,
            template: &template,
            user_settings: &settings,
            sender_domain: None,
            trigger_date: None,
            has_active_provider_connection: false,
            config: &config,
        };
        let out = compose_email(&input);
        assert!(out.message_id.starts_with("<isg-"));
        assert!(out.message_id.ends_with("@agency.com>"));
    }

    #[test]
    fn default_reply_to_is_template_from_email() {
        let account = account();
        let template = template();
        let settings = user_settings();
        let config = EmailProviderConfig::default();
        let input = ComposeInput {
            scheduled_email_id: ScheduledEmailId::new(),
            email_log_id: EmailLogId::new(),
            automation_id: AutomationId::new(),
            account: &account,
            template: &template,
            user_settings: &settings,
            sender_domain: None,
            trigger_date: None,
            has_active_provider_connection: false,
            config: &config,
        };
        let out = compose_email(&input);
        assert_eq!(out.reply_to, "agent@agency.com");
    }

    #[test]
    fn tracking_reply_to_requires_domain_and_connection() {
        let account = account();
        let template = template();
        let settings = user_settings();
        let config = EmailProviderConfig::default().with_reply_domain("reply.agency.com");

        let input_no_connection = ComposeInput {
            scheduled_email_id: ScheduledEmailId::new(),
            email_log_id: EmailLogId::new(),
            automation_id: AutomationId::new(),
            account: &account,
            template: &template,
            user_settings: &settings,
            sender_domain: None,
            trigger_date: None,
            has_active_provider_connection: false,
            config: &config,
        };
        assert!(!compose_email(&input_no_connection).reply_to.contains("reply.agency.com"));

        let email_log_id = EmailLogId::new();
        let input_with_connection = ComposeInput {
            scheduled_email_id: ScheduledEmailId::new(),
            email_log_id,
            automation_id: AutomationId::new(),
            account: &account,
            template: &template,
            user_settings: &settings,
            sender_domain: None,
            trigger_date: None,
            has_active_provider_connection: true,
            config: &config,
        };
        let out = compose_email(&input_with_connection);
        assert_eq!(out.reply_to, format!("reply-{email_log_id}@reply.agency.com"));
        assert!(uses_tracking_reply(&config, true));
        assert!(!uses_tracking_reply(&config, false));
    }
}
