pub mod account;
pub mod activity;
pub mod automation;
pub mod email_log;
pub mod error;
pub mod filter;
pub mod ids;
pub mod policy;
pub mod scheduled_email;
pub mod sender_domain;
pub mod template;
pub mod unsubscribe;
pub mod user_settings;

pub use account::{Account, EmailValidationStatus, looks_like_email};
pub use activity::{ActivityKind, ActivityLogEntry};
pub use automation::{
    Automation, AutomationStatus, DelayUnit, PacingConfig, TemplateRef, WorkflowNode,
};
pub use email_log::{EmailLog, EmailLogStatus};
pub use error::DomainError;
pub use filter::{DATE_TRIGGER_FIELDS, FilterConfig, Group, Rule};
pub use ids::{
    AccountId, AutomationId, BatchId, EmailLogId, OwnerId, PolicyId, ScheduledEmailId, TemplateId,
};
pub use policy::{Policy, PolicyStatus};
pub use scheduled_email::{ScheduledEmail, ScheduledEmailStatus};
pub use sender_domain::{SenderDomain, SenderDomainStatus};
pub use template::EmailTemplate;
pub use unsubscribe::Unsubscribe;
pub use user_settings::UserSettings;
