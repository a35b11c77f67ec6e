pub mod error;
pub mod pacing;
pub mod plan;
pub mod timezone;
pub mod trigger_window;
pub mod workflow;

pub use error::PlannerError;
pub use pacing::{apply_pacing, valid_pacing_days};
pub use plan::{PlanOutcome, plan_automation};
pub use timezone::local_to_utc;
pub use trigger_window::{TriggerWindow, partition_date_trigger_rules};
pub use workflow::{PlanStep, plan_steps};
