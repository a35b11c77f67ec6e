pub mod config;
pub mod datasource;
pub mod error;
pub mod send;

pub use config::SenderConfig;
pub use datasource::{NewEmailLog, SenderDataSource};
pub use error::SenderError;
pub use send::{SendOutcome, send_due, send_one};
