pub mod config;
pub mod datasource;
pub mod error;
pub mod run;
pub mod summary;

pub use config::ReactorConfig;
pub use datasource::{AccountPage, ReactorDataSource};
pub use error::ReactorError;
pub use run::Reactor;
pub use summary::RunSummary;
