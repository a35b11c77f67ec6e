pub mod config;
pub mod datasource;
pub mod error;
pub mod verify;

pub use config::VerifierConfig;
pub use datasource::VerifierDataSource;
pub use error::VerifierError;
pub use verify::{VerifyOutcome, verify_due};
