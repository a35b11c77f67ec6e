pub mod error;
pub mod memory;
pub mod store;
pub mod testing;

pub use error::StoreError;
pub use memory::MemoryScheduledEmailStore;
pub use store::{NewScheduledEmail, ScheduledEmailStore};
pub use testing::run_store_conformance_tests;
