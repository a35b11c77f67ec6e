pub mod context;
pub mod date_predicate;
pub mod error;
pub mod evaluator;
pub mod geocoder;
pub mod text_ops;

pub use context::EvalContext;
pub use error::RuleError;
pub use evaluator::{MatchResult, evaluate_account, geocode_key_for, rule_matches};
pub use geocoder::{GeocodeCache, GeocoderClient, LatLng};
