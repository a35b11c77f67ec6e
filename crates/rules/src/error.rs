/// Errors from the filter evaluator and its supporting geocoder cache.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("geocoder request failed: {0}")]
    GeocoderRequest(#[from] reqwest::Error),
    #[error("geocoder response was not valid JSON: {0}")]
    GeocoderResponse(String),
    #[error("geocoder request timed out")]
    GeocoderTimeout,
}
