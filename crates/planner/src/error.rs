/// Errors from the trigger-date planner and its timezone helper.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("invalid send time: {0}")]
    InvalidSendTime(String),
    #[error("no template could be resolved for node {node_id}")]
    UnresolvedTemplate { node_id: String },
    #[error("store error: {0}")]
    Store(#[from] cadence_store::StoreError),
}
