/// Aggregate outcome of one reactor action, returned to the RPC layer
/// (§4.6, §6 "POST /v1/run").
#[derive(Debug, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub action: String,
    pub refreshed: u64,
    pub new_scheduled: u64,
    pub verified: u64,
    pub cancelled: u64,
    pub sent: u64,
    pub failed: u64,
    pub errors: Vec<String>,
    pub has_more: bool,
    pub next_offset: Option<usize>,
}

impl RunSummary {
    #[must_use]
    pub fn for_action(action: &str) -> Self {
        Self { action: action.to_string(), ..Self::default() }
    }

    fn merge(&mut self, other: Self) {
        self.refreshed += other.refreshed;
        self.new_scheduled += other.new_scheduled;
        self.verified += other.verified;
        self.cancelled += other.cancelled;
        self.sent += other.sent;
        self.failed += other.failed;
        self.errors.extend(other.errors);
        self.has_more = self.has_more || other.has_more;
        if other.next_offset.is_some() {
            self.next_offset = other.next_offset;
        }
    }

    pub(crate) fn absorb(&mut self, other: Self) {
        self.merge(other);
    }
}
