use serde::{Deserialize, Serialize};

/// A single predicate within a [`Group`].
///
/// `value2` is only meaningful for `between`-shaped operators (`policy_count
/// between`, date-range `between`). `radius` is only meaningful for
/// `location within_radius`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub value2: Option<String>,
    #[serde(default)]
    pub radius: Option<f64>,
    /// Restricts `policy_expiration`/`policy_effective` rules to policies of
    /// this line of business.
    #[serde(default, rename = "policyType")]
    pub policy_type: Option<String>,
    /// Restricts `policy_expiration`/`policy_effective` rules to policies of
    /// this term (matched the way `policy_term` rules are, ignoring the
    /// trailing "month(s)").
    #[serde(default, rename = "policyTerm")]
    pub policy_term: Option<String>,
}

impl Rule {
    #[must_use]
    pub fn new(field: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: None,
            value2: None,
            radius: None,
            policy_type: None,
            policy_term: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_value2(mut self, value: impl Into<String>) -> Self {
        self.value2 = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }
}

/// A group of AND-ed rules. Groups themselves are OR-ed together by
/// [`FilterConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// The account-targeting filter attached to an automation.
///
/// Accounts match iff at least one group matches (OR) and a group matches
/// iff every one of its rules matches (AND). An empty group list matches
/// every account, subject to `not_opted_out` and `search`.
///
/// Deserialization also accepts the legacy shape `{ rules: [...] }` (no
/// `groups` wrapper), which is treated as a single implicit group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default, rename = "notOptedOut")]
    pub not_opted_out: bool,
    #[serde(default)]
    pub search: String,
}

impl FilterConfig {
    /// Construct a filter from legacy `{ rules: [...] }` JSON, wrapping the
    /// rule list as a single group.
    #[must_use]
    pub fn from_legacy_rules(rules: Vec<Rule>) -> Self {
        Self {
            groups: vec![Group { rules }],
            not_opted_out: false,
            search: String::new(),
        }
    }

    /// Parse a filter-config JSON value, accepting both the modern
    /// `{ groups, notOptedOut, search }` shape and the legacy
    /// `{ rules: [...] }` shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is neither shape.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.get("groups").is_some() {
            return serde_json::from_value(value.clone());
        }
        if let Some(rules) = value.get("rules") {
            let rules: Vec<Rule> = serde_json::from_value(rules.clone())?;
            let mut cfg = Self::from_legacy_rules(rules);
            if let Some(v) = value.get("notOptedOut").and_then(serde_json::Value::as_bool) {
                cfg.not_opted_out = v;
            }
            if let Some(v) = value.get("search").and_then(serde_json::Value::as_str) {
                cfg.search = v.to_owned();
            }
            return Ok(cfg);
        }
        // Neither shape present: treat as match-all with no groups.
        Ok(Self::default())
    }
}

/// Trigger-date fields recognized by the planner (§4.2). Kept distinct from
/// arbitrary filter fields because these three drive relative-date math
/// instead of a simple account/policy attribute comparison.
pub const DATE_TRIGGER_FIELDS: [&str; 3] =
    ["policy_expiration", "policy_effective", "account_created"];
