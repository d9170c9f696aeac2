use crate::error::AttributeError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// An entry of the external policy registry, as handed to the host at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    #[serde(alias = "displayName")]
    pub display_name: String,
}

/// Read-only list of policies offered by the task panel's selection control.
#[derive(Debug, Clone, Default)]
pub struct PolicyCatalog {
    policies: Vec<Policy>,
}

impl PolicyCatalog {
    pub fn new(policies: Vec<Policy>) -> Self {
        let policies = policies
            .into_iter()
            .unique_by(|policy| policy.id.clone())
            .collect();
        Self { policies }
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn get(&self, id: &str) -> Option<&Policy> {
        self.policies.iter().find(|policy| policy.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
}

/// Ordered, duplicate-free set of policy ids attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PolicySet(Vec<String>);

impl PolicySet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).unique().collect())
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|existing| existing == id)
    }

    /// Parses the JSON array string stored in the `policyId` attribute.
    pub fn from_json(raw: &str) -> Result<Self, AttributeError> {
        serde_json::from_str::<Vec<String>>(raw)
            .map(Self::new)
            .map_err(|e| AttributeError::InvalidPolicySet(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        // A Vec<String> always serializes.
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

impl From<Vec<String>> for PolicySet {
    fn from(ids: Vec<String>) -> Self {
        Self::new(ids)
    }
}

impl From<PolicySet> for Vec<String> {
    fn from(set: PolicySet) -> Self {
        set.0
    }
}
