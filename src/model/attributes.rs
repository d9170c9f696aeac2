use super::action::FlowAction;
use super::policy::PolicySet;
use crate::error::AttributeError;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed set of extended attributes this layer reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeKey {
    Name,
    StepNumber,
    PolicyIds,
    Action,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 4] = [
        AttributeKey::Name,
        AttributeKey::StepNumber,
        AttributeKey::PolicyIds,
        AttributeKey::Action,
    ];

    /// Attribute name in the diagram wire format.
    pub fn wire_name(&self) -> &'static str {
        match self {
            AttributeKey::Name => "name",
            AttributeKey::StepNumber => "stepNumber",
            AttributeKey::PolicyIds => "policyId",
            AttributeKey::Action => "action",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.wire_name() == name)
    }

    /// Decodes a wire string into this key's typed value.
    ///
    /// `policyId` is kept as its raw JSON text; it is only parsed when a panel
    /// needs the individual ids, so malformed content is never lost.
    pub fn decode(&self, raw: &str) -> Result<AttributeValue, AttributeError> {
        match self {
            AttributeKey::Name => Ok(AttributeValue::Text(raw.to_string())),
            AttributeKey::PolicyIds => Ok(AttributeValue::Text(raw.to_string())),
            AttributeKey::StepNumber => raw
                .trim()
                .parse::<u32>()
                .map(AttributeValue::Number)
                .map_err(|_| AttributeError::InvalidStepNumber(raw.to_string())),
            AttributeKey::Action => raw.parse::<FlowAction>().map(AttributeValue::Action),
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Number(u32),
    Action(FlowAction),
}

impl AttributeValue {
    /// Encodes the value back into its wire string.
    pub fn encode(&self) -> String {
        match self {
            AttributeValue::Text(text) => text.clone(),
            AttributeValue::Number(n) => n.to_string(),
            AttributeValue::Action(action) => action.as_str().to_string(),
        }
    }
}

/// Extended attributes of one element, keyed by `AttributeKey`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributes(AHashMap<AttributeKey, AttributeValue>);

impl Attributes {
    pub fn get(&self, key: AttributeKey) -> Option<&AttributeValue> {
        self.0.get(&key)
    }

    pub fn set(&mut self, key: AttributeKey, value: AttributeValue) {
        self.0.insert(key, value);
    }

    pub fn remove(&mut self, key: AttributeKey) -> Option<AttributeValue> {
        self.0.remove(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applies every entry of `patch`, overwriting existing values.
    pub fn merge(&mut self, patch: &AttributePatch) {
        for (key, value) in patch.entries() {
            self.set(*key, value.clone());
        }
    }

    /// Entries in `AttributeKey` order, for stable serialization.
    pub fn entries(&self) -> Vec<(AttributeKey, &AttributeValue)> {
        AttributeKey::ALL
            .into_iter()
            .filter_map(|key| self.0.get(&key).map(|value| (key, value)))
            .collect()
    }

    pub fn name(&self) -> Option<&str> {
        match self.get(AttributeKey::Name) {
            Some(AttributeValue::Text(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// The task's step number; `None` when missing.
    pub fn step_number(&self) -> Option<u32> {
        match self.get(AttributeKey::StepNumber) {
            Some(AttributeValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// The raw JSON text stored for the task's policy set.
    pub fn policy_ids_raw(&self) -> Option<&str> {
        match self.get(AttributeKey::PolicyIds) {
            Some(AttributeValue::Text(raw)) => Some(raw.as_str()),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<FlowAction> {
        match self.get(AttributeKey::Action) {
            Some(AttributeValue::Action(action)) => Some(*action),
            _ => None,
        }
    }
}

/// A set of attribute writes issued together as one mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributePatch(Vec<(AttributeKey, AttributeValue)>);

impl AttributePatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, key: AttributeKey, value: AttributeValue) -> Self {
        self.0.retain(|(existing, _)| *existing != key);
        self.0.push((key, value));
        self
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.with(AttributeKey::Name, AttributeValue::Text(name.into()))
    }

    pub fn step_number(self, step: u32) -> Self {
        self.with(AttributeKey::StepNumber, AttributeValue::Number(step))
    }

    pub fn policy_ids(self, policies: &PolicySet) -> Self {
        self.with(AttributeKey::PolicyIds, AttributeValue::Text(policies.to_json()))
    }

    pub fn action(self, action: FlowAction) -> Self {
        self.with(AttributeKey::Action, AttributeValue::Action(action))
    }

    pub fn entries(&self) -> &[(AttributeKey, AttributeValue)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
