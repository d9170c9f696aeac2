use crate::config::Locale;
use crate::error::AttributeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a gateway branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowAction {
    #[default]
    Yes,
    No,
}

impl FlowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowAction::Yes => "yes",
            FlowAction::No => "no",
        }
    }

    /// The display name a flow carrying this action must have.
    pub fn label(&self, locale: Locale) -> &'static str {
        match (locale, self) {
            (Locale::En, FlowAction::Yes) => "Yes",
            (Locale::En, FlowAction::No) => "No",
            (Locale::Vi, FlowAction::Yes) => "Có",
            (Locale::Vi, FlowAction::No) => "Không",
        }
    }
}

impl fmt::Display for FlowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowAction {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "yes" => Ok(FlowAction::Yes),
            "no" => Ok(FlowAction::No),
            other => Err(AttributeError::InvalidAction(other.to_string())),
        }
    }
}
