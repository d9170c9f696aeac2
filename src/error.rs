use crate::editor::ValidationIssue;
use thiserror::Error;

/// Errors surfaced by the `DiagramHost` facade.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DesignerError {
    #[error("The diagram host has not been initialized")]
    NotInitialized,

    #[error("The diagram host is already initialized")]
    AlreadyInitialized,

    #[error("A diagram load is in progress")]
    Busy,

    #[error("The diagram host has been torn down")]
    Disposed,

    #[error("Failed to import diagram: {0}")]
    ImportFailed(String),

    #[error("Failed to serialize diagram: {0}")]
    SerializationFailed(String),

    /// Only ever logged. Viewport framing never affects the model.
    #[error("Failed to adjust viewport: {0}")]
    ViewportAdjustmentFailed(String),

    #[error("Failed to construct the diagram engine: {0}")]
    EngineCreationFailed(String),

    #[error("Gesture rejected: {0}")]
    GestureRejected(String),

    #[error("No property panel is open")]
    NoActiveSession,

    #[error("The open property panel does not accept these values")]
    SessionMismatch,

    #[error("Task values are invalid: {}", format_issues(.0))]
    InvalidTaskValues(Vec<ValidationIssue>),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised by diagram engine capability implementations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Import rejected: {0}")]
    Import(String),

    #[error("Serialization rejected: {0}")]
    Serialization(String),

    #[error("Viewport operation failed: {0}")]
    Viewport(String),

    #[error("Element '{0}' does not exist")]
    UnknownElement(String),

    #[error("Cannot use '{0}' as a shape")]
    InvalidShape(String),

    #[error("Cannot connect '{source_id}' to '{target_id}': {reason}")]
    InvalidConnection {
        source_id: String,
        target_id: String,
        reason: String,
    },

    #[error("Engine construction failed: {0}")]
    Construction(String),
}

/// Errors that occur while decoding an extended attribute from its wire string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttributeError {
    #[error("'{0}' is not a valid step number")]
    InvalidStepNumber(String),

    #[error("'{0}' is not a valid flow action (expected 'yes' or 'no')")]
    InvalidAction(String),

    #[error("Policy set is not a JSON array of strings: {0}")]
    InvalidPolicySet(String),
}

/// Errors that occur while loading a `DesignerConfig`.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Failed to parse designer config JSON: {0}")]
    JsonParseError(String),

    #[error("Invalid designer config: {0}")]
    ValidationError(String),
}
