//! Error taxonomy for parameter construction, URL sync and panel operations.
//!
//! Only construction errors are fatal. Everything raised while syncing a URL or
//! handling an edit is caught per key, logged and dropped, so callers mostly see
//! these values through `tracing` output rather than through `Result`s.

use thiserror::Error;

/// Errors produced while defining, syncing or editing parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamsError {
    /// A definition used a `type` this crate does not know
    #[error("unknown parameter type: {0:?}")]
    UnknownParamType(String),

    /// No initial value could be produced for a parameter
    #[error("no value defined for parameter {key:?}")]
    NoValueDefined { key: String },

    /// A query-string key that is neither `name` nor `name[i]`
    #[error("malformed URL segment: {0:?}")]
    MalformedUrlSegment(String),

    /// A raw value could not be parsed into the parameter's type
    #[error("failed to parse {key:?}: {reason}")]
    ParseFailure { key: String, reason: String },

    /// The mount point for the panel does not exist
    #[error("no container found for selector {0:?}")]
    MissingContainer(String),

    /// A key was requested that is not part of the definition set
    #[error("key {key:?} does not exist in defined params. Available keys: {available:?}")]
    UnknownKey { key: String, available: Vec<String> },

    /// Definition JSON could not be deserialized
    #[error("invalid parameter definitions: {0}")]
    InvalidDefinitions(String),

    /// Panel configuration could not be deserialized
    #[error("invalid panel configuration: {0}")]
    InvalidConfig(String),
}

impl ParamsError {
    /// Whether the error must abort initialization
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParamsError::UnknownParamType(_)
                | ParamsError::NoValueDefined { .. }
                | ParamsError::MissingContainer(_)
                | ParamsError::InvalidDefinitions(_)
                | ParamsError::InvalidConfig(_)
        )
    }

    pub(crate) fn parse_failure(key: &str, reason: impl Into<String>) -> Self {
        ParamsError::ParseFailure {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ParamsError {
    fn from(e: serde_json::Error) -> Self {
        ParamsError::InvalidDefinitions(e.to_string())
    }
}
