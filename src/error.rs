use thiserror::Error;

use crate::rate::Rate;

/// Everything that can go wrong while building or rebinding a graph.
///
/// Generation itself never fails: numeric edge cases are clamped inside the
/// unit generators so a started graph always produces a full block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("definition is missing its type identifier")]
    MissingType,

    #[error("unknown unit generator type `{0}`")]
    UnknownType(String),

    #[error("unknown rate `{0}`")]
    UnknownRate(String),

    #[error("`{kind}` cannot run at {rate} rate")]
    UnsupportedRate { kind: String, rate: Rate },

    #[error("`{kind}` has no input named `{input}`")]
    UnknownInput { kind: String, input: String },

    #[error("`{kind}` requires input `{input}`")]
    MissingInput { kind: String, input: String },

    #[error("input `{input}` of `{kind}` expects {expected}")]
    InputMismatch {
        kind: String,
        input: String,
        expected: &'static str,
    },

    #[error("invalid option `{option}` for `{kind}`: {reason}")]
    InvalidOption {
        kind: String,
        option: String,
        reason: String,
    },

    #[error("unknown curve shape `{0}`")]
    UnknownCurve(String),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("id `{0}` is already registered")]
    DuplicateId(String),

    #[error("path `{0}` does not resolve to a node")]
    PathNotFound(String),

    #[error("path `{0}` does not point at a value node")]
    NotAValue(String),

    #[error("dependency cycle through `{0}`")]
    Cycle(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed definition: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Malformed(err.to_string())
    }
}
