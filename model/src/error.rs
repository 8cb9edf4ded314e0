use thiserror::Error;

/// Errors raised while building or validating domain records.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("invalid date {value:?}: expected YYYYMMDD")]
    InvalidDate { value: String },

    #[error("invalid check time {value:?}: expected YYYYMMDDhh:mm:ss")]
    InvalidCheckTime { value: String },

    #[error("invalid identifier {value:?}: {reason}")]
    InvalidId { value: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("invalid {field} value {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("inconsistent record: {0}")]
    Inconsistent(String),

    #[error("failed to compile {kind} schema: {reason}")]
    SchemaCompile { kind: String, reason: String },

    #[error(
        "{kind} failed schema validation ({} error{}):\n  - {}",
        .violations.len(),
        if .violations.len() == 1 { "" } else { "s" },
        .violations.join("\n  - ")
    )]
    Schema { kind: String, violations: Vec<String> },

    #[error("no dish data found to export")]
    NoDishData,

    #[error("report has no rows")]
    EmptyReport,
}
