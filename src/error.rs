//! Error types for tasktrack
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad id, bad input, bad config)
//! - 4: Operation failed (store, serialization, io)

use thiserror::Error;

/// Exit codes for the task CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasktrack operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ambiguous task id '{prefix}': {}", matches.join(", "))]
    AmbiguousId {
        prefix: String,
        matches: Vec<String>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Operation failures (exit code 4)
    #[error("Task store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Corrupt task record {id}: {source}")]
    Serialization {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Some ids of a batch succeeded; `message` and `code` come from the
    /// failures alone.
    #[error("{message}")]
    PartialCompletion {
        message: String,
        code: i32,
        completed: Vec<String>,
        failed: Vec<(String, String)>,
    },
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotFound(_)
            | Error::InvalidInput(_)
            | Error::AmbiguousId { .. }
            | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            Error::StoreUnavailable(_)
            | Error::Serialization { .. }
            | Error::Storage(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlSerialize(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,

            Error::PartialCompletion { code, .. } => *code,
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::AmbiguousId { prefix, matches } => Some(serde_json::json!({
                "prefix": prefix,
                "matches": matches,
            })),
            Error::Serialization { id, .. } => Some(serde_json::json!({ "id": id })),
            Error::PartialCompletion {
                completed, failed, ..
            } => Some(serde_json::json!({
                "completed": completed,
                "failed": failed
                    .iter()
                    .map(|(id, error)| serde_json::json!({ "id": id, "error": error }))
                    .collect::<Vec<_>>(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for tasktrack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_map_to_exit_code_two() {
        assert_eq!(
            Error::NotFound("abc".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        assert_eq!(
            Error::InvalidInput("bad".to_string()).exit_code(),
            exit_codes::USER_ERROR
        );
        let ambiguous = Error::AmbiguousId {
            prefix: "ab".to_string(),
            matches: vec!["abc12345".to_string(), "abd12345".to_string()],
        };
        assert_eq!(ambiguous.exit_code(), exit_codes::USER_ERROR);
        assert_eq!(
            ambiguous.to_string(),
            "Ambiguous task id 'ab': abc12345, abd12345"
        );
    }

    #[test]
    fn store_errors_map_to_operation_failed() {
        let err = Error::StoreUnavailable("closed".to_string());
        assert_eq!(err.exit_code(), exit_codes::OPERATION_FAILED);

        let json = JsonError::from(&err);
        assert_eq!(json.code, exit_codes::OPERATION_FAILED);
        assert!(json.error.contains("closed"));
        assert!(json.details.is_none());
    }

    #[test]
    fn ambiguous_id_exposes_matches_as_details() {
        let err = Error::AmbiguousId {
            prefix: "wr".to_string(),
            matches: vec!["write123".to_string(), "wrap4567".to_string()],
        };
        let details = err.details().expect("details");
        assert_eq!(details["prefix"], "wr");
        assert_eq!(details["matches"][1], "wrap4567");
    }

    #[test]
    fn partial_completion_keeps_failure_code_and_both_lists() {
        let err = Error::PartialCompletion {
            message: "Task not found: zzzz".to_string(),
            code: exit_codes::USER_ERROR,
            completed: vec!["shipit12".to_string()],
            failed: vec![("zzzz".to_string(), "Task not found: zzzz".to_string())],
        };
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert_eq!(err.to_string(), "Task not found: zzzz");
        let details = err.details().expect("details");
        assert_eq!(details["completed"][0], "shipit12");
        assert_eq!(details["failed"][0]["id"], "zzzz");
        assert_eq!(details["failed"][0]["error"], "Task not found: zzzz");
    }
}
