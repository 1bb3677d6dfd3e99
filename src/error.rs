use thiserror::Error;

use crate::record::NodeId;

pub type Result<T> = std::result::Result<T, ReviewError>;

/// Failures surfaced by the backend and the view model.
///
/// None of these ever leave local state half-applied; callers report them
/// and move on.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered with HTTP {status}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("server rejected {action}: status `{status}`")]
    Rejected { action: &'static str, status: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("query returned no records")]
    EmptyResult,

    #[error("unknown record `{0}`")]
    UnknownRecord(NodeId),

    #[error("record `{0}` already has a request in flight")]
    Busy(NodeId),
}

impl ReviewError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ReviewError::Malformed(message.into())
    }

    /// Empty and malformed query results are treated as "nothing to show"
    /// rather than as a broken connection.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, ReviewError::EmptyResult | ReviewError::Malformed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ReviewError::HttpStatus {
            endpoint: "/buscard/node/update".into(),
            status: 500,
        };
        assert_eq!(err.to_string(), "/buscard/node/update answered with HTTP 500");

        let err = ReviewError::Rejected {
            action: "delete",
            status: "error".into(),
        };
        assert_eq!(err.to_string(), "server rejected delete: status `error`");

        let err = ReviewError::Busy(NodeId::from("n1"));
        assert_eq!(err.to_string(), "record `n1` already has a request in flight");
    }

    #[test]
    fn test_empty_result_classification() {
        assert!(ReviewError::EmptyResult.is_empty_result());
        assert!(ReviewError::malformed("not an array").is_empty_result());
        assert!(!ReviewError::UnknownRecord(NodeId::from("x")).is_empty_result());
    }
}
