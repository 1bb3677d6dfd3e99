//! Backend abstraction and the HTTP client implementation.
//!
//! This module provides:
//! - `Backend` trait for the three review endpoints (query, update, delete)
//! - `HttpBackend` implementation using reqwest
//! - Response types and their decoding rules

pub mod http;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, ReviewError};
use crate::query::QueryCriteria;
use crate::record::{FieldValues, NodeId, Record};

pub use http::HttpBackend;

/// Decoded query response: `[debugInfo, {fnode: Record}, ...]`.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// First element of the response array, usually `{debug_query: ...}`.
    pub debug: Value,
    pub records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct QueryEntry {
    fnode: Record,
}

impl QueryResponse {
    /// Decode a raw response body.
    ///
    /// Any entry that is not `{fnode: Record}` makes the whole response
    /// malformed; a response with no records is `EmptyResult`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Array(mut items) = value else {
            return Err(ReviewError::malformed("query response is not an array"));
        };
        if items.is_empty() {
            return Err(ReviewError::malformed("query response is empty"));
        }

        let debug = items.remove(0);
        if debug.is_null() {
            tracing::debug!("query response carries no debug info");
        }

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let entry: QueryEntry = serde_json::from_value(item).map_err(|err| {
                ReviewError::malformed(format!("entry {} is not a file node: {}", index + 1, err))
            })?;
            records.push(entry.fnode);
        }

        if records.is_empty() {
            return Err(ReviewError::EmptyResult);
        }

        Ok(Self { debug, records })
    }
}

/// `{status: "ok" | other}` reply of the update and delete endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusReply {
    pub fn ok() -> Self {
        Self {
            status: Some("ok".to_string()),
            error: None,
        }
    }

    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }

    /// Turn a non-ok reply into a `Rejected` error for `action`.
    pub fn into_result(self, action: &'static str) -> Result<()> {
        if self.is_ok() {
            return Ok(());
        }
        let status = self
            .status
            .or(self.error)
            .unwrap_or_else(|| "missing".to_string());
        Err(ReviewError::Rejected { action, status })
    }
}

/// Trait for backend implementations
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Run a search and return the decoded records
    async fn query(&self, criteria: &QueryCriteria) -> Result<QueryResponse>;

    /// Persist the editable fields of one record
    async fn update(&self, node_id: &NodeId, fields: &FieldValues) -> Result<StatusReply>;

    /// Delete a set of records in one call
    async fn delete(&self, node_ids: &[NodeId]) -> Result<StatusReply>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_query_response() {
        let raw = json!([
            {"debug_query": "MATCH (fnode:FileNode) RETURN fnode"},
            {"fnode": {"FILE-NODE-id": "a", "filepath": "C:\\x\\a.pdf"}},
            {"fnode": {"FILE-NODE-id": "b", "filepath": "C:\\x\\b.pdf", "phone": "1"}}
        ]);
        let response = QueryResponse::from_json(raw).unwrap();
        assert_eq!(response.records.len(), 2);
        assert_eq!(response.records[1].values.phone, "1");
        assert!(response.debug.get("debug_query").is_some());
    }

    #[test]
    fn test_debug_only_response_is_empty_result() {
        let raw = json!([{"debug_query": "MATCH ..."}]);
        let err = QueryResponse::from_json(raw).unwrap_err();
        assert!(matches!(err, ReviewError::EmptyResult));
    }

    #[test]
    fn test_non_array_response_is_malformed() {
        let raw = json!({"error": "Service not found"});
        let err = QueryResponse::from_json(raw).unwrap_err();
        assert!(matches!(err, ReviewError::Malformed(_)));
    }

    #[test]
    fn test_bad_entry_is_malformed() {
        let raw = json!([{}, {"fnode": {"category": "no id"}}]);
        let err = QueryResponse::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_status_reply() {
        assert!(StatusReply::ok().into_result("update").is_ok());

        let reply: StatusReply = serde_json::from_value(json!({"error": "nodeId and fields required"})).unwrap();
        let err = reply.into_result("update").unwrap_err();
        assert_eq!(
            err.to_string(),
            "server rejected update: status `nodeId and fields required`"
        );

        let err = StatusReply::with_status("not found").into_result("delete").unwrap_err();
        assert!(matches!(err, ReviewError::Rejected { action: "delete", .. }));
    }
}
