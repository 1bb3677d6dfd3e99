//! HTTP backend implementation using reqwest.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::error::{Result, ReviewError};
use crate::query::QueryCriteria;
use crate::record::{FieldValues, NodeId};
use crate::remote::{Backend, QueryResponse, StatusReply};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    node_id: &'a NodeId,
    fields: &'a FieldValues,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    node_ids: &'a [NodeId],
}

/// Backend talking to the review web service
pub struct HttpBackend {
    client: Client,
    query_url: Url,
    update_url: Url,
    delete_url: Url,
}

impl HttpBackend {
    /// Create a new HTTP backend from configuration
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            query_url: endpoint_url(&config.base_url, &config.query_endpoint)?,
            update_url: endpoint_url(&config.base_url, &config.update_endpoint)?,
            delete_url: endpoint_url(&config.base_url, &config.delete_endpoint)?,
        })
    }

    async fn send_json(&self, url: &Url, request: RequestBuilder) -> Result<Value> {
        let endpoint = url.path().to_string();
        let response = request.send().await.map_err(|source| ReviewError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            // the update route answers 400 with a JSON error body
            if status.as_u16() == 400 {
                if let Ok(body) = response.json::<Value>().await {
                    return Ok(body);
                }
            }
            return Err(ReviewError::HttpStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| ReviewError::malformed(format!("{} did not return JSON: {}", endpoint, err)))
    }

    async fn post_status<T: Serialize + ?Sized>(&self, url: &Url, body: &T) -> Result<StatusReply> {
        let value = self
            .send_json(url, self.client.post(url.clone()).json(body))
            .await?;
        serde_json::from_value(value)
            .map_err(|err| ReviewError::malformed(format!("unexpected status reply: {}", err)))
    }
}

impl Backend for HttpBackend {
    async fn query(&self, criteria: &QueryCriteria) -> Result<QueryResponse> {
        tracing::debug!(
            node_path = %criteria.node_path,
            filter = %criteria.property_filter,
            "posting query"
        );
        let request = self.client.post(self.query_url.clone()).form(criteria);
        let value = self.send_json(&self.query_url, request).await?;
        QueryResponse::from_json(value)
    }

    async fn update(&self, node_id: &NodeId, fields: &FieldValues) -> Result<StatusReply> {
        tracing::debug!(%node_id, "posting update");
        self.post_status(&self.update_url, &UpdateRequest { node_id, fields })
            .await
    }

    async fn delete(&self, node_ids: &[NodeId]) -> Result<StatusReply> {
        tracing::debug!(count = node_ids.len(), "posting delete");
        self.post_status(&self.delete_url, &DeleteRequest { node_ids })
            .await
    }
}

/// Join a base URL and an endpoint path, tolerating stray slashes.
fn endpoint_url(base: &str, endpoint: &str) -> anyhow::Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    Url::parse(&joined).with_context(|| format!("invalid endpoint URL: {}", joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_url_joins_slashes() {
        let url = endpoint_url("http://127.0.0.1:5000/", "/buscard/node/update").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/buscard/node/update");

        let url = endpoint_url("http://host/app", "buscard/node/delete").unwrap();
        assert_eq!(url.as_str(), "http://host/app/buscard/node/delete");
    }

    #[test]
    fn test_endpoint_url_rejects_garbage() {
        assert!(endpoint_url("not a url", "/x").is_err());
    }

    #[test]
    fn test_request_bodies_use_camel_case() {
        let id = NodeId::from("busCard-1");
        let fields = FieldValues::default();
        let body = serde_json::to_value(UpdateRequest { node_id: &id, fields: &fields }).unwrap();
        assert_eq!(body["nodeId"], "busCard-1");
        assert!(body["fields"].is_object());

        let ids = vec![NodeId::from("a"), NodeId::from("b")];
        let body = serde_json::to_value(DeleteRequest { node_ids: &ids }).unwrap();
        assert_eq!(body, json!({"nodeIds": ["a", "b"]}));
    }
}
