//! HTTP node service against the console backend.

use super::{ChildrenRequest, NodeRequest, NodeService};
use crate::error::TreeError;
use crate::tree::NodeData;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

/// Join a backend base URL and an absolute API path.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a failed response into an error, preferring the backend's `errormsg`.
pub(crate) async fn response_error(response: Response) -> TreeError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = match status {
        410 | 417 | 500 => serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("errormsg").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body),
        _ => body,
    };
    if status == 410 {
        TreeError::Gone(message)
    } else {
        TreeError::Server { status, message }
    }
}

/// The backend wraps payloads as `result` or `data`; bare payloads pass through.
pub(crate) fn unwrap_payload(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("result").or_else(|| map.remove("data")) {
            Some(inner) if !inner.is_null() => inner,
            _ => Value::Object(map),
        },
        other => other,
    }
}

pub struct HttpNodeService {
    client: Client,
    base_url: String,
}

impl HttpNodeService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        HttpNodeService {
            client,
            base_url: base_url.into(),
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value, TreeError> {
        let url = endpoint(&self.base_url, path);
        debug!(url = %url, "GET");
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(response_error(response).await);
        }
        Ok(unwrap_payload(response.json().await?))
    }
}

#[async_trait]
impl NodeService for HttpNodeService {
    async fn list_children(&self, request: &ChildrenRequest) -> Result<Vec<NodeData>, TreeError> {
        let payload = self.get_json(&request.url).await?;
        Ok(serde_json::from_value(payload)?)
    }

    async fn fetch_node(&self, request: &NodeRequest) -> Result<NodeData, TreeError> {
        let payload = self.get_json(&request.url).await?;
        Ok(serde_json::from_value(payload)?)
    }
}
