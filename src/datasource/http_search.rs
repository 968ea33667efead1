//! Search-backend adapter speaking a JSON-over-HTTP query API

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::model::DataSourceType;
use crate::utils::error::{AlertflowError, Result};

use super::DataSourceAdapter;

/// Connection details the search adapter expects inside the opaque blob
#[derive(Debug, Deserialize)]
struct SearchDetails {
    endpoint: String,
    #[serde(default)]
    auth_token: Option<String>,
}

/// Adapter for search backends exposing a `_search`-style JSON endpoint
pub struct HttpSearchAdapter {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSearchAdapter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl DataSourceAdapter for HttpSearchAdapter {
    async fn run_query(
        &self,
        details: &serde_json::Value,
        query: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let details: SearchDetails = serde_json::from_value(details.clone()).map_err(|e| {
            AlertflowError::DataSource(format!("malformed search connection details: {}", e))
        })?;

        debug!("Running search query against {}", details.endpoint);

        let mut request = self
            .client
            .post(&details.endpoint)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "query": query }));
        if let Some(token) = &details.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AlertflowError::DataSource(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AlertflowError::DataSource(format!(
                "search backend returned status {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AlertflowError::DataSource(format!("bad search response: {}", e)))?;

        extract_rows(body)
    }

    fn source_type(&self) -> DataSourceType {
        DataSourceType::Search
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Accept either a bare row array or an ES-style `hits.hits` envelope
fn extract_rows(body: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    match body {
        serde_json::Value::Array(rows) => Ok(rows),
        serde_json::Value::Object(ref map) => {
            if let Some(hits) = map
                .get("hits")
                .and_then(|h| h.get("hits"))
                .and_then(|h| h.as_array())
            {
                return Ok(hits.clone());
            }
            if let Some(rows) = map.get("rows").and_then(|r| r.as_array()) {
                return Ok(rows.clone());
            }
            Err(AlertflowError::DataSource(
                "search response has no recognizable row set".to_string(),
            ))
        }
        _ => Err(AlertflowError::DataSource(
            "search response is not JSON rows".to_string(),
        )),
    }
}
