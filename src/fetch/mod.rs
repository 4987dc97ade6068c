// src/fetch/mod.rs

pub mod normalize;

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{collections::HashMap, time::Duration};
use tracing::{debug, info, instrument};

use crate::{catalog::TableInfo, error::RemoteRequestError};

/// How filters travel to the API. Both verbs return the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportVerb {
    /// Filters comma-joined in the query string.
    Get,
    /// Filters in a JSON body.
    Post,
}

impl TransportVerb {
    /// GET for small filter sets, POST once the values no longer fit a query string
    /// comfortably or would be mangled by comma joining.
    pub fn choose(resolved: &[(String, Vec<String>)], get_max_values: usize) -> Self {
        let count: usize = resolved.iter().map(|(_, v)| v.len()).sum();
        let has_comma = resolved
            .iter()
            .flat_map(|(_, v)| v.iter())
            .any(|v| v.contains(','));
        if count > get_max_values || has_comma {
            TransportVerb::Post
        } else {
            TransportVerb::Get
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Client for the statistics API. One per run; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct StatBankClient {
    client: Client,
    base_url: String,
}

impl StatBankClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url)
            .with_context(|| format!("invalid API base URL {:?}", base_url))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Variable catalog of `table_id`.
    #[instrument(level = "debug", skip(self))]
    pub async fn table_info(&self, table_id: &str) -> Result<TableInfo> {
        let url = format!("{}/tableinfo/{}", self.base_url, table_id);
        let resp = self
            .client
            .get(&url)
            .query(&[("format", "JSON"), ("lang", "en")])
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;
        let resp = ensure_ok(resp).await?;
        let text = resp
            .text()
            .await
            .with_context(|| format!("reading body from {}", url))?;
        serde_json::from_str(&text).with_context(|| format!("parsing table info for {}", table_id))
    }

    /// Raw tabular text for `table_id` with the given filters.
    #[instrument(level = "info", skip(self, resolved), fields(variables = resolved.len()))]
    pub async fn fetch_table(
        &self,
        table_id: &str,
        resolved: &[(String, Vec<String>)],
        format: &str,
        verb: TransportVerb,
    ) -> Result<String> {
        let request = match verb {
            TransportVerb::Post => {
                let url = format!("{}/data", self.base_url);
                let variables: Vec<_> = resolved
                    .iter()
                    .map(|(code, values)| json!({ "code": code, "values": values }))
                    .collect();
                let body = json!({
                    "valuePresentation": "Default",
                    "format": format,
                    "table": table_id,
                    "variables": variables,
                });
                self.client.post(url).json(&body)
            }
            TransportVerb::Get => {
                let url = format!("{}/data/{}/{}", self.base_url, table_id, format);
                let mut params: Vec<(String, String)> = resolved
                    .iter()
                    .map(|(code, values)| (code.clone(), values.join(",")))
                    .collect();
                params.push(("valuePresentation".into(), "Default".into()));
                self.client.get(url).query(&params)
            }
        };

        let resp = request
            .send()
            .await
            .with_context(|| format!("{:?} data for {}", verb, table_id))?;
        let resp = ensure_ok(resp).await?;
        let text = resp
            .text()
            .await
            .with_context(|| format!("reading data for {}", table_id))?;
        debug!(bytes = text.len(), "received table data");
        Ok(text)
    }

    /// Fetch and normalize: renamed columns, aggregate rows removed.
    pub async fn fetch_dataset(
        &self,
        table_id: &str,
        resolved: &[(String, Vec<String>)],
        format: &str,
        verb: TransportVerb,
        labels: &HashMap<String, String>,
    ) -> Result<RecordBatch> {
        let text = self.fetch_table(table_id, resolved, format, verb).await?;
        let batch = normalize::normalize(&text, labels)?;
        info!(table = %table_id, rows = batch.num_rows(), ?verb, "fetched");
        Ok(batch)
    }
}

/// Turn any non-200 response into a [`RemoteRequestError`] carrying the server's message.
async fn ensure_ok(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status == StatusCode::OK {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);
    Err(RemoteRequestError {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
        message,
    }
    .into())
}
