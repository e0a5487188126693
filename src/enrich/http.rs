// src/enrich/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::Enricher;

#[derive(Serialize)]
struct LookupRequest<'a> {
    entity: &'a str,
}

/// POSTs `{"entity": "<label>"}` to a JSON endpoint and returns the body.
pub struct HttpEnricher {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpEnricher {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("building enrichment http client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Enricher for HttpEnricher {
    async fn lookup(&self, entity: &str) -> Result<Value, String> {
        let mut req = self.client.post(&self.endpoint).json(&LookupRequest { entity });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| format!("request failed: {e}"))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| format!("http error: {e}"))?;
        resp.json::<Value>()
            .await
            .map_err(|e| format!("invalid json: {e}"))
    }
}
