//! HTTP client for the Skyward server API.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use skyward_core::models::Command;

/// Acknowledgement returned by the command endpoints.
#[derive(Debug, Deserialize)]
pub struct Accepted {
    pub status: String,
    #[serde(default)]
    pub action: Option<String>,
}

/// Client for a running skyward-server.
pub struct PilotClient {
    base_url: String,
    client: reqwest::Client,
}

impl PilotClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit operator text for parsing.
    pub async fn send_text(&self, text: &str) -> Result<Accepted> {
        let url = self.endpoint("/v1/commands/text");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;
        accepted(response).await
    }

    /// Submit a canonical command, bypassing the parser.
    pub async fn send_command(&self, command: &Command) -> Result<Accepted> {
        let url = self.endpoint("/v1/commands");
        let response = self
            .client
            .post(&url)
            .json(command)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;
        accepted(response).await
    }

    /// Fetch the latest pilot status.
    pub async fn state(&self) -> Result<Value> {
        let url = self.endpoint("/v1/state");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;
        if !response.status().is_success() {
            bail!("{} returned {}", url, response.status());
        }
        Ok(response.json().await?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn accepted(response: reqwest::Response) -> Result<Accepted> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Server rejected request ({}): {}", status, body);
    }
    Ok(response.json().await?)
}
