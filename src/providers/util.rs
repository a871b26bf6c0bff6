use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;
use tracing::debug;

const USER_AGENT: &str = "coincast/1.0";

/// Issues a single GET request and parses the JSON body.
///
/// A fresh client is built per call. Transport failures, non-success
/// statuses and malformed bodies are all returned as errors naming `label`.
pub async fn fetch_json<T: DeserializeOwned>(url: &str, label: &str) -> Result<T> {
    debug!("Requesting {} from {}", label, url);

    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow!("Request error: {} for {}", e, label))?;

    if !response.status().is_success() {
        return Err(anyhow!("HTTP error: {} for {}", response.status(), label));
    }

    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", label, e))
}
