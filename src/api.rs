use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;

// Path of the random text endpoint under the provider's base URL
const TEXT_PATH: &str = "text";
// Query parameter carrying the maximum length
const LIMIT_PARAM: &str = "limit";

/// One row returned by the provider: column name to (nullable) text value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRow {
    columns: HashMap<String, Option<String>>,
}

impl ProviderRow {
    pub fn new(columns: HashMap<String, Option<String>>) -> Self {
        Self { columns }
    }

    /// Convenience for a row with a single non-null column.
    pub fn single(column: &str, value: impl Into<String>) -> Self {
        let mut columns = HashMap::new();
        columns.insert(column.to_string(), Some(value.into()));
        Self { columns }
    }

    /// `None` if the column is missing, `Some(None)` if it is present but null.
    pub fn column(&self, name: &str) -> Option<Option<&str>> {
        self.columns.get(name).map(|value| value.as_deref())
    }
}

// Trait defining the interface for random text providers
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Asks the provider for a string of at most `limit` characters.
    /// Returns the rows the provider answered with (usually zero or one).
    async fn query(&self, limit: u32) -> Result<Vec<ProviderRow>>;
}

// --- HTTP Provider Implementation ---

pub struct HttpContentProvider {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpContentProvider {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), TEXT_PATH)
    }
}

#[async_trait]
impl ContentProvider for HttpContentProvider {
    async fn query(&self, limit: u32) -> Result<Vec<ProviderRow>> {
        let request_url = self.endpoint();
        log::info!("Querying content provider: {} with {}={}", request_url, LIMIT_PARAM, limit);

        // The limit is bound as a query parameter, never spliced into the path
        let mut request = self.client.get(&request_url).query(&[(LIMIT_PARAM, limit)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to content provider")?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            log::info!("Content provider returned no content");
            return Ok(Vec::new());
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| "<Failed to read error body>".to_string());
            log::error!("Content provider request failed with status {}: {}", status, error_body);
            return Err(anyhow::anyhow!("Provider request failed with status {}: {}", status, error_body));
        }

        let rows: Vec<HashMap<String, Option<String>>> = response
            .json()
            .await
            .context("Failed to decode content provider rows")?;

        log::debug!("Content provider returned {} row(s)", rows.len());
        Ok(rows.into_iter().map(ProviderRow::new).collect())
    }
}
