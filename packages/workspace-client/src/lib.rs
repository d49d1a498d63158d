//! Pure REST API client for the workspace/database tool.
//!
//! A minimal client for the workspace API. Supports discovering structured
//! collections via search, reading collection schemas, flag-mode paginated
//! queries, and record create/update with per-type write envelopes built
//! through a pluggable formatter table.
//!
//! # Example
//!
//! ```rust,ignore
//! use workspace_client::{FormatterTable, WorkspaceClient};
//!
//! let client = WorkspaceClient::from_env()?;
//!
//! for db in client.search_databases().await? {
//!     println!("{} ({})", db.title, db.id);
//! }
//!
//! let table = FormatterTable::with_defaults();
//! let props = [("Name", "title", serde_json::json!("Food shelf"))];
//! client.create_record("db-id", build_properties(&table, &props)).await?;
//! ```

pub mod error;
pub mod properties;
pub mod types;

pub use error::{Result, WorkspaceError};
pub use properties::{extract_property, extract_with_kind, FormatterTable, PropertyKind};
pub use types::{
    Database, DatabaseSchema, PropertyDescriptor, QueryPage, QueryRequest, Record,
};

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use paginate_core::{collect_all, Cursor, Page, PageLimit, PageSource};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://api.notion.com/v1";

/// Wire API version sent with every request.
const API_VERSION: &str = "2022-06-28";

/// Timeout applied uniformly to every request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Reference to a created or updated record.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRef {
    pub id: String,
    pub url: Option<String>,
}

/// Workspace API client. A cheap value handle; clone freely.
#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    timeout: Duration,
    page_limit: PageLimit,
}

impl WorkspaceClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            page_limit: PageLimit::default(),
        }
    }

    /// Create from the `WORKSPACE_API_TOKEN` environment variable, loading
    /// a `.env` file first if one is present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let token = std::env::var("WORKSPACE_API_TOKEN")
            .map_err(|_| WorkspaceError::Config("WORKSPACE_API_TOKEN not set".into()))?;
        Ok(Self::new(token))
    }

    /// Set a custom base URL (staging, proxies, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the maximum page count for paginated fetches.
    pub fn with_page_limit(mut self, limit: PageLimit) -> Self {
        self.page_limit = limit;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", API_VERSION)
            .timeout(self.timeout)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn post_json<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", API_VERSION)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn patch_json<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T> {
        let resp = self
            .http
            .patch(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", API_VERSION)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "workspace API error");
            return Err(WorkspaceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| WorkspaceError::Malformed(e.to_string()))
    }

    /// Discover every structured collection the integration can see.
    ///
    /// Pages through the search endpoint and keeps only database objects.
    pub async fn search_databases(&self) -> Result<Vec<Database>> {
        let items = self
            .collect_flag_paged(self.url("/search"), json!({}))
            .await?;

        let databases = items
            .iter()
            .filter(|item| item["object"].as_str() == Some("database"))
            .map(|item| Database {
                id: item["id"].as_str().unwrap_or_default().to_string(),
                title: item["title"][0]["plain_text"]
                    .as_str()
                    .filter(|t| !t.is_empty())
                    .unwrap_or("Untitled")
                    .to_string(),
            })
            .collect::<Vec<_>>();

        info!(count = databases.len(), "discovered databases");
        Ok(databases)
    }

    /// A collection's schema: property name mapped to its type tag and,
    /// for constrained properties, the allowed option names.
    pub async fn database_schema(&self, database_id: &str) -> Result<DatabaseSchema> {
        let body: Value = self
            .get_json(&self.url(&format!("/databases/{database_id}")))
            .await?;

        let properties = body
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| WorkspaceError::Malformed("response has no properties".into()))?;

        let mut schema = DatabaseSchema::new();
        for (name, prop) in properties {
            let kind = prop["type"].as_str().unwrap_or_default().to_string();
            let options = prop[&kind]["options"].as_array().map(|opts| {
                opts.iter()
                    .filter_map(|o| o["name"].as_str())
                    .map(str::to_string)
                    .collect()
            });
            schema.insert(name.clone(), PropertyDescriptor { kind, options });
        }
        Ok(schema)
    }

    /// Raw query results for a collection, across every page.
    ///
    /// Flag-mode pagination: `has_more` plus `next_cursor`, with the cursor
    /// merged back into the original request body as `start_cursor`.
    pub async fn query_database(
        &self,
        database_id: &str,
        request: &QueryRequest,
    ) -> Result<Vec<Value>> {
        let body = serde_json::to_value(request)
            .map_err(|e| WorkspaceError::Malformed(e.to_string()))?;
        self.collect_flag_paged(self.url(&format!("/databases/{database_id}/query")), body)
            .await
    }

    /// Query a collection and flatten every row's properties through
    /// per-type extraction.
    pub async fn fetch_records(
        &self,
        database_id: &str,
        request: &QueryRequest,
    ) -> Result<Vec<Record>> {
        let rows = self.query_database(database_id, request).await?;
        info!(database_id, count = rows.len(), "fetched records");
        Ok(rows.iter().map(flatten_record).collect())
    }

    /// Create a record in a collection. `properties` must already be
    /// shaped as write envelopes (see [`build_properties`]).
    pub async fn create_record(
        &self,
        database_id: &str,
        properties: Map<String, Value>,
    ) -> Result<RecordRef> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
        });
        let created: RecordRef = self.post_json(&self.url("/pages"), &body).await?;
        info!(record_id = %created.id, "created record");
        Ok(created)
    }

    /// Update properties on an existing record.
    pub async fn update_record(
        &self,
        record_id: &str,
        properties: Map<String, Value>,
    ) -> Result<RecordRef> {
        let body = json!({ "properties": properties });
        let updated: RecordRef = self
            .patch_json(&self.url(&format!("/pages/{record_id}")), &body)
            .await?;
        info!(record_id = %updated.id, "updated record");
        Ok(updated)
    }

    async fn collect_flag_paged(&self, url: String, base_body: Value) -> Result<Vec<Value>> {
        let source = FlagPaged {
            client: self,
            url,
            base_body,
        };
        collect_all(&source, self.page_limit).await
    }
}

/// Flag-mode page source: the endpoint and body are reused unmodified on
/// every call, except for the `start_cursor` merged in from the previous
/// response.
struct FlagPaged<'a> {
    client: &'a WorkspaceClient,
    url: String,
    base_body: Value,
}

#[async_trait]
impl<'a> PageSource for FlagPaged<'a> {
    type Item = Value;
    type Error = WorkspaceError;

    async fn fetch(&self, after: Option<&Cursor>) -> Result<Page<Value>> {
        let mut body = self.base_body.clone();
        if let Some(cursor) = after {
            body["start_cursor"] = json!(cursor.as_str());
        }

        let page: QueryPage = self.client.post_json(&self.url, &body).await?;
        debug!(count = page.results.len(), has_more = page.has_more, "query page");

        let next = if page.has_more {
            let cursor = page.next_cursor.ok_or_else(|| {
                WorkspaceError::Malformed("has_more set but next_cursor missing".into())
            })?;
            Some(Cursor(cursor))
        } else {
            None
        };

        Ok(Page {
            items: page.results,
            next,
        })
    }
}

/// Shape plain values into write envelopes using a formatter table.
pub fn build_properties(
    table: &FormatterTable,
    inputs: &[(&str, &str, Value)],
) -> Map<String, Value> {
    inputs
        .iter()
        .map(|(name, tag, value)| (name.to_string(), table.format(tag, value)))
        .collect()
}

/// Flatten one raw row into a [`Record`].
fn flatten_record(row: &Value) -> Record {
    let properties: BTreeMap<String, Value> = row["properties"]
        .as_object()
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| (name.clone(), extract_property(prop)))
                .collect()
        })
        .unwrap_or_default();

    Record {
        id: row["id"].as_str().unwrap_or_default().to_string(),
        created_time: parse_time(&row["created_time"]),
        last_edited_time: parse_time(&row["last_edited_time"]),
        url: row["url"].as_str().map(str::to_string),
        properties,
    }
}

fn parse_time(value: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    value
        .as_str()
        .and_then(|s| s.parse::<chrono::DateTime<chrono::Utc>>().ok())
}

/// Pull a collection id out of a shared view URL.
///
/// Takes the 32 hex characters after the `v=` marker and re-hyphenates
/// them into the 8-4-4-4-12 id shape. `None` when the marker is absent or
/// too little follows it.
pub fn database_id_from_url(url: &str) -> Option<String> {
    let cleaned: String = url
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '{' | '}'))
        .collect();

    let raw = cleaned.split("v=").nth(1)?;
    let id = raw.get(..32)?;
    if !id.is_ascii() {
        return None;
    }

    Some(format!(
        "{}-{}-{}-{}-{}",
        &id[..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..32]
    ))
}
