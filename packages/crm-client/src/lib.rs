//! Pure REST API client for the company-intelligence CRM.
//!
//! A minimal client for the CRM v2 API. Supports companies, lists, list
//! entries, and the typed field records attached to entries, including the
//! paginated fetch-and-normalize pipeline that turns an entry's raw field
//! pages into a flat, keyed field set plus a business summary.
//!
//! # Example
//!
//! ```rust,ignore
//! use crm_client::{CrmClient, SummaryFields};
//!
//! let client = CrmClient::from_env()?;
//!
//! let ids = SummaryFields { description: "vendor-description".into(), ..Default::default() };
//! let profile = client.entry_profile(51750, 14355566, &ids).await?;
//! println!("{:?}", profile.summary.location_str);
//! ```

pub mod error;
pub mod normalize;
pub mod types;

pub use error::{CrmError, Result};
pub use normalize::{
    normalize, summarize, CompanySummary, NormalizedField, NormalizedFieldSet, SummaryFields,
};
pub use types::{
    Company, EntityList, FieldMeta, FieldRecord, ListEntry, ListPage, UpdateOutcome, WhoAmI,
};

use std::time::Duration;

use async_trait::async_trait;
use paginate_core::{collect_all, Cursor, Page, PageLimit, PageSource};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://api.affinity.co/v2";

/// Timeout applied uniformly to every request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// An entry's fields together with their business summary.
#[derive(Debug, Clone)]
pub struct EntryProfile {
    pub fields: NormalizedFieldSet,
    pub summary: CompanySummary,
}

/// CRM API client. A cheap value handle; clone freely.
#[derive(Debug, Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    timeout: Duration,
    page_limit: PageLimit,
}

impl CrmClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            page_limit: PageLimit::default(),
        }
    }

    /// Create from the `CRM_API_TOKEN` environment variable, loading a
    /// `.env` file first if one is present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let token = std::env::var("CRM_API_TOKEN")
            .map_err(|_| CrmError::Config("CRM_API_TOKEN not set".into()))?;
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

    /// GET a JSON body, converting non-success statuses into
    /// [`CrmError::Api`] and undecodable bodies into [`CrmError::Malformed`].
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), url, "CRM API error");
            return Err(CrmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| CrmError::Malformed(e.to_string()))
    }

    /// The authenticated user behind the token.
    pub async fn whoami(&self) -> Result<WhoAmI> {
        self.get_json(&self.url("/auth/whoami")).await
    }

    /// All companies visible to the token, across every page.
    pub async fn companies(&self, page_size: Option<u32>) -> Result<Vec<Company>> {
        self.collect_cursor_paged(self.first_url("/companies", page_size))
            .await
    }

    /// One company by id.
    pub async fn company(&self, company_id: i64) -> Result<Company> {
        self.get_json(&self.url(&format!("/companies/{company_id}")))
            .await
    }

    /// Field definitions available on companies.
    pub async fn company_fields(&self) -> Result<Vec<FieldMeta>> {
        self.collect_cursor_paged(self.url("/companies/fields"))
            .await
    }

    /// Lists a company belongs to.
    pub async fn company_lists(&self, company_id: i64) -> Result<Vec<EntityList>> {
        self.collect_cursor_paged(self.url(&format!("/companies/{company_id}/lists")))
            .await
    }

    /// List entries (rows) for a company across all its lists.
    pub async fn company_list_entries(&self, company_id: i64) -> Result<Vec<ListEntry>> {
        self.collect_cursor_paged(self.url(&format!("/companies/{company_id}/list-entries")))
            .await
    }

    /// All lists visible to the token.
    pub async fn lists(&self, page_size: Option<u32>) -> Result<Vec<EntityList>> {
        self.collect_cursor_paged(self.first_url("/lists", page_size))
            .await
    }

    /// One list by id.
    pub async fn list(&self, list_id: i64) -> Result<EntityList> {
        self.get_json(&self.url(&format!("/lists/{list_id}"))).await
    }

    /// All entries of a list.
    pub async fn list_entries(&self, list_id: i64) -> Result<Vec<ListEntry>> {
        self.collect_cursor_paged(self.url(&format!("/lists/{list_id}/list-entries")))
            .await
    }

    /// One entry of a list.
    pub async fn list_entry(&self, list_id: i64, entry_id: i64) -> Result<ListEntry> {
        self.get_json(&self.url(&format!("/lists/{list_id}/list-entries/{entry_id}")))
            .await
    }

    /// All raw field records on an entry, following `pagination.nextUrl`
    /// until exhausted. Arrival order is preserved across pages.
    pub async fn entry_fields(&self, list_id: i64, entry_id: i64) -> Result<Vec<FieldRecord>> {
        self.collect_cursor_paged(self.url(&format!(
            "/lists/{list_id}/list-entries/{entry_id}/fields"
        )))
        .await
    }

    /// Fetch, normalize, and summarize an entry's fields in one pass.
    pub async fn entry_profile(
        &self,
        list_id: i64,
        entry_id: i64,
        summary_ids: &SummaryFields,
    ) -> Result<EntryProfile> {
        let records = self.entry_fields(list_id, entry_id).await?;
        info!(list_id, entry_id, count = records.len(), "collected entry fields");

        let fields = normalize(records);
        let summary = summarize(&fields, summary_ids);
        Ok(EntryProfile { fields, summary })
    }

    /// One field on an entry. A 200 parses into the record; any other
    /// status reads as "not there" rather than an error.
    pub async fn field(
        &self,
        list_id: i64,
        entry_id: i64,
        field_id: &str,
    ) -> Result<Option<FieldRecord>> {
        let url = self.url(&format!(
            "/lists/{list_id}/list-entries/{entry_id}/fields/{field_id}"
        ));
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .send()
            .await?;

        if resp.status() != reqwest::StatusCode::OK {
            debug!(field_id, status = resp.status().as_u16(), "field not readable");
            return Ok(None);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| CrmError::Malformed(e.to_string()))
    }

    /// Write one field value on an entry.
    ///
    /// `value_type` is the field's declared type tag and is supplied by the
    /// caller. A 204 means the write took; anything else comes back as a
    /// rejection with the response body attached.
    pub async fn update_field(
        &self,
        list_id: i64,
        entry_id: i64,
        field_id: &str,
        value_type: &str,
        value: serde_json::Value,
    ) -> Result<UpdateOutcome> {
        let url = self.url(&format!(
            "/lists/{list_id}/list-entries/{entry_id}/fields/{field_id}"
        ));
        let payload = json!({
            "value": {
                "type": value_type,
                "data": { "str": value },
            }
        });

        let resp = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            info!(field_id, "field updated");
            return Ok(UpdateOutcome::Applied);
        }

        let body = resp.text().await.unwrap_or_default();
        warn!(field_id, status = status.as_u16(), "field update rejected");
        Ok(UpdateOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn first_url(&self, path: &str, page_size: Option<u32>) -> String {
        match page_size {
            Some(limit) => format!("{}?limit={limit}", self.url(path)),
            None => self.url(path),
        }
    }

    async fn collect_cursor_paged<T>(&self, first_url: String) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let source = CursorPaged {
            client: self,
            first_url,
            _item: std::marker::PhantomData::<T>,
        };
        collect_all(&source, self.page_limit).await
    }
}

/// Cursor-mode page source: the server returns the complete next-page URL
/// in the envelope, so the continuation token *is* the next request.
struct CursorPaged<'a, T> {
    client: &'a CrmClient,
    first_url: String,
    _item: std::marker::PhantomData<T>,
}

#[async_trait]
impl<'a, T> PageSource for CursorPaged<'a, T>
where
    T: DeserializeOwned + Send + Sync,
{
    type Item = T;
    type Error = CrmError;

    async fn fetch(&self, after: Option<&Cursor>) -> Result<Page<T>> {
        let url = match after {
            Some(cursor) => cursor.as_str().to_string(),
            None => self.first_url.clone(),
        };

        let page: ListPage<T> = self.client.get_json(&url).await?;
        let next = page.pagination.and_then(|p| p.next_url).map(Cursor);

        Ok(Page {
            items: page.data,
            next,
        })
    }
}
