use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// The authenticated caller, as reported by the auth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WhoAmI {
    pub user: Value,
}

/// A company entity.
#[derive(Debug, Clone, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub domain: Option<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(rename = "isGlobal", default)]
    pub is_global: bool,
}

/// A list (a named collection of entities).
#[derive(Debug, Clone, Deserialize)]
pub struct EntityList {
    pub id: i64,
    pub name: String,
    /// Entity kind the list holds ("company", "person", ...).
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// One row of a list, with membership metadata and the entity it points at.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEntry {
    pub id: i64,
    #[serde(rename = "listId")]
    pub list_id: i64,
    #[serde(rename = "creatorId")]
    pub creator_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    /// The underlying entity. Shape depends on the list kind.
    pub entity: Option<Value>,
}

/// Metadata for one field definition (not its value on any entry).
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMeta {
    pub id: String,
    pub name: String,
    #[serde(rename = "enrichmentSource")]
    pub enrichment_source: Option<String>,
}

/// One typed attribute of a list entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "enrichmentSource")]
    pub enrichment_source: Option<String>,
    pub value: FieldValue,
}

/// The typed payload of a field record.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldValue {
    /// Declared type tag ("number", "location", "text", ...).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Opaquely-shaped data; `None` means the field is unset.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Envelope for collection endpoints: items plus the cursor-mode
/// continuation (a ready-to-use next-page URL).
#[derive(Debug, Clone, Deserialize)]
pub struct ListPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(rename = "nextUrl")]
    pub next_url: Option<String>,
}

/// Result of a single-field write.
///
/// Rejections carry the response for diagnostics instead of being raised,
/// so callers can decide whether to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    Rejected { status: u16, body: String },
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}
