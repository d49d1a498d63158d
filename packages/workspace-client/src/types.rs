use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured collection (database) discovered via search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Database {
    pub id: String,
    /// First title segment's plain text; "Untitled" when the title is empty.
    pub title: String,
}

/// One property definition in a collection schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyDescriptor {
    /// The wire type tag ("title", "select", ...).
    pub kind: String,
    /// Allowed option names, for select / multi_select properties.
    pub options: Option<Vec<String>>,
}

/// A collection's schema: property name to descriptor, sorted by name.
pub type DatabaseSchema = BTreeMap<String, PropertyDescriptor>;

/// Flag-mode pagination envelope: a boolean plus an opaque cursor that
/// gets merged back into the original request for the next call.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Query options for a collection. All optional; the filter and sorts use
/// the API's own JSON shapes and are passed through untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorts: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// One row of a collection, flattened: metadata plus every property run
/// through per-type extraction.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: String,
    pub created_time: Option<DateTime<Utc>>,
    pub last_edited_time: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub properties: BTreeMap<String, Value>,
}
