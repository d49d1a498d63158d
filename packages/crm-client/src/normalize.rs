//! Field normalization and business summaries.
//!
//! List-entry fields arrive as a heterogeneous sequence of typed records.
//! [`normalize`] flattens them into a keyed set with type-specific
//! coercion applied, and [`summarize`] extracts a fixed-shape business
//! summary from a configured table of well-known field ids.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::FieldRecord;

/// A field record after coercion. Never built from null data; unset
/// fields are dropped during normalization instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedField {
    pub id: String,
    pub name: String,
    /// Enrichment source, if the value came from a data provider.
    pub source: Option<String>,
    /// Declared type tag of the original value.
    pub kind: Option<String>,
    pub data: Value,
}

/// Normalized fields keyed by field id. Keyed lookup is the only access
/// pattern downstream; insertion order is not preserved.
pub type NormalizedFieldSet = HashMap<String, NormalizedField>;

/// Flatten a sequence of field records into a keyed, coerced set.
///
/// Fields with null data are dropped entirely. On duplicate ids the last
/// occurrence wins, matching accumulation order of the source sequence.
pub fn normalize<I>(records: I) -> NormalizedFieldSet
where
    I: IntoIterator<Item = FieldRecord>,
{
    let mut set = NormalizedFieldSet::new();
    for record in records {
        if let Some(field) = normalize_field(record) {
            set.insert(field.id.clone(), field);
        }
    }
    set
}

/// Normalize one record; `None` means the field was unset.
pub fn normalize_field(record: FieldRecord) -> Option<NormalizedField> {
    let data = match record.value.data {
        Some(Value::Null) | None => return None,
        Some(data) => data,
    };

    let kind = record.value.kind;
    let data = match kind.as_deref() {
        Some("number") => coerce_number(data),
        Some("location") => normalize_location(&data),
        _ => data,
    };

    Some(NormalizedField {
        id: record.id,
        name: record.name,
        source: record.enrichment_source,
        kind,
        data,
    })
}

/// Integral-first numeric coercion.
///
/// A value that round-trips exactly through an integer stays an integer;
/// anything else numeric becomes a float. Values that cannot be read as a
/// number at all pass through unchanged rather than failing the field.
fn coerce_number(data: Value) -> Value {
    match &data {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                return data;
            }
            match n.as_f64() {
                Some(f) if is_exact_integral(f) => json!(f as i64),
                _ => data,
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return json!(i);
            }
            match s.parse::<f64>() {
                Ok(f) if is_exact_integral(f) => json!(f as i64),
                Ok(f) => json!(f),
                Err(_) => data,
            }
        }
        _ => data,
    }
}

fn is_exact_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
}

const ADDRESS_KEYS: [&str; 5] = ["streetAddress", "city", "state", "country", "continent"];

/// Restructure a location payload into a fixed-key `raw` object plus a
/// human-readable `location_str` (city, state, country; absent parts
/// skipped).
fn normalize_location(data: &Value) -> Value {
    let mut raw = serde_json::Map::new();
    for key in ADDRESS_KEYS {
        raw.insert(
            key.to_string(),
            data.get(key).cloned().unwrap_or(Value::Null),
        );
    }

    let location_str = ["city", "state", "country"]
        .iter()
        .filter_map(|k| raw.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    json!({ "raw": raw, "location_str": location_str })
}

/// The well-known field ids a summary is built from.
///
/// These are API-specific identifiers owned by the workspace that defined
/// the fields, so they come in as configuration rather than constants.
#[derive(Debug, Clone, Default)]
pub struct SummaryFields {
    pub profile_url: String,
    pub linkedin_url: String,
    pub description: String,
    pub industries: String,
    pub technologies: String,
    pub business_models: String,
    pub client_focus: String,
    pub ownership_types: String,
    pub employee_range: String,
    pub year_founded: String,
    pub last_funding: String,
    pub total_funding: String,
    pub location: String,
}

/// External links for a company.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyUrls {
    pub profile: Option<Value>,
    pub linkedin: Option<Value>,
}

/// Funding figures for a company.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Funding {
    pub last: Option<Value>,
    pub total: Option<Value>,
}

/// Fixed-shape business summary of a normalized field set.
///
/// Every lookup has a defined default (empty sequence for array-shaped
/// entries, `None` for scalars), so building one never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanySummary {
    pub urls: CompanyUrls,
    pub description: Option<Value>,
    pub industries: Vec<Value>,
    pub technologies: Vec<Value>,
    pub business_models: Vec<Value>,
    pub client_focus: Vec<Value>,
    pub ownership_types: Vec<Value>,
    pub employee_range: Option<Value>,
    pub year_founded: Option<Value>,
    pub funding: Funding,
    pub location: Option<Value>,
    pub location_str: Option<String>,
}

/// Extract a [`CompanySummary`] from a normalized field set.
pub fn summarize(fields: &NormalizedFieldSet, ids: &SummaryFields) -> CompanySummary {
    let scalar = |id: &str| fields.get(id).map(|f| f.data.clone());
    let array = |id: &str| match fields.get(id).map(|f| &f.data) {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    };

    // The location field was already restructured during normalization;
    // pull its two derived parts back out, defaulting when absent.
    let location_data = fields.get(&ids.location).map(|f| &f.data);
    let location = location_data
        .and_then(|d| d.get("raw"))
        .filter(|raw| !raw.is_null())
        .cloned();
    let location_str = location_data
        .and_then(|d| d.get("location_str"))
        .and_then(Value::as_str)
        .map(str::to_string);

    CompanySummary {
        urls: CompanyUrls {
            profile: scalar(&ids.profile_url),
            linkedin: scalar(&ids.linkedin_url),
        },
        description: scalar(&ids.description),
        industries: array(&ids.industries),
        technologies: array(&ids.technologies),
        business_models: array(&ids.business_models),
        client_focus: array(&ids.client_focus),
        ownership_types: array(&ids.ownership_types),
        employee_range: scalar(&ids.employee_range),
        year_founded: scalar(&ids.year_founded),
        funding: Funding {
            last: scalar(&ids.last_funding),
            total: scalar(&ids.total_funding),
        },
        location,
        location_str,
    }
}
