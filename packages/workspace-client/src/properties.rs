//! Typed property extraction and write-envelope formatting.
//!
//! Every record property arrives tagged with its type and wrapped in a
//! per-type envelope. Reads go through [`extract_property`], which
//! flattens the envelope into a plain value; writes go through a
//! [`FormatterTable`], which rebuilds the envelope the API expects for
//! that type tag. The table is pluggable so new tags can be supported
//! without touching any call site.

use std::collections::HashMap;

use serde_json::{json, Value};

/// The property type tags this client understands natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    People,
    Files,
    Formula,
    Relation,
    Rollup,
}

impl PropertyKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "title" => Self::Title,
            "rich_text" => Self::RichText,
            "number" => Self::Number,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "date" => Self::Date,
            "checkbox" => Self::Checkbox,
            "url" => Self::Url,
            "email" => Self::Email,
            "phone_number" => Self::PhoneNumber,
            "people" => Self::People,
            "files" => Self::Files,
            "formula" => Self::Formula,
            "relation" => Self::Relation,
            "rollup" => Self::Rollup,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Number => "number",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Date => "date",
            Self::Checkbox => "checkbox",
            Self::Url => "url",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::People => "people",
            Self::Files => "files",
            Self::Formula => "formula",
            Self::Relation => "relation",
            Self::Rollup => "rollup",
        }
    }
}

/// Flatten one tagged property object into a plain value.
///
/// The tag is read from the object's `type` key. Unknown tags degrade to a
/// stringified passthrough of the payload, never an error.
pub fn extract_property(prop: &Value) -> Value {
    let tag = prop.get("type").and_then(Value::as_str).unwrap_or_default();
    match PropertyKind::from_tag(tag) {
        Some(kind) => extract_with_kind(kind, prop),
        None => match prop.get(tag) {
            Some(payload) => Value::String(stringify(payload)),
            None => json!(""),
        },
    }
}

/// Flatten the payload under `kind`'s key inside `prop`.
pub fn extract_with_kind(kind: PropertyKind, prop: &Value) -> Value {
    let payload = &prop[kind.as_tag()];
    match kind {
        PropertyKind::Title => first_plain_text(payload),
        PropertyKind::RichText => {
            let parts: Vec<&str> = payload
                .as_array()
                .map(|texts| {
                    texts
                        .iter()
                        .filter_map(|t| t["plain_text"].as_str())
                        .collect()
                })
                .unwrap_or_default();
            json!(parts.join(" "))
        }
        PropertyKind::Number | PropertyKind::Checkbox | PropertyKind::Url
        | PropertyKind::Email | PropertyKind::PhoneNumber => payload.clone(),
        PropertyKind::Select => payload["name"].clone(),
        PropertyKind::MultiSelect => names_of(payload),
        PropertyKind::Date => payload["start"].clone(),
        PropertyKind::People => names_of(payload),
        PropertyKind::Files => names_of(payload),
        PropertyKind::Formula => {
            let string = &payload["string"];
            if string.is_null() {
                payload["number"].clone()
            } else {
                string.clone()
            }
        }
        // Relations are summarized as a count; the full graph is not needed
        // for flat exports.
        PropertyKind::Relation => json!(payload.as_array().map(|a| a.len()).unwrap_or(0)),
        PropertyKind::Rollup => {
            let number = &payload["number"];
            if number.is_null() {
                payload.get("array").cloned().unwrap_or_else(|| json!([]))
            } else {
                number.clone()
            }
        }
    }
}

fn first_plain_text(payload: &Value) -> Value {
    payload
        .as_array()
        .and_then(|texts| texts.first())
        .and_then(|t| t["plain_text"].as_str())
        .map(|s| json!(s))
        .unwrap_or_else(|| json!(""))
}

fn names_of(payload: &Value) -> Value {
    let names: Vec<Value> = payload
        .as_array()
        .map(|items| items.iter().map(|i| i["name"].clone()).collect())
        .unwrap_or_default();
    Value::Array(names)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A pure per-type write formatter.
pub type Formatter = fn(&Value) -> Value;

/// Table of write formatters keyed by property type tag.
///
/// [`FormatterTable::format`] builds the envelope the API expects for a
/// value of the given tag. Tags without a registered formatter fall back
/// to the rich_text envelope, matching how the API treats free-form text.
#[derive(Clone)]
pub struct FormatterTable {
    formatters: HashMap<String, Formatter>,
}

impl FormatterTable {
    /// An empty table with no formatters registered.
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// A table pre-loaded with formatters for every writable
    /// [`PropertyKind`].
    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        table.register("title", |v| json!({ "title": [{ "text": { "content": stringify(v) } }] }));
        table.register("rich_text", format_rich_text);
        table.register("number", |v| json!({ "number": v }));
        table.register("select", |v| json!({ "select": { "name": stringify(v) } }));
        table.register("multi_select", |v| {
            let options: Vec<Value> = match v.as_array() {
                Some(items) => items.iter().map(|i| json!({ "name": i })).collect(),
                None => vec![json!({ "name": v })],
            };
            json!({ "multi_select": options })
        });
        table.register("checkbox", |v| json!({ "checkbox": v }));
        table.register("date", |v| json!({ "date": { "start": stringify(v) } }));
        table.register("url", |v| json!({ "url": stringify(v) }));
        table.register("email", |v| json!({ "email": stringify(v) }));
        table.register("phone_number", |v| json!({ "phone_number": stringify(v) }));
        table
    }

    /// Register (or replace) the formatter for a tag.
    pub fn register(&mut self, tag: impl Into<String>, formatter: Formatter) {
        self.formatters.insert(tag.into(), formatter);
    }

    /// Build the write envelope for `value` under `tag`.
    pub fn format(&self, tag: &str, value: &Value) -> Value {
        match self.formatters.get(tag) {
            Some(formatter) => formatter(value),
            None => format_rich_text(value),
        }
    }
}

impl Default for FormatterTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn format_rich_text(value: &Value) -> Value {
    json!({ "rich_text": [{ "text": { "content": stringify(value) } }] })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: &str, payload: Value) -> Value {
        let mut prop = serde_json::Map::new();
        prop.insert("type".into(), json!(tag));
        prop.insert(tag.into(), payload);
        Value::Object(prop)
    }

    #[test]
    fn extracts_title_plain_text() {
        let prop = tagged("title", json!([{ "plain_text": "Weekly sync" }]));
        assert_eq!(extract_property(&prop), json!("Weekly sync"));
    }

    #[test]
    fn empty_title_extracts_as_empty_string() {
        let prop = tagged("title", json!([]));
        assert_eq!(extract_property(&prop), json!(""));
    }

    #[test]
    fn rich_text_joins_segments() {
        let prop = tagged(
            "rich_text",
            json!([{ "plain_text": "hello" }, { "plain_text": "world" }]),
        );
        assert_eq!(extract_property(&prop), json!("hello world"));
    }

    #[test]
    fn select_extracts_name_or_null() {
        assert_eq!(
            extract_property(&tagged("select", json!({ "name": "High" }))),
            json!("High")
        );
        assert_eq!(extract_property(&tagged("select", Value::Null)), Value::Null);
    }

    #[test]
    fn multi_select_extracts_option_names() {
        let prop = tagged("multi_select", json!([{ "name": "a" }, { "name": "b" }]));
        assert_eq!(extract_property(&prop), json!(["a", "b"]));
    }

    #[test]
    fn relation_extracts_as_count() {
        let prop = tagged("relation", json!([{ "id": "x" }, { "id": "y" }]));
        assert_eq!(extract_property(&prop), json!(2));
    }

    #[test]
    fn formula_prefers_string_then_number() {
        let s = tagged("formula", json!({ "string": "done", "number": null }));
        assert_eq!(extract_property(&s), json!("done"));
        let n = tagged("formula", json!({ "string": null, "number": 12 }));
        assert_eq!(extract_property(&n), json!(12));
    }

    #[test]
    fn rollup_prefers_number_then_array() {
        let n = tagged("rollup", json!({ "number": 3 }));
        assert_eq!(extract_property(&n), json!(3));
        let a = tagged("rollup", json!({ "array": [1, 2] }));
        assert_eq!(extract_property(&a), json!([1, 2]));
    }

    #[test]
    fn unknown_tag_stringifies_payload() {
        let prop = json!({ "type": "status", "status": { "name": "Open" } });
        assert_eq!(
            extract_property(&prop),
            json!(r#"{"name":"Open"}"#)
        );
    }

    #[test]
    fn format_builds_title_envelope() {
        let table = FormatterTable::with_defaults();
        assert_eq!(
            table.format("title", &json!("Hello")),
            json!({ "title": [{ "text": { "content": "Hello" } }] })
        );
    }

    #[test]
    fn unregistered_tag_falls_back_to_rich_text() {
        let table = FormatterTable::with_defaults();
        assert_eq!(
            table.format("mystery", &json!("x")),
            json!({ "rich_text": [{ "text": { "content": "x" } }] })
        );
    }

    #[test]
    fn custom_formatter_can_be_registered() {
        let mut table = FormatterTable::with_defaults();
        table.register("status", |v| json!({ "status": { "name": v } }));
        assert_eq!(
            table.format("status", &json!("Open")),
            json!({ "status": { "name": "Open" } })
        );
    }

    /// Formatting then extracting with the same tag must return the
    /// original input for the symmetric kinds.
    #[test]
    fn format_then_extract_round_trips() {
        let table = FormatterTable::with_defaults();
        let cases = [
            (PropertyKind::Select, json!("High")),
            (PropertyKind::MultiSelect, json!(["a", "b"])),
            (PropertyKind::Number, json!(42.5)),
            (PropertyKind::Checkbox, json!(true)),
        ];

        for (kind, value) in cases {
            let envelope = table.format(kind.as_tag(), &value);
            assert_eq!(
                extract_with_kind(kind, &envelope),
                value,
                "round-trip failed for {:?}",
                kind
            );
        }
    }
}
