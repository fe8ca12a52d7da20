use indexmap::IndexMap;
use serde::Serialize;

/// Prefix marking a cell that holds a list.
pub const LIST_MARKER: &str = "[arr]";
/// Prefix marking a cell that holds a flat key/value map.
pub const STRUCT_MARKER: &str = "[obj]";

const DELIMITER: char = ';';
const PAIR_SEPARATOR: char = ':';

/// Decoded cell value.
///
/// On the wire (sheet cells, TSV) lists and structs are plain text carrying a
/// marker prefix. In JSON they serialize as a string, an array of strings and
/// an object of strings respectively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TaggedValue {
    Scalar(String),
    List(Vec<String>),
    /// Equality is key-by-key; insertion order only affects rendering.
    Struct(IndexMap<String, String>),
}

impl Default for TaggedValue {
    fn default() -> Self {
        TaggedValue::Scalar(String::new())
    }
}

impl TaggedValue {
    /// Render the value as cell text.
    ///
    /// - `Scalar`: unchanged.
    /// - `List`: `"[arr] a; b"`, each element trimmed.
    /// - `Struct`: `"[obj] k1: v1; k2: v2"`.
    pub fn encode(&self) -> String {
        match self {
            TaggedValue::Scalar(text) => text.clone(),
            TaggedValue::List(items) => {
                let joined = items.iter().map(|s| s.trim()).collect::<Vec<_>>().join("; ");
                format!("{LIST_MARKER} {joined}")
            }
            TaggedValue::Struct(fields) => {
                let joined = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.trim(), v.trim()))
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("{STRUCT_MARKER} {joined}")
            }
        }
    }

    /// Parse cell text.
    ///
    /// Marker detection is a case-sensitive prefix match on the trimmed text.
    /// Empty list elements are dropped. A struct part without a key or without
    /// a `:` separator is skipped. The value keeps everything after the first
    /// `:`, so values may contain colons but keys may not.
    pub fn decode(text: &str) -> Self {
        let text = text.trim();

        if let Some(rest) = text.strip_prefix(LIST_MARKER) {
            let items = rest
                .split(DELIMITER)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            return TaggedValue::List(items);
        }

        if let Some(rest) = text.strip_prefix(STRUCT_MARKER) {
            let mut fields = IndexMap::new();
            for part in rest.split(DELIMITER) {
                let Some((key, value)) = part.split_once(PAIR_SEPARATOR) else {
                    continue;
                };
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                fields.insert(key.to_string(), value.trim().to_string());
            }
            return TaggedValue::Struct(fields);
        }

        TaggedValue::Scalar(text.to_string())
    }

    /// Build a value from a JSON request field.
    ///
    /// Arrays become lists, objects become structs, everything else a scalar.
    /// Nested non-string members are flattened to their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => {
                TaggedValue::List(items.iter().map(json_text).collect())
            }
            serde_json::Value::Object(map) => TaggedValue::Struct(
                map.iter().map(|(k, v)| (k.clone(), json_text(v))).collect(),
            ),
            other => TaggedValue::Scalar(json_text(other)),
        }
    }

    /// Text of a scalar, `None` for lists and structs.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            TaggedValue::Scalar(text) => Some(text),
            _ => None,
        }
    }
}

/// JSON value as plain text: strings verbatim, `null` empty, the rest as JSON.
pub fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
