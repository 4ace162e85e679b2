//! Conversion options and the "falsy-omits" filter.
//!
//! Conversion options arrive as a loose key/value collection (`quality`,
//! `width`, `sheet`, ...). Only the ones that carry a meaningful value are
//! forwarded to the `convert` stage:
//!
//! | Key          | Forwarded when                                   |
//! |--------------|--------------------------------------------------|
//! | `all_sheets` | value is exactly `true`                          |
//! | `sheet`      | value is a number > 0                            |
//! | `sheet_name` | non-empty; written to `sheet`, overriding index  |
//! | anything else| not `""`, `0`, `null` or `false`                 |
//!
//! A zero or `false` therefore means "unset". Callers that need to send a
//! real zero (e.g. `wait_time: 0`) use [`ConversionOptions::pin`], which
//! bypasses the filter.

use crate::error::CloudConvertError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Loose conversion options plus explicitly pinned values.
///
/// Deserialises from a flat object; a nested `pinned` object holds values
/// that must be sent verbatim:
///
/// ```json
/// {"quality": 80, "sheet_name": "Q3", "pinned": {"wait_time": 0}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pinned: IndexMap<String, Value>,
    #[serde(flatten)]
    values: IndexMap<String, Value>,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from free-form JSON text (an object).
    pub fn from_json_str(field: &str, text: &str) -> Result<Self, CloudConvertError> {
        let map = super::builder::parse_json_object(field, text)?;
        Ok(map.into_iter().collect())
    }

    /// Set a filtered option.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Set an option that is always forwarded, zero and `false` included.
    pub fn pin(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.pinned.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.pinned.is_empty()
    }

    /// The option fields that survive the filter, in input order, with
    /// pinned values applied last.
    pub fn filtered(&self) -> Map<String, Value> {
        let mut out = Map::new();
        let mut sheet_name: Option<&Value> = None;

        for (key, value) in &self.values {
            match key.as_str() {
                "all_sheets" => {
                    if value == &Value::Bool(true) {
                        out.insert(key.clone(), Value::Bool(true));
                    }
                }
                "sheet" if value.is_number() => {
                    if value.as_f64().is_some_and(|n| n > 0.0) {
                        out.insert(key.clone(), value.clone());
                    }
                }
                "sheet_name" => {
                    if is_set(value) {
                        sheet_name = Some(value);
                    }
                }
                _ => {
                    if is_set(value) {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        // Name beats index no matter which key came first.
        if let Some(name) = sheet_name {
            out.insert("sheet".to_string(), name.clone());
        }

        for (key, value) in &self.pinned {
            out.insert(key.clone(), value.clone());
        }
        out
    }
}

impl FromIterator<(String, Value)> for ConversionOptions {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            pinned: IndexMap::new(),
            values: iter.into_iter().collect(),
        }
    }
}

/// `false` for `""`, `0`, `null` and `false`.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
