//! # Document Loading
//!
//! Parses JSON and YAML text into [`Value`]. YAML is read through
//! `serde_yaml::Value` and converted explicitly so that non-string map keys
//! are rejected instead of being stringified, and YAML tags are dropped.
//!
//! Callers own the I/O. [`DocumentFormat::from_path`] picks a parser from a
//! file extension without touching the file.

use std::path::Path;

use crate::error::ValueError;
use crate::value::{Map, Value};

/// Supported document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Infer the format from a file extension. Unknown extensions read as YAML,
    /// which is a superset of JSON.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(DocumentFormat::Yaml)
    }

    pub fn from_extension(ext: &str) -> Self {
        if ext.eq_ignore_ascii_case("json") {
            DocumentFormat::Json
        } else {
            DocumentFormat::Yaml
        }
    }

    /// Parse text in this format.
    pub fn parse(self, text: &str) -> Result<Value, ValueError> {
        match self {
            DocumentFormat::Json => Value::from_json_str(text),
            DocumentFormat::Yaml => Value::from_yaml_str(text),
        }
    }
}

/// Parse a document, choosing the parser from the path's extension.
pub fn parse_document(path: &Path, text: &str) -> Result<Value, ValueError> {
    DocumentFormat::from_path(path).parse(text)
}

impl Value {
    /// Parse a JSON document. Object key order is preserved.
    pub fn from_json_str(text: &str) -> Result<Value, ValueError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Value, ValueError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(text)?;
        Value::from_yaml(&yaml)
    }

    /// Convert an already parsed YAML tree.
    pub fn from_yaml(yaml: &serde_yaml::Value) -> Result<Value, ValueError> {
        match yaml {
            serde_yaml::Value::Null => Ok(Value::Null),
            serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(ValueError::UnsupportedNumber(n.to_string()))
                }
            }
            serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
            serde_yaml::Value::Sequence(seq) => {
                let items = seq.iter().map(Value::from_yaml).collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(items))
            }
            serde_yaml::Value::Mapping(mapping) => {
                let mut map = Map::with_capacity(mapping.len());
                for (k, v) in mapping {
                    let key = match k {
                        serde_yaml::Value::String(s) => s.clone(),
                        other => return Err(ValueError::NonStringKey(describe_key(other))),
                    };
                    map.insert(key, Value::from_yaml(v)?);
                }
                Ok(Value::Map(map))
            }
            serde_yaml::Value::Tagged(tagged) => Value::from_yaml(&tagged.value),
        }
    }
}

fn describe_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::Null => "null".to_string(),
        serde_yaml::Value::Bool(b) => format!("bool {b}"),
        serde_yaml::Value::Number(n) => format!("number {n}"),
        serde_yaml::Value::Sequence(_) => "sequence".to_string(),
        serde_yaml::Value::Mapping(_) => "mapping".to_string(),
        serde_yaml::Value::Tagged(t) => describe_key(&t.value),
        serde_yaml::Value::String(s) => format!("string {s:?}"),
    }
}
