use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One asset shown in the gallery.
///
/// `prompt` and `negative_prompt` hold JavaScript string literals (already
/// quoted), and `onclick` holds an HTML-escaped handler; both are inserted
/// into markup as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkItem {
    pub name: String,
    pub filename: String,
    pub shorthash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default)]
    pub local_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onclick: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub sort_keys: BTreeMap<String, String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
}

impl NetworkItem {
    pub fn new(name: impl Into<String>, filename: impl Into<String>, shorthash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            shorthash: shorthash.into(),
            ..Default::default()
        }
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.filename)
    }

    /// Raw metadata worth exposing: anything but null, `{}` or `[]`.
    pub fn raw_metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref().filter(|value| match value {
            serde_json::Value::Null => false,
            serde_json::Value::Object(map) => !map.is_empty(),
            serde_json::Value::Array(list) => !list.is_empty(),
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        })
    }
}
