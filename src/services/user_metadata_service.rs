use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::AppError;
use crate::services::lister_service::FileLister;

pub trait UserMetadataStore: Send + Sync {
    /// Metadata for `filename`. With a lister, existence checks come from its
    /// cached listings; without one the filesystem is asked directly.
    fn get_user_metadata(
        &self,
        filename: &Path,
        lister: Option<&mut FileLister>,
    ) -> Map<String, Value>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSidecarStore;

impl JsonSidecarStore {
    fn read(path: &Path) -> Result<Map<String, Value>, AppError> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            other => Err(AppError::General(format!(
                "expected a JSON object, found {other}"
            ))),
        }
    }
}

impl UserMetadataStore for JsonSidecarStore {
    fn get_user_metadata(
        &self,
        filename: &Path,
        lister: Option<&mut FileLister>,
    ) -> Map<String, Value> {
        let metadata_path = filename.with_extension("json");
        let exists = match lister {
            Some(lister) => lister.exists(&metadata_path),
            None => metadata_path.exists(),
        };
        if !exists {
            return Map::new();
        }

        Self::read(&metadata_path).unwrap_or_else(|err| {
            log::warn!(
                "Error reading extra network user metadata from {}: {err}",
                metadata_path.display()
            );
            Map::new()
        })
    }
}
