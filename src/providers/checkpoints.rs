use std::path::PathBuf;

use crate::error::AppError;
use crate::models::item::NetworkItem;
use crate::providers::{
    base_item, local_preview, read_safetensors_metadata, shorthash, HashCache, ModelDirectory,
    ModelFile, Naming,
};
use crate::services::page_service::{CatalogProvider, ItemContext};
use crate::services::template_service::{escape_html, quote_js};

const EXTENSIONS: &[&str] = &["ckpt", "safetensors"];

pub struct CheckpointProvider {
    models: ModelDirectory,
    hashes: HashCache,
}

impl CheckpointProvider {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            models: ModelDirectory::new(roots, EXTENSIONS, Naming::RelativeToRoot),
            hashes: HashCache::new(),
        }
    }

    fn item(&self, file: &ModelFile, index: Option<usize>, ctx: &mut ItemContext<'_>) -> NetworkItem {
        let (mtime, _) = ctx.mctime(&file.path);
        let sha256 = self.hashes.sha256_or_queue(&file.path, mtime);
        let mut item = base_item(file, index, &shorthash(&sha256), ctx);

        if !sha256.is_empty() {
            item.search_terms.push(sha256);
        }
        item.onclick = Some(escape_html(&format!(
            "return selectCheckpoint({})",
            quote_js(&file.name)
        )));
        item.local_preview = local_preview(&file.path, "", &ctx.options().samples_format);
        item.metadata = read_safetensors_metadata(&file.path).unwrap_or_else(|err| {
            log::warn!("Unable to read checkpoint metadata for {}: {err}", file.name);
            None
        });
        item
    }
}

impl CatalogProvider for CheckpointProvider {
    fn title(&self) -> &str {
        "Checkpoints"
    }

    fn list_items(&self, ctx: &mut ItemContext<'_>) -> Result<Vec<NetworkItem>, AppError> {
        Ok(self
            .models
            .files()
            .iter()
            .enumerate()
            .map(|(index, file)| self.item(file, Some(index), ctx))
            .collect())
    }

    fn create_item(
        &self,
        name: &str,
        index: Option<usize>,
        ctx: &mut ItemContext<'_>,
    ) -> Result<NetworkItem, AppError> {
        let file = self
            .models
            .find(name)
            .ok_or_else(|| AppError::NotFound(format!("checkpoint {name}")))?;
        Ok(self.item(&file, index, ctx))
    }

    fn allowed_directories_for_previews(&self) -> Vec<PathBuf> {
        self.models.roots().to_vec()
    }

    fn refresh(&self) -> Result<(), AppError> {
        self.models.rescan();
        Ok(())
    }

    fn allow_prompt(&self) -> bool {
        false
    }
}
