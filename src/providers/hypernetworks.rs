use std::path::PathBuf;

use crate::error::AppError;
use crate::models::item::NetworkItem;
use crate::providers::{base_item, local_preview, shorthash, HashCache, ModelDirectory, ModelFile, Naming};
use crate::services::page_service::{CatalogProvider, ItemContext};
use crate::services::template_service::quote_js;

const EXTENSIONS: &[&str] = &["pt"];

pub struct HypernetworkProvider {
    models: ModelDirectory,
    hashes: HashCache,
}

impl HypernetworkProvider {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            models: ModelDirectory::new(roots, EXTENSIONS, Naming::Stem),
            hashes: HashCache::new(),
        }
    }

    fn item(&self, file: &ModelFile, index: Option<usize>, ctx: &mut ItemContext<'_>) -> NetworkItem {
        let (mtime, _) = ctx.mctime(&file.path);
        let sha256 = self.hashes.sha256_or_queue(&file.path, mtime);
        let mut item = base_item(file, index, &shorthash(&sha256), ctx);

        // The multiplier is resolved client-side.
        item.prompt = Some(format!(
            "{} + opts.extra_networks_default_multiplier + {}",
            quote_js(&format!("<hypernet:{}:", file.name)),
            quote_js(">")
        ));
        item.local_preview = local_preview(&file.path, ".preview", &ctx.options().samples_format);
        item
    }
}

impl CatalogProvider for HypernetworkProvider {
    fn title(&self) -> &str {
        "Hypernetworks"
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
            .ok_or_else(|| AppError::NotFound(format!("hypernetwork {name}")))?;
        Ok(self.item(&file, index, ctx))
    }

    fn allowed_directories_for_previews(&self) -> Vec<PathBuf> {
        self.models.roots().to_vec()
    }

    fn refresh(&self) -> Result<(), AppError> {
        self.models.rescan();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalleryOptions;
    use crate::providers::tests::touch;
    use crate::services::lister_service::FileLister;

    #[test]
    fn prompt_defers_multiplier_to_client() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("hypernetworks");
        touch(&root.join("anime/style.pt"), b"weights");
        touch(&root.join("anime/style.preview.webp"), b"webp");
        touch(&root.join("anime/style.description.txt"), b"Soft shading");

        let provider = HypernetworkProvider::new(vec![root.clone()]);
        let options = GalleryOptions::default();
        let mut lister = FileLister::new();
        let mut ctx = ItemContext::new(&mut lister, &options, vec![root]);
        let item = provider.create_item("style", Some(4), &mut ctx).unwrap();

        assert_eq!(
            item.prompt.as_deref(),
            Some(r#""<hypernet:style:" + opts.extra_networks_default_multiplier + ">""#)
        );
        assert_eq!(item.description.as_deref(), Some("Soft shading"));
        assert!(item.preview.as_deref().unwrap().contains("style.preview.webp"));
        assert!(item.local_preview.ends_with("anime/style.preview.png"));
        assert_eq!(item.search_terms, vec!["hypernetworks/anime/style.pt".to_string()]);
        assert_eq!(item.sort_keys.get("default").map(String::as_str), Some("4"));
        assert!(provider.allow_prompt());
        assert!(!provider.allow_negative_prompt());
    }
}
