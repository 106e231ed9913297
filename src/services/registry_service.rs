use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::GalleryOptions;
use crate::providers::checkpoints::CheckpointProvider;
use crate::providers::hypernetworks::HypernetworkProvider;
use crate::providers::textual_inversion::TextualInversionProvider;
use crate::services::page_service::{CatalogProvider, ExtraNetworksPage};
use crate::services::template_service::{DefaultTemplates, HtmlTemplates};
use crate::services::user_metadata_service::{JsonSidecarStore, UserMetadataStore};

pub struct PageRegistry {
    pages: Vec<Arc<ExtraNetworksPage>>,
    allowed_dirs: HashSet<PathBuf>,
    templates: Arc<dyn HtmlTemplates>,
    metadata_store: Arc<dyn UserMetadataStore>,
}

impl Default for PageRegistry {
    fn default() -> Self {
        Self::new(Arc::new(DefaultTemplates), Arc::new(JsonSidecarStore))
    }
}

impl PageRegistry {
    pub fn new(
        templates: Arc<dyn HtmlTemplates>,
        metadata_store: Arc<dyn UserMetadataStore>,
    ) -> Self {
        Self {
            pages: Vec::new(),
            allowed_dirs: HashSet::new(),
            templates,
            metadata_store,
        }
    }

    pub fn initialize(&mut self) {
        self.pages.clear();
        self.allowed_dirs.clear();
    }

    pub fn register_page(&mut self, page: ExtraNetworksPage) {
        self.pages.push(Arc::new(page));
        self.allowed_dirs = self
            .pages
            .iter()
            .flat_map(|page| page.allowed_directories_for_previews())
            .collect();
    }

    pub fn register_provider(&mut self, provider: Box<dyn CatalogProvider>) {
        let page = ExtraNetworksPage::new(
            provider,
            Arc::clone(&self.templates),
            Arc::clone(&self.metadata_store),
        );
        log::debug!("Registered extra networks page {}", page.name());
        self.register_page(page);
    }

    pub fn register_default_pages(&mut self, options: &GalleryOptions) {
        self.register_provider(Box::new(TextualInversionProvider::new(
            options.embeddings_dir.iter().cloned().collect(),
        )));
        self.register_provider(Box::new(HypernetworkProvider::new(
            options.hypernetwork_dir.iter().cloned().collect(),
        )));
        self.register_provider(Box::new(CheckpointProvider::new(
            options.checkpoint_dirs.clone(),
        )));
    }

    pub fn find(&self, name: &str) -> Option<Arc<ExtraNetworksPage>> {
        let wanted = name.trim().to_lowercase();
        self.pages
            .iter()
            .find(|page| page.name() == wanted || page.extra_networks_tabname() == wanted)
            .cloned()
    }

    pub fn pages(&self) -> &[Arc<ExtraNetworksPage>] {
        &self.pages
    }

    pub fn allowed_dirs(&self) -> &HashSet<PathBuf> {
        &self.allowed_dirs
    }

    pub fn pages_in_preferred_order(&self, tab_reorder: &str) -> Vec<Arc<ExtraNetworksPage>> {
        let preferred: Vec<String> = tab_reorder
            .split(',')
            .map(|fragment| fragment.trim().to_lowercase())
            .collect();
        let fallback = self.pages.len();

        let mut ordered: Vec<(usize, Arc<ExtraNetworksPage>)> = self
            .pages
            .iter()
            .map(|page| {
                let score = preferred
                    .iter()
                    .position(|fragment| page.name().contains(fragment.as_str()))
                    .unwrap_or(fallback);
                (score, Arc::clone(page))
            })
            .collect();
        ordered.sort_by_key(|(score, _)| *score);
        ordered.into_iter().map(|(_, page)| page).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::item::NetworkItem;
    use crate::services::page_service::ItemContext;

    struct Named(&'static str, PathBuf);

    impl CatalogProvider for Named {
        fn title(&self) -> &str {
            self.0
        }

        fn list_items(&self, _ctx: &mut ItemContext<'_>) -> Result<Vec<NetworkItem>, AppError> {
            Ok(Vec::new())
        }

        fn create_item(
            &self,
            name: &str,
            _index: Option<usize>,
            _ctx: &mut ItemContext<'_>,
        ) -> Result<NetworkItem, AppError> {
            Err(AppError::NotFound(name.to_string()))
        }

        fn allowed_directories_for_previews(&self) -> Vec<PathBuf> {
            vec![self.1.clone()]
        }
    }

    fn registry() -> PageRegistry {
        let mut registry = PageRegistry::default();
        for title in ["Textual Inversion", "Hypernetworks", "Checkpoints", "Lora"] {
            registry.register_provider(Box::new(Named(
                title,
                PathBuf::from(format!("/models/{title}")),
            )));
        }
        registry
    }

    fn names(pages: &[Arc<ExtraNetworksPage>]) -> Vec<&str> {
        pages.iter().map(|page| page.name()).collect()
    }

    #[test]
    fn allowed_dirs_follow_registration() {
        let mut registry = registry();
        assert_eq!(registry.allowed_dirs().len(), 4);
        assert!(registry
            .allowed_dirs()
            .contains(&PathBuf::from("/models/Lora")));

        registry.initialize();
        assert!(registry.pages().is_empty());
        assert!(registry.allowed_dirs().is_empty());
    }

    #[test]
    fn finds_pages_by_name_or_tab() {
        let registry = registry();
        assert_eq!(registry.find("lora").unwrap().title(), "Lora");
        assert_eq!(
            registry.find("textual_inversion").unwrap().title(),
            "Textual Inversion"
        );
        assert_eq!(
            registry.find("textual inversion").unwrap().title(),
            "Textual Inversion"
        );
        assert!(registry.find("styles").is_none());
    }

    #[test]
    fn preferred_order_uses_first_matching_fragment() {
        let registry = registry();
        let ordered = registry.pages_in_preferred_order(" Lora, checkpoint ");
        assert_eq!(
            names(&ordered),
            vec!["lora", "checkpoints", "textual inversion", "hypernetworks"]
        );
    }

    #[test]
    fn empty_preference_keeps_registration_order() {
        let registry = registry();
        assert_eq!(
            names(&registry.pages_in_preferred_order("")),
            vec!["textual inversion", "hypernetworks", "checkpoints", "lora"]
        );
    }

    #[test]
    fn empty_fragment_matches_every_page() {
        let registry = registry();
        assert_eq!(
            names(&registry.pages_in_preferred_order("lora,,checkpoint")),
            vec!["lora", "textual inversion", "hypernetworks", "checkpoints"]
        );
    }

    #[test]
    fn default_pages_cover_builtin_catalogs() {
        let mut registry = PageRegistry::default();
        registry.register_default_pages(&GalleryOptions::default());
        assert_eq!(
            names(registry.pages()),
            vec!["textual inversion", "hypernetworks", "checkpoints"]
        );
    }
}
