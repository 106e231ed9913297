use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::Value;

use crate::config::GalleryOptions;
use crate::error::AppError;
use crate::models::card::CardOutput;
use crate::models::item::NetworkItem;
use crate::models::tree::ProxyName;
use crate::scope_path::{absolute, relative_to_parent};
use crate::services::card_service::{self, CardRenderContext};
use crate::services::lister_service::FileLister;
use crate::services::payload_service::{script_data_html, Rows};
use crate::services::row_service::{build_tree, TreeRenderContext};
use crate::services::template_service::{HtmlTemplates, PaneFields};
use crate::services::thumb_service::preview_extension_order;
use crate::services::tree_service::get_tree;
use crate::services::user_metadata_service::UserMetadataStore;

const PATH_QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

pub trait CatalogProvider: Send + Sync {
    fn title(&self) -> &str;

    fn list_items(&self, ctx: &mut ItemContext<'_>) -> Result<Vec<NetworkItem>, AppError>;

    fn create_item(
        &self,
        name: &str,
        index: Option<usize>,
        ctx: &mut ItemContext<'_>,
    ) -> Result<NetworkItem, AppError>;

    fn allowed_directories_for_previews(&self) -> Vec<PathBuf>;

    fn refresh(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn allow_prompt(&self) -> bool {
        true
    }

    fn allow_negative_prompt(&self) -> bool {
        false
    }
}

pub struct ItemContext<'a> {
    lister: &'a mut FileLister,
    options: &'a GalleryOptions,
    allowed_dirs: Vec<PathBuf>,
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = stem.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl<'a> ItemContext<'a> {
    pub fn new(
        lister: &'a mut FileLister,
        options: &'a GalleryOptions,
        allowed_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            lister,
            options,
            allowed_dirs,
        }
    }

    pub fn options(&self) -> &GalleryOptions {
        self.options
    }

    pub fn mctime(&mut self, path: &Path) -> (i64, i64) {
        self.lister.mctime(path)
    }

    pub fn link_preview(&mut self, filename: &Path) -> String {
        let normalized = filename.to_string_lossy().replace('\\', "/");
        let quoted = utf8_percent_encode(&normalized, PATH_QUOTE);
        let (mtime, _) = self.lister.mctime(filename);
        format!("./sd_extra_networks/thumb?filename={quoted}&mtime={mtime}")
    }

    pub fn find_preview(&mut self, stem: &Path) -> Option<String> {
        let candidates: Vec<PathBuf> = preview_extension_order(&self.options.samples_format)
            .iter()
            .flat_map(|ext| {
                [
                    with_suffix(stem, &format!(".{ext}")),
                    with_suffix(stem, &format!(".preview.{ext}")),
                ]
            })
            .collect();
        let found = candidates.into_iter().find(|file| self.lister.exists(file))?;
        Some(self.link_preview(&found))
    }

    pub fn find_description(&mut self, stem: &Path) -> Option<String> {
        for file in [with_suffix(stem, ".txt"), with_suffix(stem, ".description.txt")] {
            if !self.lister.exists(&file) {
                continue;
            }
            match fs::read(&file) {
                Ok(bytes) => return Some(String::from_utf8_lossy(&bytes).into_owned()),
                Err(err) => log::debug!("Skipping description {}: {err}", file.display()),
            }
        }
        None
    }

    pub fn get_sort_keys(&mut self, path: &Path) -> BTreeMap<String, String> {
        let (modified, created) = self.lister.mctime(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        BTreeMap::from([
            ("date_created".to_string(), created.to_string()),
            ("date_modified".to_string(), modified.to_string()),
            ("name".to_string(), name),
            ("path".to_string(), path.to_string_lossy().to_lowercase()),
        ])
    }

    pub fn search_terms_from_path(&self, filename: &Path) -> String {
        relative_to_parent(filename, &self.allowed_dirs)
    }
}

#[derive(Debug, Default)]
pub struct PageState {
    items: Vec<NetworkItem>,
    metadata: HashMap<String, Value>,
    lister: FileLister,
}

impl PageState {
    fn upsert(&mut self, item: NetworkItem) {
        match self.items.iter_mut().find(|existing| existing.name == item.name) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }
}

pub struct ExtraNetworksPage {
    title: String,
    name: String,
    extra_networks_tabname: String,
    provider: Box<dyn CatalogProvider>,
    templates: Arc<dyn HtmlTemplates>,
    user_metadata: Arc<dyn UserMetadataStore>,
    state: Mutex<PageState>,
}

fn pretty_json(value: &Value) -> Result<String, AppError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| AppError::General(e.to_string()))
}

impl ExtraNetworksPage {
    pub fn new(
        provider: Box<dyn CatalogProvider>,
        templates: Arc<dyn HtmlTemplates>,
        user_metadata: Arc<dyn UserMetadataStore>,
    ) -> Self {
        let title = provider.title().to_string();
        let name = title.to_lowercase();
        let extra_networks_tabname = name.replace(' ', "_");
        Self {
            title,
            name,
            extra_networks_tabname,
            provider,
            templates,
            user_metadata,
            state: Mutex::new(PageState::default()),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extra_networks_tabname(&self) -> &str {
        &self.extra_networks_tabname
    }

    pub fn allow_prompt(&self) -> bool {
        self.provider.allow_prompt()
    }

    pub fn allow_negative_prompt(&self) -> bool {
        self.provider.allow_negative_prompt()
    }

    pub fn allowed_directories_for_previews(&self) -> Vec<PathBuf> {
        self.provider
            .allowed_directories_for_previews()
            .iter()
            .map(|dir| absolute(dir))
            .collect()
    }

    pub fn refresh(&self) -> Result<(), AppError> {
        self.provider.refresh()
    }

    fn lock_state(&self) -> MutexGuard<'_, PageState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn items(&self) -> Vec<NetworkItem> {
        self.lock_state().items.clone()
    }

    pub fn read_user_metadata(&self, item: &mut NetworkItem, lister: Option<&mut FileLister>) {
        let metadata = self.user_metadata.get_user_metadata(item.path(), lister);
        if let Some(desc) = metadata.get("description").and_then(Value::as_str) {
            item.description = Some(desc.to_string());
        }
        item.user_metadata = Some(metadata);
    }

    pub fn create_item_html(
        &self,
        tabname: &str,
        item: &NetworkItem,
        template: Option<&dyn HtmlTemplates>,
        div_id: Option<usize>,
        options: &GalleryOptions,
    ) -> CardOutput {
        let allowed_dirs = self.allowed_directories_for_previews();
        let ctx = CardRenderContext {
            tabname,
            extra_networks_tabname: &self.extra_networks_tabname,
            allow_negative_prompt: self.allow_negative_prompt(),
            templates: self.templates.as_ref(),
            allowed_dirs: &allowed_dirs,
            options,
        };
        card_service::create_item_html(&ctx, item, template, div_id)
    }

    fn create_tree_view_html(&self, state: &PageState, tabname: &str) -> Result<String, AppError> {
        let roots = self.allowed_directories_for_previews();
        if roots.is_empty() {
            return Ok(String::new());
        }
        let by_path: HashMap<PathBuf, &NetworkItem> = state
            .items
            .iter()
            .map(|item| (absolute(item.path()), item))
            .collect();
        let tree = get_tree(&roots, &by_path)?;

        let ctx = TreeRenderContext {
            tabname,
            extra_networks_tabname: &self.extra_networks_tabname,
            templates: self.templates.as_ref(),
            allow_negative_prompt: self.allow_negative_prompt(),
        };
        let mut rows = Rows::new();
        build_tree(&tree, &ctx, &mut rows, 0, 0, None)?;
        script_data_html(tabname, &self.extra_networks_tabname, ProxyName::TreeList, &rows)
    }

    fn create_card_view_html(
        &self,
        state: &PageState,
        tabname: &str,
        options: &GalleryOptions,
    ) -> Result<String, AppError> {
        let rows: Rows = state
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let html = self
                    .create_item_html(tabname, item, Some(self.templates.as_ref()), Some(i), options)
                    .into_html();
                (i, html)
            })
            .collect();
        script_data_html(tabname, &self.extra_networks_tabname, ProxyName::CardsList, &rows)
    }

    pub fn create_html(
        &self,
        tabname: &str,
        options: &GalleryOptions,
        empty: bool,
    ) -> Result<String, AppError> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        state.lister.reset();
        state.metadata.clear();

        let listed = if empty {
            Vec::new()
        } else {
            let mut ctx = ItemContext::new(
                &mut state.lister,
                options,
                self.allowed_directories_for_previews(),
            );
            self.provider.list_items(&mut ctx)?
        };
        state.items.clear();
        for item in listed {
            state.upsert(item);
        }

        for item in state.items.iter_mut() {
            if let Some(raw) = item.raw_metadata() {
                state.metadata.insert(item.name.clone(), raw.clone());
            }
            if item.user_metadata.is_none() {
                self.read_user_metadata(item, Some(&mut state.lister));
            }
        }

        let tree_enabled = options.tree_view_default_enabled;
        let data_sort_mode = options.card_order_field.trim().to_lowercase();
        let data_sort_dir = options.card_order.trim().to_lowercase();
        let tree_html = self.create_tree_view_html(state, tabname)?;
        let cards_html = self.create_card_view_html(state, tabname, options)?;

        Ok(self.templates.pane(&PaneFields {
            tabname,
            extra_networks_tabname: &self.extra_networks_tabname,
            data_sort_mode: &data_sort_mode,
            data_sort_dir: &data_sort_dir,
            tree_view_btn_extra_class: if tree_enabled {
                "extra-network-control--enabled"
            } else {
                ""
            },
            tree_view_div_extra_class: if tree_enabled { "" } else { "hidden" },
            tree_html: &tree_html,
            cards_html: &cards_html,
            tree_view_default_width: options.tree_view_default_width,
            tree_view_div_default_display: if tree_enabled { "block" } else { "none" },
            pane_content_default_display: if tree_enabled { "grid" } else { "flex" },
        }))
    }

    pub fn get_single_card(
        &self,
        tabname: &str,
        name: &str,
        options: &GalleryOptions,
    ) -> Result<String, AppError> {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let mut fresh = FileLister::new();
        let created = {
            let mut ctx =
                ItemContext::new(&mut fresh, options, self.allowed_directories_for_previews());
            self.provider.create_item(name, None, &mut ctx)
        };
        let mut item = match created {
            Ok(item) => item,
            Err(err) => {
                log::error!("Error creating item for extra network {name}: {err}");
                state
                    .items
                    .iter()
                    .find(|item| item.name == name)
                    .cloned()
                    .ok_or_else(|| AppError::NotFound(format!("extra network item {name}")))?
            }
        };

        self.read_user_metadata(&mut item, None);
        if let Some(raw) = item.raw_metadata() {
            state.metadata.insert(item.name.clone(), raw.clone());
        }
        let html = self
            .create_item_html(tabname, &item, Some(self.templates.as_ref()), None, options)
            .into_html();
        state.upsert(item);
        Ok(html)
    }

    pub fn metadata_json(&self, item: &str) -> Result<Option<String>, AppError> {
        let state = self.lock_state();
        state.metadata.get(item).map(pretty_json).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HiddenModels;
    use crate::services::payload_service::decode_rows;
    use crate::services::template_service::DefaultTemplates;
    use crate::services::user_metadata_service::JsonSidecarStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Lists every `.pt` file under its root, named by file stem.
    struct DirProvider {
        root: PathBuf,
        fail_create: AtomicBool,
    }

    impl DirProvider {
        fn new(root: PathBuf) -> Self {
            Self {
                root,
                fail_create: AtomicBool::new(false),
            }
        }

        fn files(&self) -> Vec<PathBuf> {
            let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "pt"))
                .collect();
            files.sort();
            files
        }

        fn item_for(&self, path: &Path, index: Option<usize>, ctx: &mut ItemContext<'_>) -> NetworkItem {
            let stem = path.with_extension("");
            let name = stem.file_name().unwrap().to_string_lossy().to_string();
            let mut sort_keys = ctx.get_sort_keys(path);
            if let Some(index) = index {
                sort_keys.insert("default".to_string(), index.to_string());
            }
            NetworkItem {
                preview: ctx.find_preview(&stem),
                description: ctx.find_description(&stem),
                search_terms: vec![ctx.search_terms_from_path(path)],
                prompt: Some(format!("\"{name}\"")),
                metadata: Some(json!({"dim": 8})),
                sort_keys,
                ..NetworkItem::new(name, path.to_string_lossy(), "0123456789")
            }
        }
    }

    impl CatalogProvider for DirProvider {
        fn title(&self) -> &str {
            "Test Nets"
        }

        fn list_items(&self, ctx: &mut ItemContext<'_>) -> Result<Vec<NetworkItem>, AppError> {
            Ok(self
                .files()
                .iter()
                .enumerate()
                .map(|(i, path)| self.item_for(path, Some(i), ctx))
                .collect())
        }

        fn create_item(
            &self,
            name: &str,
            index: Option<usize>,
            ctx: &mut ItemContext<'_>,
        ) -> Result<NetworkItem, AppError> {
            if self.fail_create.load(Ordering::Relaxed) {
                return Err(AppError::General("catalog offline".to_string()));
            }
            let path = self
                .files()
                .into_iter()
                .find(|p| p.file_stem().is_some_and(|s| s == name))
                .ok_or_else(|| AppError::NotFound(name.to_string()))?;
            Ok(self.item_for(&path, index, ctx))
        }

        fn allowed_directories_for_previews(&self) -> Vec<PathBuf> {
            vec![self.root.clone()]
        }
    }

    fn page_for(root: PathBuf) -> ExtraNetworksPage {
        ExtraNetworksPage::new(
            Box::new(DirProvider::new(root)),
            Arc::new(DefaultTemplates),
            Arc::new(JsonSidecarStore),
        )
    }

    fn payload(html: &str, proxy: &str) -> Rows {
        let marker = format!("data-proxy-name=\"{proxy}\" data-json=\"");
        let start = html.find(&marker).unwrap() + marker.len();
        let end = html[start..].find('"').unwrap() + start;
        decode_rows(&html[start..end]).unwrap()
    }

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nets");
        fs::create_dir_all(root.join("styles")).unwrap();
        fs::create_dir_all(root.join(".archive")).unwrap();
        fs::write(root.join("styles/item2.pt"), b"x").unwrap();
        fs::write(root.join("styles/item10.pt"), b"x").unwrap();
        fs::write(root.join("styles/item1.pt"), b"x").unwrap();
        fs::write(root.join("styles/item1.preview.png"), b"png").unwrap();
        fs::write(root.join("styles/item1.txt"), b"first \xff item").unwrap();
        fs::write(root.join(".archive/old.pt"), b"x").unwrap();
        (dir, root)
    }

    #[test]
    fn names_derive_from_title() {
        let (_dir, root) = setup();
        let page = page_for(root);
        assert_eq!(page.name(), "test nets");
        assert_eq!(page.extra_networks_tabname(), "test_nets");
    }

    #[test]
    fn create_html_renders_tree_and_cards() {
        let (_dir, root) = setup();
        let page = page_for(root);
        let html = page
            .create_html("txt2img", &GalleryOptions::default(), false)
            .unwrap();

        assert!(html.contains(r#"id="txt2img_test_nets_pane""#));
        let cards = payload(&html, "cards_list");
        assert_eq!(cards.len(), 4);
        assert!(cards.values().any(|c| c.contains("search_only")));

        let tree = payload(&html, "tree_list");
        let labels: Vec<&String> = tree.values().collect();
        let pos = |needle: &str| labels.iter().position(|h| h.contains(needle)).unwrap();
        assert!(pos("styles/item1.pt") < pos("styles/item2.pt"));
        assert!(pos("styles/item2.pt") < pos("styles/item10.pt"));
    }

    #[test]
    fn items_get_preview_description_and_search_terms() {
        let (_dir, root) = setup();
        let page = page_for(root);
        page.create_html("txt2img", &GalleryOptions::default(), false)
            .unwrap();

        let items = page.items();
        let first = items.iter().find(|i| i.name == "item1").unwrap();
        let preview = first.preview.as_deref().unwrap();
        assert!(preview.starts_with("./sd_extra_networks/thumb?filename="));
        assert!(preview.contains("item1.preview.png&mtime="));
        assert_eq!(first.description.as_deref(), Some("first \u{fffd} item"));
        assert_eq!(first.search_terms, vec!["nets/styles/item1.pt".to_string()]);
        assert!(first.user_metadata.is_some());
        assert!(first.sort_keys.contains_key("default"));
    }

    #[test]
    fn user_metadata_description_overrides_file() {
        let (_dir, root) = setup();
        fs::write(root.join("styles/item2.json"), r#"{"description": "from json"}"#).unwrap();
        let page = page_for(root);
        page.create_html("txt2img", &GalleryOptions::default(), false)
            .unwrap();
        let items = page.items();
        let item = items.iter().find(|i| i.name == "item2").unwrap();
        assert_eq!(item.description.as_deref(), Some("from json"));
    }

    #[test]
    fn empty_pane_lists_nothing() {
        let (_dir, root) = setup();
        let page = page_for(root);
        let html = page
            .create_html("txt2img", &GalleryOptions::default(), true)
            .unwrap();
        assert!(payload(&html, "cards_list").is_empty());
        assert!(page.items().is_empty());
    }

    #[test]
    fn tree_view_can_start_hidden() {
        let (_dir, root) = setup();
        let page = page_for(root);
        let options = GalleryOptions {
            tree_view_default_enabled: false,
            ..Default::default()
        };
        let html = page.create_html("txt2img", &options, false).unwrap();
        assert!(html.contains("display: none;"));
        assert!(html.contains("extra-network-tree hidden"));
    }

    #[test]
    fn never_policy_blanks_hidden_cards() {
        let (_dir, root) = setup();
        let page = page_for(root);
        let options = GalleryOptions {
            hidden_models: HiddenModels::Never,
            ..Default::default()
        };
        let html = page.create_html("txt2img", &options, false).unwrap();
        let cards = payload(&html, "cards_list");
        assert_eq!(cards.values().filter(|c| c.is_empty()).count(), 1);
    }

    #[test]
    fn metadata_is_pretty_printed() {
        let (_dir, root) = setup();
        let page = page_for(root);
        assert_eq!(page.metadata_json("item1").unwrap(), None);

        page.create_html("txt2img", &GalleryOptions::default(), false)
            .unwrap();
        assert_eq!(
            page.metadata_json("item1").unwrap().as_deref(),
            Some("{\n    \"dim\": 8\n}")
        );
        assert_eq!(page.metadata_json("missing").unwrap(), None);
    }

    #[test]
    fn single_card_picks_up_new_files() {
        let (_dir, root) = setup();
        let page = page_for(root.clone());
        let options = GalleryOptions::default();
        page.create_html("txt2img", &options, false).unwrap();

        fs::write(root.join("styles/item2.preview.webp"), b"webp").unwrap();
        fs::write(root.join("styles/item2.json"), r#"{"description": "fresh"}"#).unwrap();

        let html = page.get_single_card("txt2img", "item2", &options).unwrap();
        assert!(html.contains("item2.preview.webp"));
        assert!(html.contains("fresh"));
        let items = page.items();
        let stored = items.iter().find(|i| i.name == "item2").unwrap();
        assert_eq!(stored.description.as_deref(), Some("fresh"));
    }

    #[test]
    fn single_card_falls_back_to_cached_item() {
        let (_dir, root) = setup();
        let provider = DirProvider::new(root.clone());
        provider.fail_create.store(true, Ordering::Relaxed);
        let page = ExtraNetworksPage::new(
            Box::new(provider),
            Arc::new(DefaultTemplates),
            Arc::new(JsonSidecarStore),
        );
        let options = GalleryOptions::default();
        page.create_html("txt2img", &options, false).unwrap();

        let html = page.get_single_card("txt2img", "item10", &options).unwrap();
        assert!(html.contains(r#"data-name="item10""#));

        let err = page
            .get_single_card("txt2img", "never-listed", &options)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
