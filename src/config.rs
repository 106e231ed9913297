use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

const SETTINGS_FILE: &str = "settings.json";
const CONFIG_ENV: &str = "EXTRA_NETWORKS_CONFIG";
const BIND_ENV: &str = "EXTRA_NETWORKS_BIND";
const DEFAULT_BIND: &str = "127.0.0.1:7861";

/// How cards stored under dot-prefixed folders are shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum HiddenModels {
    Always,
    Never,
    #[default]
    #[serde(rename = "When searched")]
    #[serde(other)]
    WhenSearched,
}

/// Read-only host options consumed by the gallery.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GalleryOptions {
    pub card_height: u32,
    pub card_width: u32,
    pub card_text_scale: f64,
    pub card_show_description: bool,
    pub card_description_is_html: bool,
    pub hidden_models: HiddenModels,
    pub card_order: String,
    pub card_order_field: String,
    pub tree_view_default_enabled: bool,
    pub tree_view_default_width: u32,
    pub tab_reorder: String,
    pub samples_format: String,
    pub checkpoint_dirs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypernetwork_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings_dir: Option<PathBuf>,
    pub bind_address: String,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            card_height: 0,
            card_width: 0,
            card_text_scale: 1.0,
            card_show_description: true,
            card_description_is_html: false,
            hidden_models: HiddenModels::default(),
            card_order: "Ascending".to_string(),
            card_order_field: "Path".to_string(),
            tree_view_default_enabled: true,
            tree_view_default_width: 180,
            tab_reorder: String::new(),
            samples_format: "png".to_string(),
            checkpoint_dirs: Vec::new(),
            hypernetwork_dir: None,
            embeddings_dir: None,
            bind_address: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ConfigStore {
    settings_path: PathBuf,
    settings: GalleryOptions,
}

impl ConfigStore {
    pub fn new() -> Result<Self> {
        let settings_path = match std::env::var(CONFIG_ENV) {
            Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom),
            _ => {
                let dirs = ProjectDirs::from("dev", "extra-networks", "extra-networks")
                    .ok_or_else(|| anyhow!("unable to resolve config directory"))?;
                dirs.config_dir().join(SETTINGS_FILE)
            }
        };
        Self::load(settings_path)
    }

    pub fn load(settings_path: PathBuf) -> Result<Self> {
        let mut settings = if settings_path.exists() {
            let data = fs::read(&settings_path)
                .with_context(|| format!("failed to read settings file {settings_path:?}"))?;
            let parsed: GalleryOptions = serde_json::from_slice(&data)
                .with_context(|| format!("failed to parse settings from {settings_path:?}"))?;
            info!("Loaded gallery options from {:?}", settings_path);
            parsed
        } else {
            warn!(
                "No settings at {:?}; using default gallery options.",
                settings_path
            );
            GalleryOptions::default()
        };

        if let Ok(bind) = std::env::var(BIND_ENV) {
            let bind = bind.trim();
            if !bind.is_empty() {
                settings.bind_address = bind.to_string();
            }
        }

        Ok(Self {
            settings_path,
            settings,
        })
    }

    pub fn settings(&self) -> GalleryOptions {
        self.settings.clone()
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings_path.clone()
    }
}
