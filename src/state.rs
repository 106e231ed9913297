use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::GalleryOptions;
use crate::services::registry_service::PageRegistry;

pub struct AppState {
    pub options: RwLock<GalleryOptions>,
    pub registry: RwLock<PageRegistry>,
}

impl AppState {
    /// State with the built-in pages registered for `options`.
    pub fn with_default_pages(options: GalleryOptions) -> Self {
        let mut registry = PageRegistry::default();
        registry.register_default_pages(&options);
        Self::new(options, registry)
    }

    pub fn new(options: GalleryOptions, registry: PageRegistry) -> Self {
        Self {
            options: RwLock::new(options),
            registry: RwLock::new(registry),
        }
    }

    /// Snapshot of the options for one request.
    pub fn options(&self) -> GalleryOptions {
        self.options
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn registry(&self) -> RwLockReadGuard<'_, PageRegistry> {
        self.registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn registry_mut(&self) -> RwLockWriteGuard<'_, PageRegistry> {
        self.registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drops every page and registers the built-ins again from the current
    /// options.
    pub fn reload_pages(&self) {
        let options = self.options();
        let mut registry = self.registry_mut();
        registry.initialize();
        registry.register_default_pages(&options);
        log::info!("Registered {} extra networks pages", registry.pages().len());
    }
}
