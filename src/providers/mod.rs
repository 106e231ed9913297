//! Built-in catalogs backed by model directories on disk.

pub mod checkpoints;
pub mod hypernetworks;
pub mod textual_inversion;

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SendError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::thread;

use serde_json::Value;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::AppError;
use crate::models::item::NetworkItem;
use crate::services::page_service::ItemContext;

const SHORTHASH_LEN: usize = 10;
const HASH_BUFFER: usize = 1024 * 1024;
const MAX_SAFETENSORS_HEADER: u64 = 100 * 1024 * 1024;

/// How a model file is named in its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// File name without extension.
    Stem,
    /// Path below its root without extension, `/`-separated.
    RelativeToRoot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    pub name: String,
    pub path: PathBuf,
}

/// Model files with given extensions found beneath a set of roots.
///
/// The first access scans the roots; later accesses reuse that listing until
/// [`ModelDirectory::rescan`] is called.
#[derive(Debug)]
pub struct ModelDirectory {
    roots: Vec<PathBuf>,
    extensions: &'static [&'static str],
    naming: Naming,
    files: RwLock<Option<Vec<ModelFile>>>,
}

impl ModelDirectory {
    pub fn new(roots: Vec<PathBuf>, extensions: &'static [&'static str], naming: Naming) -> Self {
        Self {
            roots,
            extensions,
            naming,
            files: RwLock::new(None),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn has_model_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext.as_str()))
    }

    fn name_for(&self, root: &Path, path: &Path) -> String {
        match self.naming {
            Naming::Stem => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default(),
            Naming::RelativeToRoot => path
                .strip_prefix(root)
                .unwrap_or(path)
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/"),
        }
    }

    fn scan(&self) -> Vec<ModelFile> {
        let mut files: Vec<ModelFile> = Vec::new();
        for root in &self.roots {
            if !root.is_dir() {
                log::debug!("Skipping missing model directory {}", root.display());
                continue;
            }
            let walker = WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| self.has_model_extension(e.path()));

            for entry in walker {
                let file = ModelFile {
                    name: self.name_for(root, entry.path()),
                    path: entry.into_path(),
                };
                match files.iter_mut().find(|existing| existing.name == file.name) {
                    Some(existing) => *existing = file,
                    None => files.push(file),
                }
            }
        }
        log::info!(
            "Found {} model files under {} directories",
            files.len(),
            self.roots.len()
        );
        files
    }

    pub fn files(&self) -> Vec<ModelFile> {
        if let Some(files) = self
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            return files.clone();
        }
        let scanned = self.scan();
        *self
            .files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(scanned.clone());
        scanned
    }

    pub fn rescan(&self) {
        let scanned = self.scan();
        *self
            .files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(scanned);
    }

    pub fn find(&self, name: &str) -> Option<ModelFile> {
        self.files().into_iter().find(|file| file.name == name)
    }
}

type HashEntries = Arc<Mutex<HashMap<PathBuf, (i64, String)>>>;
type PendingHashes = Arc<Mutex<HashSet<PathBuf>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn digest_file(path: &Path) -> Result<String, AppError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 digests memoized by path and modification time, computed on a
/// background thread.
#[derive(Debug, Default)]
pub struct HashCache {
    entries: HashEntries,
    pending: PendingHashes,
    worker: Mutex<Option<Sender<(PathBuf, i64)>>>,
}

impl HashCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn cached(&self, path: &Path, mtime: i64) -> Option<String> {
        lock(&self.entries)
            .get(path)
            .filter(|(cached_mtime, _)| *cached_mtime == mtime)
            .map(|(_, digest)| digest.clone())
    }

    /// Digest of `path` at `mtime` if already known. Otherwise the file is
    /// queued and an empty string comes back until a later listing.
    pub fn sha256_or_queue(&self, path: &Path, mtime: i64) -> String {
        if let Some(digest) = self.cached(path, mtime) {
            return digest;
        }
        if lock(&self.pending).insert(path.to_path_buf()) {
            self.enqueue(path.to_path_buf(), mtime);
        }
        String::new()
    }

    fn enqueue(&self, path: PathBuf, mtime: i64) {
        let mut worker = lock(&self.worker);
        let job = match worker.as_ref() {
            Some(sender) => match sender.send((path, mtime)) {
                Ok(()) => return,
                Err(SendError(job)) => job,
            },
            None => (path, mtime),
        };

        match self.spawn_worker() {
            Ok(sender) => {
                if let Err(SendError((path, _))) = sender.send(job) {
                    lock(&self.pending).remove(&path);
                }
                *worker = Some(sender);
            }
            Err(err) => {
                log::warn!("Unable to start model hashing thread: {err}");
                lock(&self.pending).remove(&job.0);
            }
        }
    }

    fn spawn_worker(&self) -> std::io::Result<Sender<(PathBuf, i64)>> {
        let (sender, receiver) = mpsc::channel::<(PathBuf, i64)>();
        let entries = Arc::clone(&self.entries);
        let pending = Arc::clone(&self.pending);
        thread::Builder::new()
            .name("model-hashes".to_string())
            .spawn(move || {
                for (path, mtime) in receiver {
                    // An unreadable file caches an empty digest until its mtime changes.
                    let digest = digest_file(&path).unwrap_or_else(|err| {
                        log::warn!("Unable to hash {}: {err}", path.display());
                        String::new()
                    });
                    lock(&entries).insert(path.clone(), (mtime, digest));
                    lock(&pending).remove(&path);
                }
            })?;
        Ok(sender)
    }

    #[cfg(test)]
    pub(crate) fn wait_for_pending(&self) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while !lock(&self.pending).is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(5));
        }
    }
}

pub fn shorthash(sha256: &str) -> String {
    sha256.chars().take(SHORTHASH_LEN).collect()
}

/// The `__metadata__` table from a `.safetensors` header, if the file is one
/// and carries it.
pub fn read_safetensors_metadata(path: &Path) -> Result<Option<Value>, AppError> {
    let is_safetensors = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("safetensors"));
    if !is_safetensors {
        return Ok(None);
    }

    let mut file = File::open(path)?;
    let mut len_bytes = [0u8; 8];
    file.read_exact(&mut len_bytes)?;
    let header_len = u64::from_le_bytes(len_bytes);
    if header_len > MAX_SAFETENSORS_HEADER {
        return Err(AppError::General(format!(
            "safetensors header of {header_len} bytes in {}",
            path.display()
        )));
    }

    let mut header = Vec::new();
    file.take(header_len).read_to_end(&mut header)?;
    let mut parsed: Value = serde_json::from_slice(&header)?;
    Ok(parsed
        .get_mut("__metadata__")
        .map(Value::take)
        .filter(|metadata| !metadata.is_null()))
}

/// Fields every built-in catalog fills the same way.
pub(crate) fn base_item(
    file: &ModelFile,
    index: Option<usize>,
    shorthash: &str,
    ctx: &mut ItemContext<'_>,
) -> NetworkItem {
    let stem = file.path.with_extension("");
    let mut sort_keys = ctx.get_sort_keys(&file.path);
    if let Some(index) = index {
        sort_keys.insert("default".to_string(), index.to_string());
    }
    NetworkItem {
        preview: ctx.find_preview(&stem),
        description: ctx.find_description(&stem),
        search_terms: vec![ctx.search_terms_from_path(&file.path)],
        sort_keys,
        ..NetworkItem::new(
            file.name.clone(),
            file.path.to_string_lossy(),
            shorthash,
        )
    }
}

/// `<stem><suffix>.<samples_format>` beside the model file.
pub(crate) fn local_preview(path: &Path, suffix: &str, samples_format: &str) -> String {
    format!(
        "{}{suffix}.{}",
        path.with_extension("").to_string_lossy(),
        samples_format.trim().trim_start_matches('.')
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;

    pub(crate) fn touch(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub(crate) fn safetensors_bytes(header: &Value) -> Vec<u8> {
        let header = serde_json::to_vec(header).unwrap();
        let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&[0u8; 16]);
        bytes
    }

    #[test]
    fn scan_filters_extensions_and_names_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Stable-diffusion");
        touch(&root.join("base.safetensors"), b"a");
        touch(&root.join("sdxl/Turbo.CKPT"), b"b");
        touch(&root.join("sdxl/readme.md"), b"c");

        let stems = ModelDirectory::new(vec![root.clone()], &["ckpt", "safetensors"], Naming::Stem);
        let names: Vec<String> = stems.files().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["base", "Turbo"]);

        let relative =
            ModelDirectory::new(vec![root], &["ckpt", "safetensors"], Naming::RelativeToRoot);
        assert!(relative.find("sdxl/Turbo").is_some());
        assert!(relative.find("readme").is_none());
    }

    #[test]
    fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let models = ModelDirectory::new(vec![dir.path().join("absent")], &["pt"], Naming::Stem);
        assert!(models.files().is_empty());
    }

    #[test]
    fn rescan_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("one.pt"), b"1");
        let models = ModelDirectory::new(vec![dir.path().to_path_buf()], &["pt"], Naming::Stem);
        assert_eq!(models.files().len(), 1);

        touch(&dir.path().join("two.pt"), b"2");
        assert_eq!(models.files().len(), 1);
        models.rescan();
        assert_eq!(models.files().len(), 2);
    }

    #[test]
    fn hashes_are_computed_in_background_and_memoized_by_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model.pt");
        touch(&file, b"abc");
        let cache = HashCache::new();

        assert_eq!(cache.sha256_or_queue(&file, 1), "");
        cache.wait_for_pending();
        let digest = cache.sha256_or_queue(&file, 1);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(shorthash(&digest), "ba7816bf8f");

        fs::write(&file, b"changed").unwrap();
        assert_eq!(cache.sha256_or_queue(&file, 1), digest);
        assert_eq!(cache.sha256_or_queue(&file, 2), "");
        cache.wait_for_pending();
        let changed = cache.sha256_or_queue(&file, 2);
        assert_eq!(changed.len(), 64);
        assert_ne!(changed, digest);
    }

    #[test]
    fn unreadable_file_hashes_to_empty_once() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.pt");
        let cache = HashCache::new();

        assert_eq!(cache.sha256_or_queue(&absent, 0), "");
        cache.wait_for_pending();
        assert_eq!(cache.sha256_or_queue(&absent, 0), "");
        assert!(lock(&cache.pending).is_empty());
    }

    #[test]
    fn reads_safetensors_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model.safetensors");
        let header = serde_json::json!({
            "__metadata__": {"ss_base_model": "sd15"},
            "weight": {"dtype": "F16", "shape": [1], "data_offsets": [0, 2]}
        });
        touch(&file, &safetensors_bytes(&header));

        assert_eq!(
            read_safetensors_metadata(&file).unwrap(),
            Some(serde_json::json!({"ss_base_model": "sd15"}))
        );

        let plain = dir.path().join("model.ckpt");
        touch(&plain, b"pickle");
        assert_eq!(read_safetensors_metadata(&plain).unwrap(), None);

        let broken = dir.path().join("broken.safetensors");
        touch(&broken, b"\x01");
        assert!(read_safetensors_metadata(&broken).is_err());
    }

    #[test]
    fn local_preview_keeps_directory() {
        assert_eq!(
            local_preview(Path::new("/m/styles/anime.v2.pt"), ".preview", "png"),
            "/m/styles/anime.v2.preview.png"
        );
    }
}
