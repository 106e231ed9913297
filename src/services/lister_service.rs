use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    pub modified: i64,
    pub created: i64,
}

#[derive(Debug, Default)]
struct DirListing {
    files: HashMap<String, ListedFile>,
    lowercase: HashMap<String, String>,
}

impl DirListing {
    fn read(dir: &Path) -> Self {
        let mut listing = Self::default();
        let Ok(entries) = fs::read_dir(dir) else {
            return listing;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let (modified, created) = entry
                .metadata()
                .map(|meta| {
                    let modified = meta.modified().ok().map(unix_seconds).unwrap_or(0);
                    let created = meta.created().ok().map(unix_seconds).unwrap_or(modified);
                    (modified, created)
                })
                .unwrap_or((0, 0));
            listing.lowercase.insert(name.to_lowercase(), name.clone());
            listing.files.insert(
                name.clone(),
                ListedFile {
                    name,
                    modified,
                    created,
                },
            );
        }
        listing
    }

    fn find(&self, name: &str) -> Option<&ListedFile> {
        self.files.get(name).or_else(|| {
            self.lowercase
                .get(&name.to_lowercase())
                .and_then(|actual| self.files.get(actual))
        })
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    chrono::DateTime::<chrono::Utc>::from(time).timestamp()
}

#[derive(Debug, Default)]
pub struct FileLister {
    listings: HashMap<PathBuf, DirListing>,
}

impl FileLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&mut self, path: &Path) -> Option<ListedFile> {
        let dir = path.parent()?;
        let name = path.file_name()?.to_string_lossy();
        self.listings
            .entry(dir.to_path_buf())
            .or_insert_with(|| DirListing::read(dir))
            .find(&name)
            .cloned()
    }

    pub fn exists(&mut self, path: &Path) -> bool {
        self.find(path).is_some()
    }

    pub fn mctime(&mut self, path: &Path) -> (i64, i64) {
        self.find(path)
            .map(|file| (file.modified, file.created))
            .unwrap_or((0, 0))
    }

    pub fn reset(&mut self) {
        self.listings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_listing_until_reset() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model.txt");
        let mut lister = FileLister::new();

        assert!(!lister.exists(&file));
        fs::write(&file, "desc").unwrap();
        assert!(!lister.exists(&file), "stale listing should still be served");

        lister.reset();
        assert!(lister.exists(&file));
        let (modified, _) = lister.mctime(&file);
        assert!(modified > 0);
    }

    #[test]
    fn matches_names_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Model.PNG"), b"png").unwrap();
        let mut lister = FileLister::new();

        assert!(lister.exists(&dir.path().join("model.png")));
        assert_eq!(
            lister.find(&dir.path().join("model.png")).unwrap().name,
            "Model.PNG"
        );
    }

    #[test]
    fn unknown_files_have_zero_times() {
        let dir = tempfile::tempdir().unwrap();
        let mut lister = FileLister::new();
        assert_eq!(lister.mctime(&dir.path().join("nope.pt")), (0, 0));
    }
}
