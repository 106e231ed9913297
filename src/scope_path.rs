use std::path::{Path, PathBuf};

pub fn normalize(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }
    normalized
}

pub fn is_within_scope(path: &str, root: &str) -> bool {
    let path = normalize(path);
    let root = normalize(root);

    if path == root {
        return true;
    }

    if root == "/" {
        return path.starts_with('/');
    }

    if cfg!(windows) {
        let path_lower = path.to_ascii_lowercase();
        let root_lower = root.to_ascii_lowercase();
        return path_lower.starts_with(&(root_lower + "/"));
    }

    path.starts_with(&(root + "/"))
}

/// Absolute form of `path` without touching the filesystem.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// The part of `filename` below the last root that contains it, with a
/// leading `/`. Empty when no root matches.
pub fn local_path<P: AsRef<Path>>(filename: &str, roots: &[P]) -> String {
    let filename = normalize(&absolute(Path::new(filename)).to_string_lossy());
    let mut local = String::new();
    for root in roots {
        let root = normalize(&absolute(root.as_ref()).to_string_lossy());
        if is_within_scope(&filename, &root) {
            let start = if root == "/" { 0 } else { root.len() };
            local = filename[start..].to_string();
        }
    }
    local
}

/// True when any segment of the path is a dot-file or dot-folder.
pub fn has_hidden_segment(path: &str) -> bool {
    normalize(path)
        .split('/')
        .any(|segment| segment.starts_with('.') && segment != "." && segment != "..")
}

/// Path of `filename` relative to the parent of the first directory that
/// contains it, so the directory's own name stays part of the result.
pub fn relative_to_parent<P: AsRef<Path>>(filename: &Path, directories: &[P]) -> String {
    let abspath = absolute(filename);
    for directory in directories {
        let directory = absolute(directory.as_ref());
        let parent = directory.parent().unwrap_or(&directory);
        if let Ok(relative) = abspath.strip_prefix(parent) {
            return normalize(&relative.to_string_lossy());
        }
    }
    String::new()
}
