use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const DEFAULT_PREVIEW_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

pub fn allowed_preview_extensions(samples_format: &str) -> BTreeSet<String> {
    let mut extensions: BTreeSet<String> = DEFAULT_PREVIEW_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect();
    let extra = samples_format.trim().trim_start_matches('.').to_ascii_lowercase();
    if !extra.is_empty() {
        extensions.insert(extra);
    }
    extensions
}

pub fn preview_extension_order(samples_format: &str) -> Vec<String> {
    let mut order: Vec<String> = DEFAULT_PREVIEW_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect();
    let extra = samples_format.trim().trim_start_matches('.').to_ascii_lowercase();
    if !extra.is_empty() && !order.contains(&extra) {
        order.push(extra);
    }
    order
}

fn is_inside(file: &Path, dir: &Path) -> bool {
    fs::canonicalize(dir)
        .map(|dir| file != dir && file.starts_with(&dir))
        .unwrap_or(false)
}

/// Checks that `filename` may be served as a thumbnail and returns its
/// resolved location. Nothing is read from the file itself.
pub fn resolve_thumbnail(
    filename: &str,
    allowed_dirs: &HashSet<PathBuf>,
    extensions: &BTreeSet<String>,
) -> Result<PathBuf, AppError> {
    let path = Path::new(filename);
    if filename.is_empty() || !path.is_file() {
        return Err(AppError::NotFound(filename.to_string()));
    }

    let resolved = fs::canonicalize(path)?;
    if !allowed_dirs.iter().any(|dir| is_inside(&resolved, dir)) {
        return Err(AppError::Forbidden(format!(
            "{filename}. Must be in one of directories registered by extra pages."
        )));
    }

    let ext = resolved
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if !extensions.contains(&ext) {
        let allowed: Vec<&str> = extensions.iter().map(String::as_str).collect();
        return Err(AppError::Forbidden(format!(
            "{filename}. Extensions allowed: {}.",
            allowed.join(", ")
        )));
    }

    Ok(resolved)
}
