use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::models::item::NetworkItem;
use crate::models::tree::{Tree, TreeNode};

fn relative_key(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn subtree<'a>(
    dir: &Path,
    base: &Path,
    items: &HashMap<PathBuf, &'a NetworkItem>,
) -> Result<Tree<'a>, AppError> {
    let mut tree = Tree::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            let children = subtree(&path, base, items)?;
            if !children.is_empty() {
                tree.insert(relative_key(&path, base), TreeNode::Dir(children));
            }
        } else if let Some(item) = items.get(&path).copied() {
            tree.insert(relative_key(&path, base), TreeNode::Item(item));
        }
    }
    Ok(tree)
}

pub fn get_tree<'a>(
    roots: &[PathBuf],
    items: &HashMap<PathBuf, &'a NetworkItem>,
) -> Result<Tree<'a>, AppError> {
    let mut tree = Tree::new();
    for root in roots {
        let base = root.parent().unwrap_or(root);
        let key = relative_key(root, base);
        let node = if root.is_dir() {
            TreeNode::Dir(subtree(root, base, items)?)
        } else if let Some(item) = items.get(root).copied() {
            TreeNode::Item(item)
        } else {
            TreeNode::Dir(Tree::new())
        };
        tree.insert(key, node);
    }
    Ok(tree)
}
