use std::collections::BTreeMap;

use crate::models::item::NetworkItem;

/// Directory tree keyed by path relative to the parent of each root.
pub type Tree<'a> = BTreeMap<String, TreeNode<'a>>;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode<'a> {
    Dir(Tree<'a>),
    Item(&'a NetworkItem),
}

impl TreeNode<'_> {
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Dir,
    File,
}

impl std::fmt::Display for RowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dir => write!(f, "dir"),
            Self::File => write!(f, "file"),
        }
    }
}

impl std::str::FromStr for RowKind {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dir" => Ok(Self::Dir),
            "file" => Ok(Self::File),
            _ => Err(crate::error::AppError::General(format!(
                "Invalid button type: {s}"
            ))),
        }
    }
}

/// Which client-side list a payload feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyName {
    TreeList,
    CardsList,
}

impl std::fmt::Display for ProxyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TreeList => write!(f, "tree_list"),
            Self::CardsList => write!(f, "cards_list"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_kind_round_trips_through_str() {
        assert_eq!("dir".parse::<RowKind>().unwrap(), RowKind::Dir);
        assert_eq!(RowKind::File.to_string(), "file");
        assert!("folder".parse::<RowKind>().is_err());
    }
}
