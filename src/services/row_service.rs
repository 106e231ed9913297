use crate::error::AppError;
use crate::models::item::NetworkItem;
use crate::models::tree::{RowKind, Tree, TreeNode};
use crate::natural_sort::natural_cmp;
use crate::services::payload_service::Rows;
use crate::services::template_service::{
    collapse_whitespace, escape_html, CopyPathButton, EditItemButton, HtmlTemplates,
    MetadataButton, TreeRowFields,
};

const CHEVRON: &str = "<i class='tree-list-item-action-chevron'></i>";
const FOLDER_GLYPH: &str = "🗀";
const FILE_GLYPH: &str = "🗎";

pub struct TreeRenderContext<'a> {
    pub tabname: &'a str,
    pub extra_networks_tabname: &'a str,
    pub templates: &'a dyn HtmlTemplates,
    pub allow_negative_prompt: bool,
}

#[derive(Default)]
pub struct RowSpec<'a> {
    pub div_id: usize,
    pub parent_id: Option<usize>,
    pub depth: usize,
    pub label: &'a str,
    pub data_path: Option<&'a str>,
    pub data_hash: Option<&'a str>,
    pub data_prompt: Option<&'a str>,
    pub data_neg_prompt: Option<&'a str>,
    pub data_allow_neg: Option<&'a str>,
    pub onclick_extra: Option<&'a str>,
}

pub fn card_clicked_js(tabname: &str, item: &NetworkItem, allow_negative_prompt: bool) -> String {
    if let Some(onclick) = &item.onclick {
        return onclick.clone();
    }
    escape_html(&format!(
        "cardClicked('{tabname}', {prompt}, {neg_prompt}, {allow_neg});",
        prompt = item.prompt.as_deref().unwrap_or("''"),
        neg_prompt = item.negative_prompt.as_deref().unwrap_or("''"),
        allow_neg = allow_negative_prompt,
    ))
}

fn data_attributes(kind: RowKind, row: &RowSpec<'_>) -> String {
    let mut attrs = String::new();
    let mut push = |key: &str, value: &str| {
        attrs.push_str(&format!("data-{key}=\"{}\" ", escape_html(value)));
    };
    if let Some(path) = row.data_path {
        push("path", path);
    }
    if let Some(hash) = row.data_hash {
        push("hash", hash);
    }
    if let Some(prompt) = row.data_prompt.filter(|p| !p.is_empty()) {
        push("prompt", prompt);
    }
    if let Some(neg) = row.data_neg_prompt.filter(|p| !p.is_empty()) {
        push("neg-prompt", neg);
    }
    if let Some(allow) = row.data_allow_neg.filter(|p| !p.is_empty()) {
        push("allow-neg", allow);
    }
    push("tree-entry-type", &kind.to_string());
    push("div-id", &row.div_id.to_string());
    if let Some(parent) = row.parent_id {
        push("parent-id", &parent.to_string());
    }
    push("depth", &row.depth.to_string());
    if row.parent_id.is_none() {
        attrs.push_str("data-expanded ");
    }
    attrs
}

pub fn build_row(ctx: &TreeRenderContext<'_>, kind: RowKind, row: &RowSpec<'_>) -> String {
    let label = escape_html(row.label);
    let (subitem, action_leading, visual_leading, visual_trailing) = match kind {
        RowKind::Dir => ("has-subitem", CHEVRON, FOLDER_GLYPH, String::new()),
        RowKind::File => {
            let filename = escape_html(row.data_path.unwrap_or_default());
            let buttons = [
                ctx.templates.copy_path_button(&CopyPathButton {
                    filename: &filename,
                }),
                ctx.templates.edit_item_button(&EditItemButton {
                    tabname: ctx.tabname,
                    extra_networks_tabname: ctx.extra_networks_tabname,
                    name: &label,
                }),
                ctx.templates.metadata_button(&MetadataButton {
                    extra_networks_tabname: ctx.extra_networks_tabname,
                    name: &label,
                }),
            ];
            (
                "subitem",
                "",
                FILE_GLYPH,
                format!("<div class=\"button-row\">{}</div>", buttons.concat()),
            )
        }
    };

    let attributes = data_attributes(kind, row);
    let html = ctx.templates.tree_row(&TreeRowFields {
        data_attributes: &attributes,
        subitem,
        search_terms: "",
        btn_type: kind,
        tabname: ctx.tabname,
        onclick_extra: row.onclick_extra.unwrap_or_default(),
        extra_networks_tabname: ctx.extra_networks_tabname,
        action_leading,
        visual_leading,
        label: &label,
        visual_trailing: &visual_trailing,
        action_trailing: "",
    });
    collapse_whitespace(&html)
}

/// Renders `tree` depth-first into `rows`, starting at `div_id`, and
/// returns the next id to hand out at this level.
///
/// A directory takes the current id and its children start right after
/// it; once the subtree is done the counter continues past the subtree's
/// returned id.
pub fn build_tree(
    tree: &Tree<'_>,
    ctx: &TreeRenderContext<'_>,
    rows: &mut Rows,
    mut div_id: usize,
    depth: usize,
    parent_id: Option<usize>,
) -> Result<usize, AppError> {
    let mut entries: Vec<_> = tree.iter().collect();
    entries.sort_by(|a, b| natural_cmp(a.0, b.0));

    for (key, node) in entries {
        if rows.contains_key(&div_id) {
            return Err(AppError::DuplicateRowId(div_id));
        }
        match node {
            TreeNode::Dir(children) => {
                let row = RowSpec {
                    div_id,
                    parent_id,
                    depth,
                    label: key,
                    data_path: Some(key),
                    ..Default::default()
                };
                rows.insert(div_id, build_row(ctx, RowKind::Dir, &row));
                div_id = build_tree(children, ctx, rows, div_id + 1, depth + 1, Some(div_id))?;
            }
            TreeNode::Item(item) => {
                let onclick = card_clicked_js(ctx.tabname, item, ctx.allow_negative_prompt);
                let allow_neg = ctx.allow_negative_prompt.to_string();
                let row = RowSpec {
                    div_id,
                    parent_id,
                    depth,
                    label: &item.name,
                    data_path: Some(&item.filename),
                    data_hash: Some(&item.shorthash),
                    data_prompt: Some(item.prompt.as_deref().unwrap_or("''")),
                    data_neg_prompt: Some(item.negative_prompt.as_deref().unwrap_or("''")),
                    data_allow_neg: Some(&allow_neg),
                    onclick_extra: Some(&onclick),
                };
                rows.insert(div_id, build_row(ctx, RowKind::File, &row));
            }
        }
        div_id += 1;
    }
    Ok(div_id)
}
