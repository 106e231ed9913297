use crate::models::card::CardFields;
use crate::models::tree::RowKind;

pub struct CopyPathButton<'a> {
    pub filename: &'a str,
}

pub struct EditItemButton<'a> {
    pub tabname: &'a str,
    pub extra_networks_tabname: &'a str,
    pub name: &'a str,
}

pub struct MetadataButton<'a> {
    pub extra_networks_tabname: &'a str,
    pub name: &'a str,
}

pub struct TreeRowFields<'a> {
    pub data_attributes: &'a str,
    pub subitem: &'a str,
    pub search_terms: &'a str,
    pub btn_type: RowKind,
    pub tabname: &'a str,
    pub onclick_extra: &'a str,
    pub extra_networks_tabname: &'a str,
    pub action_leading: &'a str,
    pub visual_leading: &'a str,
    pub label: &'a str,
    pub visual_trailing: &'a str,
    pub action_trailing: &'a str,
}

pub struct PaneFields<'a> {
    pub tabname: &'a str,
    pub extra_networks_tabname: &'a str,
    pub data_sort_mode: &'a str,
    pub data_sort_dir: &'a str,
    pub tree_view_btn_extra_class: &'a str,
    pub tree_view_div_extra_class: &'a str,
    pub tree_html: &'a str,
    pub cards_html: &'a str,
    pub tree_view_default_width: u32,
    pub tree_view_div_default_display: &'a str,
    pub pane_content_default_display: &'a str,
}

pub trait HtmlTemplates: Send + Sync {
    fn copy_path_button(&self, fields: &CopyPathButton<'_>) -> String;
    fn edit_item_button(&self, fields: &EditItemButton<'_>) -> String;
    fn metadata_button(&self, fields: &MetadataButton<'_>) -> String;
    fn tree_row(&self, fields: &TreeRowFields<'_>) -> String;
    fn card(&self, fields: &CardFields) -> String;
    fn pane(&self, fields: &PaneFields<'_>) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTemplates;

impl HtmlTemplates for DefaultTemplates {
    fn copy_path_button(&self, f: &CopyPathButton<'_>) -> String {
        format!(
            r#"<div class="copy-path-button card-button"
    title="Copy path to clipboard"
    onclick="extraNetworksCopyCardPath(event)"
    data-clipboard-text="{filename}">
</div>"#,
            filename = f.filename
        )
    }

    fn edit_item_button(&self, f: &EditItemButton<'_>) -> String {
        format!(
            r#"<div class="edit-button card-button"
    title="Edit metadata"
    onclick="extraNetworksEditUserMetadata(event, '{tabname}', '{extra_networks_tabname}', '{name}')">
</div>"#,
            tabname = f.tabname,
            extra_networks_tabname = f.extra_networks_tabname,
            name = f.name
        )
    }

    fn metadata_button(&self, f: &MetadataButton<'_>) -> String {
        format!(
            r#"<div class="metadata-button card-button"
    title="Show internal metadata"
    onclick="extraNetworksRequestMetadata(event, '{extra_networks_tabname}', '{name}')">
</div>"#,
            extra_networks_tabname = f.extra_networks_tabname,
            name = f.name
        )
    }

    fn tree_row(&self, f: &TreeRowFields<'_>) -> String {
        format!(
            r#"<div class="tree-list-item {subitem}" {data_attributes}>
    <span data-filterable-item-text hidden>{search_terms}</span>
    <div class="tree-list-content tree-list-content-{btn_type}"
        type="button"
        onclick="extraNetworksTreeOnClick(event, '{tabname}', '{extra_networks_tabname}');{onclick_extra}">
        <span class="tree-list-item-action tree-list-item-action--leading">{action_leading}</span>
        <span class="tree-list-item-visual tree-list-item-visual--leading">{visual_leading}</span>
        <span class="tree-list-item-label tree-list-item-label--truncate">{label}</span>
        <span class="tree-list-item-visual tree-list-item-visual--trailing">{visual_trailing}</span>
        <span class="tree-list-item-action tree-list-item-action--trailing">{action_trailing}</span>
    </div>
</div>"#,
            subitem = f.subitem,
            data_attributes = f.data_attributes,
            search_terms = f.search_terms,
            btn_type = f.btn_type,
            tabname = f.tabname,
            extra_networks_tabname = f.extra_networks_tabname,
            onclick_extra = f.onclick_extra,
            action_leading = f.action_leading,
            visual_leading = f.visual_leading,
            label = f.label,
            visual_trailing = f.visual_trailing,
            action_trailing = f.action_trailing,
        )
    }

    fn card(&self, f: &CardFields) -> String {
        let div_id = f.div_id.map(|id| id.to_string()).unwrap_or_default();
        format!(
            r#"<div class="card{search_only}" style="{style}" onclick="{card_clicked}"
    data-div-id="{div_id}" data-name="{name}" data-prompt="{data_prompt}"
    data-neg-prompt="{data_neg_prompt}" data-allow-neg="{data_allow_neg}" {sort_keys}>
    {background_image}
    <div class="button-row">{copy_path_button}{metadata_button}{edit_button}</div>
    <div class="actions">
        <div class="additional">{search_terms}</div>
        <span class="name">{name}</span>
        <span class="description">{description}</span>
    </div>
</div>"#,
            search_only = f.search_only,
            style = f.style,
            card_clicked = f.card_clicked,
            div_id = div_id,
            name = f.name,
            data_prompt = escape_html(&f.data_prompt),
            data_neg_prompt = escape_html(&f.data_neg_prompt),
            data_allow_neg = f.data_allow_neg,
            sort_keys = f.sort_keys,
            background_image = f.background_image,
            copy_path_button = f.copy_path_button,
            metadata_button = f.metadata_button,
            edit_button = f.edit_button,
            search_terms = f.search_terms,
            description = f.description,
        )
    }

    fn pane(&self, f: &PaneFields<'_>) -> String {
        format!(
            r#"<div id="{tabname}_{ent}_pane" class="extra-network-pane">
    <div class="extra-network-control" id="{tabname}_{ent}_controls">
        <div class="extra-network-control--search">
            <input id="{tabname}_{ent}_extra_search" class="extra-network-control--search-text" type="search" placeholder="Search">
        </div>
        <div id="{tabname}_{ent}_extra_sort" class="extra-network-control--sort" data-sortmode="{data_sort_mode}" data-sortdir="{data_sort_dir}"></div>
        <div id="{tabname}_{ent}_extra_tree_view" class="extra-network-control--tree-view {tree_view_btn_extra_class}" title="Enable Tree View"></div>
        <div id="{tabname}_{ent}_extra_refresh" class="extra-network-control--refresh" title="Refresh page"></div>
    </div>
    <div class="extra-network-pane-content" style="display: {pane_content_default_display};">
        <div id="{tabname}_{ent}_tree_view" class="extra-network-tree {tree_view_div_extra_class}" style="flex-basis: {width}px; display: {tree_view_div_default_display};">
            {tree_html}
        </div>
        <div id="{tabname}_{ent}_cards" class="extra-network-cards" data-sort-mode="{data_sort_mode}" data-sort-dir="{data_sort_dir}">
            {cards_html}
        </div>
    </div>
</div>"#,
            tabname = f.tabname,
            ent = f.extra_networks_tabname,
            data_sort_mode = f.data_sort_mode,
            data_sort_dir = f.data_sort_dir,
            tree_view_btn_extra_class = f.tree_view_btn_extra_class,
            tree_view_div_extra_class = f.tree_view_div_extra_class,
            pane_content_default_display = f.pane_content_default_display,
            width = f.tree_view_default_width,
            tree_view_div_default_display = f.tree_view_div_default_display,
            tree_html = f.tree_html,
            cards_html = f.cards_html,
        )
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn quote_js(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn collapse_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last_space = false;
    for ch in html.trim().chars() {
        match ch {
            '\n' | '\r' => continue,
            ' ' => {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            }
            _ => {
                out.push(ch);
                last_space = false;
            }
        }
    }
    out
}
