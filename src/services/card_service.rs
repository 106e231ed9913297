use std::path::PathBuf;

use crate::config::{GalleryOptions, HiddenModels};
use crate::models::card::{CardFields, CardOutput};
use crate::models::item::NetworkItem;
use crate::scope_path::{has_hidden_segment, local_path};
use crate::services::row_service::card_clicked_js;
use crate::services::template_service::{
    escape_html, CopyPathButton, EditItemButton, HtmlTemplates, MetadataButton,
};

pub struct CardRenderContext<'a> {
    pub tabname: &'a str,
    pub extra_networks_tabname: &'a str,
    pub allow_negative_prompt: bool,
    pub templates: &'a dyn HtmlTemplates,
    pub allowed_dirs: &'a [PathBuf],
    pub options: &'a GalleryOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    SearchOnly,
    Suppressed,
}

pub fn visibility(item: &NetworkItem, allowed_dirs: &[PathBuf], policy: HiddenModels) -> Visibility {
    if policy == HiddenModels::Always {
        return Visibility::Shown;
    }
    if !has_hidden_segment(&local_path(&item.filename, allowed_dirs)) {
        return Visibility::Shown;
    }
    match policy {
        HiddenModels::Never => Visibility::Suppressed,
        _ => Visibility::SearchOnly,
    }
}

fn card_style(options: &GalleryOptions) -> String {
    let mut style = String::new();
    if options.card_height > 0 {
        style.push_str(&format!("height: {}px;", options.card_height));
    }
    if options.card_width > 0 {
        style.push_str(&format!("width: {}px;", options.card_width));
    }
    style.push_str(&format!("font-size: {}%;", options.card_text_scale * 100.0));
    style
}

fn sort_keys_html(item: &NetworkItem) -> String {
    item.sort_keys
        .iter()
        .map(|(key, value)| format!("data-sort-{key}=\"{}\"", escape_html(value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn search_terms_html(item: &NetworkItem, search_only: bool) -> String {
    let class = if search_only {
        "search_terms search_only"
    } else {
        "search_terms"
    };
    item.search_terms
        .iter()
        .map(|term| format!("<span class='hidden {class}'>{}</span>", escape_html(term)))
        .collect()
}

pub fn create_item_html(
    ctx: &CardRenderContext<'_>,
    item: &NetworkItem,
    template: Option<&dyn HtmlTemplates>,
    div_id: Option<usize>,
) -> CardOutput {
    let search_only = match visibility(item, ctx.allowed_dirs, ctx.options.hidden_models) {
        Visibility::Suppressed => return CardOutput::Html(String::new()),
        Visibility::SearchOnly => true,
        Visibility::Shown => false,
    };

    let name = escape_html(&item.name);
    let background_image = item
        .preview
        .as_deref()
        .filter(|preview| !preview.is_empty())
        .map(|preview| {
            format!(
                r#"<img src="{}" class="preview" loading="lazy">"#,
                escape_html(preview)
            )
        })
        .unwrap_or_default();

    let copy_path_button = ctx.templates.copy_path_button(&CopyPathButton {
        filename: &escape_html(&item.filename),
    });
    let metadata_button = if item.raw_metadata().is_some() {
        ctx.templates.metadata_button(&MetadataButton {
            extra_networks_tabname: ctx.extra_networks_tabname,
            name: &name,
        })
    } else {
        String::new()
    };
    let edit_button = ctx.templates.edit_item_button(&EditItemButton {
        tabname: ctx.tabname,
        extra_networks_tabname: ctx.extra_networks_tabname,
        name: &name,
    });

    let description = if ctx.options.card_show_description {
        item.description.clone().unwrap_or_default()
    } else {
        String::new()
    };
    let description = if ctx.options.card_description_is_html {
        description
    } else {
        escape_html(&description)
    };

    let fields = CardFields {
        div_id,
        background_image,
        card_clicked: card_clicked_js(ctx.tabname, item, ctx.allow_negative_prompt),
        copy_path_button,
        description,
        edit_button,
        metadata_button,
        name,
        data_prompt: item.prompt.clone().unwrap_or_else(|| "''".to_string()),
        data_neg_prompt: item
            .negative_prompt
            .clone()
            .unwrap_or_else(|| "''".to_string()),
        data_allow_neg: ctx.allow_negative_prompt.to_string(),
        search_only: if search_only { " search_only" } else { "" }.to_string(),
        search_terms: search_terms_html(item, search_only),
        sort_keys: sort_keys_html(item),
        style: card_style(ctx.options),
        tabname: ctx.tabname.to_string(),
        extra_networks_tabname: ctx.extra_networks_tabname.to_string(),
    };

    match template {
        Some(template) => CardOutput::Html(template.card(&fields)),
        None => CardOutput::Fields(Box::new(fields)),
    }
}
