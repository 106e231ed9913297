use serde::Serialize;

/// Everything a card template can reference. Values are already escaped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CardFields {
    pub div_id: Option<usize>,
    pub background_image: String,
    pub card_clicked: String,
    pub copy_path_button: String,
    pub description: String,
    pub edit_button: String,
    pub metadata_button: String,
    pub name: String,
    pub data_prompt: String,
    pub data_neg_prompt: String,
    pub data_allow_neg: String,
    pub search_only: String,
    pub search_terms: String,
    pub sort_keys: String,
    pub style: String,
    pub tabname: String,
    pub extra_networks_tabname: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardOutput {
    Html(String),
    Fields(Box<CardFields>),
}

impl CardOutput {
    /// Rendered markup; field sets render as nothing.
    pub fn into_html(self) -> String {
        match self {
            Self::Html(html) => html,
            Self::Fields(_) => String::new(),
        }
    }
}
