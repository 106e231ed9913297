use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::config::GalleryOptions;
use crate::error::AppError;
use crate::services::page_service::ExtraNetworksPage;
use crate::services::thumb_service::{allowed_preview_extensions, resolve_thumbnail};
use crate::state::AppState;

const DEFAULT_TABNAME: &str = "txt2img";

fn default_tabname() -> String {
    DEFAULT_TABNAME.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ThumbQuery {
    #[serde(default)]
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    #[serde(default)]
    pub page: String,
    #[serde(default)]
    pub item: String,
}

#[derive(Debug, Deserialize)]
pub struct SingleCardQuery {
    #[serde(default)]
    pub page: String,
    #[serde(default = "default_tabname")]
    pub tabname: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PagesQuery {
    #[serde(default = "default_tabname")]
    pub tabname: String,
    #[serde(default)]
    pub empty: bool,
}

#[derive(Debug, Serialize)]
pub struct PageHtml {
    pub name: String,
    pub title: String,
    pub html: String,
    pub allow_prompt: bool,
    pub allow_negative_prompt: bool,
}

#[derive(Debug, Serialize)]
pub struct PagesResponse {
    pub pages: Vec<PageHtml>,
}

async fn run_blocking<T, F>(task: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::General(format!("background task failed: {e}")))?
}

fn render_pages(
    pages: &[Arc<ExtraNetworksPage>],
    tabname: &str,
    options: &GalleryOptions,
    empty: bool,
) -> Result<PagesResponse, AppError> {
    let pages = pages
        .iter()
        .map(|page| {
            Ok(PageHtml {
                name: page.name().to_string(),
                title: page.title().to_string(),
                html: page.create_html(tabname, options, empty)?,
                allow_prompt: page.allow_prompt(),
                allow_negative_prompt: page.allow_negative_prompt(),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    Ok(PagesResponse { pages })
}

pub async fn thumb(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ThumbQuery>,
    request: Request,
) -> Result<Response, AppError> {
    let allowed_dirs = state.registry().allowed_dirs().clone();
    let extensions = allowed_preview_extensions(&state.options().samples_format);
    let filename = query.filename;

    let path = run_blocking(move || resolve_thumbnail(&filename, &allowed_dirs, &extensions))
        .await?;

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => Ok(response.map(Body::new)),
        Err(err) => {
            let err: Infallible = err;
            match err {}
        }
    }
}

pub async fn metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetadataQuery>,
) -> Result<Json<Value>, AppError> {
    let Some(page) = state.registry().find(&query.page) else {
        return Ok(Json(json!({})));
    };

    let item = query.item;
    let metadata = run_blocking(move || page.metadata_json(&item)).await?;
    Ok(Json(match metadata {
        Some(metadata) => json!({ "metadata": metadata }),
        None => json!({}),
    }))
}

pub async fn get_single_card(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SingleCardQuery>,
) -> Result<Json<Value>, AppError> {
    let page = state
        .registry()
        .find(&query.page)
        .ok_or_else(|| AppError::UnknownPage(query.page.clone()))?;
    let options = state.options();

    let html = run_blocking(move || page.get_single_card(&query.tabname, &query.name, &options))
        .await?;
    Ok(Json(json!({ "html": html })))
}

pub async fn pages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PagesQuery>,
) -> Result<Json<PagesResponse>, AppError> {
    let options = state.options();
    let pages = state.registry().pages_in_preferred_order(&options.tab_reorder);

    let response =
        run_blocking(move || render_pages(&pages, &query.tabname, &options, query.empty)).await?;
    Ok(Json(response))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PagesQuery>,
) -> Result<Json<PagesResponse>, AppError> {
    let options = state.options();
    let pages = state.registry().pages_in_preferred_order(&options.tab_reorder);

    let response = run_blocking(move || {
        for page in &pages {
            page.refresh()
                .map_err(|err| err.logged(&format!("refreshing {}", page.name())))?;
        }
        render_pages(&pages, &query.tabname, &options, false)
    })
    .await?;
    log::info!("Refreshed {} extra networks pages", response.pages.len());
    Ok(Json(response))
}
