use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    General(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File cannot be fetched: {0}")]
    Forbidden(String),

    #[error("Unknown extra networks page: {0}")]
    UnknownPage(String),

    #[error("div_id already in rows: {0}")]
    DuplicateRowId(usize),
}

impl AppError {
    /// Records the error in the log and hands it back unchanged.
    pub fn logged(self, context: &str) -> Self {
        log::error!("Error {context}: {self}");
        self
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::UnknownPage(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(serde_json::json!({ "detail": self }))).into_response()
    }
}
