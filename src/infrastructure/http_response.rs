// HTTP response utilities for errors and file downloads
use crate::application::error::WorkflowError;
use crate::domain::files::FileError;
use crate::infrastructure::csv_export::ExportedFile;
use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;

pub fn error_status(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::Upload { .. } | WorkflowError::Process { .. } => StatusCode::BAD_GATEWAY,
        WorkflowError::File(FileError::UnknownFile(_)) => StatusCode::NOT_FOUND,
        WorkflowError::File(FileError::UnsupportedFileType(_)) => StatusCode::BAD_REQUEST,
        WorkflowError::NoFileSelected => StatusCode::BAD_REQUEST,
        WorkflowError::NoResults => StatusCode::NOT_FOUND,
        WorkflowError::Superseded(_) => StatusCode::CONFLICT,
        WorkflowError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> axum::response::Response {
        let status = error_status(&self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

/// Attachment header with an ASCII fallback and an RFC 5987 UTF-8 name
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

pub fn csv_download(file: ExportedFile) -> Result<Response<Body>, StatusCode> {
    let disposition = HeaderValue::from_str(&content_disposition(&file.filename)).map_err(|e| {
        tracing::error!("Invalid download filename {}: {}", file.filename, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, file.contents.len())
        .body(Body::from(file.contents))
        .map_err(|e| {
            tracing::error!("Response build error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
