use crate::error::{LapsecamError, SessionError, StorageError};
use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::io::ErrorKind;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

/// Crate error rendered as an HTTP status with a JSON body
#[derive(Debug)]
pub struct ApiError(pub LapsecamError);

impl<E> From<E> for ApiError
where
    E: Into<LapsecamError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            LapsecamError::Storage(StorageError::InvalidPath { .. }) => StatusCode::BAD_REQUEST,
            LapsecamError::Storage(StorageError::UnknownCategory { .. })
            | LapsecamError::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            LapsecamError::Session(SessionError::Busy { .. }) => StatusCode::CONFLICT,
            LapsecamError::Session(SessionError::InvalidParameters { .. }) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected ({}): {}", status, self.0);
        }

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("mp4") => "video/mp4",
        Some("h264") => "video/h264",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Stream a file from disk without loading it into memory
pub async fn file_response(path: &Path, disposition: Disposition) -> Result<Response, ApiError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StorageError::NotFound {
                path: path.display().to_string(),
            }
            .into())
        }
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();

    let disposition = match disposition {
        Disposition::Attachment => {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().replace('"', ""))
                .unwrap_or_else(|| "download".to_string());
            format!("attachment; filename=\"{}\"", filename)
        }
        Disposition::Inline => "inline".to_string(),
    };

    let headers = [
        (header::CONTENT_TYPE, content_type_for(path).to_string()),
        (header::CONTENT_LENGTH, length.to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
