//! HTTP API
//!
//! - POST /upload             - store a PDF from the `file` multipart field
//! - POST /convert            - turn the latest (or `?filename=`) PDF into a workbook
//! - GET  /download/{name}    - fetch a generated workbook as an attachment
//! - GET  /notas              - list every row of `notas_fiscais`

use crate::convert::{self, ConvertError};
use crate::db::{Database, Record};
use crate::extract::TableExtractor;
use crate::storage::{Storage, StorageError};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// ============================================================================
// AppState
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Arc<Storage>,
    pub extractor: Arc<dyn TableExtractor>,
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug)]
pub struct AppError(pub StatusCode, pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({"message": self.1}))).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidFilename(_) => bad_request(e.to_string()),
            StorageError::NotFound(_) => not_found(e.to_string()),
            StorageError::Io { .. } => internal(e.to_string()),
        }
    }
}

impl From<ConvertError> for AppError {
    fn from(e: ConvertError) -> Self {
        match e {
            ConvertError::NoPdf(_) | ConvertError::NoTables => not_found(e.to_string()),
            ConvertError::Storage(e @ (StorageError::InvalidFilename(_) | StorageError::NotFound(_))) => {
                AppError::from(e)
            }
            other => internal(format!("Erro ao processar o PDF: {}", other)),
        }
    }
}

fn not_found(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::NOT_FOUND, msg.into())
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::BAD_REQUEST, msg.into())
}

fn internal(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::INTERNAL_SERVER_ERROR, msg.into())
}

fn no_file() -> AppError {
    bad_request("Nenhum arquivo enviado")
}

/// Keeps the status axum assigns, so a body cut off by the size limit is 413.
fn multipart_error(e: MultipartError) -> AppError {
    AppError(e.status(), format!("Erro ao ler o envio: {}", e.body_text()))
}

// ============================================================================
// Request / Response types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct FileResponse {
    pub message: String,
    pub file_path: String,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub filename: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

// POST /upload
async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FileResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!(error = %e, "upload without a multipart body");
        no_file()
    })?;

    loop {
        let field = multipart.next_field().await.map_err(|e| {
            tracing::warn!(error = %e, status = %e.status(), "malformed multipart body");
            multipart_error(e)
        })?;
        let Some(field) = field else {
            tracing::warn!("upload without a 'file' field");
            return Err(no_file());
        };
        if field.name() != Some("file") {
            continue;
        }

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(no_file()),
        };
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, status = %e.status(), filename = %filename, "failed to read upload");
            multipart_error(e)
        })?;

        let path = state.storage.save_upload(&filename, &bytes).await.map_err(|e| {
            tracing::warn!(error = %e, filename = %filename, "upload rejected");
            AppError::from(e)
        })?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "stored upload");

        return Ok(Json(FileResponse {
            message: "Arquivo PDF carregado com sucesso!".to_string(),
            file_path: path.display().to_string(),
        }));
    }
}

// POST /convert?filename=X
async fn convert_handler(
    State(state): State<AppState>,
    Query(params): Query<ConvertQuery>,
) -> Result<Json<FileResponse>, AppError> {
    let storage = state.storage.clone();
    let extractor = state.extractor.clone();

    let result = tokio::task::spawn_blocking(move || {
        convert::convert_pdf(&storage, extractor.as_ref(), params.filename.as_deref())
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "conversion task failed");
        internal(format!("Erro ao processar o PDF: {}", e))
    })?;

    let conversion = result.map_err(|e| {
        match &e {
            ConvertError::NoPdf(_) | ConvertError::NoTables => tracing::warn!(error = %e, "nothing to convert"),
            _ => tracing::error!(error = %e, "conversion failed"),
        }
        AppError::from(e)
    })?;

    Ok(Json(FileResponse {
        message: "Arquivo Excel gerado com sucesso!".to_string(),
        file_path: conversion.output.display().to_string(),
    }))
}

// GET /download/{filename}
async fn download_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.storage.read_output(&filename).await.map_err(|e| {
        tracing::warn!(error = %e, filename = %filename, "download failed");
        AppError::from(e)
    })?;

    let content_type = if filename.to_ascii_lowercase().ends_with(".xlsx") {
        XLSX_CONTENT_TYPE
    } else {
        "application/octet-stream"
    };
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        filename.replace(['"', '\\'], "_"),
        urlencoding::encode(&filename)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

// GET /notas
async fn notas_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Record>>, AppError> {
    let notas = state.db.get_notas().map_err(|e| {
        tracing::error!(error = %e, "failed to read notas_fiscais");
        internal(format!("Erro ao obter as notas fiscais: {}", e))
    })?;
    Ok(Json(notas))
}

// ============================================================================
// Router
// ============================================================================

/// Build the application router. `max_body_bytes` caps every request body.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/convert", post(convert_handler))
        .route("/download/{filename}", get(download_handler))
        .route("/notas", get(notas_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
