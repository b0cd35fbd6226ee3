//! HTTP delivery: generate, download, template status, health.

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::context::ContractRequest;
use crate::pipeline::{ContractPipeline, GeneratedContract, PipelineError};
use crate::templates::{TemplateLocator, TemplateStatus};

pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const SUCCESS_MESSAGE: &str = "Contrato gerado com sucesso!";

/// Characters left as-is in an RFC 5987 `filename*` value.
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ContractPipeline>,
    locator: Arc<TemplateLocator>,
}

impl AppState {
    pub fn new(pipeline: Arc<ContractPipeline>, locator: Arc<TemplateLocator>) -> Self {
        Self { pipeline, locator }
    }
}

// Response types
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub docx_file: String,
    pub pdf_file: Option<String>,
}

impl From<GeneratedContract> for GenerateResponse {
    fn from(generated: GeneratedContract) -> Self {
        Self {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            docx_file: generated.docx_file,
            pdf_file: generated.pdf_file,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub template_ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub enum ApiError {
    Pipeline(PipelineError),
    NotFound,
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Pipeline(err) if err.is_client_error() => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Pipeline(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "Arquivo não encontrado".to_string()),
            Self::Internal(message) => {
                tracing::error!(error = %message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/gerar-contrato", post(generate_contract))
        .route("/download/:filename", get(download))
        .route("/api/status-template", get(template_status))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /api/gerar-contrato
///
/// The body is parsed here rather than by an extractor so a missing template
/// is reported before anything about the payload.
async fn generate_contract(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    if !state.pipeline.template_exists() {
        return Err(PipelineError::TemplateMissing(state.pipeline.template_path().to_path_buf()).into());
    }

    let request: ContractRequest = serde_json::from_slice(&body)
        .map_err(|e| PipelineError::RenderFailure(format!("corpo JSON inválido: {e}")))?;

    let generated = state.pipeline.generate(&request).await?;
    Ok(Json(GenerateResponse::from(generated)))
}

/// GET /download/:filename
async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    if !is_plain_file_name(&filename) {
        return Err(ApiError::NotFound);
    }

    let path = state.pipeline.output_dir().join(&filename);
    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::NotFound);
    }

    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// GET /api/status-template
async fn template_status(State(state): State<AppState>) -> Json<TemplateStatus> {
    Json(state.locator.status())
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
        template_ok: state.locator.exists(),
    })
}

/// Only bare names inside the output directory may be downloaded.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        && !name.contains("..")
}

/// `attachment` disposition with an RFC 5987 `filename*` for non-ASCII names.
fn content_disposition(filename: &str) -> String {
    if filename.is_ascii() {
        return format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    }

    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' { c } else { '_' })
        .collect();
    let encoded = utf8_percent_encode(filename, FILENAME_ESCAPE);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("Contrato_Maria_2025-03-14_093005.docx"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name("../uploads/contrato_base.docx"));
        assert!(!is_plain_file_name("sub/file.docx"));
        assert!(!is_plain_file_name("..\\file.docx"));
    }

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("Contrato_Ana_2025-01-01_000000.pdf"),
            "attachment; filename=\"Contrato_Ana_2025-01-01_000000.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        assert_eq!(
            content_disposition("Contrato_João.docx"),
            "attachment; filename=\"Contrato_Jo_o.docx\"; filename*=UTF-8''Contrato_Jo%C3%A3o.docx"
        );
    }

    #[test]
    fn test_error_status_mapping() {
        let missing = ApiError::from(PipelineError::MissingField("cliente_cpf".into())).into_response();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let template = ApiError::from(PipelineError::TemplateMissing("x".into())).into_response();
        assert_eq!(template.status(), StatusCode::BAD_REQUEST);

        let render = ApiError::from(PipelineError::RenderFailure("x".into())).into_response();
        assert_eq!(render.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(ApiError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
    }
}
