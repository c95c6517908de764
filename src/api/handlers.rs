//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::server::AppState;
use crate::core::{evaluate_rows, process_sheet, CancelToken, ProcessingReport};
use crate::error::{SheetError, SheetResult};
use crate::source::{open_source, DryRunSource};

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}

fn status_for(error: &SheetError) -> StatusCode {
    match error {
        SheetError::MissingHeader(_) | SheetError::Validation(_) | SheetError::Config(_) => {
            StatusCode::BAD_REQUEST
        }
        SheetError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(path: &str, method: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "SheetMacro API Server".to_string(),
        version: state.version.clone(),
        description: "Evaluates `?` cells by calling header-named functions".to_string(),
        endpoints: vec![
            endpoint("/health", "GET", "Health check endpoint"),
            endpoint("/version", "GET", "Get server version"),
            endpoint("/api/v1/functions", "GET", "List registered functions"),
            endpoint("/api/v1/evaluate", "POST", "Evaluate posted rows"),
            endpoint("/api/v1/calculate", "POST", "Evaluate a server-side sheet file"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec![
            "functions".to_string(),
            "evaluate".to_string(),
            "calculate".to_string(),
        ],
    }))
}

/// One registered function
#[derive(Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub signature: String,
    pub parameters: Vec<crate::types::Parameter>,
}

/// GET /api/v1/functions - Registered functions
pub async fn functions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let list: Vec<FunctionInfo> = state
        .registry
        .functions()
        .map(|f| FunctionInfo {
            name: f.canonical_name.clone(),
            signature: f.signature(),
            parameters: f.parameters.clone(),
        })
        .collect();
    Json(ApiResponse::ok(list))
}

/// Evaluate request: row 0 is the header
#[derive(Deserialize)]
pub struct EvaluateRequest {
    pub sheet_id: String,
    pub rows: Vec<Vec<String>>,
}

/// Evaluate response
#[derive(Serialize)]
pub struct EvaluateResponse {
    pub sheet_id: String,
    pub rows: Vec<Vec<String>>,
    pub report: ProcessingReport,
}

/// POST /api/v1/evaluate - Evaluate posted rows
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Response {
    let _guard = state.locks.acquire(&req.sheet_id).await;
    info!(sheet = %req.sheet_id, rows = req.rows.len(), "evaluate request");

    let worker_state = Arc::clone(&state);
    let rows = req.rows;
    let result = tokio::task::spawn_blocking(move || {
        evaluate_rows(
            rows,
            &worker_state.registry,
            &worker_state.engine,
            &CancelToken::new(),
        )
    })
    .await;

    match result {
        Ok(Ok((rows, report))) => Json(ApiResponse::ok(EvaluateResponse {
            sheet_id: req.sheet_id,
            rows,
            report,
        }))
        .into_response(),
        Ok(Err(e)) => {
            warn!(sheet = %req.sheet_id, error = %e, "evaluate failed");
            error_response(status_for(&e), e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Calculate request
#[derive(Deserialize)]
pub struct CalculateRequest {
    pub file_path: String,
    #[serde(default)]
    pub dry_run: bool,
}

/// Calculate response
#[derive(Serialize)]
pub struct CalculateResponse {
    pub file_path: String,
    pub dry_run: bool,
    pub report: ProcessingReport,
}

fn calculate_file(state: &AppState, path: PathBuf, dry_run: bool) -> SheetResult<ProcessingReport> {
    let source = open_source(&path, None, state.engine.retry)?;
    let cancel = CancelToken::new();
    if dry_run {
        let mut dry = DryRunSource::new(source);
        process_sheet(&mut dry, &state.registry, &state.engine, &cancel)
    } else {
        let mut source = source;
        process_sheet(&mut source, &state.registry, &state.engine, &cancel)
    }
}

/// POST /api/v1/calculate - Evaluate a sheet file on the server
pub async fn calculate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CalculateRequest>,
) -> Response {
    let path = PathBuf::from(&req.file_path);
    let sheet_id = path
        .canonicalize()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| req.file_path.clone());
    let _guard = state.locks.acquire(&sheet_id).await;

    let worker_state = Arc::clone(&state);
    let dry_run = req.dry_run;
    let result =
        tokio::task::spawn_blocking(move || calculate_file(&worker_state, path, dry_run)).await;

    match result {
        Ok(Ok(report)) => Json(ApiResponse::ok(CalculateResponse {
            file_path: req.file_path,
            dry_run,
            report,
        }))
        .into_response(),
        Ok(Err(e)) => {
            warn!(file = %req.file_path, error = %e, "calculate failed");
            error_response(status_for(&e), e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
