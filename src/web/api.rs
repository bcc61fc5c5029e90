//! The HTTP surface: a single cloneable state struct threaded
//! through every handler via axum's `State` extractor, errors mapped to
//! `{error: {code, message}}` via `IntoResponse`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{Engine, EngineError};
use crate::services::{
    self, compose,
    env_file::EnvFile,
    power::{self, PowerAction, PowerGuard},
    ServiceStatus,
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub root: PathBuf,
    pub power_guard: Arc<PowerGuard>,
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => ApiError::Validation(msg),
            EngineError::TruncatedByCap { .. } => ApiError::Internal(err.to_string()),
            EngineError::Io { .. } | EngineError::Cancelled => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<services::ServiceError> for ApiError {
    fn from(err: services::ServiceError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

// ============================================================================
// GET /api/services
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ServiceDto {
    pub name: String,
    pub status: &'static str,
    pub compose_version: Option<String>,
}

pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<ServiceDto>>, ApiError> {
    let names = services::list_services(&state.root)?;

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let service_dir = state.root.join(&name);
        let status = power::status(&service_dir).await.unwrap_or(ServiceStatus::Down);
        let compose_version = compose::read_manifest(&services::compose_path(&state.root, &name))
            .ok()
            .and_then(|m| compose::extract_version(&m))
            .map(|(major, minor)| format!("{major}.{minor}"));

        out.push(ServiceDto {
            name,
            status: match status {
                ServiceStatus::Up => "Up",
                ServiceStatus::Down => "Down",
            },
            compose_version,
        });
    }

    Ok(Json(out))
}

// ============================================================================
// GET /api/services/:name/status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    services::validate_name(&name)?;
    let service_dir = state.root.join(&name);
    if !service_dir.is_dir() {
        return Err(ApiError::Validation(format!("unknown service '{name}'")));
    }

    let status = power::status(&service_dir)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(StatusResponse {
        status: match status {
            ServiceStatus::Up => "Up",
            ServiceStatus::Down => "Down",
        },
    }))
}

// ============================================================================
// POST /api/services/:name/power
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PowerRequest {
    pub action: String,
}

#[derive(Debug, Serialize)]
pub struct PowerResponse {
    pub success: bool,
    pub message: String,
}

pub async fn post_power(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<PowerRequest>,
) -> Result<Json<PowerResponse>, ApiError> {
    services::validate_name(&name)?;
    let action = PowerAction::parse(&req.action)
        .ok_or_else(|| ApiError::Validation(format!("unknown power action '{}'", req.action)))?;

    let service_dir = state.root.join(&name);
    if !service_dir.is_dir() {
        return Err(ApiError::Validation(format!("unknown service '{name}'")));
    }

    let output = state
        .power_guard
        .run_action(&service_dir, &name, action)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(PowerResponse {
        success: true,
        message: output,
    }))
}

// ============================================================================
// GET /api/services/:name/config, /config-data, POST .../config/env
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub content: String,
}

pub async fn get_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ConfigResponse>, ApiError> {
    services::validate_name(&name)?;
    let path = services::compose_path(&state.root, &name);
    let content = compose::read_manifest(&path).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(ConfigResponse { content }))
}

#[derive(Debug, Serialize)]
pub struct ConfigDataResponse {
    pub env: HashMap<String, String>,
}

pub async fn get_config_data(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ConfigDataResponse>, ApiError> {
    services::validate_name(&name)?;
    let path = services::env_path(&state.root, &name);
    let env = EnvFile::load(&path).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(ConfigDataResponse {
        env: env.pairs().into_iter().collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateEnvRequest {
    pub env_data: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn post_config_env(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateEnvRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    services::validate_name(&name)?;
    let path = services::env_path(&state.root, &name);
    let mut env = EnvFile::load(&path).map_err(|e| ApiError::Internal(e.to_string()))?;
    env.set_pairs(req.env_data.into_iter().collect());
    env.persist(&path).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================================
// GET /api/services/:name/logs/files
// ============================================================================

pub async fn list_log_files(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let files = state.engine.list_log_files(&name)?;
    Ok(Json(files))
}

// ============================================================================
// GET /api/services/:name/logs/read
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReadLinesParams {
    pub file: String,
    pub start: i64,
    pub num: usize,
}

pub async fn read_lines(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<ReadLinesParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let lines = state
        .engine
        .read_lines(&name, &params.file, params.start, params.num)?;
    Ok(Json(lines))
}

// ============================================================================
// GET /api/services/:name/logs/time-range
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TimeRangeParams {
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct TimeRangeResponse {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

pub async fn get_time_range(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<TimeRangeParams>,
) -> Result<Json<TimeRangeResponse>, ApiError> {
    let range = state.engine.get_time_range(&name, &params.file)?;
    Ok(Json(TimeRangeResponse {
        start: range.start,
        end: range.end,
    }))
}

// ============================================================================
// POST /api/services/:name/logs/search
// ============================================================================

fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub file: String,
    /// Locale form (`M/D/YYYY, H:MM:SS AM|PM`) or ISO-8601 with offset;
    /// normalized to an instant by the facade.
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub lines: Vec<String>,
    pub total: usize,
}

pub async fn search_logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let from = req.from.as_deref().map(|s| state.engine.parse_time(s)).transpose()?;
    let to = req.to.as_deref().map(|s| state.engine.parse_time(s)).transpose()?;

    let result = state.engine.read_time_range(
        &name,
        &req.file,
        from,
        to,
        req.limit.min(1000),
        req.offset,
        &req.search,
    )?;

    Ok(Json(SearchResponse {
        lines: result.lines,
        total: result.total,
    }))
}

// ============================================================================
// GET /health
// ============================================================================

pub async fn health_check() -> &'static str {
    "ok"
}
