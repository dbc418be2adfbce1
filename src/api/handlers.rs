//! HTTP 处理函数
//!
//! 只做请求与编排器之间的映射：
//! - GET  /                         - 服务信息
//! - GET  /api/v1/health            - 健康检查
//! - POST /api/v1/emitir            - 提交小票 / 发票
//! - GET  /api/v1/status/{task_id}  - 查询任务
//! - POST /api/v1/validate          - 预检（不创建任务）
//! - POST /api/v1/nota-credito      - 提交贷记单

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use crate::api::dto::{HealthResponse, ServiceInfo, StatusResponse, TaskResponse, VERSION};
use crate::error::OrchestratorError;
use crate::models::{CreditNoteRequest, EmissionRequest};
use crate::orchestrator::TaskOrchestrator;

/// 路由共享状态
pub struct ApiState {
    pub orchestrator: Arc<TaskOrchestrator>,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(orchestrator: Arc<TaskOrchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Instant::now(),
        }
    }
}

pub async fn root() -> impl IntoResponse {
    Json(json!(ServiceInfo::default()))
}

pub async fn health(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    Json(json!(HealthResponse {
        status: "healthy",
        version: VERSION,
        browser_ready: orchestrator.available_slots() > 0,
        active_tasks: orchestrator.active_tasks(),
        uptime_seconds: state.started_at.elapsed().as_secs_f64(),
    }))
}

/// POST /api/v1/emitir
pub async fn submit_emission(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<EmissionRequest>,
) -> impl IntoResponse {
    let kind = request.kind;
    match state.orchestrator.submit_emission(request).await {
        Ok(receipt) => {
            info!("Tarea {} creada para {}", receipt.task_id, kind);
            accepted(TaskResponse::accepted(
                receipt,
                "Comprobante en cola para procesamiento",
            ))
        }
        Err(e) => rejected(e),
    }
}

/// POST /api/v1/nota-credito
pub async fn submit_credit_note(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CreditNoteRequest>,
) -> impl IntoResponse {
    let referenced = request.referenced_document.clone();
    match state.orchestrator.submit_credit_note(request).await {
        Ok(receipt) => {
            info!(
                "Tarea {} creada para NOTA_CREDITO - Boleta: {}",
                receipt.task_id, referenced
            );
            accepted(TaskResponse::accepted(
                receipt,
                "Nota de crédito en cola para procesamiento",
            ))
        }
        Err(e) => rejected(e),
    }
}

/// GET /api/v1/status/{task_id}
pub async fn task_status(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.get_status(&task_id) {
        Ok(task) => (StatusCode::OK, Json(json!(StatusResponse::from(task)))),
        Err(e) => rejected(e),
    }
}

/// POST /api/v1/validate
pub async fn validate(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<EmissionRequest>,
) -> impl IntoResponse {
    Json(json!(state.orchestrator.validate(&request)))
}

fn accepted(response: TaskResponse) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::ACCEPTED, Json(json!(response)))
}

fn rejected(error: OrchestratorError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &error {
        OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::Rejected(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::InvalidTransition { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("请求被拒绝 ({}): {}", status, error);
    (status, Json(json!({ "error": error.to_string() })))
}
