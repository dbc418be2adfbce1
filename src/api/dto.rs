//! HTTP 响应结构

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{EmissionOutcome, EmissionTask, TaskId, TaskStatus};
use crate::orchestrator::TaskReceipt;

pub const SERVICE_NAME: &str = "Servicio de Emisión SUNAT";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `GET /`
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
    pub docs: &'static str,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            message: SERVICE_NAME,
            version: VERSION,
            docs: "/api/v1",
        }
    }
}

/// 提交后返回 202
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl TaskResponse {
    pub fn accepted(receipt: TaskReceipt, message: &str) -> Self {
        Self {
            task_id: receipt.task_id,
            status: receipt.status,
            message: message.to_string(),
            created_at: receipt.created_at,
        }
    }
}

/// 任务状态查询
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub result: Option<EmissionOutcome>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
}

impl From<EmissionTask> for StatusResponse {
    fn from(task: EmissionTask) -> Self {
        Self {
            duration_seconds: task.duration_seconds(),
            task_id: task.id,
            status: task.status,
            result: task.result,
            started_at: task.started_at,
            completed_at: task.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// 是否还有空闲的浏览器名额
    pub browser_ready: bool,
    pub active_tasks: usize,
    pub uptime_seconds: f64,
}
