//! 开票任务编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **提交**：同步检查请求结构，登记任务后立即返回，不等待浏览器
//! 2. **并发控制**：使用 Semaphore 限制同时驱动浏览器的任务数量
//! 3. **生命周期**：PENDING → PROCESSING → COMPLETED / FAILED，只前进不回退
//! 4. **隔离**：执行过程中的 panic 只让该任务失败
//! 5. **查询**：返回任务的一致快照
//!
//! 每个任务的 JoinHandle 都保留在编排器中，`join` / `shutdown` 可以等待它们结束

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{ErrorCategory, OrchestratorError};
use crate::models::{
    CreditNoteRequest, EmissionFailure, EmissionOutcome, EmissionPayload, EmissionRequest, EmissionTask, TaskId,
    TaskStatus,
};
use crate::orchestrator::executor::EmissionExecutor;
use crate::orchestrator::registry::TaskRegistry;
use crate::services::ValidationReport;
use crate::workflow::FlowCtx;

/// 提交回执
#[derive(Debug, Clone, Serialize)]
pub struct TaskReceipt {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// 任务统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// 开票任务编排器
pub struct TaskOrchestrator {
    registry: Arc<TaskRegistry>,
    executor: Arc<EmissionExecutor>,
    semaphore: Arc<Semaphore>,
    handles: DashMap<TaskId, JoinHandle<()>>,
}

impl TaskOrchestrator {
    pub fn new(executor: EmissionExecutor, max_concurrent: usize) -> Self {
        Self {
            registry: Arc::new(TaskRegistry::new()),
            executor: Arc::new(executor),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            handles: DashMap::new(),
        }
    }

    pub async fn submit_emission(&self, request: EmissionRequest) -> Result<TaskReceipt, OrchestratorError> {
        self.submit(EmissionPayload::Document(request))
    }

    pub async fn submit_credit_note(&self, request: CreditNoteRequest) -> Result<TaskReceipt, OrchestratorError> {
        self.submit(EmissionPayload::CreditNote(request))
    }

    /// 登记任务并在后台执行，立即返回
    pub fn submit(&self, payload: EmissionPayload) -> Result<TaskReceipt, OrchestratorError> {
        payload.check_shape()?;

        let task = EmissionTask::new(payload.clone());
        let receipt = TaskReceipt {
            task_id: task.id,
            status: task.status,
            created_at: task.created_at,
        };
        let ctx = FlowCtx::new(task.id, task.kind);
        self.registry.insert(task);
        info!("{} 📥 任务已登记", ctx);

        self.handles.retain(|_, handle| !handle.is_finished());

        let handle = tokio::spawn(run_task(
            self.registry.clone(),
            self.executor.clone(),
            self.semaphore.clone(),
            payload,
            ctx,
        ));
        self.handles.insert(receipt.task_id, handle);

        Ok(receipt)
    }

    /// 查询任务；ID 无法解析时同样视为不存在
    pub fn get_status(&self, task_id: &str) -> Result<EmissionTask, OrchestratorError> {
        let id: TaskId = task_id
            .parse()
            .map_err(|_| OrchestratorError::NotFound(task_id.to_string()))?;
        self.status(&id)
    }

    pub fn status(&self, id: &TaskId) -> Result<EmissionTask, OrchestratorError> {
        self.registry
            .snapshot(id)
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    /// 预检，不创建任务
    pub fn validate(&self, request: &EmissionRequest) -> ValidationReport {
        self.executor.validator().validate(request)
    }

    pub fn validate_credit_note(&self, request: &CreditNoteRequest) -> ValidationReport {
        self.executor.validator().validate_credit_note(request)
    }

    /// 正在驱动浏览器的任务数量
    pub fn active_tasks(&self) -> usize {
        self.registry.count_with_status(TaskStatus::Processing)
    }

    /// 当前空闲的浏览器名额
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn counts(&self) -> TaskCounts {
        TaskCounts {
            pending: self.registry.count_with_status(TaskStatus::Pending),
            processing: self.registry.count_with_status(TaskStatus::Processing),
            completed: self.registry.count_with_status(TaskStatus::Completed),
            failed: self.registry.count_with_status(TaskStatus::Failed),
        }
    }

    /// 等待某个任务结束
    pub async fn join(&self, id: &TaskId) {
        let Some((_, handle)) = self.handles.remove(id) else {
            return;
        };
        if let Err(e) = handle.await {
            error!("[任务 {}] 执行任务异常结束: {}", id, e);
        }
    }

    /// 等待所有在途任务结束
    pub async fn shutdown(&self) {
        loop {
            let pending: Vec<TaskId> = self.handles.iter().map(|entry| *entry.key()).collect();
            if pending.is_empty() {
                break;
            }
            info!("⏳ 等待 {} 个在途任务结束...", pending.len());
            for id in pending {
                self.join(&id).await;
            }
        }
    }
}

async fn run_task(
    registry: Arc<TaskRegistry>,
    executor: Arc<EmissionExecutor>,
    semaphore: Arc<Semaphore>,
    payload: EmissionPayload,
    ctx: FlowCtx,
) {
    let id = ctx.task_id;
    let permit = semaphore.acquire_owned().await;

    if let Err(e) = registry.update(&id, |task| task.mark_processing(Utc::now())) {
        error!("{} 无法开始任务: {}", ctx, e);
        return;
    }
    info!("{} ▶️ 开始处理", ctx);

    // 名额一直持有到结果写入之后
    let outcome = match &permit {
        Ok(_) => AssertUnwindSafe(executor.run(&payload, &ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                error!("{} 💥 执行过程中出现 panic: {}", ctx, message);
                EmissionOutcome::Failure(EmissionFailure::new(ErrorCategory::Internal, message))
            }),
        Err(_) => {
            warn!("{} 编排器已关闭", ctx);
            EmissionOutcome::Failure(EmissionFailure::new(ErrorCategory::Internal, "编排器已关闭"))
        }
    };

    let succeeded = outcome.is_success();
    if let Err(e) = registry.update(&id, |task| task.finish(outcome, Utc::now())) {
        error!("{} 无法记录结果: {}", ctx, e);
        return;
    }

    let duration = registry
        .snapshot(&id)
        .and_then(|task| task.duration_seconds())
        .unwrap_or_default();
    if succeeded {
        info!("{} ✅ 任务完成 ({:.1}s)", ctx, duration);
    } else {
        info!("{} ❌ 任务失败 ({:.1}s)", ctx, duration);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知 panic".to_string()
    }
}
