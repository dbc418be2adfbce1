//! 开票任务及其结果

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{ErrorCategory, OrchestratorError};
use crate::models::document::DocumentKind;
use crate::models::request::EmissionPayload;

/// 任务 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 从门户取回的单据文件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentArtifact {
    pub filename: String,
    /// 文件内容，序列化为 base64
    #[serde(serialize_with = "serialize_base64")]
    pub content: Vec<u8>,
    pub size: usize,
    pub mime_type: String,
    /// 门户分配的单号
    pub document_number: String,
}

impl DocumentArtifact {
    pub fn pdf(filename: String, content: Vec<u8>, document_number: String) -> Self {
        Self {
            filename,
            size: content.len(),
            content,
            mime_type: "application/pdf".to_string(),
            document_number,
        }
    }
}

fn serialize_base64<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(content))
}

/// 业务结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusinessOutcome {
    /// 小票 / 发票
    Sale {
        series: String,
        number: String,
        total: f64,
    },
    CreditNote {
        referenced_document: String,
        emission_date: String,
        motive_code: String,
        motive: String,
    },
}

/// 成功结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionSuccess {
    pub message: String,
    pub kind: DocumentKind,
    /// 门户分配的单号（读取失败时为空）
    pub document_number: Option<String>,
    pub details: BusinessOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<DocumentArtifact>,
    pub warnings: Vec<String>,
}

/// 失败结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionFailure {
    pub category: ErrorCategory,
    pub message: String,
}

impl EmissionFailure {
    /// 消息为空时用分类描述代替
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            category.describe().to_string()
        } else {
            message
        };
        Self { category, message }
    }
}

/// 执行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EmissionOutcome {
    Success(EmissionSuccess),
    Failure(EmissionFailure),
}

impl EmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EmissionOutcome::Success(_))
    }

    fn terminal_status(&self) -> TaskStatus {
        match self {
            EmissionOutcome::Success(_) => TaskStatus::Completed,
            EmissionOutcome::Failure(_) => TaskStatus::Failed,
        }
    }
}

/// 开票任务
///
/// 只由绑定该 ID 的执行任务修改；状态只前进不回退
#[derive(Debug, Clone)]
pub struct EmissionTask {
    pub id: TaskId,
    pub kind: DocumentKind,
    pub status: TaskStatus,
    pub request: EmissionPayload,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<EmissionOutcome>,
}

impl EmissionTask {
    pub fn new(request: EmissionPayload) -> Self {
        Self {
            id: TaskId::new(),
            kind: request.kind(),
            status: TaskStatus::Pending,
            request,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
        }
    }

    /// PENDING → PROCESSING
    pub fn mark_processing(&mut self, now: DateTime<Utc>) -> Result<(), OrchestratorError> {
        if self.status != TaskStatus::Pending {
            return Err(self.invalid_transition(TaskStatus::Processing));
        }
        self.status = TaskStatus::Processing;
        self.started_at = Some(now.max(self.created_at));
        Ok(())
    }

    /// PROCESSING → COMPLETED / FAILED
    pub fn finish(&mut self, outcome: EmissionOutcome, now: DateTime<Utc>) -> Result<(), OrchestratorError> {
        let target = outcome.terminal_status();
        let Some(started_at) = self.started_at.filter(|_| self.status == TaskStatus::Processing) else {
            return Err(self.invalid_transition(target));
        };
        self.status = target;
        self.completed_at = Some(now.max(started_at));
        self.result = Some(outcome);
        Ok(())
    }

    /// 由开始与完成时间推导，不单独保存
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    fn invalid_transition(&self, to: TaskStatus) -> OrchestratorError {
        OrchestratorError::InvalidTransition {
            task_id: self.id,
            from: self.status,
            to,
        }
    }
}
