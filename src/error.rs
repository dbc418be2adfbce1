//! 错误类型与失败分类

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::models::document::DocumentKind;
use crate::models::task::{TaskId, TaskStatus};

/// 浏览器自动化层错误
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// 等待条件超时
    #[error("等待 {locator} 达到 {condition} 超时 ({timeout:?})")]
    Timeout {
        locator: String,
        condition: String,
        timeout: Duration,
    },
    /// 元素不存在
    #[error("元素不存在: {0}")]
    ElementNotFound(String),
    /// 无法切换到 frame
    #[error("无法切换到 frame: {0}")]
    FrameUnavailable(String),
    /// 下载目录中找不到文件
    #[error("找不到下载文件: {0}")]
    ArtifactNotFound(String),
    /// 浏览器 / CDP 错误
    #[error("浏览器错误: {0}")]
    Browser(String),
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for SurfaceError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        SurfaceError::Browser(err.to_string())
    }
}

impl From<anyhow::Error> for SurfaceError {
    fn from(err: anyhow::Error) -> Self {
        SurfaceError::Browser(format!("{:#}", err))
    }
}

/// 流程步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    SearchMenu,
    ClientSection,
    DateEntry,
    /// 第几个商品（从 1 开始）
    ItemEntry(usize),
    Commit,
    ReasonSelection,
    ReferenceEntry,
    SustainingText,
}

impl std::fmt::Display for FlowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowStep::SearchMenu => write!(f, "菜单搜索"),
            FlowStep::ClientSection => write!(f, "客户信息"),
            FlowStep::DateEntry => write!(f, "开具日期"),
            FlowStep::ItemEntry(position) => write!(f, "第 {} 个商品", position),
            FlowStep::Commit => write!(f, "提交确认"),
            FlowStep::ReasonSelection => write!(f, "原因选择"),
            FlowStep::ReferenceEntry => write!(f, "关联单号"),
            FlowStep::SustainingText => write!(f, "说明文字"),
        }
    }
}

/// 开票执行错误
///
/// 在执行器边界转换为失败结果，不会继续向上抛出
#[derive(Debug, Error)]
pub enum EmissionError {
    /// 预检失败
    #[error("预检未通过: {}", .0.join("; "))]
    Validation(Vec<String>),
    /// 无法打开浏览器会话
    #[error("无法打开浏览器会话: {0}")]
    Session(#[source] SurfaceError),
    /// 登录失败
    #[error("登录失败: {0}")]
    Authentication(#[source] SurfaceError),
    /// 某个步骤失败
    #[error("{step}步骤失败: {source}")]
    Step {
        step: FlowStep,
        #[source]
        source: SurfaceError,
    },
    /// 门户合计与申报合计不一致
    #[error("合计不一致: 门户 {actual} vs 申报 {expected}")]
    TotalMismatch { expected: f64, actual: f64 },
    /// 门户合计无法读取或解析
    #[error("无法读取门户合计: {0}")]
    TotalUnreadable(String),
    /// 不支持的单据类型
    #[error("不支持的单据类型: {0}")]
    UnsupportedKind(DocumentKind),
    /// 取回文件失败（只作为警告）
    #[error("取回 PDF 失败: {0}")]
    ArtifactRetrieval(#[source] SurfaceError),
}

impl EmissionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EmissionError::Validation(_) => ErrorCategory::Validation,
            EmissionError::Session(_) => ErrorCategory::SessionFailure,
            EmissionError::Authentication(_) => ErrorCategory::AuthenticationFailure,
            EmissionError::Step { step, .. } => match step {
                FlowStep::SearchMenu => ErrorCategory::SearchMenuFailure,
                FlowStep::ClientSection => ErrorCategory::ClientSectionFailure,
                FlowStep::DateEntry => ErrorCategory::DateEntryFailure,
                FlowStep::ItemEntry(_) => ErrorCategory::ItemEntryFailure,
                FlowStep::Commit => ErrorCategory::CommitFailure,
                FlowStep::ReasonSelection => ErrorCategory::ReasonSelectionFailure,
                FlowStep::ReferenceEntry => ErrorCategory::ReferenceEntryFailure,
                FlowStep::SustainingText => ErrorCategory::SustainingTextFailure,
            },
            EmissionError::TotalMismatch { .. } | EmissionError::TotalUnreadable(_) => ErrorCategory::TotalMismatch,
            EmissionError::UnsupportedKind(_) => ErrorCategory::UnsupportedDocumentKind,
            EmissionError::ArtifactRetrieval(_) => ErrorCategory::ArtifactRetrievalFailure,
        }
    }
}

/// 为自动化调用标注所属步骤
pub trait StepContext<T> {
    fn during(self, step: FlowStep) -> Result<T, EmissionError>;
}

impl<T> StepContext<T> for Result<T, SurfaceError> {
    fn during(self, step: FlowStep) -> Result<T, EmissionError> {
        self.map_err(|source| EmissionError::Step { step, source })
    }
}

/// 失败分类（对外输出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    SessionFailure,
    AuthenticationFailure,
    SearchMenuFailure,
    ClientSectionFailure,
    DateEntryFailure,
    ItemEntryFailure,
    TotalMismatch,
    CommitFailure,
    ReasonSelectionFailure,
    ReferenceEntryFailure,
    SustainingTextFailure,
    ArtifactRetrievalFailure,
    UnsupportedDocumentKind,
    /// 执行过程中出现 panic
    Internal,
}

impl ErrorCategory {
    pub fn describe(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "预检未通过",
            ErrorCategory::SessionFailure => "无法打开浏览器会话",
            ErrorCategory::AuthenticationFailure => "登录失败",
            ErrorCategory::SearchMenuFailure => "菜单导航失败",
            ErrorCategory::ClientSectionFailure => "客户信息填写失败",
            ErrorCategory::DateEntryFailure => "日期填写失败",
            ErrorCategory::ItemEntryFailure => "商品录入失败",
            ErrorCategory::TotalMismatch => "合计不一致",
            ErrorCategory::CommitFailure => "提交确认失败",
            ErrorCategory::ReasonSelectionFailure => "原因选择失败",
            ErrorCategory::ReferenceEntryFailure => "关联单号填写失败",
            ErrorCategory::SustainingTextFailure => "说明文字填写失败",
            ErrorCategory::ArtifactRetrievalFailure => "取回 PDF 失败",
            ErrorCategory::UnsupportedDocumentKind => "不支持的单据类型",
            ErrorCategory::Internal => "内部错误",
        }
    }
}

/// 提交时的请求结构错误（同步返回给调用方）
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Tipo de documento no soportado: {0}")]
    UnsupportedKind(DocumentKind),
    #[error("Se requiere al menos un producto")]
    NoLineItems,
    #[error("Producto {position}: {reason}")]
    InvalidLineItem { position: usize, reason: String },
    #[error("Los montos del resumen no pueden ser negativos")]
    NegativeSummary,
    #[error("La fecha debe estar en formato dd/mm/yyyy: {0}")]
    InvalidDate(String),
    #[error("Tipo de nota no válido: {0}")]
    UnknownMotive(String),
    #[error("Se requiere el número de boleta")]
    MissingReference,
}

impl RequestError {
    pub fn invalid_item(position: usize, reason: impl Into<String>) -> Self {
        RequestError::InvalidLineItem {
            position,
            reason: reason.into(),
        }
    }
}

/// 编排层错误
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Tarea no encontrada: {0}")]
    NotFound(String),
    #[error(transparent)]
    Rejected(#[from] RequestError),
    /// 状态只前进不回退
    #[error("任务 {task_id} 无法从 {from} 转换到 {to}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
}
