//! 开票流程上下文
//!
//! 封装"我正在处理哪个任务、哪种单据"这一信息

use std::fmt::Display;

use crate::models::{DocumentKind, TaskId};

/// 开票流程上下文
///
/// 只用于日志前缀，不参与业务判断
#[derive(Debug, Clone)]
pub struct FlowCtx {
    /// 任务 ID
    pub task_id: TaskId,

    /// 单据类型
    pub kind: DocumentKind,
}

impl FlowCtx {
    pub fn new(task_id: TaskId, kind: DocumentKind) -> Self {
        Self { task_id, kind }
    }
}

impl Display for FlowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[任务 {} {}]", self.task_id, self.kind)
    }
}
