//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `task_orchestrator` - 任务编排器
//! - 同步检查请求结构并登记任务
//! - 后台执行，控制并发数量（Semaphore）
//! - 隔离单个任务的 panic
//!
//! ### `executor` - 单个任务执行器
//! - 预检 → 打开会话 → 登录 → 流程 → 取回 PDF → 关闭会话
//! - 把错误归类为结果
//!
//! ### `registry` - 任务登记表
//!
//! ## 层次关系
//!
//! ```text
//! task_orchestrator (多个任务)
//!     ↓
//! executor (单个任务)
//!     ↓
//! workflow::DocumentFlow / CreditNoteFlow
//!     ↓
//! services (能力层：login / form / artifact / validator)
//!     ↓
//! infrastructure (基础设施：AutomationSurface)
//! ```

pub mod executor;
pub mod registry;
pub mod task_orchestrator;

pub use executor::EmissionExecutor;
pub use registry::TaskRegistry;
pub use task_orchestrator::{TaskCounts, TaskOrchestrator, TaskReceipt};
