//! # Emission Submit
//!
//! 通过浏览器自动化在税务门户上开具小票（BOLETA）、发票（FACTURA）与贷记单（NOTA_CREDITO）的异步任务服务
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有浏览器会话，只暴露自动化能力
//! - `AutomationSurface` - 导航、等待、点击、输入、切换 iframe、读取文本、下载
//! - `ChromiumSurface` - 基于 chromiumoxide 的实现，通过 `JsExecutor` 执行脚本
//! - `ScriptedSurface` - 按脚本应答的实现
//!
//! ### ② 业务能力层（Services）
//! - `PortalLogin` - 登录门户
//! - `FormDriver` - 带超时的表单操作
//! - `ArtifactService` - 读取单号并取回 PDF
//! - `Validator` - 不打开浏览器的预检
//!
//! ### ③ 流程层（Workflow）
//! - `DocumentFlow` - 小票 / 发票的录入顺序
//! - `CreditNoteFlow` - 贷记单的录入顺序
//!
//! ### ④ 编排层（Orchestration）
//! - `TaskOrchestrator` - 登记任务、限制并发、隔离 panic
//! - `EmissionExecutor` - 单个任务从打开会话到关闭会话
//!
//! HTTP 接口（`api/`）与应用生命周期（`app`）位于最外层

pub mod api;
pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{EmissionError, ErrorCategory, OrchestratorError, RequestError};
pub use models::{CreditNoteRequest, DocumentKind, EmissionOutcome, EmissionRequest, EmissionTask, TaskId, TaskStatus};
pub use orchestrator::{TaskOrchestrator, TaskReceipt};
