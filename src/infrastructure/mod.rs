//! 基础设施层
//!
//! 持有浏览器会话这一稀缺资源，只向上暴露自动化能力

pub mod chromium;
pub mod js_executor;
pub mod scripted;
pub mod session;
pub mod surface;

pub use chromium::{ChromiumLauncher, ChromiumSurface};
pub use js_executor::JsExecutor;
pub use scripted::{Action, Script, ScriptedFactory, ScriptedSurface};
pub use session::SessionGuard;
pub use surface::{AutomationSurface, Condition, Key, Locator, SessionOptions, SurfaceFactory};
