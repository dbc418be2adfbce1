//! 业务能力层
//!
//! 描述"能对门户做什么"：登录、填表、取回文件、预检。
//! 不关心流程顺序，不出现任务 ID

pub mod artifact_service;
pub mod form_driver;
pub mod portal_login;
pub mod selectors;
pub mod validator;

pub use artifact_service::ArtifactService;
pub use form_driver::FormDriver;
pub use portal_login::PortalLogin;
pub use validator::{ValidationReport, Validator, DEFAULT_TOLERANCE};
