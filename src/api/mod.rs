//! HTTP 接口层
//!
//! 对外保留原有的路径与西班牙语字段名，所有业务都交给 `TaskOrchestrator`

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
