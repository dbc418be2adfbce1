//! 流程层
//!
//! 定义"一张单据"在门户上的完整录入顺序，只借用会话，不持有资源

pub mod credit_note_flow;
pub mod document_flow;
pub mod flow_ctx;

pub use credit_note_flow::{extract_reference_number, CreditNoteFlow, CreditNoteReport, ReferenceNumber};
pub use document_flow::{parse_portal_total, DocumentFlow};
pub use flow_ctx::FlowCtx;
