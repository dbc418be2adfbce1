pub mod document;
pub mod motive;
pub mod request;
pub mod task;

pub use document::{artifact_filename, DocumentKind};
pub use request::{
    ClientIdentity, ClientPath, CreditNoteRequest, Credentials, EmissionPayload, EmissionRequest, LineItem,
    Summary,
};
pub use task::{
    BusinessOutcome, DocumentArtifact, EmissionFailure, EmissionOutcome, EmissionSuccess, EmissionTask, TaskId,
    TaskStatus,
};
