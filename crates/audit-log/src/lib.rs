//! Redaction and audit recording (C6, C8): scrubs sensitive payload content
//! before anything is persisted, then appends the resulting row to an
//! append-only sink without letting a storage failure affect an
//! already-computed response.

mod recorder;
mod redact;

pub use recorder::{AuditRecorder, AuditSink};
pub use redact::redact;

pub use gate_core;
