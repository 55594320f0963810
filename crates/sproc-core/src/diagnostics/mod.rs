//! Error-reporting collaborator.
//!
//! The gateway never formats user-facing messages. Every failure it
//! catches is handed to an [`ErrorSink`] together with the operation name,
//! the calling user, and structured context.

mod seen;
mod sink;

pub use seen::SeenErrorSet;
pub use sink::{ErrorCategory, ErrorReport, ErrorSink, MemoryErrorSink, RecordedError, TracingErrorSink};
