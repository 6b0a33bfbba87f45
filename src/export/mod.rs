//! Export job orchestration
//!
//! The orchestrator sequences trim, enhancement, encode, embed,
//! validation, and assembly, reporting progress over a single-writer
//! single-reader channel and honoring cooperative cancellation.

pub mod orchestrator;
pub mod progress;

pub use orchestrator::{ExportHandle, ExportOrchestrator, ExportRequest};
pub use progress::{CancelFlag, ExportState, ProgressUpdate};
