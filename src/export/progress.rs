//! Progress and cancellation plumbing
//!
//! One writer (the worker) and one reader (the UI): progress flows over a
//! plain mpsc channel, cancellation over a shared atomic flag checked
//! cooperatively between chunks and stages.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle states of an export job
///
/// Transitions are strictly sequential; no state is skipped and none is
/// revisited except by starting a new job. `Errored` is reachable from
/// any active state, `Cancelled` only up to and including `Embedding` —
/// validation and assembly are near-atomic and always run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    /// No job active
    #[default]
    Idle,
    /// Slicing the selected region
    Trimming,
    /// Applying gain, normalization, and fades
    Enhancing,
    /// Compressing PCM to MP3
    Encoding,
    /// Preparing cover art and writing the tag block
    Embedding,
    /// Checking platform limits
    Validating,
    /// Building the distribution archive
    Assembling,
    /// Archive produced
    Complete,
    /// Job failed; error retained until the user retries
    Errored,
    /// Job stopped at the user's request
    Cancelled,
}

impl ExportState {
    /// States in which a cancellation request is still honored
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            ExportState::Trimming
                | ExportState::Enhancing
                | ExportState::Encoding
                | ExportState::Embedding
        )
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportState::Idle => "Idle",
            ExportState::Trimming => "Trimming",
            ExportState::Enhancing => "Enhancing",
            ExportState::Encoding => "Encoding",
            ExportState::Embedding => "Embedding",
            ExportState::Validating => "Validating",
            ExportState::Assembling => "Assembling",
            ExportState::Complete => "Complete",
            ExportState::Errored => "Errored",
            ExportState::Cancelled => "Cancelled",
        };
        write!(f, "{}", name)
    }
}

/// One tick of the progress stream: the current state and the overall
/// export fraction in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub state: ExportState,
    pub fraction: f32,
}

/// Overall-fraction band occupied by each active stage
///
/// Cheap stages jump to their boundary on entry and exit; the encoder
/// interpolates its own fine-grained fraction inside the Encoding band.
pub(crate) fn stage_band(state: ExportState) -> (f32, f32) {
    match state {
        ExportState::Trimming => (0.0, 0.05),
        ExportState::Enhancing => (0.05, 0.15),
        ExportState::Encoding => (0.15, 0.80),
        ExportState::Embedding => (0.80, 0.90),
        ExportState::Validating => (0.90, 0.95),
        ExportState::Assembling => (0.95, 1.0),
        _ => (0.0, 0.0),
    }
}

/// Shared cancellation handle
///
/// Cloned into the worker; any clone can request cancellation. The
/// request is cooperative: the pipeline checks between encoder chunks
/// and between stages, never preemptively.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
