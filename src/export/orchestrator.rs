//! Export Orchestrator
//!
//! Sequences the pipeline stages, owns the progress and cancellation
//! contract, and enforces the at-most-one-export invariant. This is the
//! only surface the recording editor talks to: it hands over the decoded
//! audio, the raw cover bitmap, the trim and enhancement choices, and
//! the metadata form, and gets back a progress stream and eventually the
//! archive bytes.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use uuid::Uuid;

use crate::artwork;
use crate::audio::buffer::AudioBuffer;
use crate::audio::{encoder, enhance, trim, EnhancementSettings, TrimRange};
use crate::error::{ExportError, Result};
use crate::export::progress::{stage_band, CancelFlag, ExportState, ProgressUpdate};
use crate::metadata::SermonMetadata;
use crate::package::{self, DistributionPackage};
use crate::tags;
use crate::validation::{self, ValidationInput};

/// Everything the editor supplies when the user hits "Exportar"
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Full decoded recording
    pub source: AudioBuffer,
    /// Selected region, already clamped against the waveform
    pub trim: TrimRange,
    pub enhancement: EnhancementSettings,
    pub metadata: SermonMetadata,
    /// Raw cover bitmap as uploaded; normalized during the Embedding stage
    pub artwork: image::DynamicImage,
}

/// State and progress observed together, never torn
#[derive(Debug, Clone)]
struct Snapshot {
    state: ExportState,
    fraction: f32,
    error: Option<String>,
    /// A worker currently owns the pipeline
    active: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            state: ExportState::Idle,
            fraction: 0.0,
            error: None,
            active: false,
        }
    }
}

#[derive(Debug, Default)]
struct JobShared {
    snapshot: Mutex<Snapshot>,
}

fn lock(shared: &JobShared) -> MutexGuard<'_, Snapshot> {
    // A worker that panicked mid-update left nothing torn worth keeping;
    // recover the guard and let the error path overwrite it.
    shared
        .snapshot
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to an export running on a worker thread
pub struct ExportHandle {
    id: Uuid,
    cancel: CancelFlag,
    progress: Receiver<ProgressUpdate>,
    worker: JoinHandle<Result<Vec<u8>>>,
}

impl ExportHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Clone the cancellation handle, e.g. for a dialog button
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// The progress stream; closed when the job ends
    pub fn progress(&self) -> &Receiver<ProgressUpdate> {
        &self.progress
    }

    /// Wait for the job and return the archive bytes
    pub fn join(self) -> Result<Vec<u8>> {
        match self.worker.join() {
            Ok(outcome) => outcome,
            Err(_) => Err(ExportError::Internal {
                reason: "export worker panicked".to_string(),
            }),
        }
    }
}

/// Serializes exports and tracks the lifecycle of the current job
///
/// One orchestrator per open document. Cloning is cheap and every clone
/// observes the same job.
#[derive(Debug, Clone, Default)]
pub struct ExportOrchestrator {
    shared: Arc<JobShared>,
}

impl ExportOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExportState {
        lock(&self.shared).state
    }

    /// Current state and overall fraction, read atomically
    pub fn progress_snapshot(&self) -> ProgressUpdate {
        let snap = lock(&self.shared);
        ProgressUpdate {
            state: snap.state,
            fraction: snap.fraction,
        }
    }

    /// Error detail retained from a failed job, for display
    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared).error.clone()
    }

    /// Start an export on a worker thread
    ///
    /// Fails with `BusyError` while a job is in flight, and also while
    /// the orchestrator sits in `Errored`: a failed job returns to
    /// `Idle` only through an explicit [`reset`](Self::reset).
    pub fn start(&self, request: ExportRequest) -> Result<ExportHandle> {
        {
            let mut snap = lock(&self.shared);
            if snap.active || snap.state == ExportState::Errored {
                return Err(ExportError::Busy);
            }
            snap.active = true;
            snap.state = ExportState::Idle;
            snap.fraction = 0.0;
            snap.error = None;
        }

        let id = Uuid::new_v4();
        let cancel = CancelFlag::new();
        let (progress_tx, progress_rx) = mpsc::channel();

        let shared = Arc::clone(&self.shared);
        let worker_cancel = cancel.clone();

        let spawned = thread::Builder::new()
            .name(format!("export-{}", id))
            .spawn(move || {
                let outcome = run_pipeline(request, &shared, &worker_cancel, &progress_tx);
                finish(&shared, &progress_tx, &outcome);
                outcome
            });

        match spawned {
            Ok(worker) => {
                log::info!("export {} started", id);
                Ok(ExportHandle {
                    id,
                    cancel,
                    progress: progress_rx,
                    worker,
                })
            }
            Err(e) => {
                let mut snap = lock(&self.shared);
                snap.active = false;
                snap.state = ExportState::Idle;
                Err(ExportError::Io(e))
            }
        }
    }

    /// Explicit user retry: clear a finished or failed job back to `Idle`
    ///
    /// Fails with `BusyError` while a job is still running.
    pub fn reset(&self) -> Result<()> {
        let mut snap = lock(&self.shared);
        if snap.active {
            return Err(ExportError::Busy);
        }
        snap.state = ExportState::Idle;
        snap.fraction = 0.0;
        snap.error = None;
        Ok(())
    }
}

/// Update the shared snapshot and emit one progress tick
fn report(shared: &JobShared, tx: &Sender<ProgressUpdate>, state: ExportState, fraction: f32) {
    {
        let mut snap = lock(shared);
        snap.state = state;
        snap.fraction = fraction;
    }
    // The editor may have dropped its receiver; progress is best-effort.
    let _ = tx.send(ProgressUpdate { state, fraction });
}

/// Enter a stage: honor a pending cancellation first, then jump the
/// overall fraction to the stage's lower boundary
fn enter_stage(
    shared: &JobShared,
    tx: &Sender<ProgressUpdate>,
    cancel: &CancelFlag,
    state: ExportState,
) -> Result<()> {
    if state.is_cancellable() && cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }
    report(shared, tx, state, stage_band(state).0);
    Ok(())
}

/// Leave a stage: jump to its upper boundary
fn leave_stage(shared: &JobShared, tx: &Sender<ProgressUpdate>, state: ExportState) {
    report(shared, tx, state, stage_band(state).1);
}

/// Record the terminal state once the worker is done
fn finish(shared: &JobShared, tx: &Sender<ProgressUpdate>, outcome: &Result<Vec<u8>>) {
    let (state, error) = match outcome {
        Ok(_) => (ExportState::Complete, None),
        Err(e) if e.is_cancellation() => (ExportState::Cancelled, None),
        Err(e) => (ExportState::Errored, Some(e.to_string())),
    };

    let fraction = {
        let mut snap = lock(shared);
        snap.active = false;
        snap.state = state;
        snap.error = error.clone();
        if state == ExportState::Complete {
            snap.fraction = 1.0;
        }
        snap.fraction
    };
    let _ = tx.send(ProgressUpdate { state, fraction });

    match (state, &error) {
        (ExportState::Complete, _) => log::info!("export complete"),
        (ExportState::Cancelled, _) => log::info!("export cancelled"),
        (_, Some(message)) => log::warn!("export failed: {}", message),
        _ => {}
    }
}

/// Run every stage in order, producing the archive bytes
///
/// Each stage exclusively owns its input buffer and drops it as soon as
/// the next stage's output exists, so a long sermon never holds more
/// than two PCM copies at once.
fn run_pipeline(
    request: ExportRequest,
    shared: &JobShared,
    cancel: &CancelFlag,
    tx: &Sender<ProgressUpdate>,
) -> Result<Vec<u8>> {
    let ExportRequest {
        source,
        trim: range,
        enhancement,
        metadata,
        artwork: raw_artwork,
    } = request;

    enter_stage(shared, tx, cancel, ExportState::Trimming)?;
    let trimmed = trim(&source, &range)?;
    drop(source);
    leave_stage(shared, tx, ExportState::Trimming);

    enter_stage(shared, tx, cancel, ExportState::Enhancing)?;
    let enhanced = enhance(&trimmed, &enhancement);
    drop(trimmed);
    leave_stage(shared, tx, ExportState::Enhancing);

    enter_stage(shared, tx, cancel, ExportState::Encoding)?;
    let duration_secs = enhanced.duration_secs();
    let (band_start, band_end) = stage_band(ExportState::Encoding);
    let audio = encoder::encode_mp3(&enhanced, cancel, |f| {
        report(
            shared,
            tx,
            ExportState::Encoding,
            band_start + f * (band_end - band_start),
        );
    })?;
    drop(enhanced);

    enter_stage(shared, tx, cancel, ExportState::Embedding)?;
    let cover = artwork::process_cover(&raw_artwork)?;
    let tagged = tags::embed_tags(&audio, &metadata, &cover)?;
    drop(audio);
    leave_stage(shared, tx, ExportState::Embedding);

    // Validation and assembly are fast and near-atomic; cancellation is
    // no longer honored from here on.
    enter_stage(shared, tx, cancel, ExportState::Validating)?;
    let report_result = validation::validate(&ValidationInput {
        audio_bytes: tagged.len() as u64,
        duration_secs,
        cover_bytes: cover.jpeg.len() as u64,
        metadata: &metadata,
    });
    leave_stage(shared, tx, ExportState::Validating);

    enter_stage(shared, tx, cancel, ExportState::Assembling)?;
    let package = DistributionPackage {
        audio: tagged,
        cover,
        metadata,
        validation: report_result,
    };
    // The Complete tick (fraction 1.0) is emitted by finish().
    package::assemble(&package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::{generate_test_tone, ChannelLayout};
    use chrono::NaiveDate;
    use image::{Rgb, RgbImage};

    fn sample_metadata() -> SermonMetadata {
        SermonMetadata {
            title: "La Roca Firme".to_string(),
            speaker: "Pastor Gómez".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            series: None,
            description: Some(
                "Una reflexión extensa sobre la fe y la esperanza en tiempos difíciles."
                    .to_string(),
            ),
        }
    }

    fn sample_request(duration_secs: f32) -> ExportRequest {
        let source = generate_test_tone(440.0, duration_secs, 22050, ChannelLayout::Mono);
        let end = source.duration_secs();
        ExportRequest {
            source,
            trim: TrimRange::new(0.0, end).unwrap(),
            enhancement: EnhancementSettings::default(),
            metadata: sample_metadata(),
            artwork: image::DynamicImage::ImageRgb8(RgbImage::from_pixel(
                200,
                200,
                Rgb([40, 80, 120]),
            )),
        }
    }

    #[test]
    fn test_full_export_completes() {
        let orchestrator = ExportOrchestrator::new();
        let handle = orchestrator.start(sample_request(12.0)).unwrap();

        let archive = handle.join().unwrap();
        assert!(!archive.is_empty());
        assert_eq!(orchestrator.state(), ExportState::Complete);
        assert_eq!(orchestrator.progress_snapshot().fraction, 1.0);
    }

    #[test]
    fn test_progress_stream_is_ordered_and_monotonic() {
        let orchestrator = ExportOrchestrator::new();
        let handle = orchestrator.start(sample_request(12.0)).unwrap();

        // The stream closes when the worker ends, so collecting drains
        // the whole job.
        let updates: Vec<ProgressUpdate> = handle.progress().iter().collect();
        handle.join().unwrap();

        assert!(updates.len() > 6);
        for pair in updates.windows(2) {
            assert!(pair[1].fraction >= pair[0].fraction);
        }

        // Stages appear in order, none skipped, none revisited.
        let mut stages: Vec<ExportState> = Vec::new();
        for update in &updates {
            if stages.last() != Some(&update.state) {
                stages.push(update.state);
            }
        }
        assert_eq!(
            stages,
            vec![
                ExportState::Trimming,
                ExportState::Enhancing,
                ExportState::Encoding,
                ExportState::Embedding,
                ExportState::Validating,
                ExportState::Assembling,
                ExportState::Complete,
            ]
        );

        let last = updates.last().unwrap();
        assert_eq!(last.state, ExportState::Complete);
        assert_eq!(last.fraction, 1.0);
    }

    #[test]
    fn test_second_start_is_rejected_while_running() {
        let orchestrator = ExportOrchestrator::new();
        // 60 s of stereo keeps the worker busy well past the second call.
        let handle = orchestrator.start(sample_request(60.0)).unwrap();

        let second = orchestrator.start(sample_request(12.0));
        assert!(matches!(second, Err(ExportError::Busy)));

        handle.cancel();
        let outcome = handle.join();
        assert!(matches!(outcome, Err(ExportError::Cancelled)));
        assert_eq!(orchestrator.state(), ExportState::Cancelled);

        // Slot is free again after the cancelled job ends.
        let retry = orchestrator.start(sample_request(12.0)).unwrap();
        retry.join().unwrap();
    }

    #[test]
    fn test_cancel_before_first_stage() {
        let orchestrator = ExportOrchestrator::new();
        let handle = orchestrator.start(sample_request(12.0)).unwrap();
        handle.cancel();

        // Cancellation may land in any cancellable stage; either way no
        // archive is produced once the flag was raised before encoding
        // finished -- or the job may already have passed the last check.
        match handle.join() {
            Err(ExportError::Cancelled) => {
                assert_eq!(orchestrator.state(), ExportState::Cancelled)
            }
            Ok(_) => assert_eq!(orchestrator.state(), ExportState::Complete),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_errored_job_blocks_until_reset() {
        let orchestrator = ExportOrchestrator::new();
        let mut request = sample_request(12.0);
        request.metadata.title = String::new(); // blocking validation error

        let handle = orchestrator.start(request).unwrap();
        let outcome = handle.join();
        assert!(matches!(
            outcome,
            Err(ExportError::ValidationBlocked { .. })
        ));
        assert_eq!(orchestrator.state(), ExportState::Errored);
        assert!(orchestrator.last_error().is_some());

        // No auto-retry: a new start is refused until the user resets.
        assert!(matches!(
            orchestrator.start(sample_request(12.0)),
            Err(ExportError::Busy)
        ));

        orchestrator.reset().unwrap();
        assert_eq!(orchestrator.state(), ExportState::Idle);
        assert!(orchestrator.last_error().is_none());

        let retry = orchestrator.start(sample_request(12.0)).unwrap();
        retry.join().unwrap();
    }

    #[test]
    fn test_too_short_episode_fails_validation() {
        let orchestrator = ExportOrchestrator::new();
        let handle = orchestrator.start(sample_request(5.0)).unwrap();

        match handle.join() {
            Err(ExportError::ValidationBlocked { errors }) => {
                assert!(errors.iter().any(|e| e.contains("muy corto")));
            }
            _ => panic!("expected ValidationBlocked"),
        }
    }
}
