//! Subcommand handlers
//!
//! Decoding of the WAV recording and the cover bitmap happens here, at
//! the edge; the pipeline itself only ever sees decoded data.

use std::fs;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use log::{error, info, warn};

use crate::audio::buffer::{AudioBuffer, ChannelLayout};
use crate::audio::{EnhancementSettings, TrimRange, BITRATE_KBPS};
use crate::cli::{EpisodeArgs, ExportArgs, ValidateArgs};
use crate::error::{ExportError, Result};
use crate::export::{ExportOrchestrator, ExportRequest, ExportState};
use crate::metadata::SermonMetadata;
use crate::validation::{validate as run_validation, ValidationInput};

/// Run a full export and write the archive to disk
pub fn export(args: ExportArgs) -> Result<()> {
    let source = import_wav(&args.input)?;
    info!(
        "loaded {}: {:.1} s, {} Hz, {} channel(s)",
        args.input.display(),
        source.duration_secs(),
        source.sample_rate,
        source.num_channels()
    );

    let artwork = image::open(&args.cover).map_err(|e| ExportError::Artwork {
        reason: format!("cannot open cover {}: {}", args.cover.display(), e),
    })?;

    let metadata = resolve_metadata(&args.episode)?;
    let end = args.end.unwrap_or_else(|| source.duration_secs());
    let request = ExportRequest {
        trim: TrimRange::new(args.start, end)?,
        enhancement: EnhancementSettings {
            gain_db: args.gain_db,
            normalize: args.normalize,
            fade_in_secs: args.fade_in,
            fade_out_secs: args.fade_out,
        },
        metadata,
        artwork,
        source,
    };

    let orchestrator = ExportOrchestrator::new();
    let handle = orchestrator.start(request)?;

    // Print state changes and coarse percentage steps, not every tick.
    let mut last_state = ExportState::Idle;
    let mut last_percent = -1i32;
    for update in handle.progress().iter() {
        let percent = (update.fraction * 100.0) as i32;
        if update.state != last_state || percent >= last_percent + 10 {
            info!("[{:>3}%] {}", percent, update.state);
            last_state = update.state;
            last_percent = percent;
        }
    }

    match handle.join() {
        Ok(archive) => {
            fs::write(&args.output, &archive)?;
            info!(
                "wrote {} ({} bytes)",
                args.output.display(),
                archive.len()
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e.user_message());
            Err(e)
        }
    }
}

/// Check the prospective episode against the platform limits
///
/// The audio size is an estimate from the fixed bitrate; everything else
/// is exact. Useful as pre-flight feedback before a long export.
pub fn validate(args: ValidateArgs) -> Result<()> {
    let duration_secs = match &args.input {
        Some(path) => wav_duration_secs(path)?,
        None => 0.0,
    };

    let cover_bytes = match &args.cover {
        Some(path) => fs::metadata(path)?.len(),
        None => 0,
    };

    let estimated_audio_bytes = (duration_secs * (BITRATE_KBPS as f64) * 1000.0 / 8.0) as u64;
    let metadata = resolve_metadata(&args.episode)?;

    let report = run_validation(&ValidationInput {
        audio_bytes: estimated_audio_bytes,
        duration_secs,
        cover_bytes,
        metadata: &metadata,
    });

    for message in &report.errors {
        error!("✗ {}", message);
    }
    for message in &report.warnings {
        warn!("⚠ {}", message);
    }
    if report.is_valid() {
        info!("✓ El episodio cumple los requisitos de la plataforma");
    } else {
        info!(
            "El episodio tiene {} error(es) que bloquean la exportación",
            report.errors.len()
        );
    }

    Ok(())
}

/// Build the episode metadata from a JSON file or individual flags
fn resolve_metadata(args: &EpisodeArgs) -> Result<SermonMetadata> {
    if let Some(path) = &args.metadata {
        let contents = fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&contents)?);
    }

    Ok(SermonMetadata {
        title: args.title.clone(),
        speaker: args.speaker.clone(),
        date: args
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
        series: args.series.clone(),
        description: args.description.clone(),
    })
}

/// Import a WAV recording, converting samples to 32-bit float
pub fn import_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).map_err(|e| ExportError::InvalidAudio {
        reason: format!("failed to open WAV file {}: {}", path.display(), e),
    })?;

    let spec = reader.spec();
    let layout =
        ChannelLayout::from_count(spec.channels as usize).ok_or(ExportError::UnsupportedFormat {
            format: format!(
                "{}-channel audio (only mono/stereo supported)",
                spec.channels
            ),
        })?;

    let samples = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if samples.is_empty() {
        return Err(ExportError::InvalidAudio {
            reason: "file contains no samples".to_string(),
        });
    }

    AudioBuffer::from_interleaved(&samples, layout, spec.sample_rate)
}

/// Read the duration of a WAV file from its header, without decoding
fn wav_duration_secs(path: &Path) -> Result<f64> {
    let reader = WavReader::open(path).map_err(|e| ExportError::InvalidAudio {
        reason: format!("failed to open WAV file {}: {}", path.display(), e),
    })?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Read samples from a WAV reader and convert to f32 in [-1, 1]
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let map_err = |e: hound::Error| ExportError::InvalidAudio {
        reason: format!("failed to read samples: {}", e),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map_err(map_err))
            .collect(),
        SampleFormat::Int => {
            let max_value = (1i64 << (bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value).map_err(map_err))
                .collect()
        }
    }
}
