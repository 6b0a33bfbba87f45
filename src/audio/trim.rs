//! Trim Extractor
//!
//! Slices a PCM buffer to the region the user selected in the waveform
//! editor. Bounds must already be valid for the source buffer: the
//! extractor fails instead of clamping, so a bad range surfaces as a
//! caller bug rather than a silently shortened episode.

use crate::audio::buffer::AudioBuffer;
use crate::error::{ExportError, Result};

/// User-selected export region, in seconds from the start of the recording
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrimRange {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TrimRange {
    /// Create a trim range, rejecting inverted or negative bounds
    pub fn new(start_secs: f64, end_secs: f64) -> Result<Self> {
        if start_secs < 0.0 {
            return Err(ExportError::TrimRange {
                reason: format!("start {:.3}s is negative", start_secs),
            });
        }
        if start_secs >= end_secs {
            return Err(ExportError::TrimRange {
                reason: format!(
                    "start {:.3}s is not before end {:.3}s",
                    start_secs, end_secs
                ),
            });
        }
        Ok(Self {
            start_secs,
            end_secs,
        })
    }

    /// Duration of the selected region in seconds
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Extract the samples within `[start, end)` into a new buffer
///
/// Sample rate and channel count are preserved. Fails if the range ends
/// past the source duration; the caller is expected to clamp against the
/// waveform before asking for an export.
pub fn trim(source: &AudioBuffer, range: &TrimRange) -> Result<AudioBuffer> {
    let source_duration = source.duration_secs();

    // Allow for the bound landing on the final frame boundary.
    let half_frame = 0.5 / source.sample_rate.max(1) as f64;
    if range.end_secs > source_duration + half_frame {
        return Err(ExportError::TrimRange {
            reason: format!(
                "end {:.3}s exceeds source duration {:.3}s",
                range.end_secs, source_duration
            ),
        });
    }

    let rate = source.sample_rate as f64;
    let start_frame = (range.start_secs * rate).round() as usize;
    let end_frame = ((range.end_secs * rate).round() as usize).min(source.num_frames());

    if start_frame >= end_frame {
        return Err(ExportError::TrimRange {
            reason: format!(
                "range [{:.3}s, {:.3}s) selects no frames",
                range.start_secs, range.end_secs
            ),
        });
    }

    let samples = source
        .samples
        .iter()
        .map(|channel| channel[start_frame..end_frame].to_vec())
        .collect();

    Ok(AudioBuffer {
        samples,
        sample_rate: source.sample_rate,
    })
}
