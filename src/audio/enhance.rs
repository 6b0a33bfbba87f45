//! Enhancement Processor
//!
//! Applies gain, peak normalization, and fade curves to a trimmed buffer.
//! Order of application is fixed: gain first so the normalization peak
//! scan sees the gained signal, fades last so they are not scaled back up
//! by normalization.

use crate::audio::buffer::{db_to_linear, AudioBuffer};
use serde::{Deserialize, Serialize};

/// Minimum gain in dB (effectively silent)
const MIN_GAIN_DB: f32 = -96.0;

/// Maximum gain in dB
const MAX_GAIN_DB: f32 = 24.0;

/// Normalization target ceiling, just under full scale
pub const NORMALIZE_TARGET_DB: f32 = -0.1;

/// Enhancement parameters chosen in the export dialog
///
/// The default value is an identity transform: applying it returns a
/// bit-for-bit copy of the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementSettings {
    /// Gain in decibels, clamped to [-96, +24]
    pub gain_db: f32,
    /// Scale the whole buffer so its peak hits the target ceiling
    pub normalize: bool,
    /// Linear fade-in duration in seconds
    pub fade_in_secs: f32,
    /// Linear fade-out duration in seconds
    pub fade_out_secs: f32,
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            normalize: false,
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
        }
    }
}

impl EnhancementSettings {
    /// True when applying these settings would leave the audio unchanged
    pub fn is_identity(&self) -> bool {
        self.gain_db == 0.0
            && !self.normalize
            && self.fade_in_secs <= 0.0
            && self.fade_out_secs <= 0.0
    }
}

/// Apply the enhancement chain, producing a new buffer
///
/// Length, sample rate, and channel count always match the input.
pub fn enhance(source: &AudioBuffer, settings: &EnhancementSettings) -> AudioBuffer {
    let mut output = source.clone();

    if settings.is_identity() {
        return output;
    }

    apply_gain(&mut output, settings.gain_db);

    if settings.normalize {
        apply_normalization(&mut output);
    }

    apply_fades(&mut output, settings.fade_in_secs, settings.fade_out_secs);

    output
}

/// Multiply every sample by the linear gain, clipping to the valid range
fn apply_gain(buffer: &mut AudioBuffer, gain_db: f32) {
    let gain = db_to_linear(gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB));

    // Unity gain optimization
    if (gain - 1.0).abs() < f32::EPSILON {
        return;
    }

    for channel in buffer.samples.iter_mut() {
        for sample in channel.iter_mut() {
            *sample = (*sample * gain).clamp(-1.0, 1.0);
        }
    }
}

/// Scale the whole buffer so the peak maps to the target ceiling
///
/// One global factor over all channels; a silent buffer is left alone.
fn apply_normalization(buffer: &mut AudioBuffer) {
    let peak = buffer.peak();
    if peak <= 0.0 {
        return;
    }

    let scale = db_to_linear(NORMALIZE_TARGET_DB) / peak;

    for channel in buffer.samples.iter_mut() {
        for sample in channel.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Apply linear fade ramps to the ends of the buffer
///
/// If the buffer is shorter than fade-in + fade-out, both fades shrink
/// proportionally so the ramps meet without overlapping.
fn apply_fades(buffer: &mut AudioBuffer, fade_in_secs: f32, fade_out_secs: f32) {
    let num_frames = buffer.num_frames();
    if num_frames == 0 {
        return;
    }

    let rate = buffer.sample_rate as f32;
    let mut fade_in = (fade_in_secs.max(0.0) * rate) as usize;
    let mut fade_out = (fade_out_secs.max(0.0) * rate) as usize;

    if fade_in + fade_out > num_frames {
        let scale = num_frames as f32 / (fade_in + fade_out) as f32;
        fade_in = (fade_in as f32 * scale).floor() as usize;
        fade_out = num_frames - fade_in;
    }

    for channel in buffer.samples.iter_mut() {
        for i in 0..fade_in {
            channel[i] *= i as f32 / fade_in as f32;
        }
        for i in (num_frames - fade_out)..num_frames {
            channel[i] *= (num_frames - i) as f32 / fade_out as f32;
        }
    }
}
