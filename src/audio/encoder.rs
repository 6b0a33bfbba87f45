//! Audio Encoder
//!
//! Compresses the trimmed and enhanced PCM into a constant-bitrate MP3
//! stream using the LAME encoder. Encoding is chunked so progress is
//! observable during a multi-minute sermon and cancellation can take
//! effect between chunks instead of only at the end.

use std::mem::MaybeUninit;

use mp3lame_encoder::{Builder, FlushNoGap, InterleavedPcm};

use crate::audio::buffer::AudioBuffer;
use crate::error::{ExportError, Result};
use crate::export::progress::CancelFlag;

/// Fixed distribution bitrate in kbps
pub const BITRATE_KBPS: u32 = 128;

/// Frames encoded per chunk (~0.19 s at 44.1 kHz)
const CHUNK_FRAMES: usize = 8192;

/// Encode a PCM buffer to a 128 kbps MP3 stream
///
/// `on_progress` receives a monotonically non-decreasing fraction in
/// [0, 1], reported once per chunk; the final value is 1.0 exactly once.
/// If `cancel` is raised between chunks the partial output is dropped
/// and `CancelledError` is returned — no partial stream ever reaches the
/// caller.
pub fn encode_mp3(
    buffer: &AudioBuffer,
    cancel: &CancelFlag,
    mut on_progress: impl FnMut(f32),
) -> Result<Vec<u8>> {
    if buffer.is_empty() {
        return Err(ExportError::Encode {
            reason: "buffer contains no samples".to_string(),
        });
    }

    let num_channels = buffer.num_channels();
    if num_channels == 0 || num_channels > 2 {
        return Err(ExportError::Encode {
            reason: format!(
                "MP3 only supports 1 or 2 channels, got {}",
                num_channels
            ),
        });
    }

    let mut builder = Builder::new().ok_or_else(|| ExportError::Encode {
        reason: "failed to create LAME encoder".to_string(),
    })?;

    builder
        .set_sample_rate(buffer.sample_rate)
        .map_err(|e| ExportError::Encode {
            reason: format!("invalid sample rate: {:?}", e),
        })?;
    builder
        .set_num_channels(num_channels as u8)
        .map_err(|e| ExportError::Encode {
            reason: format!("invalid channel count: {:?}", e),
        })?;
    builder
        .set_brate(mp3lame_encoder::Bitrate::Kbps128)
        .map_err(|e| ExportError::Encode {
            reason: format!("failed to set bitrate: {:?}", e),
        })?;
    builder
        .set_quality(mp3lame_encoder::Quality::Best)
        .map_err(|e| ExportError::Encode {
            reason: format!("failed to set quality: {:?}", e),
        })?;

    let mut encoder = builder.build().map_err(|e| ExportError::Encode {
        reason: format!("failed to build encoder: {:?}", e),
    })?;

    // Interleave and convert to i16 once; LAME consumes interleaved PCM.
    let total_frames = buffer.num_frames();
    let mut interleaved = Vec::with_capacity(total_frames * num_channels);
    for frame in 0..total_frames {
        for ch in 0..num_channels {
            let sample = buffer.channel(ch)[frame];
            interleaved.push((sample.clamp(-1.0, 1.0) * 32767.0) as i16);
        }
    }

    let mut output = Vec::new();
    let mut frames_done = 0usize;

    while frames_done < total_frames {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        let frames = CHUNK_FRAMES.min(total_frames - frames_done);
        let start = frames_done * num_channels;
        let chunk = &interleaved[start..start + frames * num_channels];

        // MP3 worst case per chunk: 1.25 * samples + 7200
        let max_output_size = frames * num_channels * 5 / 4 + 7200;
        let mut chunk_out: Vec<MaybeUninit<u8>> = vec![MaybeUninit::uninit(); max_output_size];

        let encoded_size = encoder
            .encode(InterleavedPcm(chunk), &mut chunk_out)
            .map_err(|e| ExportError::Encode {
                reason: format!("MP3 encoding failed: {:?}", e),
            })?;

        // Convert MaybeUninit<u8> to u8 (safe because encoder initialized them)
        output.extend(
            chunk_out[..encoded_size]
                .iter()
                .map(|b| unsafe { b.assume_init() }),
        );

        frames_done += frames;
        on_progress(frames_done as f32 / total_frames as f32);
    }

    let mut flush_out: Vec<MaybeUninit<u8>> = vec![MaybeUninit::uninit(); 7200];
    let flush_size = encoder
        .flush::<FlushNoGap>(&mut flush_out)
        .map_err(|e| ExportError::Encode {
            reason: format!("MP3 flush failed: {:?}", e),
        })?;
    output.extend(
        flush_out[..flush_size]
            .iter()
            .map(|b| unsafe { b.assume_init() }),
    );

    log::debug!(
        "encoded {} frames at {} kbps: {} bytes",
        total_frames,
        BITRATE_KBPS,
        output.len()
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::buffer::{generate_test_tone, ChannelLayout};

    #[test]
    fn test_empty_buffer_is_rejected() {
        let buffer = AudioBuffer::new(0, ChannelLayout::Mono, 44100);
        let result = encode_mp3(&buffer, &CancelFlag::new(), |_| {});
        assert!(matches!(result, Err(ExportError::Encode { .. })));
    }

    #[test]
    fn test_encode_produces_plausible_stream() {
        let tone = generate_test_tone(440.0, 2.0, 44100, ChannelLayout::Mono);
        let bytes = encode_mp3(&tone, &CancelFlag::new(), |_| {}).unwrap();

        // 2 s at 128 kbps is ~32 KB; allow generous slack either way.
        assert!(bytes.len() > 10_000);
        assert!(bytes.len() < 100_000);
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_one() {
        let tone = generate_test_tone(440.0, 3.0, 44100, ChannelLayout::Stereo);
        let mut fractions = Vec::new();

        encode_mp3(&tone, &CancelFlag::new(), |f| fractions.push(f)).unwrap();

        assert!(fractions.len() > 1, "expected chunked progress reports");
        for pair in fractions.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(fractions.last().copied(), Some(1.0));
        assert_eq!(fractions.iter().filter(|&&f| f == 1.0).count(), 1);
    }

    #[test]
    fn test_cancel_drops_partial_output() {
        let tone = generate_test_tone(440.0, 3.0, 44100, ChannelLayout::Mono);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = encode_mp3(&tone, &cancel, |_| {});
        assert!(matches!(result, Err(ExportError::Cancelled)));
    }

    #[test]
    fn test_cancel_mid_encode() {
        let tone = generate_test_tone(440.0, 3.0, 44100, ChannelLayout::Mono);
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let mut reports = 0;

        let result = encode_mp3(&tone, &cancel, |_| {
            reports += 1;
            if reports == 2 {
                trigger.cancel();
            }
        });

        assert!(matches!(result, Err(ExportError::Cancelled)));
        assert_eq!(reports, 2);
    }
}
