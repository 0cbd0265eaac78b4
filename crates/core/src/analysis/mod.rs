//! Offline lip-sync generation from speech audio.
//!
//! The mouth is driven by loudness alone: a short-time RMS envelope is
//! normalised to its peak and thresholded into open/closed frames spaced
//! one hop apart.

use crate::{AnalysisConfig, AvatarError, Result, VisemeFrame, VisemeSequence};

/// Short-time RMS of `samples`, one value per hop. Frames are centred on
/// their hop position, so the signal is zero-padded by half a frame on
/// both ends.
pub fn rms_envelope(samples: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    if samples.is_empty() || frame_length == 0 || hop_length == 0 {
        return Vec::new();
    }

    let pad = frame_length / 2;
    let padded_len = samples.len() + 2 * pad;
    if padded_len < frame_length {
        return Vec::new();
    }
    let frames = 1 + (padded_len - frame_length) / hop_length;

    (0..frames)
        .map(|frame| {
            let start = frame * hop_length;
            let sum: f32 = (start..start + frame_length)
                .filter_map(|padded| padded.checked_sub(pad))
                .filter_map(|index| samples.get(index))
                .map(|sample| sample * sample)
                .sum();
            (sum / frame_length as f32).sqrt()
        })
        .collect()
}

/// Turns mono audio into a lip-sync track whose `time` fields are offsets
/// from the start of the clip.
pub fn generate_lip_sync(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<VisemeSequence> {
    if sample_rate == 0 {
        return Err(AvatarError::InvalidInput("sample rate must be positive"));
    }
    if config.frame_seconds <= 0.0 || config.hop_seconds <= 0.0 {
        return Err(AvatarError::InvalidInput(
            "analysis frame and hop must be positive",
        ));
    }

    let rate = sample_rate as f32;
    let frame_length = ((rate * config.frame_seconds) as usize).max(1);
    let hop_length = ((rate * config.hop_seconds) as usize).max(1);
    let envelope = rms_envelope(samples, frame_length, hop_length);

    let peak = envelope.iter().copied().fold(0.0_f32, f32::max);
    let frames = envelope
        .iter()
        .enumerate()
        .map(|(index, &amplitude)| {
            let normalised = if peak > 0.0 { amplitude / peak } else { 0.0 };
            VisemeFrame::new(
                normalised > config.open_threshold,
                index as f32 * config.hop_seconds,
            )
        })
        .collect();

    tracing::debug!(
        samples = samples.len(),
        frame_length,
        hop_length,
        peak,
        "generated lip-sync track"
    );
    VisemeSequence::new(frames)
}
