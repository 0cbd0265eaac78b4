//! Lip-sync data and the player that turns it into mouth weights.
//!
//! Playback runs on two clocks. Frame advancement is event scheduled: each
//! frame arms an [`Alarm`] for the frame's declared delay and the target
//! mouth shape only changes when that alarm fires. Smoothing runs on every
//! render tick and moves the current weights a fixed fraction of the way
//! toward the active target.

mod player;

pub use player::{Advance, PlaybackState, VisemePlayer};

use serde::{Deserialize, Serialize};

use crate::{AvatarError, LipSyncConfig, Result};

pub const MOUTH_OPEN: &str = "mouthOpen";
pub const MOUTH_CLOSED: &str = "mouthClosed";
pub const SMILE: &str = "smile";

/// One timed mouth state as delivered by the lip-sync feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisemeFrame {
    pub mouth_open: bool,
    /// Seconds. Interpreted according to [`crate::TimingMode`].
    #[serde(rename = "time")]
    pub time_offset: f32,
}

impl VisemeFrame {
    pub fn new(mouth_open: bool, time_offset: f32) -> Self {
        Self {
            mouth_open,
            time_offset,
        }
    }
}

/// Ordered frames decoded from a single feed message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VisemeSequence {
    frames: Vec<VisemeFrame>,
}

impl VisemeSequence {
    /// Builds a sequence, rejecting negative, non-finite or decreasing
    /// time offsets.
    pub fn new(frames: Vec<VisemeFrame>) -> Result<Self> {
        let mut previous = 0.0_f32;
        for frame in &frames {
            if !frame.time_offset.is_finite() || frame.time_offset < 0.0 {
                return Err(AvatarError::InvalidInput(
                    "viseme time offsets must be finite and non-negative",
                ));
            }
            if frame.time_offset < previous {
                return Err(AvatarError::InvalidInput(
                    "viseme time offsets must be non-decreasing",
                ));
            }
            previous = frame.time_offset;
        }
        Ok(Self { frames })
    }

    /// Decodes the JSON array carried in a feed message.
    pub fn parse(json: &str) -> Result<Self> {
        let frames: Vec<VisemeFrame> = serde_json::from_str(json)?;
        Self::new(frames)
    }

    /// Like [`VisemeSequence::parse`], but a malformed payload yields an
    /// empty sequence so playback goes straight to the resting pose.
    pub fn parse_lenient(json: &str) -> Self {
        Self::parse(json).unwrap_or_else(|err| {
            tracing::warn!(%err, "discarding malformed lip-sync payload");
            Self::default()
        })
    }

    pub fn frames(&self) -> &[VisemeFrame] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&VisemeFrame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The three mouth channels owned by the player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouthWeights {
    pub open: f32,
    pub closed: f32,
    pub smile: f32,
}

impl MouthWeights {
    pub fn rest(config: &LipSyncConfig) -> Self {
        Self {
            open: config.rest_open,
            closed: config.rest_closed,
            smile: config.rest_smile,
        }
        .clamped()
    }

    /// Target shape for a frame: fully open or fully closed, with a wider
    /// smile while speaking.
    pub fn target_for(frame: &VisemeFrame, config: &LipSyncConfig) -> Self {
        let open = if frame.mouth_open { 1.0 } else { 0.0 };
        Self {
            open,
            closed: 1.0 - open,
            smile: if frame.mouth_open {
                config.speaking_smile
            } else {
                config.rest_smile
            },
        }
        .clamped()
    }

    /// Closes `factor` of the gap toward `target` on every channel.
    pub fn approach(&self, target: &Self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        Self {
            open: lerp(self.open, target.open, factor),
            closed: lerp(self.closed, target.closed, factor),
            smile: lerp(self.smile, target.smile, factor),
        }
        .clamped()
    }

    pub fn channels(&self) -> [(&'static str, f32); 3] {
        [
            (MOUTH_OPEN, self.open),
            (MOUTH_CLOSED, self.closed),
            (SMILE, self.smile),
        ]
    }

    fn clamped(self) -> Self {
        Self {
            open: self.open.clamp(0.0, 1.0),
            closed: self.closed.clamp(0.0, 1.0),
            smile: self.smile.clamp(0.0, 1.0),
        }
    }
}

pub fn lerp(from: f32, to: f32, factor: f32) -> f32 {
    from + (to - from) * factor
}
