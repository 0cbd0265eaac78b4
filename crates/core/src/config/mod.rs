use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub idle: IdleConfig,
    pub lip_sync: LipSyncConfig,
    pub analysis: AnalysisConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Sections or fields that are absent
    /// fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Where the avatar comes from and which of its meshes carries the face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub asset_path: String,
    pub face_mesh: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            asset_path: "assets/avatar.json".to_string(),
            face_mesh: "Face".to_string(),
        }
    }
}

/// Idle head motion and blink parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    pub yaw_amplitude: f32,
    pub yaw_frequency: f32,
    pub pitch_amplitude: f32,
    pub pitch_frequency: f32,
    /// Seconds of idle time that must pass before blinks are considered.
    pub blink_warmup: f32,
    pub blink_probability: f32,
    pub reset_probability: f32,
    /// Fixed seed for the blink draws. `None` seeds from the system time.
    pub seed: Option<u64>,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            yaw_amplitude: 0.05,
            yaw_frequency: 0.5,
            pitch_amplitude: 0.03,
            pitch_frequency: 0.3,
            blink_warmup: 2.0,
            blink_probability: 0.02,
            reset_probability: 0.02,
            seed: None,
        }
    }
}

/// How a frame's `time` field turns into the delay before the next frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMode {
    /// `time` is how long the frame is held.
    #[default]
    Duration,
    /// `time` is the frame's offset from the start of the sequence.
    Absolute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    /// Fraction of the remaining gap closed on every render tick.
    pub smoothing: f32,
    pub timing: TimingMode,
    /// Hold time of the last frame in [`TimingMode::Absolute`].
    pub final_hold: f32,
    pub rest_open: f32,
    pub rest_closed: f32,
    pub rest_smile: f32,
    pub speaking_smile: f32,
    pub tilt_amplitude: f32,
    pub tilt_step: f32,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.1,
            timing: TimingMode::Duration,
            final_hold: 0.025,
            rest_open: 0.0,
            rest_closed: 1.0,
            rest_smile: 0.2,
            speaking_smile: 0.5,
            tilt_amplitude: 0.05,
            tilt_step: 0.1,
        }
    }
}

/// Offline lip-sync generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub frame_seconds: f32,
    pub hop_seconds: f32,
    /// Normalised RMS above which the mouth counts as open.
    pub open_threshold: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_seconds: 0.05,
            hop_seconds: 0.025,
            open_threshold: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json(
            r#"{ "lip_sync": { "timing": "absolute" }, "render": { "fps": 30 } }"#,
        )
        .unwrap();

        assert_eq!(config.lip_sync.timing, TimingMode::Absolute);
        assert_eq!(config.lip_sync.smoothing, 0.1);
        assert_eq!(config.render.fps, 30);
        assert_eq!(config.idle, IdleConfig::default());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(AppConfig::from_json("{ not json").is_err());
    }
}
