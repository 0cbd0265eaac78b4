use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{IdlePose, MouthWeights};

pub const BLINK: &str = "blink";

/// Concrete value routed to a morph target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightUpdate {
    pub target: String,
    pub value: f32,
}

impl WeightUpdate {
    pub fn new(target: impl Into<String>, value: f32) -> Self {
        Self {
            target: target.into(),
            value: value.clamp(0.0, 1.0),
        }
    }
}

/// Final per-tick pose. Targets absent from `weights` keep the value they
/// had on the previous tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rotation: Vec3,
    pub weights: Vec<WeightUpdate>,
}

impl Pose {
    pub fn weight(&self, target: &str) -> Option<f32> {
        self.weights
            .iter()
            .find(|update| update.target == target)
            .map(|update| update.value)
    }
}

/// What the viseme player hands the compositor for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouthContribution {
    pub tilt: f32,
    pub mouth: Option<MouthWeights>,
}

/// Merges idle motion and lip sync into a [`Pose`].
///
/// Rotation axes are disjoint: idle owns pitch (`x`) and yaw (`y`), the
/// player owns tilt (`z`). `blink` belongs to idle, the mouth channels to
/// the player.
pub fn compose(idle: &IdlePose, mouth: &MouthContribution) -> Pose {
    let mut weights = Vec::with_capacity(4);
    if let Some(blink) = idle.blink {
        weights.push(WeightUpdate::new(BLINK, blink));
    }
    if let Some(mouth) = mouth.mouth {
        weights.extend(
            mouth
                .channels()
                .into_iter()
                .map(|(target, value)| WeightUpdate::new(target, value)),
        );
    }

    Pose {
        rotation: idle.rotation + Vec3::new(0.0, 0.0, mouth.tilt),
        weights,
    }
}
