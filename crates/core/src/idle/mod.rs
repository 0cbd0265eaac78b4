//! Procedural idle motion: a slow periodic head sway plus random blinks.

use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::IdleConfig;

/// Timers driving the idle motion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IdleState {
    /// Idle time since start or since the last blink reset.
    pub elapsed_time: f32,
    /// Total time the generator has been running.
    pub total_time: f32,
    /// Value of `total_time` at the most recent blink reset.
    pub last_blink_reset_time: f32,
}

/// Contribution of the idle generator to one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdlePose {
    /// `x` is pitch, `y` is yaw. `z` is left to the viseme player.
    pub rotation: Vec3,
    /// `None` when blinking was not evaluated this tick.
    pub blink: Option<f32>,
}

/// Computes one tick of idle motion.
///
/// `draw` yields uniform samples in `[0, 1)`. Two independent samples are
/// taken per tick once the warm-up has passed: one decides the blink pulse,
/// the other whether idle time restarts. When the mesh has no blink channel
/// neither is drawn.
pub fn compute_idle_pose(
    state: &IdleState,
    delta: f32,
    blink_enabled: bool,
    config: &IdleConfig,
    draw: &mut impl FnMut() -> f32,
) -> (IdlePose, IdleState) {
    let delta = delta.max(0.0);
    let mut next = IdleState {
        elapsed_time: state.elapsed_time + delta,
        total_time: state.total_time + delta,
        last_blink_reset_time: state.last_blink_reset_time,
    };

    let t = next.elapsed_time;
    let rotation = Vec3::new(
        (t * config.pitch_frequency).cos() * config.pitch_amplitude,
        (t * config.yaw_frequency).sin() * config.yaw_amplitude,
        0.0,
    );

    let mut blink = None;
    if blink_enabled && next.elapsed_time > config.blink_warmup {
        blink = Some(if draw() > 1.0 - config.blink_probability {
            1.0
        } else {
            0.0
        });
        if draw() > 1.0 - config.reset_probability {
            next.elapsed_time = 0.0;
            next.last_blink_reset_time = next.total_time;
        }
    }

    (IdlePose { rotation, blink }, next)
}

/// Stateful wrapper around [`compute_idle_pose`] that owns its RNG.
#[derive(Debug)]
pub struct IdleMotion {
    config: IdleConfig,
    state: IdleState,
    rng: StdRng,
}

impl IdleMotion {
    pub fn new(config: IdleConfig) -> Self {
        let seed = config.seed.unwrap_or_else(time_seed);
        Self {
            config,
            state: IdleState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &IdleState {
        &self.state
    }

    pub fn config(&self) -> &IdleConfig {
        &self.config
    }

    pub fn tick(&mut self, delta: f32, blink_enabled: bool) -> IdlePose {
        let rng = &mut self.rng;
        let (pose, state) = compute_idle_pose(
            &self.state,
            delta,
            blink_enabled,
            &self.config,
            &mut || rng.random::<f32>(),
        );
        if state.last_blink_reset_time != self.state.last_blink_reset_time {
            tracing::trace!(at = state.total_time, "idle timer reset");
        }
        self.state = state;
        pose
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> IdleMotion {
        IdleMotion::new(IdleConfig {
            seed: Some(seed),
            ..IdleConfig::default()
        })
    }

    #[test]
    fn rotation_stays_within_amplitude() {
        let mut idle = seeded(7);
        for step in 0..5_000 {
            let delta = (step % 7) as f32 * 0.013;
            let pose = idle.tick(delta, true);
            assert!(pose.rotation.y.abs() <= 0.05 + f32::EPSILON);
            assert!(pose.rotation.x.abs() <= 0.03 + f32::EPSILON);
            assert_eq!(pose.rotation.z, 0.0);
        }
    }

    #[test]
    fn warmup_suppresses_blinks() {
        let config = IdleConfig::default();
        let mut state = IdleState::default();
        let mut draw = || 0.999_f32;

        for _ in 0..100 {
            let (pose, next) = compute_idle_pose(&state, 0.016, true, &config, &mut draw);
            assert!(next.elapsed_time < 2.0);
            assert_eq!(pose.blink, None);
            state = next;
        }
    }

    #[test]
    fn blink_and_reset_use_separate_draws() {
        let config = IdleConfig::default();
        let state = IdleState {
            elapsed_time: 3.0,
            total_time: 3.0,
            last_blink_reset_time: 0.0,
        };

        let mut samples = [0.99_f32, 0.1].into_iter();
        let (pose, next) =
            compute_idle_pose(&state, 0.1, true, &config, &mut || samples.next().unwrap());
        assert_eq!(pose.blink, Some(1.0));
        assert!((next.elapsed_time - 3.1).abs() < 1e-5);

        let mut samples = [0.1_f32, 0.99].into_iter();
        let (pose, next) =
            compute_idle_pose(&state, 0.1, true, &config, &mut || samples.next().unwrap());
        assert_eq!(pose.blink, Some(0.0));
        assert_eq!(next.elapsed_time, 0.0);
        assert!((next.last_blink_reset_time - 3.1).abs() < 1e-5);
    }

    #[test]
    fn coinciding_blink_and_reset_holds_the_blink_weight() {
        let config = IdleConfig::default();
        let state = IdleState {
            elapsed_time: 3.0,
            total_time: 3.0,
            last_blink_reset_time: 0.0,
        };

        let mut samples = [0.99_f32, 0.99].into_iter();
        let (pose, mut state) =
            compute_idle_pose(&state, 0.1, true, &config, &mut || samples.next().unwrap());
        assert_eq!(pose.blink, Some(1.0));
        assert_eq!(state.elapsed_time, 0.0);

        let mut draws = 0;
        for _ in 0..100 {
            let (pose, next) = compute_idle_pose(&state, 0.016, true, &config, &mut || {
                draws += 1;
                0.0
            });
            assert_eq!(pose.blink, None);
            state = next;
        }
        assert_eq!(draws, 0);
    }

    #[test]
    fn missing_blink_channel_skips_draws() {
        let config = IdleConfig::default();
        let state = IdleState {
            elapsed_time: 10.0,
            ..IdleState::default()
        };
        let mut draws = 0;
        let (pose, next) = compute_idle_pose(&state, 0.016, false, &config, &mut || {
            draws += 1;
            0.999
        });

        assert_eq!(draws, 0);
        assert_eq!(pose.blink, None);
        assert!(next.elapsed_time > 10.0);
    }

    #[test]
    fn same_seed_reproduces_blinks() {
        let mut a = seeded(42);
        let mut b = seeded(42);
        for _ in 0..1_000 {
            assert_eq!(a.tick(0.016, true), b.tick(0.016, true));
        }
    }
}
