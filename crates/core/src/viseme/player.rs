use crate::timeline::{Alarm, Ticket};
use crate::{LipSyncConfig, TimingMode};

use super::{MouthWeights, VisemeSequence};

/// Lifecycle of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing has been played yet. The mouth channels are left alone.
    Idle,
    /// A sequence is in flight and the weights are being smoothed.
    Playing,
    /// The last sequence finished, or was empty. Weights sit at rest.
    Resting,
}

/// Outcome of a single advancement event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advance {
    /// Frame `index` became the smoothing target. The next advancement is
    /// due `next_delay` seconds later.
    Frame { index: usize, next_delay: f64 },
    /// The cursor ran past the last frame and the resting pose was set.
    Finished,
}

/// Plays one [`VisemeSequence`] at a time.
///
/// Loading a sequence invalidates the alarm of the previous one, so a stale
/// advancement can never touch the new playback.
#[derive(Debug, Clone)]
pub struct VisemePlayer {
    config: LipSyncConfig,
    sequence: VisemeSequence,
    cursor: usize,
    state: PlaybackState,
    weights: MouthWeights,
    target: MouthWeights,
    tilt: f32,
    alarm: Alarm,
}

impl VisemePlayer {
    pub fn new(config: LipSyncConfig) -> Self {
        let rest = MouthWeights::rest(&config);
        Self::with_weights(config, rest)
    }

    /// Starts from the weights currently on the mesh so the first sequence
    /// eases in from wherever the face is.
    pub fn with_weights(config: LipSyncConfig, initial: MouthWeights) -> Self {
        Self {
            config,
            sequence: VisemeSequence::default(),
            cursor: 0,
            state: PlaybackState::Idle,
            weights: initial,
            target: initial,
            tilt: 0.0,
            alarm: Alarm::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Index of the next frame to apply.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn sequence(&self) -> &VisemeSequence {
        &self.sequence
    }

    pub fn weights(&self) -> MouthWeights {
        self.weights
    }

    pub fn target(&self) -> MouthWeights {
        self.target
    }

    /// Head tilt around `z` for the most recently applied frame.
    pub fn tilt(&self) -> f32 {
        self.tilt
    }

    pub fn pending(&self) -> Option<Ticket> {
        self.alarm.pending()
    }

    /// Mouth channels the player currently claims, if any.
    pub fn mouth(&self) -> Option<MouthWeights> {
        match self.state {
            PlaybackState::Idle => None,
            PlaybackState::Playing | PlaybackState::Resting => Some(self.weights),
        }
    }

    /// Replaces whatever is playing with `sequence`, starting at cursor 0.
    ///
    /// A non-empty sequence arms the alarm for `now` so its first frame is
    /// applied on the next [`VisemePlayer::poll`]. An empty one rests
    /// immediately without scheduling anything.
    pub fn load(&mut self, sequence: VisemeSequence, now: f64) {
        if self.state == PlaybackState::Playing {
            tracing::info!(
                cursor = self.cursor,
                len = self.sequence.len(),
                "superseding in-flight lip-sync sequence"
            );
        }
        self.alarm.invalidate();
        self.sequence = sequence;
        self.cursor = 0;

        if self.sequence.is_empty() {
            self.rest();
        } else {
            self.state = PlaybackState::Playing;
            self.alarm.schedule(now, 0.0);
        }
    }

    /// Fires every advancement that is due at `now`, returning how many
    /// fired. Each follow-up is scheduled relative to the due time of the
    /// one before it, so long frames do not drift with the tick rate.
    pub fn poll(&mut self, now: f64) -> usize {
        let mut fired = 0;
        while let Some(ticket) = self.alarm.take_due(now) {
            self.on_alarm(ticket);
            fired += 1;
        }
        fired
    }

    /// Fires a specific ticket. Returns `false`, with no state change, when
    /// the ticket belongs to a superseded sequence or was already consumed.
    pub fn fire(&mut self, ticket: Ticket) -> bool {
        if !self.alarm.claim(&ticket) {
            tracing::debug!(generation = ticket.generation, "ignoring stale viseme alarm");
            return false;
        }
        self.on_alarm(ticket);
        true
    }

    /// Applies the frame under the cursor, or the resting pose once the
    /// sequence is exhausted. Does not touch the alarm.
    pub fn advance(&mut self) -> Advance {
        let Some(frame) = self.sequence.get(self.cursor).copied() else {
            self.rest();
            return Advance::Finished;
        };

        let index = self.cursor;
        self.target = MouthWeights::target_for(&frame, &self.config);
        self.tilt = (index as f32 * self.config.tilt_step).sin() * self.config.tilt_amplitude;
        self.cursor += 1;

        let next_delay = self.delay_after(index);
        tracing::debug!(index, mouth_open = frame.mouth_open, next_delay, "viseme advance");
        Advance::Frame { index, next_delay }
    }

    /// Per-tick smoothing toward the active target.
    pub fn smooth(&mut self) {
        if self.state == PlaybackState::Playing {
            self.weights = self.weights.approach(&self.target, self.config.smoothing);
        }
    }

    fn on_alarm(&mut self, ticket: Ticket) {
        if let Advance::Frame { next_delay, .. } = self.advance() {
            self.alarm.schedule(ticket.due_seconds, next_delay);
        }
    }

    fn delay_after(&self, index: usize) -> f64 {
        let frames = self.sequence.frames();
        let current = frames[index].time_offset;
        let delay = match self.config.timing {
            TimingMode::Duration => current,
            TimingMode::Absolute => match frames.get(index + 1) {
                Some(next) => next.time_offset - current,
                None => self.config.final_hold,
            },
        };
        f64::from(delay.max(0.0))
    }

    fn rest(&mut self) {
        self.alarm.invalidate();
        self.state = PlaybackState::Resting;
        self.weights = MouthWeights::rest(&self.config);
        self.target = self.weights;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viseme::VisemeFrame;

    fn sequence(frames: &[(bool, f32)]) -> VisemeSequence {
        VisemeSequence::new(
            frames
                .iter()
                .map(|&(open, time)| VisemeFrame::new(open, time))
                .collect(),
        )
        .unwrap()
    }

    fn closed_start() -> VisemePlayer {
        VisemePlayer::with_weights(
            LipSyncConfig::default(),
            MouthWeights {
                open: 0.0,
                closed: 1.0,
                smile: 0.0,
            },
        )
    }

    #[test]
    fn idle_player_claims_nothing() {
        let player = VisemePlayer::new(LipSyncConfig::default());
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(player.mouth().is_none());
        assert!(player.pending().is_none());
    }

    #[test]
    fn empty_sequence_rests_without_timers() {
        let mut player = closed_start();
        player.load(VisemeSequence::default(), 0.0);

        assert_eq!(player.state(), PlaybackState::Resting);
        assert!(player.pending().is_none());
        let mouth = player.mouth().unwrap();
        assert_eq!((mouth.open, mouth.closed, mouth.smile), (0.0, 1.0, 0.2));
        assert_eq!(player.poll(100.0), 0);
    }

    #[test]
    fn reaches_rest_after_one_advancement_per_frame() {
        for len in 1..6 {
            let frames: Vec<(bool, f32)> = (0..len).map(|i| (i % 2 == 0, 0.05)).collect();
            let mut player = closed_start();
            player.load(sequence(&frames), 0.0);
            assert_eq!(player.poll(0.0), 1);

            for _ in 0..len {
                assert_eq!(player.state(), PlaybackState::Playing);
                let due = player.pending().expect("next advancement scheduled").due_seconds;
                assert_eq!(player.poll(due), 1);
            }

            assert_eq!(player.state(), PlaybackState::Resting);
            assert_eq!(player.cursor(), len);
            assert!(player.pending().is_none());
            assert_eq!(player.weights(), MouthWeights::rest(&LipSyncConfig::default()));
        }
    }

    #[test]
    fn target_changes_only_on_advancement() {
        let mut player = closed_start();
        player.load(sequence(&[(true, 0.2), (false, 0.3)]), 0.0);
        player.poll(0.0);

        let mut last = player.weights().open;
        for _ in 0..10 {
            player.smooth();
            assert!(player.weights().open > last);
            last = player.weights().open;
        }
        assert_eq!(player.target().open, 1.0);
        assert_eq!(player.cursor(), 1);
    }

    #[test]
    fn replacement_cancels_stale_alarm() {
        let mut player = closed_start();
        player.load(sequence(&[(true, 0.1), (true, 0.1), (true, 0.1)]), 0.0);
        player.poll(0.0);
        player.poll(0.11);
        assert_eq!(player.cursor(), 2);
        let stale = player.pending().unwrap();

        player.load(sequence(&[(false, 1.0)]), 0.15);
        assert_eq!(player.cursor(), 0);
        assert!(!player.fire(stale));
        assert_eq!(player.cursor(), 0);

        assert_eq!(player.poll(0.2), 1);
        assert_eq!(player.target().open, 0.0);
        assert!((player.pending().unwrap().due_seconds - 1.15).abs() < 1e-9);
    }

    #[test]
    fn tilt_follows_frame_index() {
        let mut player = closed_start();
        player.load(sequence(&[(true, 0.0), (false, 0.0), (true, 0.0), (false, 1.0)]), 0.0);
        player.poll(0.0);

        assert_eq!(player.cursor(), 4);
        assert!((player.tilt() - (3.0_f32 * 0.1).sin() * 0.05).abs() < 1e-6);
    }

    #[test]
    fn absolute_timing_uses_offset_differences() {
        let config = LipSyncConfig {
            timing: TimingMode::Absolute,
            ..LipSyncConfig::default()
        };
        let mut player = VisemePlayer::new(config);
        player.load(sequence(&[(true, 0.0), (false, 0.025), (true, 0.05)]), 1.0);

        assert_eq!(player.advance(), Advance::Frame { index: 0, next_delay: f64::from(0.025_f32) });
        assert!(matches!(player.advance(), Advance::Frame { index: 1, .. }));
        assert_eq!(player.advance(), Advance::Frame { index: 2, next_delay: f64::from(0.025_f32) });
        assert_eq!(player.advance(), Advance::Finished);
    }

    #[test]
    fn resting_pose_is_not_smoothed() {
        let mut player = closed_start();
        player.load(sequence(&[(true, 0.0)]), 0.0);
        player.poll(0.0);

        let rest = MouthWeights::rest(&LipSyncConfig::default());
        assert_eq!(player.state(), PlaybackState::Resting);
        assert_eq!(player.weights(), rest);
        player.smooth();
        assert_eq!(player.weights(), rest);
    }
}
