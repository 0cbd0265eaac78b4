use std::time::Instant;

/// Source of per-frame delta times, in seconds.
pub trait FrameClock {
    /// Seconds elapsed since the previous call. Never negative.
    fn delta(&mut self) -> f32;
}

/// Wall clock backed by [`Instant`]. The first call reports the time since
/// construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    last: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        delta
    }
}

/// Deterministic clock that reports the same step every frame.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepClock {
    step: f32,
}

impl FixedStepClock {
    pub fn new(step: f32) -> Self {
        Self {
            step: step.max(0.0),
        }
    }

    pub fn from_fps(fps: u32) -> Self {
        Self::new(1.0 / fps.max(1) as f32)
    }

    pub fn step(&self) -> f32 {
        self.step
    }
}

impl FrameClock for FixedStepClock {
    fn delta(&mut self) -> f32 {
        self.step
    }
}

/// Accumulated playback time shared by the render loop and the alarm.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f32) {
        self.time_seconds = (self.time_seconds + f64::from(delta)).max(self.time_seconds);
    }
}

/// Handle to one scheduled firing of an [`Alarm`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ticket {
    pub generation: u64,
    pub due_seconds: f64,
}

/// One-shot alarm guarded by a generation counter.
///
/// Only the most recently scheduled ticket of the current generation can
/// fire. [`Alarm::invalidate`] bumps the generation so every ticket handed
/// out before it is stale.
#[derive(Debug, Default, Clone)]
pub struct Alarm {
    generation: u64,
    pending: Option<Ticket>,
}

impl Alarm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending(&self) -> Option<Ticket> {
        self.pending
    }

    /// Arms the alarm `delay` seconds after `from`, replacing any pending
    /// ticket of the same generation.
    pub fn schedule(&mut self, from: f64, delay: f64) -> Ticket {
        let ticket = Ticket {
            generation: self.generation,
            due_seconds: from + delay.max(0.0),
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Drops the pending ticket and starts a new generation.
    pub fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.pending = None;
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && self.pending.as_ref() == Some(ticket)
    }

    /// Takes the pending ticket if it is due at `now`.
    pub fn take_due(&mut self, now: f64) -> Option<Ticket> {
        match self.pending {
            Some(ticket) if ticket.due_seconds <= now => self.pending.take(),
            _ => None,
        }
    }

    /// Consumes `ticket` if it is still the current one. Stale tickets are
    /// rejected and leave the alarm untouched.
    pub fn claim(&mut self, ticket: &Ticket) -> bool {
        if self.is_current(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_step_clock_reports_constant_delta() {
        let mut clock = FixedStepClock::from_fps(50);
        assert_eq!(clock.delta(), 0.02);
        assert_eq!(clock.delta(), 0.02);
        assert_eq!(FixedStepClock::new(-1.0).step(), 0.0);
    }

    #[test]
    fn playback_clock_never_moves_backwards() {
        let mut clock = PlaybackClock::default();
        clock.advance(0.5);
        clock.advance(-1.0);
        assert_eq!(clock.time_seconds, 0.5);
        clock.reset();
        assert_eq!(clock.time_seconds, 0.0);
    }

    #[test]
    fn alarm_fires_once_when_due() {
        let mut alarm = Alarm::new();
        alarm.schedule(1.0, 0.25);

        assert!(alarm.take_due(1.2).is_none());
        let ticket = alarm.take_due(1.25).expect("alarm should be due");
        assert_eq!(ticket.due_seconds, 1.25);
        assert!(alarm.take_due(5.0).is_none());
    }

    #[test]
    fn invalidate_makes_old_tickets_stale() {
        let mut alarm = Alarm::new();
        let old = alarm.schedule(0.0, 1.0);
        alarm.invalidate();
        let fresh = alarm.schedule(0.0, 1.0);

        assert!(!alarm.claim(&old));
        assert!(alarm.pending().is_some());
        assert!(alarm.claim(&fresh));
        assert!(alarm.pending().is_none());
    }
}
