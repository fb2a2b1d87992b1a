use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Wall-clock bookkeeping for a session. The engine never owns a timer; its
/// owner supplies `now` on every call, which keeps the clock trivially
/// testable with simulated instants.
///
/// Legal transitions: `Idle → Playing ⇄ Paused`, and anything → `Idle` via
/// `stop`. Calls that do not match the current state are no-ops.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    state: PlaybackState,
    /// Instant the current playing segment began; `None` unless `Playing`.
    reference: Option<Instant>,
    /// Elapsed playback accumulated before the current segment.
    base_seconds: f64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            reference: None,
            base_seconds: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Elapsed playback time, excluding any time spent paused or stopped.
    pub fn elapsed_seconds(&self, now: Instant) -> f64 {
        match (self.state, self.reference) {
            (PlaybackState::Playing, Some(reference)) => {
                self.base_seconds + now.saturating_duration_since(reference).as_secs_f64()
            }
            _ => self.base_seconds,
        }
    }

    /// `Idle → Playing` with elapsed reset to zero. No-op while playing or
    /// paused; a paused session continues via `resume`.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state != PlaybackState::Idle {
            return false;
        }
        self.state = PlaybackState::Playing;
        self.reference = Some(now);
        self.base_seconds = 0.0;
        true
    }

    /// Freeze elapsed time. The reference instant is invalidated until
    /// `resume` recomputes it.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.base_seconds = self.elapsed_seconds(now);
        self.reference = None;
        self.state = PlaybackState::Paused;
        true
    }

    /// Continue from the frozen elapsed value; wall-clock time spent paused
    /// does not count.
    pub fn resume(&mut self, now: Instant) -> bool {
        if self.state != PlaybackState::Paused {
            return false;
        }
        self.reference = Some(now);
        self.state = PlaybackState::Playing;
        true
    }

    /// Reset to `Idle` with elapsed zero. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Idle;
        self.reference = None;
        self.base_seconds = 0.0;
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pause_excludes_wall_clock_time() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new();
        assert!(clock.start(t0));
        let t45 = t0 + Duration::from_secs(45);
        assert!((clock.elapsed_seconds(t45) - 45.0).abs() < 1e-9);

        assert!(clock.pause(t45));
        // ten seconds pass with no ticks delivered
        let t55 = t45 + Duration::from_secs(10);
        assert!((clock.elapsed_seconds(t55) - 45.0).abs() < 1e-9);

        assert!(clock.resume(t55));
        assert!((clock.elapsed_seconds(t55) - 45.0).abs() < 1e-9);
        let t60 = t55 + Duration::from_secs(5);
        assert!((clock.elapsed_seconds(t60) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn illegal_transitions_are_no_ops() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new();
        assert!(!clock.pause(t0));
        assert!(!clock.resume(t0));
        assert!(clock.start(t0));
        assert!(!clock.start(t0 + Duration::from_secs(1)));
        assert!(!clock.resume(t0 + Duration::from_secs(1)));
        assert!(clock.is_playing());
    }

    #[test]
    fn stop_is_idempotent_and_resets() {
        let t0 = Instant::now();
        let mut clock = SessionClock::new();
        clock.start(t0);
        clock.stop();
        clock.stop();
        assert_eq!(clock.state(), PlaybackState::Idle);
        assert!(!clock.is_playing());
        assert_eq!(clock.elapsed_seconds(t0 + Duration::from_secs(99)), 0.0);
    }
}
