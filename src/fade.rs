use std::time::Instant;

/// Linear gain ramp used for start/stop transitions. Sampled on the control
/// tick; an explicit volume set cancels it immediately (last write wins).
#[derive(Debug, Clone, Copy)]
pub struct FadeEnvelope {
    start_gain: f32,
    target_gain: f32,
    started: Instant,
    duration_seconds: f64,
}

impl FadeEnvelope {
    pub fn new(start_gain: f32, target_gain: f32, duration_seconds: f64, now: Instant) -> Self {
        Self {
            start_gain,
            target_gain,
            started: now,
            duration_seconds,
        }
    }

    pub fn target(&self) -> f32 {
        self.target_gain
    }

    pub fn gain_at(&self, now: Instant) -> f32 {
        if self.duration_seconds <= 0.0 {
            return self.target_gain;
        }
        let t = now.saturating_duration_since(self.started).as_secs_f64();
        let p = (t / self.duration_seconds).clamp(0.0, 1.0) as f32;
        self.start_gain + (self.target_gain - self.start_gain) * p
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.duration_seconds <= 0.0
            || now.saturating_duration_since(self.started).as_secs_f64() >= self.duration_seconds
    }
}
