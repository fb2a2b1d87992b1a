use crate::models::{RampConfig, RampCurve, RampPattern};

impl RampCurve {
    /// Shape the interpolation fraction before the linear blend.
    fn apply(self, p: f32) -> f32 {
        match self {
            RampCurve::Linear => p,
            // slow start, fast finish
            RampCurve::Exponential => p * p,
            // fast start, slow finish
            RampCurve::Logarithmic => p.sqrt(),
        }
    }
}

fn blend(start: f32, end: f32, p: f32, curve: RampCurve) -> f32 {
    start + (end - start) * curve.apply(p.clamp(0.0, 1.0))
}

/// Current beat/pulse frequency for `config` at `elapsed_seconds` into a
/// session of `total_duration_seconds`.
///
/// Disabled ramps (and pattern `None`) rest at `start_hz`. The ramp window is
/// clamped to the session length; a window of zero or less is treated as
/// already complete and saturates at `end_hz`. Note that `Ascending` and
/// `Descending` share one interpolation: the actual direction comes from the
/// numeric ordering of `start_hz`/`end_hz`, not from the pattern name.
pub fn frequency_at(config: &RampConfig, elapsed_seconds: f64, total_duration_seconds: f64) -> f32 {
    if !config.enabled || config.pattern == RampPattern::None {
        return config.start_hz;
    }

    let effective = config.ramp_duration_seconds.min(total_duration_seconds);
    if effective <= 0.0 {
        return config.end_hz;
    }

    let progress = (elapsed_seconds / effective).clamp(0.0, 1.0) as f32;
    match config.pattern {
        RampPattern::None => config.start_hz,
        RampPattern::Ascending | RampPattern::Descending => {
            blend(config.start_hz, config.end_hz, progress, config.curve)
        }
        RampPattern::AscendingThenDescending | RampPattern::DescendingThenAscending => {
            // two equal halves, each with progress renormalized to [0, 1]
            if progress <= 0.5 {
                blend(config.start_hz, config.end_hz, progress * 2.0, config.curve)
            } else {
                blend(
                    config.end_hz,
                    config.start_hz,
                    (progress - 0.5) * 2.0,
                    config.curve,
                )
            }
        }
    }
}
