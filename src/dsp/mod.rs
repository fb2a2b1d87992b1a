use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::models::WaveformKind;

/// Per-generator noise filter state. Never share one instance between two
/// active generators; correlated layers are audible.
pub struct NoiseState {
    // pink noise pole bank (Paul Kellet approximation)
    b0: f32,
    b1: f32,
    b2: f32,
    b3: f32,
    b4: f32,
    b5: f32,
    // brown noise accumulator
    brown: f32,
    rng: SmallRng,
}

impl NoiseState {
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            b3: 0.0,
            b4: 0.0,
            b5: 0.0,
            brown: 0.0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn white(&mut self) -> f32 {
        self.rng.gen_range(-1.0..=1.0)
    }

    fn pink(&mut self) -> f32 {
        let w = self.white();
        self.b0 = 0.99886 * self.b0 + w * 0.0555179;
        self.b1 = 0.99332 * self.b1 + w * 0.0750759;
        self.b2 = 0.96900 * self.b2 + w * 0.1538520;
        self.b3 = 0.86650 * self.b3 + w * 0.3104856;
        self.b4 = 0.55000 * self.b4 + w * 0.5329522;
        self.b5 = -0.7616 * self.b5 - w * 0.0168980;
        ((self.b0 + self.b1 + self.b2 + self.b3 + self.b4 + self.b5) * 0.11).clamp(-1.0, 1.0)
    }

    fn brown(&mut self) -> f32 {
        // random walk with a clamping boundary so the integral cannot drift
        self.brown = (self.brown + self.white() * 0.02).clamp(-1.0, 1.0);
        self.brown
    }
}

impl Default for NoiseState {
    fn default() -> Self {
        Self::new()
    }
}

/// Amplitude of `kind` at time `t` seconds, always in [-1, 1]. Periodic
/// waveforms are pure in `freq`/`t`; noise variants advance `noise`.
pub fn sample(kind: WaveformKind, freq: f32, t: f32, noise: &mut NoiseState) -> f32 {
    let omega = 2.0 * std::f32::consts::PI * freq * t;
    match kind {
        WaveformKind::Sine => omega.sin(),
        WaveformKind::Square => {
            if omega.sin() >= 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        WaveformKind::Triangle => {
            (2.0 / std::f32::consts::PI) * omega.sin().asin()
        }
        WaveformKind::Sawtooth => {
            let x = freq * t;
            2.0 * (x - (x + 0.5).floor())
        }
        WaveformKind::WhiteNoise => noise.white(),
        WaveformKind::PinkNoise => noise.pink(),
        WaveformKind::BrownNoise => noise.brown(),
    }
}

/// 50%-duty on/off gate at `pulse_hz`, used by the isochronic generator.
pub fn isochronic_gate(pulse_hz: f32, t: f32) -> f32 {
    let s = (2.0 * std::f32::consts::PI * pulse_hz * t).sin();
    if (s + 1.0) * 0.5 > 0.5 {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [WaveformKind; 7] = [
        WaveformKind::Sine,
        WaveformKind::Square,
        WaveformKind::Triangle,
        WaveformKind::Sawtooth,
        WaveformKind::WhiteNoise,
        WaveformKind::PinkNoise,
        WaveformKind::BrownNoise,
    ];

    #[test]
    fn samples_stay_in_unit_range() {
        let mut noise = NoiseState::with_seed(7);
        for kind in KINDS {
            for f in [100.0f32, 250.0, 500.0] {
                for i in 0..4096 {
                    let t = i as f32 / 44100.0;
                    let v = sample(kind, f, t, &mut noise);
                    assert!(
                        (-1.0..=1.0).contains(&v),
                        "{kind:?} at f={f} t={t} produced {v}"
                    );
                }
            }
        }
    }

    #[test]
    fn periodic_shapes_match_definitions() {
        let mut noise = NoiseState::with_seed(1);
        // quarter period of a 1 Hz sine
        let v = sample(WaveformKind::Sine, 1.0, 0.25, &mut noise);
        assert!((v - 1.0).abs() < 1e-5);
        // square flips sign across the half period
        assert_eq!(sample(WaveformKind::Square, 1.0, 0.1, &mut noise), 1.0);
        assert_eq!(sample(WaveformKind::Square, 1.0, 0.6, &mut noise), -1.0);
        // sawtooth resets at the period boundary
        let a = sample(WaveformKind::Sawtooth, 1.0, 0.49, &mut noise);
        let b = sample(WaveformKind::Sawtooth, 1.0, 0.51, &mut noise);
        assert!(a > 0.9 && b < -0.9);
        // triangle peaks at the quarter period
        let tri = sample(WaveformKind::Triangle, 1.0, 0.25, &mut noise);
        assert!((tri - 1.0).abs() < 1e-3);
    }

    #[test]
    fn pink_noise_is_softer_than_white() {
        // less high-frequency energy shows up as a smaller mean squared
        // sample-to-sample difference
        let mut noise = NoiseState::with_seed(42);
        let n = 44100;
        let mut white = Vec::with_capacity(n);
        let mut pink = Vec::with_capacity(n);
        for _ in 0..n {
            white.push(noise.white());
        }
        for _ in 0..n {
            pink.push(noise.pink());
        }
        let diff_energy = |s: &[f32]| -> f32 {
            let e: f32 = s.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
            let total: f32 = s.iter().map(|v| v * v).sum();
            e / total.max(1e-12)
        };
        assert!(diff_energy(&pink) < diff_energy(&white) * 0.5);
    }

    #[test]
    fn brown_noise_stays_bounded() {
        let mut noise = NoiseState::with_seed(9);
        for _ in 0..500_000 {
            let v = noise.brown();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn independent_states_do_not_correlate() {
        let mut a = NoiseState::with_seed(100);
        let mut b = NoiseState::with_seed(101);
        let mut dot = 0.0f32;
        let n = 10_000;
        for _ in 0..n {
            dot += a.pink() * b.pink();
        }
        assert!((dot / n as f32).abs() < 0.05);
    }

    #[test]
    fn gate_produces_expected_cycle_count() {
        // 10 Hz pulse over one second: 20 polarity transitions
        let sr = 44100;
        let mut transitions = 0;
        let mut prev = isochronic_gate(10.0, 0.0);
        for i in 1..sr {
            let g = isochronic_gate(10.0, i as f32 / sr as f32);
            if g != prev {
                transitions += 1;
            }
            prev = g;
        }
        assert_eq!(transitions, 20);
    }
}
