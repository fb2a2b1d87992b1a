use crate::dsp::{self, NoiseState};
use crate::error::RenderError;
use crate::models::WaveformKind;

/// A complete, ready-to-loop block of interleaved samples. Published to the
/// output collaborator behind an `Arc` and never mutated afterwards; buffer
/// replacement is a pointer swap, not an in-place write.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl LoopBuffer {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

fn check(freq: f32, frames: usize) -> Result<(), RenderError> {
    if !freq.is_finite() {
        return Err(RenderError::NonFiniteFrequency(freq));
    }
    if frames == 0 {
        return Err(RenderError::EmptyBuffer);
    }
    Ok(())
}

/// Fill a mono block of `frames` samples of `kind` at `freq`, with
/// `t = i / sample_rate`. The loop seam is not phase-aligned; the resulting
/// discontinuity is accepted for this domain.
pub fn render_mono(
    kind: WaveformKind,
    freq: f32,
    sample_rate: u32,
    frames: usize,
    noise: &mut NoiseState,
) -> Result<Vec<f32>, RenderError> {
    check(freq, frames)?;
    let mut out = Vec::with_capacity(frames);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        out.push(dsp::sample(kind, freq, t, noise));
    }
    Ok(out)
}

/// Interleave two equal-length mono blocks into a stereo `LoopBuffer`.
pub fn interleave_stereo(left: &[f32], right: &[f32], sample_rate: u32) -> LoopBuffer {
    debug_assert_eq!(left.len(), right.len());
    let mut samples = Vec::with_capacity(left.len() * 2);
    for (l, r) in left.iter().zip(right) {
        samples.push(*l);
        samples.push(*r);
    }
    LoopBuffer {
        samples,
        sample_rate,
        channels: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_expected_frame_count() {
        let mut noise = NoiseState::with_seed(3);
        let block = render_mono(WaveformKind::Sine, 250.0, 44100, 44100, &mut noise).unwrap();
        assert_eq!(block.len(), 44100);
    }

    #[test]
    fn sample_times_are_index_over_rate() {
        let mut noise = NoiseState::with_seed(3);
        let sr = 8000;
        let block = render_mono(WaveformKind::Sine, 100.0, sr, 64, &mut noise).unwrap();
        for (i, v) in block.iter().enumerate() {
            let expected = (2.0 * std::f32::consts::PI * 100.0 * i as f32 / sr as f32).sin();
            assert!((v - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_degenerate_requests() {
        let mut noise = NoiseState::with_seed(3);
        assert!(matches!(
            render_mono(WaveformKind::Sine, f32::NAN, 44100, 16, &mut noise),
            Err(RenderError::NonFiniteFrequency(_))
        ));
        assert!(matches!(
            render_mono(WaveformKind::Sine, 200.0, 44100, 0, &mut noise),
            Err(RenderError::EmptyBuffer)
        ));
    }

    #[test]
    fn interleaving_alternates_channels() {
        let buf = interleave_stereo(&[1.0, 2.0], &[-1.0, -2.0], 44100);
        assert_eq!(buf.samples, vec![1.0, -1.0, 2.0, -2.0]);
        assert_eq!(buf.frames(), 2);
        assert!((buf.duration_seconds() - 2.0 / 44100.0).abs() < 1e-12);
    }
}
