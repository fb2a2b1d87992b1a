use crate::dsp::{self, NoiseState};
use crate::error::RenderError;
use crate::models::{AudioLayer, ChannelParams, LayerKind};
use crate::render::{interleave_stereo, render_mono, LoopBuffer};

/// One synthesis mode. A strategy renders a complete looped buffer for the
/// current modulation (beat/pulse) frequency; the mixer decides when the
/// modulation has drifted far enough to warrant a re-render.
pub trait BufferSynthesisStrategy: Send {
    fn render(
        &mut self,
        modulation_hz: f32,
        sample_rate: u32,
        frames: usize,
    ) -> Result<LoopBuffer, RenderError>;
}

/// Two independent mono streams: left at the carrier, right offset by the
/// beat frequency. Ramping moves the right channel only.
pub struct BinauralStrategy {
    params: ChannelParams,
    left_hz: f32,
    right_hz: f32,
}

impl BinauralStrategy {
    pub fn new(params: ChannelParams) -> Self {
        Self {
            left_hz: params.base_freq,
            right_hz: params.base_freq + params.beat_freq,
            params,
        }
    }

    pub fn left_frequency(&self) -> f32 {
        self.left_hz
    }

    pub fn right_frequency(&self) -> f32 {
        self.right_hz
    }
}

impl BufferSynthesisStrategy for BinauralStrategy {
    fn render(
        &mut self,
        modulation_hz: f32,
        sample_rate: u32,
        frames: usize,
    ) -> Result<LoopBuffer, RenderError> {
        self.left_hz = self.params.base_freq;
        self.right_hz = self.params.base_freq + modulation_hz;
        let mut scratch = NoiseState::with_seed(0); // pitched carriers only
        let left = render_mono(
            self.params.waveform,
            self.left_hz,
            sample_rate,
            frames,
            &mut scratch,
        )?;
        let right = render_mono(
            self.params.waveform,
            self.right_hz,
            sample_rate,
            frames,
            &mut scratch,
        )?;
        Ok(interleave_stereo(&left, &right, sample_rate))
    }
}

/// One stream, identical on both channels, amplitude-gated at the pulse rate
/// by a thresholded sine (50% duty).
pub struct IsochronicStrategy {
    params: ChannelParams,
}

impl IsochronicStrategy {
    pub fn new(params: ChannelParams) -> Self {
        Self { params }
    }
}

impl BufferSynthesisStrategy for IsochronicStrategy {
    fn render(
        &mut self,
        modulation_hz: f32,
        sample_rate: u32,
        frames: usize,
    ) -> Result<LoopBuffer, RenderError> {
        if !modulation_hz.is_finite() {
            return Err(RenderError::NonFiniteFrequency(modulation_hz));
        }
        if frames == 0 {
            return Err(RenderError::EmptyBuffer);
        }
        let mut noise = NoiseState::with_seed(0);
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let carrier = dsp::sample(self.params.waveform, self.params.base_freq, t, &mut noise);
            let s = carrier * dsp::isochronic_gate(modulation_hz, t);
            samples.push(s);
            samples.push(s);
        }
        Ok(LoopBuffer {
            samples,
            sample_rate,
            channels: 2,
        })
    }
}

/// Plain un-gated carrier, identical on both channels.
pub struct ToneStrategy {
    params: ChannelParams,
}

impl ToneStrategy {
    pub fn new(params: ChannelParams) -> Self {
        Self { params }
    }
}

impl BufferSynthesisStrategy for ToneStrategy {
    fn render(
        &mut self,
        _modulation_hz: f32,
        sample_rate: u32,
        frames: usize,
    ) -> Result<LoopBuffer, RenderError> {
        let mut scratch = NoiseState::with_seed(0);
        let mono = render_mono(
            self.params.waveform,
            self.params.base_freq,
            sample_rate,
            frames,
            &mut scratch,
        )?;
        Ok(interleave_stereo(&mono, &mono, sample_rate))
    }
}

/// Ambient noise bed. Owns its filter state; left and right are drawn
/// independently so the channels decorrelate.
pub struct AmbientNoiseStrategy {
    params: ChannelParams,
    noise: NoiseState,
}

impl AmbientNoiseStrategy {
    pub fn new(params: ChannelParams) -> Self {
        Self {
            params,
            noise: NoiseState::new(),
        }
    }

    #[cfg(test)]
    pub fn with_seed(params: ChannelParams, seed: u64) -> Self {
        Self {
            params,
            noise: NoiseState::with_seed(seed),
        }
    }
}

impl BufferSynthesisStrategy for AmbientNoiseStrategy {
    fn render(
        &mut self,
        _modulation_hz: f32,
        sample_rate: u32,
        frames: usize,
    ) -> Result<LoopBuffer, RenderError> {
        if frames == 0 {
            return Err(RenderError::EmptyBuffer);
        }
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            samples.push(dsp::sample(self.params.waveform, 0.0, t, &mut self.noise));
            samples.push(dsp::sample(self.params.waveform, 0.0, t, &mut self.noise));
        }
        Ok(LoopBuffer {
            samples,
            sample_rate,
            channels: 2,
        })
    }
}

/// Build the synthesis strategy for a layer. Each call hands out fresh
/// state, so two layers never share a noise filter.
pub fn strategy_for_layer(layer: &AudioLayer) -> Box<dyn BufferSynthesisStrategy> {
    match layer.kind {
        LayerKind::Binaural => Box::new(BinauralStrategy::new(layer.params)),
        LayerKind::Isochronic => Box::new(IsochronicStrategy::new(layer.params)),
        LayerKind::Tone => Box::new(ToneStrategy::new(layer.params)),
        LayerKind::Ambient => Box::new(AmbientNoiseStrategy::new(layer.params)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WaveformKind;

    fn params(base: f32, beat: f32) -> ChannelParams {
        ChannelParams {
            base_freq: base,
            beat_freq: beat,
            waveform: WaveformKind::Sine,
            volume: 0.5,
        }
    }

    #[test]
    fn binaural_offsets_right_channel_by_beat() {
        let mut voice = BinauralStrategy::new(params(200.0, 7.0));
        voice.render(7.0, 44100, 4410).unwrap();
        assert_eq!(voice.right_frequency(), voice.left_frequency() + 7.0);
        // a ramp update keeps the relation and leaves the left channel alone
        voice.render(9.5, 44100, 4410).unwrap();
        assert_eq!(voice.left_frequency(), 200.0);
        assert!((voice.right_frequency() - (voice.left_frequency() + 9.5)).abs() < 1e-6);
    }

    #[test]
    fn binaural_channels_carry_their_own_frequencies() {
        let mut voice = BinauralStrategy::new(params(200.0, 10.0));
        let buf = voice.render(10.0, 44100, 1024).unwrap();
        for i in 0..buf.frames() {
            let t = i as f32 / 44100.0;
            let expect_l = (2.0 * std::f32::consts::PI * 200.0 * t).sin();
            let expect_r = (2.0 * std::f32::consts::PI * 210.0 * t).sin();
            assert!((buf.samples[i * 2] - expect_l).abs() < 1e-4);
            assert!((buf.samples[i * 2 + 1] - expect_r).abs() < 1e-4);
        }
    }

    #[test]
    fn isochronic_gate_count_is_pulse_rate() {
        // carrierHz=250, pulseHz=10 over one second: exactly 20 gate
        // transitions, independent of the carrier
        let sr = 44100;
        let mut voice = IsochronicStrategy::new(params(250.0, 10.0));
        let buf = voice.render(10.0, sr, sr as usize).unwrap();
        let mut transitions = 0;
        let mut prev = dsp::isochronic_gate(10.0, 0.0);
        for i in 1..buf.frames() {
            let g = dsp::isochronic_gate(10.0, i as f32 / sr as f32);
            if g != prev {
                transitions += 1;
            }
            prev = g;
            // gated-off frames are silent on both channels
            if g == 0.0 {
                assert_eq!(buf.samples[i * 2], 0.0);
                assert_eq!(buf.samples[i * 2 + 1], 0.0);
            }
            assert_eq!(buf.samples[i * 2], buf.samples[i * 2 + 1]);
        }
        assert_eq!(transitions, 20);
    }

    #[test]
    fn tone_ignores_modulation() {
        let mut voice = ToneStrategy::new(params(300.0, 0.0));
        let a = voice.render(1.0, 44100, 512).unwrap();
        let b = voice.render(50.0, 44100, 512).unwrap();
        assert_eq!(a.samples, b.samples);
    }

    #[test]
    fn ambient_layers_are_independent() {
        let p = ChannelParams {
            base_freq: 0.0,
            beat_freq: 0.0,
            waveform: WaveformKind::BrownNoise,
            volume: 0.5,
        };
        let mut a = AmbientNoiseStrategy::with_seed(p, 5);
        let mut b = AmbientNoiseStrategy::with_seed(p, 6);
        let ba = a.render(0.0, 44100, 2048).unwrap();
        let bb = b.render(0.0, 44100, 2048).unwrap();
        assert_ne!(ba.samples, bb.samples);
    }
}
