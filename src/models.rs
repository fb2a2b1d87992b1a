use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

pub type LayerId = u32;

/// Valid carrier range for pitched generators, in Hz.
pub const CARRIER_HZ_RANGE: std::ops::RangeInclusive<f32> = 100.0..=500.0;
/// Valid beat/pulse range for entrainment modulation, in Hz.
pub const BEAT_HZ_RANGE: std::ops::RangeInclusive<f32> = 0.5..=100.0;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WaveformKind {
    Sine,
    Square,
    Triangle,
    Sawtooth,
    WhiteNoise,
    PinkNoise,
    BrownNoise,
}

impl WaveformKind {
    pub fn is_noise(self) -> bool {
        matches!(
            self,
            WaveformKind::WhiteNoise | WaveformKind::PinkNoise | WaveformKind::BrownNoise
        )
    }
}

fn default_volume() -> f32 {
    0.5
}

fn default_waveform() -> WaveformKind {
    WaveformKind::Sine
}

/// Per-layer synthesis parameters. `base_freq` is the audible carrier,
/// `beat_freq` is the binaural offset or isochronic pulse rate.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelParams {
    #[serde(alias = "base_freq", alias = "carrierHz")]
    pub base_freq: f32,
    #[serde(default, alias = "beat_freq", alias = "pulseHz")]
    pub beat_freq: f32,
    #[serde(default = "default_waveform")]
    pub waveform: WaveformKind,
    #[serde(default = "default_volume", alias = "gain")]
    pub volume: f32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RampPattern {
    #[default]
    None,
    Ascending,
    Descending,
    AscendingThenDescending,
    DescendingThenAscending,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RampCurve {
    #[default]
    Linear,
    Exponential,
    Logarithmic,
}

/// Scheduled sweep of the beat/pulse frequency over (part of) the session.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RampConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub pattern: RampPattern,
    #[serde(default)]
    pub curve: RampCurve,
    #[serde(default, alias = "start_hz")]
    pub start_hz: f32,
    #[serde(default, alias = "end_hz")]
    pub end_hz: f32,
    #[serde(default, alias = "ramp_duration", alias = "rampDuration")]
    pub ramp_duration_seconds: f64,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pattern: RampPattern::None,
            curve: RampCurve::Linear,
            start_hz: 0.0,
            end_hz: 0.0,
            ramp_duration_seconds: 0.0,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LayerKind {
    Binaural,
    Isochronic,
    Tone,
    Ambient,
}

impl LayerKind {
    /// Entrainment layers follow the session ramp; tone and ambient do not.
    pub fn is_entrainment(self) -> bool {
        matches!(self, LayerKind::Binaural | LayerKind::Isochronic)
    }
}

fn default_enabled() -> bool {
    true
}

/// One independently-configured, independently-gained sound source.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioLayer {
    pub id: LayerId,
    pub kind: LayerKind,
    #[serde(flatten)]
    pub params: ChannelParams,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl AudioLayer {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.kind {
            LayerKind::Ambient => {
                if !self.params.waveform.is_noise() {
                    return Err(ConfigError::AmbientWithoutNoise { layer: self.id });
                }
            }
            LayerKind::Tone => {
                if self.params.waveform.is_noise() {
                    return Err(ConfigError::NoiseCarrier { layer: self.id });
                }
                if !CARRIER_HZ_RANGE.contains(&self.params.base_freq) {
                    return Err(ConfigError::CarrierOutOfRange {
                        layer: self.id,
                        hz: self.params.base_freq,
                    });
                }
            }
            LayerKind::Binaural | LayerKind::Isochronic => {
                if self.params.waveform.is_noise() {
                    return Err(ConfigError::NoiseCarrier { layer: self.id });
                }
                if !CARRIER_HZ_RANGE.contains(&self.params.base_freq) {
                    return Err(ConfigError::CarrierOutOfRange {
                        layer: self.id,
                        hz: self.params.base_freq,
                    });
                }
                if !BEAT_HZ_RANGE.contains(&self.params.beat_freq) {
                    return Err(ConfigError::BeatOutOfRange {
                        layer: self.id,
                        hz: self.params.beat_freq,
                    });
                }
            }
        }
        Ok(())
    }
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_master_volume() -> f32 {
    0.8
}

fn default_fade_seconds() -> f64 {
    2.0
}

/// A whole session as supplied by the configuration collaborator.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default = "default_sample_rate", alias = "sample_rate")]
    pub sample_rate: u32,
    #[serde(alias = "duration", alias = "total_duration_seconds")]
    pub total_duration_seconds: f64,
    #[serde(default = "default_master_volume", alias = "master_volume")]
    pub master_volume: f32,
    #[serde(default = "default_fade_seconds", alias = "fade_in")]
    pub fade_in_seconds: f64,
    #[serde(default = "default_fade_seconds", alias = "fade_out")]
    pub fade_out_seconds: f64,
    #[serde(default)]
    pub ramp: RampConfig,
    pub layers: Vec<AudioLayer>,
}

impl SessionConfig {
    /// Full validation, run before any buffer work. A session that fails
    /// here never starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if !(self.total_duration_seconds > 0.0) {
            return Err(ConfigError::NonPositiveDuration(self.total_duration_seconds));
        }
        // an active ramp overrides every entrainment layer's beat, so its
        // endpoints face the same range check as per-layer frequencies
        if self.ramp.enabled && self.ramp.pattern != RampPattern::None {
            for hz in [self.ramp.start_hz, self.ramp.end_hz] {
                if !BEAT_HZ_RANGE.contains(&hz) {
                    return Err(ConfigError::RampOutOfRange { hz });
                }
            }
        }
        let mut seen: Vec<LayerId> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            if seen.contains(&layer.id) {
                return Err(ConfigError::DuplicateLayer(layer.id));
            }
            seen.push(layer.id);
            layer.validate()?;
        }
        Ok(())
    }
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_loop_seconds() -> f32 {
    1.0
}

fn default_retune_threshold_hz() -> f32 {
    0.1
}

fn default_retune_check_seconds() -> f64 {
    1.0
}

/// Engine tuning knobs, loadable from TOML. Constructed once by the owner
/// and passed in; the engine holds no global state.
#[derive(Deserialize, Debug, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Length of each looped buffer, in seconds of audio.
    #[serde(default = "default_loop_seconds")]
    pub loop_seconds: f32,
    /// Frequency drift that triggers a re-render of a layer's buffer.
    #[serde(default = "default_retune_threshold_hz")]
    pub retune_threshold_hz: f32,
    /// Minimum elapsed playback time between drift checks for one layer.
    #[serde(default = "default_retune_check_seconds")]
    pub retune_check_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            loop_seconds: default_loop_seconds(),
            retune_threshold_hz: default_retune_threshold_hz(),
            retune_check_seconds: default_retune_check_seconds(),
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let txt = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&txt)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binaural_layer() -> AudioLayer {
        AudioLayer {
            id: 1,
            kind: LayerKind::Binaural,
            params: ChannelParams {
                base_freq: 200.0,
                beat_freq: 7.0,
                waveform: WaveformKind::Sine,
                volume: 0.5,
            },
            enabled: true,
        }
    }

    #[test]
    fn accepts_valid_session() {
        let cfg = SessionConfig {
            sample_rate: 44100,
            total_duration_seconds: 600.0,
            master_volume: 0.8,
            fade_in_seconds: 2.0,
            fade_out_seconds: 2.0,
            ramp: RampConfig::default(),
            layers: vec![binaural_layer()],
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_frequencies() {
        let mut layer = binaural_layer();
        layer.params.base_freq = 50.0;
        assert!(matches!(
            layer.validate(),
            Err(ConfigError::CarrierOutOfRange { .. })
        ));

        let mut layer = binaural_layer();
        layer.params.beat_freq = 0.1;
        assert!(matches!(
            layer.validate(),
            Err(ConfigError::BeatOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_ramp_endpoints_outside_beat_range() {
        // startHz defaults to 0.0 when omitted; an enabled ramp must not
        // sweep layers below 0.5 Hz or above 100 Hz
        let ramp = RampConfig {
            enabled: true,
            pattern: RampPattern::Ascending,
            curve: RampCurve::Linear,
            start_hz: 0.0,
            end_hz: 400.0,
            ramp_duration_seconds: 300.0,
        };
        let cfg = SessionConfig {
            sample_rate: 44100,
            total_duration_seconds: 600.0,
            master_volume: 0.8,
            fade_in_seconds: 2.0,
            fade_out_seconds: 2.0,
            ramp,
            layers: vec![binaural_layer()],
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RampOutOfRange { .. })
        ));

        // a disabled ramp is inert; its endpoints are never consulted
        let mut cfg = cfg;
        cfg.ramp.enabled = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_noise_carrier_and_pitched_ambient() {
        let mut layer = binaural_layer();
        layer.params.waveform = WaveformKind::PinkNoise;
        assert!(matches!(
            layer.validate(),
            Err(ConfigError::NoiseCarrier { .. })
        ));

        let mut layer = binaural_layer();
        layer.kind = LayerKind::Ambient;
        assert!(matches!(
            layer.validate(),
            Err(ConfigError::AmbientWithoutNoise { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let cfg = SessionConfig {
            sample_rate: 44100,
            total_duration_seconds: 0.0,
            master_volume: 0.8,
            fade_in_seconds: 2.0,
            fade_out_seconds: 2.0,
            ramp: RampConfig::default(),
            layers: vec![],
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveDuration(_))
        ));
    }

    #[test]
    fn parses_camel_case_json() {
        let json = r#"{
            "sampleRate": 48000,
            "totalDurationSeconds": 1200,
            "masterVolume": 0.7,
            "ramp": {
                "enabled": true,
                "pattern": "ascendingThenDescending",
                "curve": "linear",
                "startHz": 2.0,
                "endHz": 10.0,
                "rampDurationSeconds": 600.0
            },
            "layers": [
                {
                    "id": 0,
                    "kind": "binaural",
                    "baseFreq": 220.0,
                    "beatFreq": 4.5,
                    "waveform": "sine",
                    "volume": 0.6
                },
                {
                    "id": 1,
                    "kind": "ambient",
                    "baseFreq": 0.0,
                    "waveform": "pinkNoise",
                    "volume": 0.3,
                    "enabled": false
                }
            ]
        }"#;
        let cfg: SessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.sample_rate, 48000);
        assert_eq!(cfg.layers.len(), 2);
        assert_eq!(cfg.layers[0].kind, LayerKind::Binaural);
        assert!(!cfg.layers[1].enabled);
        assert_eq!(cfg.ramp.pattern, RampPattern::AscendingThenDescending);
        assert!(cfg.validate().is_ok());
    }
}
