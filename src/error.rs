use thiserror::Error;

use crate::models::LayerId;

/// Rejected before a session enters the `Playing` state. Nothing is rendered
/// for a configuration that fails validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("layer {layer}: carrier frequency {hz} Hz outside 100-500 Hz")]
    CarrierOutOfRange { layer: LayerId, hz: f32 },
    #[error("layer {layer}: beat/pulse frequency {hz} Hz outside 0.5-100 Hz")]
    BeatOutOfRange { layer: LayerId, hz: f32 },
    #[error("layer {layer}: noise waveform cannot drive a pitched generator")]
    NoiseCarrier { layer: LayerId },
    #[error("layer {layer}: ambient layers require a noise waveform")]
    AmbientWithoutNoise { layer: LayerId },
    #[error("ramp endpoint {hz} Hz outside 0.5-100 Hz")]
    RampOutOfRange { hz: f32 },
    #[error("session duration must be positive, got {0}")]
    NonPositiveDuration(f64),
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("duplicate layer id {0}")]
    DuplicateLayer(LayerId),
    #[error("failed to read engine config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-layer render failure. The failing layer is disabled and the rest of
/// the mix continues; this never crosses the tick loop as a panic.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("non-finite frequency {0}")]
    NonFiniteFrequency(f32),
    #[error("requested an empty buffer")]
    EmptyBuffer,
}
