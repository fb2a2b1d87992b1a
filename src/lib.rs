//! Buffer synthesis, frequency-ramp and multi-layer mixing engine for
//! entrainment sound sessions.
//!
//! The crate turns a small set of numeric parameters (frequencies, waveform
//! kind, duration, ramp curve, per-layer gains) into complete, ready-to-loop
//! sample buffers, and evolves those parameters over wall-clock time while a
//! session is live. Playback itself belongs to an external output
//! collaborator behind the [`mixer::OutputSink`] port; this crate only ever
//! hands it finished buffers and gain values.

pub mod clock;
pub mod dsp;
pub mod error;
pub mod fade;
pub mod mixer;
pub mod models;
pub mod ramp;
pub mod render;
pub mod session;
pub mod voices;

use parking_lot::Mutex;
use std::sync::Arc;

pub use clock::PlaybackState;
pub use error::{ConfigError, RenderError};
pub use mixer::OutputSink;
pub use models::{
    AudioLayer, ChannelParams, EngineConfig, LayerId, LayerKind, RampConfig, RampCurve,
    RampPattern, SessionConfig, WaveformKind,
};
pub use render::LoopBuffer;
pub use session::{SessionEngine, TickEvent};

/// Engine handle shared between the owner's control surface and its timer
/// callback. All engine work happens under this lock on the control
/// timeline; the real-time render path never takes it.
pub type SharedEngine = Arc<Mutex<SessionEngine>>;

pub fn into_shared(engine: SessionEngine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}
