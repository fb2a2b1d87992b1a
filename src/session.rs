use std::time::Instant;

use log::debug;

use crate::clock::{PlaybackState, SessionClock};
use crate::error::ConfigError;
use crate::fade::FadeEnvelope;
use crate::mixer::{LayerMixer, OutputSink};
use crate::models::{AudioLayer, EngineConfig, LayerId, SessionConfig};
use crate::ramp;

/// Result of one control tick, for the scheduler collaborator to relay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickEvent {
    /// Not playing; nothing was done.
    Inactive,
    Running {
        elapsed_seconds: f64,
    },
    /// Emitted exactly once, the first tick at or past the total duration.
    Completed {
        elapsed_seconds: f64,
    },
}

/// Drives one session: validates configuration up front, then turns periodic
/// `tick(now)` calls from the external scheduler into ramp re-evaluation,
/// buffer re-renders and gain updates. Within a tick the order is fixed:
/// fade, then ramp, then re-render, then completion check.
pub struct SessionEngine {
    config: SessionConfig,
    clock: SessionClock,
    mixer: LayerMixer,
    fade: Option<FadeEnvelope>,
    completion_signaled: bool,
}

impl SessionEngine {
    /// Validation happens here, before any buffer work; an invalid
    /// configuration never constructs an engine.
    pub fn new(config: SessionConfig, engine: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mixer = LayerMixer::new(config.sample_rate, config.master_volume, engine);
        Ok(Self {
            config,
            clock: SessionClock::new(),
            mixer,
            fade: None,
            completion_signaled: false,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn elapsed_seconds(&self, now: Instant) -> f64 {
        self.clock.elapsed_seconds(now)
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.config.total_duration_seconds
    }

    /// The beat/pulse frequency entrainment layers should currently follow,
    /// or `None` when no ramp is active.
    fn session_beat(&self, elapsed: f64) -> Option<f32> {
        if self.config.ramp.enabled {
            Some(ramp::frequency_at(
                &self.config.ramp,
                elapsed,
                self.config.total_duration_seconds,
            ))
        } else {
            None
        }
    }

    /// Begin playback: render and publish every enabled layer, then fade in
    /// from silence to the configured master volume. No-op unless idle.
    pub fn start(&mut self, now: Instant, sink: &mut dyn OutputSink) {
        if !self.clock.start(now) {
            return;
        }
        debug!("session start: {} layer(s)", self.config.layers.len());
        self.completion_signaled = false;
        // silence first so freshly published layers enter under the fade-in
        self.mixer.set_master_gain(0.0, sink);
        // stage any configured layer without a slot; slots staged while idle
        // or surviving a stop (including edited ones) keep their state
        for layer in self.config.layers.clone() {
            if self.mixer.layer(layer.id).is_none() {
                self.mixer.stage_layer(layer);
            }
        }
        let beat = self.session_beat(0.0);
        self.mixer.publish_all(0.0, beat, sink);
        self.fade = Some(FadeEnvelope::new(
            0.0,
            self.config.master_volume,
            self.config.fade_in_seconds,
            now,
        ));
    }

    /// One step of the control timeline. Paused and idle sessions ignore
    /// ticks entirely.
    pub fn tick(&mut self, now: Instant, sink: &mut dyn OutputSink) -> TickEvent {
        if !self.clock.is_playing() {
            return TickEvent::Inactive;
        }
        let elapsed = self.clock.elapsed_seconds(now);

        if let Some(fade) = self.fade {
            self.mixer.set_master_gain(fade.gain_at(now), sink);
            if fade.is_complete(now) {
                self.fade = None;
            }
        }

        let beat = self.session_beat(elapsed);
        self.mixer.retune(elapsed, beat, sink);

        if elapsed >= self.config.total_duration_seconds && !self.completion_signaled {
            self.completion_signaled = true;
            debug!("session complete at {elapsed:.1}s");
            return TickEvent::Completed {
                elapsed_seconds: elapsed,
            };
        }
        TickEvent::Running {
            elapsed_seconds: elapsed,
        }
    }

    /// Freeze elapsed time; no further ticks take effect until resume.
    pub fn pause(&mut self, now: Instant) {
        if self.clock.pause(now) {
            debug!("session paused at {:.1}s", self.clock.elapsed_seconds(now));
        }
    }

    pub fn resume(&mut self, now: Instant) {
        self.clock.resume(now);
    }

    /// Immediate and total: withdraw every published buffer, drop any
    /// in-flight fade, reset elapsed to zero. Safe to call repeatedly.
    pub fn stop(&mut self, sink: &mut dyn OutputSink) {
        self.fade = None;
        self.mixer.unpublish_all(sink);
        self.clock.stop();
        self.completion_signaled = false;
    }

    /// Explicit volume set; cancels any active fade (last write wins).
    pub fn set_master_volume(&mut self, volume: f32, sink: &mut dyn OutputSink) {
        self.fade = None;
        self.config.master_volume = volume;
        self.mixer.set_master_gain(volume, sink);
    }

    /// Fade the master gain from its current value toward `target` over
    /// `duration_seconds`, sampled on each tick.
    pub fn fade_to(&mut self, target: f32, duration_seconds: f64, now: Instant) {
        let current = self
            .fade
            .map(|f| f.gain_at(now))
            .unwrap_or(self.mixer.master_gain());
        self.config.master_volume = target;
        self.fade = Some(FadeEnvelope::new(current, target, duration_seconds, now));
    }

    /// Live layer edits. Validation applies to additions and updates just
    /// as it does at session start. While the session is idle the layer is
    /// only staged; `start` publishes it under the fade-in from silence.
    pub fn add_layer(
        &mut self,
        layer: AudioLayer,
        now: Instant,
        sink: &mut dyn OutputSink,
    ) -> Result<(), ConfigError> {
        layer.validate()?;
        if self.clock.state() == PlaybackState::Idle {
            self.mixer.stage_layer(layer);
            return Ok(());
        }
        let elapsed = self.clock.elapsed_seconds(now);
        let beat = self.session_beat(elapsed);
        self.mixer.add_layer(layer, elapsed, beat, sink);
        Ok(())
    }

    pub fn update_layer(
        &mut self,
        layer: AudioLayer,
        now: Instant,
        sink: &mut dyn OutputSink,
    ) -> Result<(), ConfigError> {
        layer.validate()?;
        if self.clock.state() == PlaybackState::Idle {
            self.mixer.stage_layer(layer);
            return Ok(());
        }
        let elapsed = self.clock.elapsed_seconds(now);
        let beat = self.session_beat(elapsed);
        self.mixer.update_layer(layer, elapsed, beat, sink);
        Ok(())
    }

    pub fn remove_layer(&mut self, id: LayerId, sink: &mut dyn OutputSink) {
        self.mixer.remove_layer(id, sink);
    }

    pub fn set_layer_gain(&mut self, id: LayerId, volume: f32, sink: &mut dyn OutputSink) {
        self.mixer.set_layer_gain(id, volume, sink);
    }

    pub fn layer(&self, id: LayerId) -> Option<&AudioLayer> {
        self.mixer.layer(id)
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.mixer.layer_ids()
    }
}
