use std::sync::Arc;

use log::{debug, warn};

use crate::models::{AudioLayer, EngineConfig, LayerId};
use crate::render::LoopBuffer;
use crate::voices::{strategy_for_layer, BufferSynthesisStrategy};

/// Boundary to the real-time output collaborator. Buffers arrive complete
/// and immutable behind an `Arc`; replacing a layer's buffer is a pointer
/// swap on the sink side, never an in-place mutation of samples the render
/// path may be mid-loop through.
pub trait OutputSink: Send {
    fn submit_buffer(&mut self, layer: LayerId, buffer: Arc<LoopBuffer>);
    fn set_gain(&mut self, layer: LayerId, gain: f32);
    fn remove_layer(&mut self, layer: LayerId);
}

/// Gain contributed by one layer to the mix.
pub fn effective_gain(layer_volume: f32, master_volume: f32) -> f32 {
    layer_volume.clamp(0.0, 1.0) * master_volume.clamp(0.0, 1.0)
}

struct LayerSlot {
    layer: AudioLayer,
    strategy: Box<dyn BufferSynthesisStrategy>,
    /// Modulation frequency baked into the currently published buffer.
    rendered_hz: f32,
    /// Elapsed time of the last drift check, for the once-per-second bound.
    last_check_seconds: f64,
    /// Cleared after a render failure; the layer sits out the rest of the
    /// session but keeps its configuration.
    live: bool,
    published: bool,
}

impl LayerSlot {
    fn new(layer: AudioLayer) -> Self {
        let strategy = strategy_for_layer(&layer);
        Self {
            layer,
            strategy,
            rendered_hz: 0.0,
            last_check_seconds: f64::NEG_INFINITY,
            live: true,
            published: false,
        }
    }

    /// The frequency this layer's buffer should currently be rendered at.
    /// Entrainment layers follow the session beat when a ramp is active;
    /// tone and ambient layers stay at their own configuration.
    fn target_hz(&self, session_beat: Option<f32>) -> f32 {
        if self.layer.kind.is_entrainment() {
            session_beat.unwrap_or(self.layer.params.beat_freq)
        } else {
            self.layer.params.base_freq
        }
    }
}

/// Owns the session's layers and the re-render policy. All rendering happens
/// on the control timeline; the sink only ever sees finished buffers.
pub struct LayerMixer {
    slots: Vec<LayerSlot>,
    master_gain: f32,
    sample_rate: u32,
    loop_frames: usize,
    retune_threshold_hz: f32,
    retune_check_seconds: f64,
}

impl LayerMixer {
    pub fn new(sample_rate: u32, master_gain: f32, engine: &EngineConfig) -> Self {
        let loop_frames = ((sample_rate as f32 * engine.loop_seconds) as usize).max(1);
        Self {
            slots: Vec::new(),
            master_gain,
            sample_rate,
            loop_frames,
            retune_threshold_hz: engine.retune_threshold_hz,
            retune_check_seconds: engine.retune_check_seconds,
        }
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn layer(&self, id: LayerId) -> Option<&AudioLayer> {
        self.slots.iter().find(|s| s.layer.id == id).map(|s| &s.layer)
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.slots.iter().map(|s| s.layer.id).collect()
    }

    fn slot_mut(&mut self, id: LayerId) -> Option<&mut LayerSlot> {
        self.slots.iter_mut().find(|s| s.layer.id == id)
    }

    /// Add a layer; if the session is live it is rendered and published
    /// immediately without touching the other layers.
    pub fn add_layer(
        &mut self,
        layer: AudioLayer,
        elapsed_seconds: f64,
        session_beat: Option<f32>,
        sink: &mut dyn OutputSink,
    ) {
        // replacing an existing id behaves as an update
        if self.layer(layer.id).is_some() {
            self.update_layer(layer, elapsed_seconds, session_beat, sink);
            return;
        }
        let mut slot = LayerSlot::new(layer);
        if slot.layer.enabled {
            Self::publish(
                &mut slot,
                elapsed_seconds,
                session_beat,
                self.sample_rate,
                self.loop_frames,
                self.master_gain,
                sink,
            );
        }
        self.slots.push(slot);
    }

    /// Insert or replace a layer without rendering anything. Used while the
    /// session is idle; the staged slot is first published by `publish_all`.
    pub fn stage_layer(&mut self, layer: AudioLayer) {
        if let Some(slot) = self.slot_mut(layer.id) {
            *slot = LayerSlot::new(layer);
        } else {
            self.slots.push(LayerSlot::new(layer));
        }
    }

    pub fn remove_layer(&mut self, id: LayerId, sink: &mut dyn OutputSink) {
        if let Some(pos) = self.slots.iter().position(|s| s.layer.id == id) {
            let slot = self.slots.remove(pos);
            if slot.published {
                sink.remove_layer(id);
            }
        }
    }

    /// Replace a layer's configuration in place. A disabled layer keeps its
    /// slot (and configuration) but stops producing output; re-enabling
    /// re-renders against the current session time.
    pub fn update_layer(
        &mut self,
        layer: AudioLayer,
        elapsed_seconds: f64,
        session_beat: Option<f32>,
        sink: &mut dyn OutputSink,
    ) {
        let sample_rate = self.sample_rate;
        let loop_frames = self.loop_frames;
        let master_gain = self.master_gain;
        let Some(slot) = self.slot_mut(layer.id) else {
            self.add_layer(layer, elapsed_seconds, session_beat, sink);
            return;
        };
        let was_published = slot.published;
        slot.layer = layer;
        slot.strategy = strategy_for_layer(&slot.layer);
        slot.live = true;
        slot.published = false;
        slot.last_check_seconds = f64::NEG_INFINITY;
        if slot.layer.enabled {
            Self::publish(
                slot,
                elapsed_seconds,
                session_beat,
                sample_rate,
                loop_frames,
                master_gain,
                sink,
            );
        } else if was_published {
            sink.remove_layer(slot.layer.id);
        }
    }

    pub fn set_layer_gain(&mut self, id: LayerId, volume: f32, sink: &mut dyn OutputSink) {
        let master = self.master_gain;
        if let Some(slot) = self.slot_mut(id) {
            slot.layer.params.volume = volume;
            if slot.published {
                sink.set_gain(id, effective_gain(volume, master));
            }
        }
    }

    /// Push a new master gain to every published layer. Gain changes are
    /// independent of rendering and never block it.
    pub fn set_master_gain(&mut self, volume: f32, sink: &mut dyn OutputSink) {
        self.master_gain = volume;
        for slot in &self.slots {
            if slot.published {
                sink.set_gain(
                    slot.layer.id,
                    effective_gain(slot.layer.params.volume, volume),
                );
            }
        }
    }

    /// Render every enabled slot that has no buffer out: the initial publish
    /// at session start, covering staged layers and slots surviving a stop.
    pub fn publish_all(
        &mut self,
        elapsed_seconds: f64,
        session_beat: Option<f32>,
        sink: &mut dyn OutputSink,
    ) {
        let sample_rate = self.sample_rate;
        let loop_frames = self.loop_frames;
        let master_gain = self.master_gain;
        for slot in &mut self.slots {
            if slot.layer.enabled && slot.live && !slot.published {
                Self::publish(
                    slot,
                    elapsed_seconds,
                    session_beat,
                    sample_rate,
                    loop_frames,
                    master_gain,
                    sink,
                );
            }
        }
    }

    /// Ramp follow-up: re-render any published entrainment layer whose
    /// target frequency has drifted more than the threshold from what its
    /// buffer was rendered at, checking each layer at most once per
    /// `retune_check_seconds` of elapsed playback.
    pub fn retune(
        &mut self,
        elapsed_seconds: f64,
        session_beat: Option<f32>,
        sink: &mut dyn OutputSink,
    ) {
        let sample_rate = self.sample_rate;
        let loop_frames = self.loop_frames;
        let master_gain = self.master_gain;
        let threshold = self.retune_threshold_hz;
        let check_every = self.retune_check_seconds;
        for slot in &mut self.slots {
            if !slot.published || !slot.live {
                continue;
            }
            if elapsed_seconds - slot.last_check_seconds < check_every {
                continue;
            }
            slot.last_check_seconds = elapsed_seconds;
            let target = slot.target_hz(session_beat);
            if (target - slot.rendered_hz).abs() > threshold {
                debug!(
                    "layer {}: retuning {:.3} Hz -> {:.3} Hz at t={:.1}s",
                    slot.layer.id, slot.rendered_hz, target, elapsed_seconds
                );
                Self::publish(
                    slot,
                    elapsed_seconds,
                    session_beat,
                    sample_rate,
                    loop_frames,
                    master_gain,
                    sink,
                );
            }
        }
    }

    /// Withdraw every published buffer. Used by stop; slots and their
    /// configuration survive for a later restart.
    pub fn unpublish_all(&mut self, sink: &mut dyn OutputSink) {
        for slot in &mut self.slots {
            if slot.published {
                sink.remove_layer(slot.layer.id);
                slot.published = false;
            }
            slot.rendered_hz = 0.0;
            slot.last_check_seconds = f64::NEG_INFINITY;
            slot.live = true;
        }
    }

    fn publish(
        slot: &mut LayerSlot,
        elapsed_seconds: f64,
        session_beat: Option<f32>,
        sample_rate: u32,
        loop_frames: usize,
        master_gain: f32,
        sink: &mut dyn OutputSink,
    ) {
        let target = slot.target_hz(session_beat);
        match slot.strategy.render(target, sample_rate, loop_frames) {
            Ok(buffer) => {
                sink.submit_buffer(slot.layer.id, Arc::new(buffer));
                sink.set_gain(
                    slot.layer.id,
                    effective_gain(slot.layer.params.volume, master_gain),
                );
                slot.rendered_hz = target;
                slot.last_check_seconds = elapsed_seconds;
                slot.published = true;
            }
            Err(err) => {
                // terminal for this layer only; the rest of the mix continues
                warn!("layer {}: render failed, disabling: {err}", slot.layer.id);
                if slot.published {
                    sink.remove_layer(slot.layer.id);
                    slot.published = false;
                }
                slot.live = false;
            }
        }
    }
}
