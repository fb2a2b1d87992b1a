use clap::{Args as ClapArgs, Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use entrainment_engine::{
    into_shared, EngineConfig, LayerId, LoopBuffer, OutputSink, SessionConfig, SessionEngine,
    TickEvent,
};

/// CLI for rendering an entrainment session to a WAV file
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a session JSON file to WAV
    Render(RenderArgs),
    /// Generate a default engine config file and exit
    GenerateConfig(ConfigArgs),
}

#[derive(ClapArgs)]
struct RenderArgs {
    /// Path to the session JSON file
    #[arg(long)]
    path: String,
    /// Output WAV path
    #[arg(long, default_value = "session.wav")]
    out: String,
    /// Optional engine config TOML
    #[arg(long)]
    engine_config: Option<String>,
}

#[derive(ClapArgs)]
struct ConfigArgs {
    /// Output path for the generated configuration
    #[arg(long, default_value = "engine.toml")]
    out: String,
}

const DEFAULT_ENGINE_TOML: &str = "\
tick_interval_ms = 100
loop_seconds = 1.0
retune_threshold_hz = 0.1
retune_check_seconds = 1.0
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // surface engine warnings (disabled layers, retune diagnostics) on stderr
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => render_command(args)?,
        Commands::GenerateConfig(cfg) => {
            std::fs::write(&cfg.out, DEFAULT_ENGINE_TOML)?;
            println!("Generated default engine config at {}", cfg.out);
        }
    }
    Ok(())
}

/// Stand-in for the platform output collaborator: keeps the latest published
/// buffer per layer and mixes them, looped, into fixed-size blocks.
struct OfflineMixSink {
    layers: HashMap<LayerId, PlayingLayer>,
}

struct PlayingLayer {
    buffer: Arc<LoopBuffer>,
    gain: f32,
    position: usize,
}

impl OfflineMixSink {
    fn new() -> Self {
        Self {
            layers: HashMap::new(),
        }
    }

    fn mix_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        for layer in self.layers.values_mut() {
            let samples = &layer.buffer.samples;
            if samples.is_empty() {
                continue;
            }
            let mut pos = layer.position;
            for v in out.iter_mut() {
                *v += samples[pos] * layer.gain;
                pos += 1;
                if pos >= samples.len() {
                    pos = 0;
                }
            }
            layer.position = pos;
        }
    }
}

impl OutputSink for OfflineMixSink {
    fn submit_buffer(&mut self, layer: LayerId, buffer: Arc<LoopBuffer>) {
        let entry = self.layers.entry(layer).or_insert(PlayingLayer {
            buffer: buffer.clone(),
            gain: 0.0,
            position: 0,
        });
        // swap the pointer; never write into a buffer already handed out
        entry.buffer = buffer;
        entry.position = 0;
    }

    fn set_gain(&mut self, layer: LayerId, gain: f32) {
        if let Some(entry) = self.layers.get_mut(&layer) {
            entry.gain = gain;
        }
    }

    fn remove_layer(&mut self, layer: LayerId) {
        self.layers.remove(&layer);
    }
}

fn render_command(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let json_str = std::fs::read_to_string(&args.path)?;
    let session: SessionConfig = serde_json::from_str(&json_str)?;
    let engine_cfg = match &args.engine_config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let sample_rate = session.sample_rate;
    let total_seconds = session.total_duration_seconds;
    let tick = Duration::from_millis(engine_cfg.tick_interval_ms);
    let block_frames =
        ((sample_rate as u64 * engine_cfg.tick_interval_ms) / 1000).max(1) as usize;

    let engine = into_shared(SessionEngine::new(session, &engine_cfg)?);
    let mut sink = OfflineMixSink::new();

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.out, spec)?;

    // simulated control timeline: one tick per block of audio
    let t0 = Instant::now();
    let wall_start = Instant::now();
    let mut block = vec![0.0f32; block_frames * 2];
    engine.lock().start(t0, &mut sink);

    let mut step: u32 = 0;
    loop {
        let now = t0 + tick * step;
        let event = engine.lock().tick(now, &mut sink);
        sink.mix_block(&mut block);
        for sample in &block {
            let s = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(s)?;
        }
        if matches!(event, TickEvent::Completed { .. }) {
            break;
        }
        step += 1;
        // guard against a mis-sized session never completing
        if f64::from(step) * tick.as_secs_f64() > total_seconds * 2.0 + 60.0 {
            break;
        }
    }

    engine.lock().stop(&mut sink);
    writer.finalize()?;
    println!(
        "Rendered {:.0}s session to {} in {:.2}s",
        total_seconds,
        args.out,
        wall_start.elapsed().as_secs_f32()
    );
    Ok(())
}
