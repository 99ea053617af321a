use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use voltframe_core::{
    CelebrationSequence, EffectsConfig, HostContext, SequenceOutcome, SequenceState,
};
use voltframe_platform::headless::{
    FrameBounds, ManualClock, RecordingOverlay, RecordingSurface, FRAME_MS,
};
use voltframe_platform::{FrameRect, RenderSurface};

/// Game frame of the reference layout, px.
const DEMO_FRAME: FrameRect = FrameRect::new(275.0, 70.0, 730.0, 580.0);

/// Run the electric frame celebration on a headless 60 Hz host
#[derive(Parser)]
#[command(name = "voltframe")]
#[command(version)]
struct Args {
    /// TOML file with option overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Frames to simulate
    #[arg(long, default_value_t = 240)]
    frames: u32,

    /// Frame at which to dismiss; defaults to the last frame
    #[arg(long)]
    dismiss_at: Option<u32>,

    /// Write a JSON run report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log filter directives
    #[arg(long, default_value = "info")]
    log: String,
}

#[derive(Debug, Serialize)]
struct Transition {
    frame: u32,
    state: SequenceState,
}

#[derive(Debug, Serialize)]
struct RunReport {
    seed: u64,
    frames: u32,
    outcome: Option<SequenceOutcome>,
    transitions: Vec<Transition>,
    peak_bolts: usize,
    peak_particles: usize,
    sprites_created: u64,
    overlay_shows: u32,
    final_backdrop_alpha: f32,
}

fn main() {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(args.log.as_str())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    info!("Voltframe starting");
    if let Err(e) = run(args) {
        eprintln!("Voltframe error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => EffectsConfig::load(path)?,
        None => EffectsConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, frames = args.frames, "simulating");

    let clock = Rc::new(ManualClock::new());
    let surface = Rc::new(RecordingSurface::new());
    let bounds = Rc::new(FrameBounds::new(DEMO_FRAME));
    let overlay = Rc::new(RecordingOverlay::new());
    let host = HostContext::new(Rc::clone(&clock), &surface, bounds);

    let settle_frames = (config.sequence.fade_ms / FRAME_MS).ceil() as u32 + 1;
    let mut sequence = CelebrationSequence::new(
        host,
        overlay.clone(),
        config,
        StdRng::seed_from_u64(seed),
    );
    let completion = sequence.start();

    let dismiss_at = args.dismiss_at.unwrap_or(args.frames);
    let mut transitions = vec![Transition {
        frame: 0,
        state: sequence.state(),
    }];
    let mut peak_bolts = 0;
    let mut peak_particles = 0;

    for frame in 1..=args.frames {
        clock.step_frame();
        sequence.update();
        if frame == dismiss_at {
            sequence.dismiss();
        }

        peak_bolts = peak_bolts.max(sequence.effects().active_bolts());
        peak_particles = peak_particles.max(sequence.effects().active_particles());
        let state = sequence.state();
        if transitions.last().map(|t| t.state) != Some(state) {
            transitions.push(Transition { frame, state });
        }
    }
    if sequence.dismiss().is_some() {
        transitions.push(Transition {
            frame: args.frames,
            state: sequence.state(),
        });
    }
    for _ in 0..settle_frames {
        clock.step_frame();
    }

    let outcome = completion.outcome();
    if outcome.is_none() {
        warn!("sequence never resolved");
    }
    let report = RunReport {
        seed,
        frames: args.frames,
        outcome,
        transitions,
        peak_bolts,
        peak_particles,
        sprites_created: surface.sprites_created(),
        overlay_shows: overlay.show_count(),
        final_backdrop_alpha: surface.backdrop_alpha(),
    };

    match &args.report {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writer.flush()?;
            info!(path = %path.display(), "report written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_preset_parses() {
        let config = EffectsConfig::from_toml_str(include_str!("../presets/calm.toml")).unwrap();
        assert_eq!(config.bolts.max_bolts, 3);
        assert_eq!(config.sequence.spark_duration_ms, 3000.0);
        assert_eq!(config.particles.outward.fade_dist_mul, 1.5);
    }

    #[test]
    fn args_default_to_four_seconds() {
        let args = Args::try_parse_from(["voltframe", "--seed", "5"]).unwrap();
        assert_eq!(args.frames, 240);
        assert_eq!(args.seed, Some(5));
        assert!(args.dismiss_at.is_none());
        assert_eq!(args.log, "info");
    }
}
