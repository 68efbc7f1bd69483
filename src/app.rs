use std::fs;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;

use crossbeam_channel::bounded;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::Args;
use crate::config::AppConfig;
use crate::core::clip::ClipData;
use crate::core::velocity::VelocityParams;
use crate::evo::evolution::EvolutionSettings;
use crate::evo::population::Bounds;
use crate::evo::worker::{self, EvolutionUpdate, PhaseSnapshot};

/// Fitted phase annotation written by the binary.
#[derive(Debug, Serialize)]
pub struct PhaseResult {
    pub framerate: f32,
    pub phase: Vec<f32>,
    pub keys: Vec<bool>,
    pub cycle: Vec<f32>,
    pub normalised_cycle: Vec<f32>,
}

fn settings_from(config: &AppConfig) -> EvolutionSettings {
    let evolution = &config.evolution;
    EvolutionSettings {
        bounds: Bounds::new(
            evolution.amplitude,
            evolution.frequency,
            evolution.shift,
            evolution.offset,
            evolution.slope,
        ),
        behaviour: evolution.behaviour,
        blending: evolution.blending,
        window_sec: evolution.window_sec,
        steep_penalty: evolution.steep_penalty,
    }
}

fn bone_mask(clip: &ClipData, spec: &str) -> Vec<bool> {
    let mut mask = vec![false; clip.bone_count()];
    for name in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match clip.bone_names.iter().position(|b| b == name) {
            Some(i) => mask[i] = true,
            None => warn!(bone = name, "unknown bone name, skipped"),
        }
    }
    mask
}

/// Load the clip, run the optimizer worker until the tick budget is spent or
/// the stop flag is raised, and write the fitted annotation.
pub fn run(args: Args, stop: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load_or_default(&args.config);

    let text = fs::read_to_string(&args.clip_path)?;
    let clip = ClipData::from_json_str(&text)?;
    clip.validate()?;
    info!(
        frames = clip.total_frames(),
        bones = clip.bone_count(),
        framerate = clip.framerate,
        "loaded clip"
    );

    let mut params = VelocityParams::new(clip.bone_count());
    params.set_cap(config.velocity.cap);
    params.set_threshold(config.velocity.threshold);
    match &args.bones {
        Some(spec) => params.set_selected(bone_mask(&clip, spec)),
        None => params.select_all(),
    }

    let settings = settings_from(&config);
    let seed = args.seed.unwrap_or(config.run.seed);
    let ticks = args.ticks.unwrap_or(config.run.ticks);
    let report_every = config.run.report_every.max(1);
    let framerate = clip.framerate;

    let (result_tx, result_rx) = bounded::<PhaseSnapshot>(1);
    let (_update_tx, update_rx) = bounded::<EvolutionUpdate>(16);

    let worker_stop = Arc::clone(&stop);
    let handle = thread::Builder::new()
        .name("optimizer".into())
        .spawn(move || {
            worker::run(
                clip, params, settings, seed, ticks, worker_stop, update_rx, result_tx,
            )
        })?;

    let mut last_report = 0u64;
    let mut last: Option<PhaseSnapshot> = None;
    for snapshot in result_rx.iter() {
        if snapshot.tick >= last_report + report_every {
            info!(
                tick = snapshot.tick,
                mean_fitness = snapshot.mean_fitness,
                "progress"
            );
            last_report = snapshot.tick;
        }
        last = Some(snapshot);
    }
    let fun = handle.join().expect("optimizer thread panicked");

    if let Some(snapshot) = last {
        info!(
            ticks = snapshot.tick,
            mean_fitness = snapshot.mean_fitness,
            peaks = ?snapshot.peaks,
            "finished"
        );
    }

    let result = PhaseResult {
        framerate,
        phase: fun.phase().to_vec(),
        keys: fun.keys().to_vec(),
        cycle: fun.cycle().to_vec(),
        normalised_cycle: fun.normalised_cycle().to_vec(),
    };
    let json = serde_json::to_string_pretty(&result)?;
    match &args.out {
        Some(path) => {
            fs::write(path, json)?;
            info!(path, "wrote phase annotation");
        }
        None => println!("{json}"),
    }
    Ok(())
}
