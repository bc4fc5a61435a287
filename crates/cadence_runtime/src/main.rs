//! Cadence runtime
//!
//! Boots logging, loads the engine config and drives a bounded frame loop
//! over a handful of demo systems.
//!
//! Usage: `cadence [config.json] [frames]`

mod demo;

use anyhow::{Context, Result};
use cadence_core::{Engine, EngineConfig, TICK_DURATION};
use tracing_subscriber::EnvFilter;

const DEFAULT_FRAMES: u64 = 300;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_thread_names(true)
        .init();

    tracing::info!("Cadence v{}", cadence_core::VERSION);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => EngineConfig::from_path(&path)
            .with_context(|| format!("loading engine config from {path}"))?,
        None => EngineConfig::default(),
    };
    let frames = match args.next() {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid frame count '{raw}'"))?,
        None => DEFAULT_FRAMES,
    };

    let mut engine = Engine::new(config).context("creating engine")?;
    demo::install(&mut engine).context("registering demo systems")?;
    demo::populate(&mut engine, 64)?;

    let dt = TICK_DURATION.as_secs_f32();
    let mut failed_frames = 0u64;
    for _ in 0..frames {
        let report = engine.run_frame(dt);
        if !report.is_clean() {
            failed_frames += 1;
            for failure in report.failures() {
                tracing::warn!(
                    tick = report.tick(),
                    system = %failure.system,
                    phase = %failure.phase,
                    "{}",
                    failure.failure
                );
            }
        }
    }

    let timer = engine.frame_timer();
    let (min_ms, max_ms) = timer.frame_time_range_ms();
    tracing::info!(
        frames = timer.frames(),
        fps = timer.fps(),
        avg_ms = timer.frame_time_ms(),
        min_ms,
        max_ms,
        failed_frames,
        "frame loop finished"
    );
    for (handle, descriptor, _) in engine.registry().iter() {
        tracing::info!(
            system = descriptor.name(),
            %handle,
            avg_us = engine.profiler().average(descriptor.name()).as_micros() as u64,
            "system timing"
        );
    }

    engine.teardown();
    Ok(())
}
