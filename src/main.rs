use std::time::Instant;

use anyhow::{Context, Result};
use log::info;

use tumble2d::engine::physics::PhysicsWorld;
use tumble2d::game::{Tumbler, TumblerConfig};

/// Fixed tick length used by the box-stack benchmark
const TICK: f32 = 0.016;

const WARMUP_TICKS: usize = 30;
const DEFAULT_TICKS: usize = 10_000;

/// Usage: `tumbler [TICKS] [--pin-awake]`
///
/// Boxes may sleep unless `--pin-awake` is given. The classic box-stack
/// benchmark disables sleeping on every box, so pass the flag to reproduce
/// its per-tick cost.
fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let mut args = std::env::args().skip(1);
    let ticks = match args.next() {
        Some(arg) => arg
            .parse::<usize>()
            .with_context(|| format!("Invalid tick count '{}'", arg))?,
        None => DEFAULT_TICKS,
    };
    let pin_awake = args.any(|arg| arg == "--pin-awake");

    info!("Starting tumbler benchmark ({} ticks, pinned: {})", ticks, pin_awake);

    let mut world = PhysicsWorld::new();
    let config = TumblerConfig {
        pin_awake,
        ..TumblerConfig::default()
    };
    let tumbler = Tumbler::build(&mut world, config)?;

    let start = Instant::now();
    Tumbler::run(&mut world, WARMUP_TICKS, TICK)?;
    info!("Warm-up: {} ticks in {:?}", WARMUP_TICKS, start.elapsed());

    let start = Instant::now();
    Tumbler::run(&mut world, ticks, TICK)?;
    let elapsed = start.elapsed();

    let per_tick = elapsed.as_secs_f64() * 1e6 / ticks.max(1) as f64;
    info!("Ran {} ticks in {:?} ({:.2} us/tick)", ticks, elapsed, per_tick);
    info!(
        "Sleeping boxes: {}/{}, awake bodies: {}, contacts: {}",
        tumbler.sleeping_boxes(&world),
        tumbler.boxes.len(),
        world.awake_body_count(),
        world.contacts().len()
    );
    info!(
        "Lowest box at y = {:.3}, kinetic energy {:.6}",
        tumbler.lowest_box(&world),
        tumbler.kinetic_energy(&world)
    );

    Ok(())
}
