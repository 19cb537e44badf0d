//! Debris Harness
//!
//! Headless run of the debris engine: builds a floor, spawns a mix of
//! exploding and crumbling blocks and ticks them at 60 Hz until they are
//! gone, logging what the scheduler does.
//!
//! Usage: `debris_harness [config.json] [--systems N] [--seconds S] [--seed N] [--serial]`
//! Set `RUST_LOG=debug` for per-system spawn and removal messages.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trixel_debris_engine::{
    AtlasRegion, BlockGrid, DebrisConfig, ExplosionScheduler, ExplosionSettings, FragmentRenderer,
    GridIntegrator, InstanceBuffer, SourceBlock, SystemId, UpdatePool, ViewVolume,
};

const TICK: f32 = 1.0 / 60.0;

struct Options {
    config: Option<PathBuf>,
    systems: usize,
    seconds: f32,
    seed: u64,
    serial: bool,
}

impl Options {
    fn parse() -> Result<Self, Box<dyn Error>> {
        let mut options = Options {
            config: None,
            systems: 8,
            seconds: 7.0,
            seed: 1,
            serial: false,
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--systems" => options.systems = args.next().ok_or("--systems needs a value")?.parse()?,
                "--seconds" => options.seconds = args.next().ok_or("--seconds needs a value")?.parse()?,
                "--seed" => options.seed = args.next().ok_or("--seed needs a value")?.parse()?,
                "--serial" => options.serial = true,
                path => options.config = Some(PathBuf::from(path)),
            }
        }
        Ok(options)
    }
}

/// Stands in for the GPU: counts uploads and live buffers.
#[derive(Default)]
struct CountingRenderer {
    uploads: usize,
    live: std::collections::HashSet<SystemId>,
}

impl FragmentRenderer for CountingRenderer {
    fn draw_system(&mut self, id: SystemId, instances: &InstanceBuffer) {
        if self.live.insert(id) || instances.is_dirty() {
            self.uploads += 1;
        }
    }

    fn release_system(&mut self, id: SystemId) {
        self.live.remove(&id);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::new()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let options = Options::parse()?;
    let config = match &options.config {
        Some(path) => {
            log::info!("Loading debris config from {}", path.display());
            DebrisConfig::load(path)?
        }
        None => DebrisConfig::default(),
    };

    let grid = Arc::new(BlockGrid::with_floor(-24, 24, -24, 24, -1));
    let integrator = Arc::new(GridIntegrator::new(grid));
    let pool = Arc::new(UpdatePool::for_updates(1)?);
    let mut scheduler = if options.serial {
        ExplosionScheduler::new(integrator, config)
    } else {
        ExplosionScheduler::with_worker_pool(integrator, config, Arc::clone(&pool))
    };
    scheduler.set_view(ViewVolume::new(Vec3::ZERO, 48.0));

    let mut rng = StdRng::seed_from_u64(options.seed);
    let block = SourceBlock::textured(AtlasRegion::new(0.0, 0.0, 0.25, 0.25)).with_color(Vec3::new(0.8, 0.7, 0.6));
    for i in 0..options.systems {
        let center = Vec3::new(rng.gen_range(-8..=8) as f32, rng.gen_range(0..=3) as f32, rng.gen_range(-8..=8) as f32);
        let mut settings = ExplosionSettings::new(center)
            .with_energy(rng.gen_range(1.0..4.0))
            .with_energy_source(center - Vec3::new(0.0, 0.6, 0.0));
        if i % 2 == 1 {
            settings = settings.crumbling();
        }
        if i % 3 == 0 {
            settings = settings.darkened().incandescent();
        }
        scheduler.spawn(settings, &block, &mut rng)?;
    }
    log::info!(
        "Spawned {} systems with {} fragments",
        scheduler.active_count(),
        scheduler.fragment_count()
    );

    let mut renderer = CountingRenderer::default();
    let ticks = (options.seconds / TICK).ceil() as u32;
    let mut forked_ticks = 0;
    for tick in 1..=ticks {
        // A second blast halfway through the first second shakes settled debris.
        if tick == 30 {
            let moved = scheduler.propagate_energy(Vec3::new(0.0, -0.4, 0.0), 3.0);
            log::info!("Aftershock pushed {moved} fragments");
        }

        let report = scheduler.update(TICK);
        if report.forked {
            forked_ticks += 1;
        }
        scheduler.draw(&mut renderer);

        if report.removed > 0 {
            log::info!("t={:.2}s removed {} systems", tick as f32 * TICK, report.removed);
        }
        if tick % 60 == 0 {
            log::info!(
                "t={:.0}s systems={} fragments={} uploads={}",
                tick as f32 * TICK,
                scheduler.active_count(),
                scheduler.fragment_count(),
                renderer.uploads
            );
        }
    }
    // Hand released ids to the renderer.
    scheduler.force_draw(&mut renderer);

    log::info!(
        "Done: {ticks} ticks, {forked_ticks} forked, {} systems left, {} GPU buffers live",
        scheduler.active_count(),
        renderer.live.len()
    );
    Ok(())
}
