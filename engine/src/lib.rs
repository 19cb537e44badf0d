//! Trixel Debris Engine Library
//!
//! Turns destroyed blocks into short-lived debris: a block is cut into a few
//! dozen small boxes ("fragments") sized in trixels (1/16 of a block edge),
//! which are thrown, bounce off the level, settle, fade and disappear.
//! Simultaneous explosions are updated across the caller's thread and one
//! borrowed worker thread, and packed into per-explosion GPU instance
//! buffers.
//!
//! # Modules
//!
//! - [`debris`] - Decomposition, per-explosion simulation and the scheduler
//! - [`physics`] - The integrator and the entity contract it moves
//! - [`world`] - Level grid and view volume collaborators
//! - [`render`] - Instance record format, renderer seam and wgpu pass
//! - [`config`] - Tunable constants, loadable from JSON
//! - [`error`] - The crate error type
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rand::SeedableRng;
//! use trixel_debris_engine::{
//!     AtlasRegion, BlockGrid, DebrisConfig, ExplosionScheduler, ExplosionSettings,
//!     GridIntegrator, SourceBlock, UpdatePool,
//! };
//!
//! let grid = Arc::new(BlockGrid::with_floor(-16, 16, -16, 16, -1));
//! let integrator = Arc::new(GridIntegrator::new(grid));
//! let pool = Arc::new(UpdatePool::for_updates(1)?);
//! let mut scheduler = ExplosionScheduler::with_worker_pool(integrator, DebrisConfig::default(), pool);
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let block = SourceBlock::textured(AtlasRegion::new(0.0, 0.0, 0.25, 0.25));
//! scheduler.spawn(ExplosionSettings::new(glam::Vec3::ZERO).with_energy(2.0), &block, &mut rng)?;
//!
//! loop {
//!     scheduler.update(1.0 / 60.0);
//!     scheduler.draw(&mut renderer);
//! }
//! ```

pub mod config;
pub mod debris;
pub mod error;
pub mod physics;
pub mod render;
pub mod world;

pub use config::DebrisConfig;
pub use debris::worker::UpdatePool;
pub use debris::{
    AtlasRegion, ExplosionScheduler, ExplosionSettings, ExplosionSystem, FragmentEntity, SourceBlock,
    SystemId, TickContext, TickReport,
};
pub use error::DebrisError;
pub use physics::{GridIntegrator, Integrator, PhysicsEntity};
pub use render::{FragmentInstance, FragmentRenderer, InstanceBuffer};
pub use world::{BlockGrid, BlockInstance, LevelGrid, ViewVolume};
