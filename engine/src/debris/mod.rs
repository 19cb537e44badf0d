//! Trixel Debris Module
//!
//! Destroyed blocks turn into a few dozen small cubes ("fragments") that
//! fly, bounce, settle and fade out. This module owns that whole lifecycle:
//!
//! - [`settings`] - What the gameplay trigger asks for ([`ExplosionSettings`])
//! - [`decompose`] / [`divider`] - Cutting the source block into fragments
//! - [`fragment`] - One simulated fragment ([`FragmentEntity`])
//! - [`system`] - One explosion: fragments + instance buffer ([`ExplosionSystem`])
//! - [`scheduler`] - All live explosions, updated serially or split across a worker
//! - [`worker`] - The borrowed second thread used for the split
//!
//! # Lifecycle
//!
//! ```text
//! trigger ── ExplosionSystem::new ──> scheduler.add
//!                                          │ every tick
//!                                          ▼
//!             update (serial, or fork-join across the worker)
//!                                          │
//!             draw ──> FragmentRenderer    │ age > lifetime
//!                                          ▼
//!                              removed, GPU buffer released
//! ```

pub mod decompose;
pub mod divider;
pub mod fragment;
pub mod scheduler;
pub mod settings;
pub mod system;
pub mod worker;

use std::sync::atomic::{AtomicU64, Ordering};

pub use fragment::FragmentEntity;
pub use scheduler::{ExplosionScheduler, TickReport};
pub use settings::{AtlasRegion, ExplosionSettings, SourceBlock};
pub use system::{ExplosionSystem, TickContext};
pub use worker::{Joined, UpdateJob, WorkerContext, WorkerPool};

/// Identifies one explosion system for the lifetime of the process.
///
/// Renderers key their GPU buffers on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub u64);

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(1);

impl SystemId {
    pub(crate) fn next() -> Self {
        SystemId(NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "explosion#{}", self.0)
    }
}
