//! Explosion Scheduler
//!
//! Owns every live [`ExplosionSystem`] and drives them once per tick.
//!
//! # Fork-join
//!
//! With two or more systems and a borrowed worker, the first half of the
//! active list is moved into an [`UpdateJob`] and updated on the worker
//! while the caller updates the second half. `update` returns only after
//! the worker hands its half back; the list is then reassembled in the
//! original order. Systems are independent and update draws no random
//! numbers, so the split changes nothing about the result.
//!
//! # Removal
//!
//! Each half records the ids of systems that died. After the join both
//! lists are merged, the systems removed and disposed, and their ids queued
//! so the next [`ExplosionScheduler::draw`] releases the GPU buffers. A
//! half that panics is counted dead as a whole, on either side of the fork.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use glam::Vec3;
use rand::Rng;

use super::SystemId;
use super::settings::{ExplosionSettings, SourceBlock};
use super::system::{ExplosionSystem, TickContext};
use super::worker::{Joined, UpdateJob, UpdatePool, WorkerContext, update_systems};
use crate::config::DebrisConfig;
use crate::error::DebrisError;
use crate::physics::Integrator;
use crate::render::FragmentRenderer;
use crate::world::ViewVolume;

/// What one call to [`ExplosionScheduler::update`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Systems updated this tick
    pub updated: usize,
    /// Systems removed at the end of the tick
    pub removed: usize,
    /// True if half the work ran on the worker
    pub forked: bool,
}

/// All live explosions of a level.
pub struct ExplosionScheduler {
    active: Vec<ExplosionSystem>,
    integrator: Arc<dyn Integrator>,
    config: Arc<DebrisConfig>,
    view: ViewVolume,

    pool: Option<Arc<UpdatePool>>,
    worker: Option<WorkerContext<UpdateJob>>,

    // Scratch lists, cleared each tick and never shrunk.
    dead_this_tick: Vec<SystemId>,
    dead_from_worker: Vec<SystemId>,
    worker_systems: Vec<ExplosionSystem>,
    in_flight: Vec<SystemId>,

    pending_release: Vec<SystemId>,
}

impl ExplosionScheduler {
    /// A scheduler that updates everything on the calling thread.
    pub fn new(integrator: Arc<dyn Integrator>, config: DebrisConfig) -> Self {
        Self {
            active: Vec::new(),
            integrator,
            config: Arc::new(config),
            view: ViewVolume::default(),
            pool: None,
            worker: None,
            dead_this_tick: Vec::new(),
            dead_from_worker: Vec::new(),
            worker_systems: Vec::new(),
            in_flight: Vec::new(),
            pending_release: Vec::new(),
        }
    }

    /// A scheduler that borrows one worker from `pool` for its whole life.
    /// Falls back to serial updates when the pool has none to lend.
    pub fn with_worker_pool(integrator: Arc<dyn Integrator>, config: DebrisConfig, pool: Arc<UpdatePool>) -> Self {
        let mut scheduler = Self::new(integrator, config);
        scheduler.worker = pool.take();
        match &scheduler.worker {
            Some(worker) => log::info!("Explosion scheduler borrowed worker '{}'", worker.name()),
            None => log::warn!("No idle update worker; explosion scheduler runs serially"),
        }
        scheduler.pool = Some(pool);
        scheduler
    }

    /// True while a worker is held.
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Take ownership of a built system.
    pub fn add(&mut self, system: ExplosionSystem) -> SystemId {
        let id = system.id();
        self.active.push(system);
        id
    }

    /// Build a system with this scheduler's configuration and add it.
    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        settings: ExplosionSettings,
        source: &SourceBlock,
        rng: &mut R,
    ) -> Result<SystemId, DebrisError> {
        let system = ExplosionSystem::new(settings, source, &self.config, rng)?;
        Ok(self.add(system))
    }

    /// Advance every system by `elapsed` seconds and remove the dead.
    pub fn update(&mut self, elapsed: f32) -> TickReport {
        let mut report = TickReport {
            updated: self.active.len(),
            ..Default::default()
        };

        let fork_at = self.config.fork_threshold.max(2);
        if self.worker.is_some() && self.active.len() >= fork_at {
            report.forked = self.update_forked(elapsed);
        } else {
            self.update_serial(elapsed);
        }

        report.removed = self.remove_dead();
        report
    }

    fn update_serial(&mut self, elapsed: f32) {
        let ctx = TickContext {
            integrator: self.integrator.as_ref(),
            view: self.view,
            config: self.config.as_ref(),
        };
        update_systems(&mut self.active, elapsed, &ctx, &mut self.dead_this_tick);
    }

    /// Returns false if the worker refused the job and everything ran here.
    fn update_forked(&mut self, elapsed: f32) -> bool {
        let Some(mut worker) = self.worker.take() else {
            self.update_serial(elapsed);
            return false;
        };

        let split = self.active.len() / 2;
        let mut systems = std::mem::take(&mut self.worker_systems);
        systems.extend(self.active.drain(..split));
        self.in_flight.clear();
        self.in_flight.extend(systems.iter().map(ExplosionSystem::id));

        let job = UpdateJob {
            elapsed,
            start_index: 0,
            end_index: split,
            systems,
            dead: std::mem::take(&mut self.dead_from_worker),
            integrator: Arc::clone(&self.integrator),
            view: self.view,
            config: Arc::clone(&self.config),
        };

        if let Err((err, job)) = worker.start(job) {
            log::error!("Could not hand explosions to worker '{}': {err}", worker.name());
            self.reassemble(job.systems, job.dead);
            if matches!(err, DebrisError::WorkerDisconnected) {
                log::warn!("Explosion scheduler switched to serial updates");
            } else {
                self.worker = Some(worker);
            }
            self.update_serial(elapsed);
            return false;
        }

        // The worker still holds its half; a panic here must not skip the join.
        if catch_unwind(AssertUnwindSafe(|| self.update_serial(elapsed))).is_err() {
            log::error!(
                "Explosion update panicked on the caller; dropping {} systems",
                self.active.len()
            );
            self.dead_this_tick.clear();
            self.dead_this_tick
                .extend(self.active.iter().map(ExplosionSystem::id));
        }

        match worker.join() {
            Ok(Joined::Finished(job)) => {
                self.reassemble(job.systems, job.dead);
                self.worker = Some(worker);
            }
            Ok(Joined::Panicked(job)) => {
                log::error!(
                    "Explosion update panicked on worker '{}'; dropping {} systems",
                    worker.name(),
                    job.systems.len()
                );
                let mut dead = job.dead;
                dead.clear();
                dead.extend(job.systems.iter().map(ExplosionSystem::id));
                self.reassemble(job.systems, dead);
                self.worker = Some(worker);
            }
            Err(err) => {
                log::error!(
                    "Lost worker '{}' with {} systems in flight: {err}",
                    worker.name(),
                    self.in_flight.len()
                );
                log::warn!("Explosion scheduler switched to serial updates");
                self.pending_release.extend(self.in_flight.drain(..));
            }
        }
        true
    }

    /// Put the worker's half back in front of the caller's half.
    fn reassemble(&mut self, mut front: Vec<ExplosionSystem>, dead: Vec<SystemId>) {
        front.append(&mut self.active);
        std::mem::swap(&mut self.active, &mut front);
        self.worker_systems = front;
        self.dead_from_worker = dead;
    }

    /// Merge both dead lists, remove and dispose those systems.
    fn remove_dead(&mut self) -> usize {
        self.dead_this_tick.append(&mut self.dead_from_worker);
        if self.dead_this_tick.is_empty() {
            return 0;
        }

        let mut removed = 0;
        let mut index = 0;
        while index < self.active.len() {
            if self.dead_this_tick.contains(&self.active[index].id()) {
                let system = self.active.remove(index);
                self.pending_release.push(system.dispose());
                removed += 1;
            } else {
                index += 1;
            }
        }
        self.dead_this_tick.clear();
        removed
    }

    /// Push nearby fragments of every system away from `source`.
    ///
    /// Returns the number of fragments affected.
    pub fn propagate_energy(&mut self, source: Vec3, energy: f32) -> usize {
        let cutoff = self.config.energy_cutoff;
        self.active
            .iter_mut()
            .map(|system| system.apply_energy(source, energy, cutoff))
            .sum()
    }

    /// Release queued ids, then draw every system inside the view volume.
    ///
    /// Returns how many systems were drawn.
    pub fn draw(&mut self, renderer: &mut dyn FragmentRenderer) -> usize {
        self.release_pending(renderer);
        let view = self.view;
        let mut drawn = 0;
        for system in &mut self.active {
            let bounds = system.bounds();
            if !bounds.is_valid() || !view.intersects_aabb(bounds.min, bounds.max) {
                continue;
            }
            renderer.draw_system(system.id(), system.instances());
            system.instances_mut().mark_clean();
            drawn += 1;
        }
        drawn
    }

    /// Draw every system, ignoring the view volume.
    pub fn force_draw(&mut self, renderer: &mut dyn FragmentRenderer) -> usize {
        self.release_pending(renderer);
        for system in &mut self.active {
            renderer.draw_system(system.id(), system.instances());
            system.instances_mut().mark_clean();
        }
        self.active.len()
    }

    fn release_pending(&mut self, renderer: &mut dyn FragmentRenderer) {
        for id in self.pending_release.drain(..) {
            renderer.release_system(id);
        }
    }

    pub fn set_view(&mut self, view: ViewVolume) {
        self.view = view;
    }

    pub fn view(&self) -> ViewVolume {
        self.view
    }

    pub fn config(&self) -> &DebrisConfig {
        &self.config
    }

    pub fn set_gravity_factor(&mut self, factor: f32) {
        Arc::make_mut(&mut self.config).gravity_factor = factor;
    }

    pub fn set_integrator(&mut self, integrator: Arc<dyn Integrator>) {
        self.integrator = integrator;
    }

    /// Drop every system (level unload). Their ids are queued for release.
    pub fn clear(&mut self) {
        let count = self.active.len();
        for system in self.active.drain(..) {
            self.pending_release.push(system.dispose());
        }
        if count > 0 {
            log::debug!("Cleared {count} explosion systems");
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Enabled fragments across every system.
    pub fn fragment_count(&self) -> usize {
        self.active.iter().map(ExplosionSystem::live_fragment_count).sum()
    }

    pub fn contains(&self, id: SystemId) -> bool {
        self.active.iter().any(|s| s.id() == id)
    }

    pub fn system(&self, id: SystemId) -> Option<&ExplosionSystem> {
        self.active.iter().find(|s| s.id() == id)
    }

    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut ExplosionSystem> {
        self.active.iter_mut().find(|s| s.id() == id)
    }

    /// Systems in update order.
    pub fn systems(&self) -> &[ExplosionSystem] {
        &self.active
    }

    /// Ids waiting for the next draw to release them.
    pub fn pending_release(&self) -> &[SystemId] {
        &self.pending_release
    }
}

impl Drop for ExplosionScheduler {
    fn drop(&mut self) {
        if let (Some(pool), Some(worker)) = (self.pool.as_ref(), self.worker.take()) {
            pool.give_back(worker);
        }
    }
}
