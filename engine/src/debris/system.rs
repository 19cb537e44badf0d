//! One explosion: its fragments, their instance buffer and their lifetime.

use glam::Vec3;
use rand::Rng;

use super::SystemId;
use super::decompose::{crumble, distance_falloff, explode};
use super::fragment::FragmentEntity;
use super::settings::{ExplosionSettings, SourceBlock};
use crate::config::DebrisConfig;
use crate::error::DebrisError;
use crate::physics::{Aabb, Integrator};
use crate::render::instancing::InstanceBuffer;
use crate::world::ViewVolume;

/// Everything one tick of [`ExplosionSystem::update`] reads from outside.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub integrator: &'a dyn Integrator,
    pub view: ViewVolume,
    pub config: &'a DebrisConfig,
}

/// Opacity of a system of the given age: 1 until the fade starts, then
/// linear down to 0 at the end of the lifetime.
pub fn opacity_at(age: f32, config: &DebrisConfig) -> f32 {
    if age <= config.fade_start_secs {
        return 1.0;
    }
    let fade = config.fade_duration();
    if fade <= 0.0 {
        return 0.0;
    }
    (1.0 - (age - config.fade_start_secs) / fade).clamp(0.0, 1.0)
}

/// The debris of one destroyed block.
///
/// Owns its fragments and the instance buffer they pack into; slot `i` of
/// the buffer always belongs to fragment `i`.
#[derive(Debug)]
pub struct ExplosionSystem {
    id: SystemId,
    settings: ExplosionSettings,
    fragments: Vec<FragmentEntity>,
    instances: InstanceBuffer,
    age: f32,
    opacity: f32,
    dead: bool,
    translation: Vec3,
    bounds: Aabb,
}

impl ExplosionSystem {
    /// Decompose the source block into fragments.
    ///
    /// Fails on invalid settings, a fragment count above
    /// `config.max_fragment_count` or a source block without an atlas region.
    pub fn new<R: Rng + ?Sized>(
        settings: ExplosionSettings,
        source: &SourceBlock,
        config: &DebrisConfig,
        rng: &mut R,
    ) -> Result<Self, DebrisError> {
        if settings.fragment_count > config.max_fragment_count {
            return Err(DebrisError::TooManyFragments {
                count: settings.fragment_count,
                max: config.max_fragment_count,
            });
        }
        let size_range = settings.resolved_size_range()?;
        let atlas = source.atlas.ok_or(DebrisError::MissingAtlas)?;

        let fragments = if settings.crumble {
            crumble(&settings, source.color, &atlas, config, rng)
        } else {
            explode(&settings, source.color, &atlas, size_range, config, rng)
        };

        let mut system = Self {
            id: SystemId::next(),
            instances: InstanceBuffer::new(fragments.len()),
            fragments,
            settings,
            age: 0.0,
            opacity: 1.0,
            dead: false,
            translation: Vec3::ZERO,
            bounds: Aabb::EMPTY,
        };
        system.pack_all();

        log::debug!(
            "Spawned {} with {} fragments ({}) at {}",
            system.id,
            system.fragments.len(),
            if system.settings.crumble { "crumble" } else { "explode" },
            system.settings.source_block_center
        );
        Ok(system)
    }

    /// Write every fragment's record and recompute the bounds.
    fn pack_all(&mut self) {
        let mut bounds = Aabb::EMPTY;
        for (slot, fragment) in self.fragments.iter().enumerate() {
            if !fragment.enabled {
                self.instances.hide(slot);
            } else if fragment.is_spawned() {
                self.instances.write(slot, fragment.to_instance(self.opacity));
                bounds = bounds.union(&fragment.aabb());
            } else {
                self.instances
                    .write(slot, fragment.to_pending_instance(self.opacity, self.translation));
                bounds = bounds.union(&Aabb::from_center_size(
                    fragment.spawn_center + self.translation,
                    fragment.size,
                ));
            }
        }
        self.bounds = bounds;
    }

    /// Advance the system by `elapsed` seconds. Returns true once dead.
    ///
    /// A non-positive `elapsed` leaves everything untouched.
    pub fn update(&mut self, elapsed: f32, ctx: &TickContext<'_>) -> bool {
        if self.dead || elapsed <= 0.0 {
            return self.dead;
        }

        let config = ctx.config;
        self.age += elapsed;
        self.opacity = opacity_at(self.age, config);
        if self.age > config.lifetime_secs {
            self.dead = true;
        }
        let fading = self.age > config.fade_start_secs;
        let gravity = config.gravity(self.settings.gravity_modifier);

        let mut bounds = Aabb::EMPTY;
        for (slot, fragment) in self.fragments.iter_mut().enumerate() {
            if !fragment.enabled {
                continue;
            }

            let mut step = elapsed;
            if fragment.spawn_delay > 0.0 {
                fragment.spawn_delay -= elapsed;
                let pending_center = fragment.spawn_center + self.translation;
                if fragment.spawn_delay > 0.0 {
                    self.instances
                        .write(slot, fragment.to_pending_instance(self.opacity, self.translation));
                    bounds = bounds.union(&Aabb::from_center_size(pending_center, fragment.size));
                    continue;
                }
                // Released: start falling from wherever the block was carried,
                // for only the part of the tick left after the delay.
                fragment.center = pending_center;
                step = -fragment.spawn_delay;
                fragment.spawn_delay = 0.0;
                if step <= 0.0 {
                    self.instances.write(slot, fragment.to_instance(self.opacity));
                    bounds = bounds.union(&fragment.aabb());
                    continue;
                }
            }

            if fragment.frozen {
                if fading {
                    self.instances.write(slot, fragment.to_instance(self.opacity));
                }
                bounds = bounds.union(&fragment.aabb());
                continue;
            }

            simulate(fragment, step, gravity, ctx);

            if fragment.enabled {
                self.instances.write(slot, fragment.to_instance(self.opacity));
                bounds = bounds.union(&fragment.aabb());
            } else {
                log::trace!("{} fragment {slot} fell out of view", self.id);
                self.instances.hide(slot);
            }
        }
        self.bounds = bounds;
        self.dead
    }

    /// Push every spawned, enabled fragment within reach away from `source`.
    ///
    /// Returns how many fragments were affected.
    pub fn apply_energy(&mut self, source: Vec3, energy: f32, cutoff: f32) -> usize {
        let mut affected = 0;
        for fragment in &mut self.fragments {
            if !fragment.enabled || !fragment.is_spawned() {
                continue;
            }
            let offset = fragment.center - source;
            let falloff = distance_falloff(offset.length());
            if falloff <= cutoff {
                continue;
            }
            let direction = offset.try_normalize().unwrap_or(Vec3::Y);
            fragment.velocity += direction * energy * falloff;
            fragment.frozen = false;
            affected += 1;
        }
        affected
    }

    /// Move the whole system. Only fragments still waiting to spawn follow;
    /// released fragments are already simulated in world space.
    pub fn set_translation(&mut self, translation: Vec3) {
        if self.translation == translation {
            return;
        }
        self.translation = translation;
        self.pack_all();
    }

    /// Tear down the system; returns the id whose GPU resources must go.
    pub fn dispose(self) -> SystemId {
        log::debug!("Disposed {} at age {:.2}s", self.id, self.age);
        self.id
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    pub fn settings(&self) -> &ExplosionSettings {
        &self.settings
    }

    pub fn fragments(&self) -> &[FragmentEntity] {
        &self.fragments
    }

    /// Direct fragment access, for tools and tests.
    pub fn fragments_mut(&mut self) -> &mut [FragmentEntity] {
        &mut self.fragments
    }

    pub fn instances(&self) -> &InstanceBuffer {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut InstanceBuffer {
        &mut self.instances
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Flag the system for removal on the next tick.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// World bounds of every visible fragment as of the last pack.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Fragments still enabled.
    pub fn live_fragment_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.enabled).count()
    }
}

/// One physics step of an active fragment.
fn simulate(fragment: &mut FragmentEntity, elapsed: f32, gravity: f32, ctx: &TickContext<'_>) {
    let previous = fragment.center;

    fragment.velocity.y -= gravity * elapsed;
    fragment.incandescence *= ctx.config.incandescence_decay;
    let moved = ctx.integrator.integrate(fragment, elapsed, true, false);

    if !fragment.center.is_finite() || !fragment.velocity.is_finite() {
        log::warn!("Non-finite fragment state at {previous}, freezing it in place");
        fragment.center = previous;
        fragment.velocity = Vec3::ZERO;
        fragment.frozen = true;
        return;
    }

    fragment.velocity = fragment.velocity.clamp_length_max(ctx.config.max_fragment_speed);
    fragment.frozen = !moved && fragment.ground_contacts.is_still();

    if fragment.center.y < ctx.view.kill_height() {
        fragment.enabled = false;
    }
}
