//! Shared physics integrator
//!
//! Moves any [`PhysicsEntity`] by its velocity and resolves the result
//! against the level grid one axis at a time (Y, then X, then Z). Gravity is
//! not applied here; callers add it to the velocity before integrating so
//! each kind of body can scale it independently.
//!
//! # Modes
//!
//! - **simple**: plain per-axis resolution. Used for debris.
//! - **full** (`simple == false`): additionally looks one tick ahead on the
//!   horizontal axes and cancels velocity that would push the body into a
//!   wall next tick; with `keep_in_front` the lookahead also covers moving
//!   blocks for background bodies.

use std::sync::Arc;

use glam::Vec3;

use super::collision::{
    highest_top_below, lowest_bottom_above, overlaps_any, support_under, SKIN,
};
use super::entity::{GroundContacts, PhysicsEntity};
use super::types::Aabb;
use crate::world::LevelGrid;

/// Bodies moving less than this per tick count as not having moved.
pub const MOVE_EPSILON: f32 = 1e-5;

/// Vertical rebound speeds below this are dropped to zero.
const REST_SPEED: f32 = 0.05;

/// Horizontal velocity lost per second while in contact with the ground.
const GROUND_FRICTION: f32 = 6.0;

/// Horizontal speeds below this are dropped to zero while grounded.
const SLIDE_CUTOFF: f32 = 0.01;

/// Moves physics entities and resolves their collisions with the level.
pub trait Integrator: Send + Sync {
    /// Advance `entity` by `elapsed` seconds.
    ///
    /// Returns true if the entity actually moved this tick.
    fn integrate(
        &self,
        entity: &mut dyn PhysicsEntity,
        elapsed: f32,
        simple: bool,
        keep_in_front: bool,
    ) -> bool;
}

/// Reference integrator over a [`LevelGrid`].
#[derive(Clone)]
pub struct GridIntegrator {
    grid: Arc<dyn LevelGrid>,
}

impl GridIntegrator {
    pub fn new(grid: Arc<dyn LevelGrid>) -> Self {
        Self { grid }
    }

    /// Access the grid this integrator collides against.
    pub fn grid(&self) -> &dyn LevelGrid {
        self.grid.as_ref()
    }

    fn resolve_vertical(
        &self,
        position: &mut Vec3,
        velocity: &mut Vec3,
        half: Vec3,
        elapsed: f32,
        elasticity: f32,
        still_only: bool,
    ) -> bool {
        let dy = velocity.y * elapsed;
        position.y += dy;
        let aabb = Aabb::from_center_size(*position, half * 2.0);

        if dy < 0.0 {
            if let Some(floor) = highest_top_below(self.grid(), &aabb, still_only) {
                position.y = floor.max().y + half.y;
                let rebound = -velocity.y * elasticity;
                velocity.y = if rebound < REST_SPEED { 0.0 } else { rebound };
                return true;
            }
        } else if dy > 0.0 {
            if let Some(ceiling) = lowest_bottom_above(self.grid(), &aabb, still_only) {
                position.y = ceiling.min().y - half.y;
                velocity.y = 0.0;
            }
        }
        false
    }

    fn resolve_horizontal(
        &self,
        position: &mut Vec3,
        velocity: &mut Vec3,
        half: Vec3,
        elapsed: f32,
        elasticity: f32,
        still_only: bool,
    ) {
        for axis in [0usize, 2] {
            let delta = velocity[axis] * elapsed;
            if delta == 0.0 {
                continue;
            }
            let previous = position[axis];
            position[axis] += delta;
            let aabb = Aabb::from_center_size(*position, half * 2.0);
            if overlaps_any(self.grid(), &aabb, still_only) {
                position[axis] = previous;
                velocity[axis] = -velocity[axis] * elasticity;
            }
        }
    }

    fn look_ahead(&self, position: Vec3, velocity: &mut Vec3, half: Vec3, elapsed: f32, still_only: bool) {
        for axis in [0usize, 2] {
            let mut probe = position;
            probe[axis] += velocity[axis] * elapsed * 2.0;
            let aabb = Aabb::from_center_size(probe, half * 2.0);
            if overlaps_any(self.grid(), &aabb, still_only) {
                velocity[axis] = 0.0;
            }
        }
    }

    fn sample_contacts(&self, position: Vec3, half: Vec3, still_only: bool) -> GroundContacts {
        let bottom = position.y - half.y;
        let near = support_under(
            self.grid(),
            position.x - half.x + SKIN,
            position.z - half.z + SKIN,
            bottom,
            still_only,
        );
        let far = support_under(
            self.grid(),
            position.x + half.x - SKIN,
            position.z + half.z - SKIN,
            bottom,
            still_only,
        );
        GroundContacts { near, far }
    }
}

impl Integrator for GridIntegrator {
    fn integrate(
        &self,
        entity: &mut dyn PhysicsEntity,
        elapsed: f32,
        simple: bool,
        keep_in_front: bool,
    ) -> bool {
        let start = entity.center();
        let mut position = start;
        let mut velocity = entity.velocity();

        if entity.ignores_collision() {
            position += velocity * elapsed;
            entity.set_center(position);
            entity.set_ground_contacts(GroundContacts::NONE);
            return position.distance_squared(start) > MOVE_EPSILON * MOVE_EPSILON;
        }

        let half = entity.size() * 0.5;
        let elasticity = entity.elasticity();
        let still_only = entity.background();

        // Ride whatever we were resting on last tick.
        position += entity.ground_contacts().carry_velocity() * elapsed;

        if !simple {
            self.look_ahead(position, &mut velocity, half, elapsed, still_only && !keep_in_front);
        }

        let landed = self.resolve_vertical(&mut position, &mut velocity, half, elapsed, elasticity, still_only);
        self.resolve_horizontal(&mut position, &mut velocity, half, elapsed, elasticity, still_only);

        let mut contacts = if landed || velocity.y == 0.0 {
            self.sample_contacts(position, half, still_only)
        } else {
            GroundContacts::NONE
        };
        if landed && !contacts.grounded() {
            // Landed on a block neither corner probe sees (footprint wider than the block).
            let aabb = Aabb::from_center_size(position - Vec3::new(0.0, 0.02, 0.0), half * 2.0);
            contacts.near = highest_top_below(self.grid(), &aabb, still_only);
        }

        if contacts.grounded() {
            let keep = (1.0 - GROUND_FRICTION * elapsed).max(0.0);
            velocity.x *= keep;
            velocity.z *= keep;
            if velocity.x.abs() < SLIDE_CUTOFF {
                velocity.x = 0.0;
            }
            if velocity.z.abs() < SLIDE_CUTOFF {
                velocity.z = 0.0;
            }
        }

        entity.set_center(position);
        entity.set_velocity(velocity);
        entity.set_ground_contacts(contacts);
        position.distance_squared(start) > MOVE_EPSILON * MOVE_EPSILON
    }
}
