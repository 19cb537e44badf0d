//! Physics entity contract
//!
//! The integrator moves anything that exposes this narrow capability set.
//! Fragments implement it; so could any other simple body the game wants
//! integrated the same way.

use glam::Vec3;

use crate::world::BlockInstance;

/// Blocks supporting an entity, sampled under two opposite corners of its
/// footprint. An entity straddling two blocks sees both.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundContacts {
    /// Block under the footprint's minimum corner
    pub near: Option<BlockInstance>,
    /// Block under the footprint's maximum corner
    pub far: Option<BlockInstance>,
}

impl GroundContacts {
    /// No support at all (airborne).
    pub const NONE: Self = Self {
        near: None,
        far: None,
    };

    /// True if at least one supporting block was found.
    #[inline]
    pub fn grounded(&self) -> bool {
        self.near.is_some() || self.far.is_some()
    }

    /// Grounded, and every supporting block is itself motionless.
    pub fn is_still(&self) -> bool {
        self.grounded()
            && self.near.is_none_or(|b| b.is_still())
            && self.far.is_none_or(|b| b.is_still())
    }

    /// Combined carry velocity of the supports (average of the contacts).
    pub fn carry_velocity(&self) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0.0;
        for block in [self.near, self.far].into_iter().flatten() {
            sum += block.velocity + block.ground_movement;
            count += 1.0;
        }
        if count > 0.0 { sum / count } else { Vec3::ZERO }
    }
}

/// What the integrator needs to know about a body.
pub trait PhysicsEntity {
    fn center(&self) -> Vec3;
    fn set_center(&mut self, center: Vec3);
    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);
    /// Full extents of the body's box in blocks.
    fn size(&self) -> Vec3;
    fn ground_contacts(&self) -> GroundContacts;
    fn set_ground_contacts(&mut self, contacts: GroundContacts);
    /// Fraction of vertical speed kept when bouncing off the ground.
    fn elasticity(&self) -> f32;
    /// Background bodies only collide with motionless blocks.
    fn background(&self) -> bool;
    /// Skip collision entirely; the body just follows its velocity.
    fn ignores_collision(&self) -> bool;
}
