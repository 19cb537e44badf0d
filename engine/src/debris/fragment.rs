//! A single debris fragment.

use glam::Vec3;

use crate::physics::{Aabb, GroundContacts, PhysicsEntity};
use crate::render::instancing::FragmentInstance;

/// Fraction of vertical speed a fragment keeps when it bounces.
pub const FRAGMENT_ELASTICITY: f32 = 0.15;

/// One small box of a destroyed block.
///
/// Never rotates and never collides with other fragments. Created by
/// decomposition, owned by one [`super::ExplosionSystem`].
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentEntity {
    /// World-space center in blocks
    pub center: Vec3,
    /// Blocks per second
    pub velocity: Vec3,
    /// Box extents in blocks (multiples of 1/16)
    pub size: Vec3,
    /// Base tint (source color, maybe darkened)
    pub color: Vec3,
    /// Glow added on top of the tint; decays every tick
    pub incandescence: f32,
    /// Atlas sub-rectangle (u, v, width, height)
    pub texture_region: [f32; 4],
    pub ground_contacts: GroundContacts,
    /// False once the fragment fell out of the world; never re-enabled
    pub enabled: bool,
    /// At rest on motionless ground; skipped until disturbed
    pub frozen: bool,
    /// Seconds until a crumbling fragment starts falling
    pub spawn_delay: f32,
    /// Where a pending fragment sits before its system's translation
    pub spawn_center: Vec3,
}

impl FragmentEntity {
    pub fn new(center: Vec3, size: Vec3, color: Vec3, texture_region: [f32; 4]) -> Self {
        Self {
            center,
            velocity: Vec3::ZERO,
            size,
            color,
            incandescence: 0.0,
            texture_region,
            ground_contacts: GroundContacts::NONE,
            enabled: true,
            frozen: false,
            spawn_delay: 0.0,
            spawn_center: center,
        }
    }

    /// True once the spawn delay has run out.
    #[inline]
    pub fn is_spawned(&self) -> bool {
        self.spawn_delay <= 0.0
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.size.x * self.size.y * self.size.z
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.size)
    }

    /// Instance record at the current center.
    pub fn to_instance(&self, opacity: f32) -> FragmentInstance {
        self.instance_at(self.center, opacity)
    }

    /// Instance record of a fragment still waiting for its spawn delay,
    /// carried along with its system's translation.
    pub fn to_pending_instance(&self, opacity: f32, translation: Vec3) -> FragmentInstance {
        self.instance_at(self.spawn_center + translation, opacity)
    }

    fn instance_at(&self, position: Vec3, opacity: f32) -> FragmentInstance {
        FragmentInstance {
            position: position.to_array(),
            size: self.size.to_array(),
            tinted_color: (self.color * (1.0 + self.incandescence)).to_array(),
            opacity,
            texture_offset_scale: self.texture_region,
        }
    }
}

impl PhysicsEntity for FragmentEntity {
    fn center(&self) -> Vec3 {
        self.center
    }

    fn set_center(&mut self, center: Vec3) {
        self.center = center;
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn size(&self) -> Vec3 {
        self.size
    }

    fn ground_contacts(&self) -> GroundContacts {
        self.ground_contacts
    }

    fn set_ground_contacts(&mut self, contacts: GroundContacts) {
        self.ground_contacts = contacts;
    }

    fn elasticity(&self) -> f32 {
        FRAGMENT_ELASTICITY
    }

    fn background(&self) -> bool {
        false
    }

    fn ignores_collision(&self) -> bool {
        false
    }
}
