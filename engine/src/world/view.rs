//! View volume used for draw culling and off-screen debris collection.

use glam::Vec3;

/// Sphere around the camera's view center.
///
/// The camera collaborator pushes a fresh volume to the scheduler every
/// frame. Fragments that fall more than half the radius below the center
/// are disabled for good.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewVolume {
    /// World-space point the camera looks at
    pub center: Vec3,
    /// Camera radius in blocks
    pub radius: f32,
}

impl Default for ViewVolume {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 32.0,
        }
    }
}

impl ViewVolume {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Height below which fragments are garbage.
    #[inline]
    pub fn kill_height(&self) -> f32 {
        self.center.y - self.radius * 0.5
    }

    /// Sphere vs axis-aligned box overlap.
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        let closest = self.center.clamp(min, max);
        closest.distance_squared(self.center) <= self.radius * self.radius
    }
}
