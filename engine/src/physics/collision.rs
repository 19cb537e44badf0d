//! Collision queries of a box against the level grid.
//!
//! Boxes are tested against every block whose cell they cover. Touching a
//! face does not count as overlap, so an entity resting exactly on a block
//! top is free to slide sideways.
//!
//! # Example
//!
//! ```ignore
//! use trixel_debris_engine::physics::collision::{highest_top_below, SKIN};
//! use trixel_debris_engine::physics::Aabb;
//! use trixel_debris_engine::world::BlockGrid;
//! use glam::Vec3;
//!
//! let grid = BlockGrid::with_floor(-4, 4, -4, 4, -1);
//! let falling = Aabb::from_center_size(Vec3::new(0.0, -0.45, 0.0), Vec3::splat(0.25));
//! assert_eq!(highest_top_below(&grid, &falling, false).map(|b| b.max().y), Some(-0.5));
//! ```

use glam::{IVec3, Vec3};

use super::types::Aabb;
use crate::world::{BlockInstance, LevelGrid, cell_of};

/// Shrink applied to query boxes so touching faces are not overlaps.
pub const SKIN: f32 = 1e-4;

/// Visit every block overlapping `aabb`.
///
/// `still_only` restricts the visit to motionless blocks (background bodies).
pub fn for_each_overlapping(
    grid: &dyn LevelGrid,
    aabb: &Aabb,
    still_only: bool,
    mut visit: impl FnMut(BlockInstance),
) {
    let min = cell_of(aabb.min + Vec3::splat(SKIN));
    let max = cell_of(aabb.max - Vec3::splat(SKIN));
    for x in min.x..=max.x {
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                if let Some(block) = grid.instance_at(IVec3::new(x, y, z)) {
                    if still_only && !block.is_still() {
                        continue;
                    }
                    visit(block);
                }
            }
        }
    }
}

/// True if any block overlaps `aabb`.
pub fn overlaps_any(grid: &dyn LevelGrid, aabb: &Aabb, still_only: bool) -> bool {
    let mut hit = false;
    for_each_overlapping(grid, aabb, still_only, |_| hit = true);
    hit
}

/// Overlapping block with the highest top face (landing surface).
pub fn highest_top_below(grid: &dyn LevelGrid, aabb: &Aabb, still_only: bool) -> Option<BlockInstance> {
    let mut best: Option<BlockInstance> = None;
    for_each_overlapping(grid, aabb, still_only, |block| {
        if best.is_none_or(|b| block.max().y > b.max().y) {
            best = Some(block);
        }
    });
    best
}

/// Overlapping block with the lowest bottom face (ceiling).
pub fn lowest_bottom_above(grid: &dyn LevelGrid, aabb: &Aabb, still_only: bool) -> Option<BlockInstance> {
    let mut best: Option<BlockInstance> = None;
    for_each_overlapping(grid, aabb, still_only, |block| {
        if best.is_none_or(|b| block.min().y < b.min().y) {
            best = Some(block);
        }
    });
    best
}

/// Block directly under a footprint point, probing just below `bottom`.
pub fn support_under(
    grid: &dyn LevelGrid,
    x: f32,
    z: f32,
    bottom: f32,
    still_only: bool,
) -> Option<BlockInstance> {
    grid.instance_at_point(Vec3::new(x, bottom - 0.01, z))
        .filter(|block| !still_only || block.is_still())
}
