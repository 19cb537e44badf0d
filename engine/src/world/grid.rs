//! Level Grid Module
//!
//! The level's block grid as seen by the fragment integrator. The game owns
//! the real grid; this module defines the narrow query contract it must
//! satisfy ([`LevelGrid`]) plus [`BlockGrid`], a hash-map implementation
//! used by the harness and the tests.
//!
//! ## Block Space
//! 1 unit = 1 block edge. The block at cell `c` occupies the unit box
//! centered on `c`, i.e. `[c - 0.5, c + 0.5]` on every axis. A trixel is
//! 1/16 of a block edge.

use glam::{IVec3, Vec3};
use std::collections::HashMap;

/// Number of trixels along one block edge.
pub const TRIXELS_PER_BLOCK: u32 = 16;

/// A block occupying one cell of the level, as reported to the integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockInstance {
    /// Grid cell of the block
    pub cell: IVec3,
    /// Velocity of the block itself (moving platforms)
    pub velocity: Vec3,
    /// Movement the block imparts on whatever rests on it (conveyors, rafts)
    pub ground_movement: Vec3,
}

impl BlockInstance {
    /// A static block at `cell`.
    pub fn fixed(cell: IVec3) -> Self {
        Self {
            cell,
            velocity: Vec3::ZERO,
            ground_movement: Vec3::ZERO,
        }
    }

    /// A block moving with `velocity`.
    pub fn moving(cell: IVec3, velocity: Vec3) -> Self {
        Self {
            cell,
            velocity,
            ground_movement: Vec3::ZERO,
        }
    }

    /// True if neither the block nor its ground movement is in motion.
    #[inline]
    pub fn is_still(&self) -> bool {
        self.velocity == Vec3::ZERO && self.ground_movement == Vec3::ZERO
    }

    /// Minimum corner of the block's box.
    #[inline]
    pub fn min(&self) -> Vec3 {
        self.cell.as_vec3() - Vec3::splat(0.5)
    }

    /// Maximum corner of the block's box.
    #[inline]
    pub fn max(&self) -> Vec3 {
        self.cell.as_vec3() + Vec3::splat(0.5)
    }
}

/// Grid cell containing a world-space point.
#[inline]
pub fn cell_of(point: Vec3) -> IVec3 {
    (point + Vec3::splat(0.5)).floor().as_ivec3()
}

/// Read-only block queries used by the integrator.
///
/// Implementations are shared between the simulation thread and the update
/// worker, so they must be `Send + Sync`. Blocks destroyed by gameplay are
/// expected to be gone from the grid before an explosion spawns.
pub trait LevelGrid: Send + Sync {
    /// The block occupying `cell`, if any.
    fn instance_at(&self, cell: IVec3) -> Option<BlockInstance>;

    /// The block containing `point`, if any.
    fn instance_at_point(&self, point: Vec3) -> Option<BlockInstance> {
        self.instance_at(cell_of(point))
    }
}

/// Sparse block grid backed by a hash map.
#[derive(Debug, Clone, Default)]
pub struct BlockGrid {
    blocks: HashMap<IVec3, BlockInstance>,
}

impl BlockGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flat floor of static blocks covering `[min_x, max_x] × [min_z, max_z]` at height `y`.
    pub fn with_floor(min_x: i32, max_x: i32, min_z: i32, max_z: i32, y: i32) -> Self {
        let mut grid = Self::new();
        for x in min_x..=max_x {
            for z in min_z..=max_z {
                grid.insert(BlockInstance::fixed(IVec3::new(x, y, z)));
            }
        }
        grid
    }

    /// Insert or replace a block.
    pub fn insert(&mut self, block: BlockInstance) {
        self.blocks.insert(block.cell, block);
    }

    /// Remove the block at `cell`, returning it.
    pub fn remove(&mut self, cell: IVec3) -> Option<BlockInstance> {
        self.blocks.remove(&cell)
    }

    /// Set the velocity of an existing block. Returns false if the cell is empty.
    pub fn set_velocity(&mut self, cell: IVec3, velocity: Vec3) -> bool {
        match self.blocks.get_mut(&cell) {
            Some(block) => {
                block.velocity = velocity;
                true
            }
            None => false,
        }
    }

    /// Check if a cell is occupied.
    pub fn contains(&self, cell: IVec3) -> bool {
        self.blocks.contains_key(&cell)
    }

    /// Number of blocks in the grid.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if the grid holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl LevelGrid for BlockGrid {
    fn instance_at(&self, cell: IVec3) -> Option<BlockInstance> {
        self.blocks.get(&cell).copied()
    }
}
