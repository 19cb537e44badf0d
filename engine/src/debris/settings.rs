//! Explosion settings and the appearance of the block being destroyed.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::DebrisError;
use crate::world::TRIXELS_PER_BLOCK;

/// Fragment count used when the trigger does not ask for one.
pub const DEFAULT_FRAGMENT_COUNT: usize = 40;

/// What a gameplay trigger asks of one explosion. Immutable once the
/// system is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionSettings {
    /// Center of the destroyed block
    pub source_block_center: Vec3,
    /// Where the blast comes from; the block center when absent
    pub energy_source: Option<Vec3>,
    /// Smallest fragment extent in trixels (derived from the count when absent)
    pub min_fragment_size: Option<u32>,
    /// Largest fragment extent in trixels (derived from the count when absent)
    pub max_fragment_size: Option<u32>,
    /// Blast strength, in blocks/s at zero distance
    pub energy: f32,
    /// Per-explosion gravity multiplier
    pub gravity_modifier: f32,
    pub fragment_count: usize,
    /// Mottle fragments darker than the source block
    pub darken: bool,
    /// Fragments start glowing hot and cool down
    pub incandesce: bool,
    /// Tile a face and stagger the fall instead of blasting outward
    pub crumble: bool,
}

impl Default for ExplosionSettings {
    fn default() -> Self {
        Self {
            source_block_center: Vec3::ZERO,
            energy_source: None,
            min_fragment_size: None,
            max_fragment_size: None,
            energy: 1.0,
            gravity_modifier: 1.0,
            fragment_count: DEFAULT_FRAGMENT_COUNT,
            darken: false,
            incandesce: false,
            crumble: false,
        }
    }
}

impl ExplosionSettings {
    pub fn new(source_block_center: Vec3) -> Self {
        Self {
            source_block_center,
            ..Default::default()
        }
    }

    pub fn with_energy_source(mut self, energy_source: Vec3) -> Self {
        self.energy_source = Some(energy_source);
        self
    }

    pub fn with_size_range(mut self, min: u32, max: u32) -> Self {
        self.min_fragment_size = Some(min);
        self.max_fragment_size = Some(max);
        self
    }

    pub fn with_energy(mut self, energy: f32) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_gravity_modifier(mut self, gravity_modifier: f32) -> Self {
        self.gravity_modifier = gravity_modifier;
        self
    }

    pub fn with_fragment_count(mut self, fragment_count: usize) -> Self {
        self.fragment_count = fragment_count;
        self
    }

    pub fn darkened(mut self) -> Self {
        self.darken = true;
        self
    }

    pub fn incandescent(mut self) -> Self {
        self.incandesce = true;
        self
    }

    pub fn crumbling(mut self) -> Self {
        self.crumble = true;
        self
    }

    /// Effective blast origin.
    #[inline]
    pub fn energy_source(&self) -> Vec3 {
        self.energy_source.unwrap_or(self.source_block_center)
    }

    pub fn validate(&self) -> Result<(), DebrisError> {
        self.resolved_size_range().map(|_| ())
    }

    /// Validate the settings and resolve the fragment extent range.
    ///
    /// Rejects a zero fragment count, non-finite positions or scalars and an
    /// inverted explicit range; clamps extents into `[1, 16]`.
    pub fn resolved_size_range(&self) -> Result<(u32, u32), DebrisError> {
        if self.fragment_count == 0 {
            return Err(DebrisError::ZeroFragmentCount);
        }
        if !self.source_block_center.is_finite() {
            return Err(DebrisError::NonFiniteSettings("source_block_center"));
        }
        if let Some(source) = self.energy_source
            && !source.is_finite()
        {
            return Err(DebrisError::NonFiniteSettings("energy_source"));
        }
        if !self.energy.is_finite() {
            return Err(DebrisError::NonFiniteSettings("energy"));
        }
        if !self.gravity_modifier.is_finite() {
            return Err(DebrisError::NonFiniteSettings("gravity_modifier"));
        }
        if let (Some(min), Some(max)) = (self.min_fragment_size, self.max_fragment_size) {
            if min > max {
                return Err(DebrisError::InvalidSizeRange { min, max });
            }
        }

        let (default_min, default_max) = default_size_range(self.fragment_count);
        let min = self
            .min_fragment_size
            .unwrap_or(default_min)
            .clamp(1, TRIXELS_PER_BLOCK);
        let max = self
            .max_fragment_size
            .unwrap_or(default_max)
            .clamp(min, TRIXELS_PER_BLOCK);
        Ok((min, max))
    }
}

/// Extent range whose expected total volume is about one block.
///
/// Mean edge is `16 / cbrt(count)` trixels, spread ±30%.
pub fn default_size_range(fragment_count: usize) -> (u32, u32) {
    let mean = TRIXELS_PER_BLOCK as f32 / (fragment_count.max(1) as f32).cbrt();
    let min = ((mean * 0.7).round() as u32).clamp(1, TRIXELS_PER_BLOCK);
    let max = ((mean * 1.3).round() as u32).clamp(min, TRIXELS_PER_BLOCK);
    (min, max)
}

/// A face's slice of the texture atlas, in UV space (v grows downward).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtlasRegion {
    pub u: f32,
    pub v: f32,
    pub width: f32,
    pub height: f32,
}

impl AtlasRegion {
    pub fn new(u: f32, v: f32, width: f32, height: f32) -> Self {
        Self { u, v, width, height }
    }

    /// The whole atlas.
    pub const FULL: Self = Self {
        u: 0.0,
        v: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// UV rectangle `(u, v, width, height)` of a face-local rectangle.
    ///
    /// `left`/`bottom`/`width`/`height` are in face units (0..1, y up).
    pub fn sub_region(&self, left: f32, bottom: f32, width: f32, height: f32) -> [f32; 4] {
        [
            self.u + left * self.width,
            self.v + (1.0 - bottom - height) * self.height,
            width * self.width,
            height * self.height,
        ]
    }
}

/// Appearance of the block being destroyed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceBlock {
    /// Atlas slice of the block's face; required to build fragments
    pub atlas: Option<AtlasRegion>,
    /// Base tint of the fragments
    pub color: Vec3,
}

impl SourceBlock {
    /// A block with an atlas slice and a white tint.
    pub fn textured(atlas: AtlasRegion) -> Self {
        Self {
            atlas: Some(atlas),
            color: Vec3::ONE,
        }
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }
}
