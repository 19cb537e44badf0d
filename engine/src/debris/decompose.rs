//! Cutting a block into fragments.
//!
//! Two modes:
//! - **explode**: roughly cubic boxes scattered through the 16³ trixel
//!   subdivision, thrown away from the energy source.
//! - **crumble**: a face tiled by [`divide_face`], each tile pushed onto a
//!   random side of the block and released top-first.
//!
//! All randomness comes from the caller's generator so a seeded generator
//! reproduces the same debris.

use std::f32::consts::TAU;

use glam::{UVec3, Vec3};
use rand::Rng;

use super::divider::{FaceCell, divide_face};
use super::fragment::FragmentEntity;
use super::settings::{AtlasRegion, ExplosionSettings};
use crate::config::DebrisConfig;
use crate::world::TRIXELS_PER_BLOCK;

/// How much of an impulse survives `distance` blocks from its origin.
#[inline]
pub fn distance_falloff(distance: f32) -> f32 {
    (1.0 + distance).powf(-1.5)
}

/// Quadratic ease-out on `[0, 1]`.
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// How far a shape is from roughly cubic, in trixels. Zero or less is
/// acceptable: `|x−y| ≤ (x+y)/2` and `|z−y| ≤ (z+y)/2`.
pub fn shape_skew(extents: UVec3) -> f32 {
    let e = extents.as_vec3();
    let xy = (e.x - e.y).abs() - (e.x + e.y) * 0.5;
    let zy = (e.z - e.y).abs() - (e.z + e.y) * 0.5;
    xy.max(zy)
}

/// Sample per-axis extents in `[min, max]` trixels until the shape is
/// roughly cubic, giving up after `max_attempts` draws with the least
/// skewed candidate seen.
pub fn sample_extents<R: Rng + ?Sized>(min: u32, max: u32, max_attempts: u32, rng: &mut R) -> UVec3 {
    let mut best = UVec3::splat(min);
    let mut best_skew = f32::INFINITY;

    for _ in 0..max_attempts.max(1) {
        let candidate = UVec3::new(
            rng.gen_range(min..=max),
            rng.gen_range(min..=max),
            rng.gen_range(min..=max),
        );
        let skew = shape_skew(candidate);
        if skew <= 0.0 {
            return candidate;
        }
        if skew < best_skew {
            best = candidate;
            best_skew = skew;
        }
    }

    log::debug!("Shape sampling exhausted {max_attempts} attempts, keeping {best} (skew {best_skew})");
    best
}

/// Uniformly distributed direction.
pub fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let theta: f32 = rng.gen_range(0.0..TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

/// Bigger fragments fly slower.
#[inline]
fn size_dampening(size: Vec3) -> f32 {
    (1.5 - (size.x + size.y + size.z)).clamp(0.0, 1.0)
}

/// Launch speed before size dampening.
fn base_speed(settings: &ExplosionSettings) -> f32 {
    let distance = settings.energy_source().distance(settings.source_block_center);
    settings.energy * distance_falloff(distance)
}

/// Tint and starting glow of one fragment.
fn tint<R: Rng + ?Sized>(settings: &ExplosionSettings, color: Vec3, rng: &mut R) -> (Vec3, f32) {
    let color = if settings.darken {
        color * rng.gen_range(0.4_f32..0.8)
    } else {
        color
    };
    let incandescence = if settings.incandesce {
        rng.gen_range(0.75..1.25)
    } else {
        0.0
    };
    (color, incandescence)
}

/// Explode mode: `settings.fragment_count` roughly cubic fragments.
pub fn explode<R: Rng + ?Sized>(
    settings: &ExplosionSettings,
    color: Vec3,
    atlas: &AtlasRegion,
    (min_size, max_size): (u32, u32),
    config: &DebrisConfig,
    rng: &mut R,
) -> Vec<FragmentEntity> {
    let block_min = settings.source_block_center - Vec3::splat(0.5);
    let energy_source = settings.energy_source();
    let speed = base_speed(settings);
    let scale = TRIXELS_PER_BLOCK as f32;

    let mut fragments = Vec::with_capacity(settings.fragment_count);
    for _ in 0..settings.fragment_count {
        let extents = sample_extents(min_size, max_size, config.max_shape_attempts, rng);
        let origin = UVec3::new(
            rng.gen_range(0..TRIXELS_PER_BLOCK),
            rng.gen_range(0..TRIXELS_PER_BLOCK),
            rng.gen_range(0..TRIXELS_PER_BLOCK),
        )
        .min(UVec3::splat(TRIXELS_PER_BLOCK) - extents);

        let local_min = origin.as_vec3() / scale;
        let size = extents.as_vec3() / scale;
        let center = block_min + local_min + size * 0.5;
        let region = atlas.sub_region(local_min.x, local_min.y, size.x, size.y);

        let direction = (center - energy_source)
            .try_normalize()
            .unwrap_or_else(|| random_unit(rng));
        let (tinted, incandescence) = tint(settings, color, rng);

        let mut fragment = FragmentEntity::new(center, size, tinted, region);
        fragment.velocity = direction * speed * size_dampening(size);
        fragment.incandescence = incandescence;
        fragments.push(fragment);
    }
    fragments
}

/// Block-local placement of a face cell pushed onto side `face`
/// (0 front +z, 1 back -z, 2 right +x, 3 left -x). Returns (min, size).
fn place_on_side(cell: &FaceCell, face: u32) -> (Vec3, Vec3) {
    let depth = cell.width.min(cell.height);
    let mirrored = 1.0 - cell.left - cell.width;
    match face {
        0 => (
            Vec3::new(cell.left, cell.bottom, 1.0 - depth),
            Vec3::new(cell.width, cell.height, depth),
        ),
        1 => (
            Vec3::new(mirrored, cell.bottom, 0.0),
            Vec3::new(cell.width, cell.height, depth),
        ),
        2 => (
            Vec3::new(1.0 - depth, cell.bottom, mirrored),
            Vec3::new(depth, cell.height, cell.width),
        ),
        _ => (
            Vec3::new(0.0, cell.bottom, cell.left),
            Vec3::new(depth, cell.height, cell.width),
        ),
    }
}

/// Crumble mode: one fragment per face cell, top cells released first.
pub fn crumble<R: Rng + ?Sized>(
    settings: &ExplosionSettings,
    color: Vec3,
    atlas: &AtlasRegion,
    config: &DebrisConfig,
    rng: &mut R,
) -> Vec<FragmentEntity> {
    let block_min = settings.source_block_center - Vec3::splat(0.5);
    let speed = base_speed(settings);
    let cells = divide_face(settings.fragment_count, rng);

    let mut fragments = Vec::with_capacity(cells.len());
    for cell in &cells {
        let (local_min, size) = place_on_side(cell, rng.gen_range(0..4));
        let center = block_min + local_min + size * 0.5;
        let region = atlas.sub_region(cell.left, cell.bottom, cell.width, cell.height);

        let jitter = if config.crumble_delay_jitter > 0.0 {
            rng.gen_range(0.0..config.crumble_delay_jitter)
        } else {
            0.0
        };
        let direction = random_unit(rng);
        let (tinted, incandescence) = tint(settings, color, rng);

        let mut fragment = FragmentEntity::new(center, size, tinted, region);
        fragment.velocity = direction * speed * size_dampening(size);
        fragment.incandescence = incandescence;
        fragment.spawn_delay = ease_out(1.0 - cell.top()) * config.crumble_delay_span + jitter;
        fragments.push(fragment);
    }
    fragments
}
