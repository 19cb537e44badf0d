//! Decomposition Tests - Fragment Volume, Face Tiling and Crumble Timing
//!
//! Tests for how an ExplosionSystem cuts its source block: explode-mode
//! volume and shape, crumble-mode face coverage and spawn delays, and the
//! construction errors.

use glam::{UVec3, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use trixel_debris_engine::debris::decompose::{sample_extents, shape_skew};
use trixel_debris_engine::debris::divider::divide_face;
use trixel_debris_engine::{AtlasRegion, DebrisConfig, DebrisError, ExplosionSettings, ExplosionSystem, SourceBlock};

fn block() -> SourceBlock {
    SourceBlock::textured(AtlasRegion::FULL)
}

fn build(settings: ExplosionSettings, seed: u64) -> ExplosionSystem {
    let mut rng = StdRng::seed_from_u64(seed);
    ExplosionSystem::new(settings, &block(), &DebrisConfig::default(), &mut rng).unwrap()
}

// ============================================================================
// Explode Mode
// ============================================================================

#[test]
fn test_explode_volume_approximates_one_block() {
    for count in [8, 10, 20, 40, 64, 100] {
        for seed in 0..4 {
            let system = build(ExplosionSettings::new(Vec3::ZERO).with_fragment_count(count), seed);
            let volume: f32 = system.fragments().iter().map(|f| f.volume()).sum();
            assert!(
                (0.4..=1.6).contains(&volume),
                "count {count} seed {seed}: total volume {volume}"
            );
        }
    }
}

#[test]
fn test_explode_produces_requested_count() {
    let system = build(ExplosionSettings::new(Vec3::ZERO).with_fragment_count(17), 1);
    assert_eq!(system.fragments().len(), 17);
    assert_eq!(system.instances().len(), 17);
}

#[test]
fn test_explode_shapes_are_roughly_cubic() {
    let system = build(ExplosionSettings::new(Vec3::ZERO), 2);
    for fragment in system.fragments() {
        let trixels = (fragment.size * 16.0).round().as_uvec3();
        assert!(trixels.min_element() >= 3 && trixels.max_element() <= 6);
        assert!(shape_skew(trixels) <= 0.0, "skewed fragment {trixels}");
    }
}

#[test]
fn test_explicit_size_range_is_respected() {
    let system = build(ExplosionSettings::new(Vec3::ZERO).with_size_range(2, 2), 3);
    for fragment in system.fragments() {
        assert_eq!(fragment.size, Vec3::splat(2.0 / 16.0));
    }
}

#[test]
fn test_same_seed_same_debris() {
    let settings = ExplosionSettings::new(Vec3::new(1.0, 2.0, 3.0)).with_energy(3.0).darkened();
    let a = build(settings.clone(), 99);
    let b = build(settings, 99);
    assert_eq!(a.fragments(), b.fragments());
}

#[test]
fn test_texture_regions_stay_inside_atlas_slice() {
    let atlas = AtlasRegion::new(0.25, 0.5, 0.25, 0.25);
    let mut rng = StdRng::seed_from_u64(4);
    let system = ExplosionSystem::new(
        ExplosionSettings::new(Vec3::ZERO),
        &SourceBlock::textured(atlas),
        &DebrisConfig::default(),
        &mut rng,
    )
    .unwrap();
    for fragment in system.fragments() {
        let [u, v, w, h] = fragment.texture_region;
        assert!(u >= 0.25 - 1e-6 && u + w <= 0.5 + 1e-6);
        assert!(v >= 0.5 - 1e-6 && v + h <= 0.75 + 1e-6);
    }
}

// ============================================================================
// Bounded Shape Sampling
// ============================================================================

#[test]
fn test_sampler_terminates_on_unsatisfiable_range() {
    // 1..16 with a single attempt: most draws fail the cubic test.
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..1000 {
        let extents = sample_extents(1, 16, 1, &mut rng);
        assert!(extents.cmpge(UVec3::ONE).all() && extents.cmple(UVec3::splat(16)).all());
    }
}

#[test]
fn test_sampler_zero_attempts_still_returns() {
    let mut rng = StdRng::seed_from_u64(6);
    let extents = sample_extents(4, 4, 0, &mut rng);
    assert_eq!(extents, UVec3::splat(4));
}

// ============================================================================
// Crumble Mode
// ============================================================================

#[test]
fn test_face_divider_tiles_unit_square() {
    let mut rng = StdRng::seed_from_u64(7);
    for count in [1, 2, 5, 40, 97] {
        let cells = divide_face(count, &mut rng);
        assert_eq!(cells.len(), count);
        let area: f32 = cells.iter().map(|c| c.area()).sum();
        assert!((area - 1.0).abs() < 1e-4, "count {count}: area {area}");
        for (i, a) in cells.iter().enumerate() {
            for b in &cells[i + 1..] {
                assert!(a.overlap_area(b) < 1e-6);
            }
        }
    }
}

#[test]
fn test_crumble_fragment_count_matches_settings() {
    let system = build(ExplosionSettings::new(Vec3::ZERO).crumbling().with_fragment_count(33), 8);
    assert_eq!(system.fragments().len(), 33);
}

#[test]
fn test_crumble_texture_regions_cover_face() {
    let system = build(ExplosionSettings::new(Vec3::ZERO).crumbling(), 9);
    let covered: f32 = system
        .fragments()
        .iter()
        .map(|f| f.texture_region[2] * f.texture_region[3])
        .sum();
    assert!((covered - 1.0).abs() < 1e-4);
}

#[test]
fn test_crumble_depth_is_smaller_cell_side() {
    let system = build(ExplosionSettings::new(Vec3::ZERO).crumbling(), 10);
    for fragment in system.fragments() {
        let [_, _, w, h] = fragment.texture_region;
        assert!((fragment.size.min_element() - w.min(h)).abs() < 1e-6);
    }
}

#[test]
fn test_crumble_top_cells_fall_first() {
    let config = DebrisConfig {
        crumble_delay_jitter: 0.0,
        ..DebrisConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(11);
    let system = ExplosionSystem::new(
        ExplosionSettings::new(Vec3::ZERO).crumbling(),
        &block(),
        &config,
        &mut rng,
    )
    .unwrap();

    let fragments = system.fragments();
    let top = |i: usize| fragments[i].center.y + fragments[i].size.y * 0.5;
    for i in 0..fragments.len() {
        assert!(fragments[i].spawn_delay >= 0.0 && fragments[i].spawn_delay <= 0.5 + 1e-6);
        for j in 0..fragments.len() {
            if top(i) > top(j) + 1e-5 {
                assert!(fragments[i].spawn_delay <= fragments[j].spawn_delay + 1e-6);
            }
        }
    }
}

// ============================================================================
// Construction Errors
// ============================================================================

#[test]
fn test_zero_fragments_rejected() {
    let mut rng = StdRng::seed_from_u64(12);
    let result = ExplosionSystem::new(
        ExplosionSettings::new(Vec3::ZERO).with_fragment_count(0),
        &block(),
        &DebrisConfig::default(),
        &mut rng,
    );
    assert!(matches!(result, Err(DebrisError::ZeroFragmentCount)));
}

#[test]
fn test_inverted_range_rejected() {
    let mut rng = StdRng::seed_from_u64(13);
    let result = ExplosionSystem::new(
        ExplosionSettings::new(Vec3::ZERO).with_size_range(9, 3),
        &block(),
        &DebrisConfig::default(),
        &mut rng,
    );
    assert!(matches!(result, Err(DebrisError::InvalidSizeRange { min: 9, max: 3 })));
}

#[test]
fn test_missing_atlas_rejected() {
    let mut rng = StdRng::seed_from_u64(14);
    let source = SourceBlock {
        atlas: None,
        color: Vec3::ONE,
    };
    let result = ExplosionSystem::new(ExplosionSettings::new(Vec3::ZERO), &source, &DebrisConfig::default(), &mut rng);
    assert!(matches!(result, Err(DebrisError::MissingAtlas)));
}

#[test]
fn test_non_finite_settings_rejected() {
    let cases = [
        (ExplosionSettings::new(Vec3::new(f32::NAN, 0.0, 0.0)), "source_block_center"),
        (
            ExplosionSettings::new(Vec3::ZERO).with_energy_source(Vec3::new(0.0, f32::INFINITY, 0.0)),
            "energy_source",
        ),
        (ExplosionSettings::new(Vec3::ZERO).with_energy(f32::NAN), "energy"),
        (
            ExplosionSettings::new(Vec3::ZERO).with_gravity_modifier(f32::NEG_INFINITY),
            "gravity_modifier",
        ),
    ];
    for (settings, field) in cases {
        let mut rng = StdRng::seed_from_u64(15);
        let result = ExplosionSystem::new(settings, &block(), &DebrisConfig::default(), &mut rng);
        match result {
            Err(DebrisError::NonFiniteSettings(name)) => assert_eq!(name, field),
            other => panic!("{field}: expected NonFiniteSettings, got {:?}", other.map(|s| s.id())),
        }
    }
}

#[test]
fn test_oversized_fragment_count_rejected() {
    let mut rng = StdRng::seed_from_u64(16);
    let result = ExplosionSystem::new(
        ExplosionSettings::new(Vec3::ZERO).with_fragment_count(usize::MAX / 2),
        &block(),
        &DebrisConfig::default(),
        &mut rng,
    );
    assert!(matches!(
        result,
        Err(DebrisError::TooManyFragments { count, max: 256 }) if count == usize::MAX / 2
    ));

    // The limit itself is still allowed.
    let at_limit = build(ExplosionSettings::new(Vec3::ZERO).with_fragment_count(256), 17);
    assert_eq!(at_limit.fragments().len(), 256);
}
