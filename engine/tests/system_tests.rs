//! Explosion System Tests - Physics Tick, Lifecycle and Instance Packing
//!
//! Drives single ExplosionSystems through `update` with the grid integrator
//! and with stub integrators that force specific outcomes (NaN state,
//! resting on still or moving ground).

use std::sync::Arc;

use glam::{IVec3, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use trixel_debris_engine::physics::GroundContacts;
use trixel_debris_engine::{
    AtlasRegion, BlockGrid, BlockInstance, DebrisConfig, ExplosionSettings, ExplosionSystem, FragmentInstance,
    GridIntegrator, Integrator, PhysicsEntity, SourceBlock, TickContext, ViewVolume,
};

const TICK: f32 = 1.0 / 60.0;

fn build(settings: ExplosionSettings, seed: u64) -> ExplosionSystem {
    let mut rng = StdRng::seed_from_u64(seed);
    ExplosionSystem::new(
        settings,
        &SourceBlock::textured(AtlasRegion::FULL),
        &DebrisConfig::default(),
        &mut rng,
    )
    .unwrap()
}

fn floor_integrator() -> GridIntegrator {
    GridIntegrator::new(Arc::new(BlockGrid::with_floor(-8, 8, -8, 8, -1)))
}

fn run(system: &mut ExplosionSystem, ctx: &TickContext<'_>, seconds: f32) {
    let ticks = (seconds / TICK).round() as u32;
    for _ in 0..ticks {
        system.update(TICK, ctx);
    }
}

/// Leaves the entity where it is and reports fixed contacts.
struct StubIntegrator {
    moved: bool,
    contacts: GroundContacts,
}

impl Integrator for StubIntegrator {
    fn integrate(&self, entity: &mut dyn PhysicsEntity, _elapsed: f32, _simple: bool, _keep_in_front: bool) -> bool {
        entity.set_ground_contacts(self.contacts);
        self.moved
    }
}

/// Corrupts every entity it touches.
struct NanIntegrator;

impl Integrator for NanIntegrator {
    fn integrate(&self, entity: &mut dyn PhysicsEntity, _elapsed: f32, _simple: bool, _keep_in_front: bool) -> bool {
        entity.set_center(Vec3::splat(f32::NAN));
        entity.set_velocity(Vec3::new(f32::INFINITY, 0.0, 0.0));
        true
    }
}

fn still_ground() -> GroundContacts {
    let block = BlockInstance::fixed(IVec3::new(0, -1, 0));
    GroundContacts {
        near: Some(block),
        far: Some(block),
    }
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_zero_elapsed_changes_nothing() {
    let config = DebrisConfig::default();
    let integrator = floor_integrator();
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).with_energy(3.0), 1);
    run(&mut system, &ctx, 0.5);

    let before = system.fragments().to_vec();
    let records = system.instances().records().to_vec();
    let age = system.age();

    assert!(!system.update(0.0, &ctx));
    assert!(!system.update(0.0, &ctx));
    assert!(!system.update(-1.0, &ctx));

    assert_eq!(system.fragments(), before.as_slice());
    assert_eq!(system.instances().records(), records.as_slice());
    assert_eq!(system.age(), age);
}

// ============================================================================
// Lifetime and Fade
// ============================================================================

#[test]
fn test_opacity_follows_lifetime() {
    let config = DebrisConfig::default();
    let integrator = floor_integrator();
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO), 2);

    for _ in 0..8 {
        system.update(0.5, &ctx);
    }
    assert_eq!(system.age(), 4.0);
    assert_eq!(system.opacity(), 1.0);

    system.update(1.0, &ctx);
    assert_eq!(system.opacity(), 0.5);
    assert!(!system.is_dead());

    system.update(1.0, &ctx);
    assert_eq!(system.opacity(), 0.0);
    assert!(!system.is_dead(), "dead only strictly after the lifetime");

    assert!(system.update(0.01, &ctx));
    assert!(system.is_dead());
}

#[test]
fn test_fading_repacks_frozen_fragments() {
    let config = DebrisConfig::default();
    let integrator = floor_integrator();
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).with_energy(0.0), 3);
    run(&mut system, &ctx, 3.5);
    assert!(system.fragments().iter().all(|f| f.frozen), "fragments should have settled");

    run(&mut system, &ctx, 1.0);
    let opacity = system.opacity();
    assert!(opacity < 1.0);
    for record in system.instances().records() {
        assert_eq!(record.opacity, opacity);
    }
}

// ============================================================================
// Physics Tick
// ============================================================================

#[test]
fn test_fragments_settle_on_floor() {
    let config = DebrisConfig::default();
    let integrator = floor_integrator();
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).with_energy(0.0), 4);
    run(&mut system, &ctx, 3.5);

    for fragment in system.fragments() {
        assert!(fragment.enabled);
        assert!(fragment.frozen);
        let bottom = fragment.center.y - fragment.size.y * 0.5;
        assert!((bottom + 0.5).abs() < 1e-4, "fragment resting at {bottom}");
    }
}

#[test]
fn test_gravity_accelerates_free_fall() {
    let config = DebrisConfig::default();
    let integrator = GridIntegrator::new(Arc::new(BlockGrid::new()));
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::new(Vec3::ZERO, 1000.0),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).with_energy(0.0).with_gravity_modifier(2.0), 5);
    system.update(1.0, &ctx);
    for fragment in system.fragments() {
        assert!((fragment.velocity.y + 0.4725 * 2.0).abs() < 1e-5);
    }
}

#[test]
fn test_incandescence_cools_each_tick() {
    let config = DebrisConfig::default();
    let integrator = floor_integrator();
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::new(0.0, 3.0, 0.0)).incandescent(), 6);
    let before: Vec<f32> = system.fragments().iter().map(|f| f.incandescence).collect();
    system.update(TICK, &ctx);
    for (fragment, glow) in system.fragments().iter().zip(before) {
        assert!((fragment.incandescence - glow * 0.95).abs() < 1e-6);
    }
}

#[test]
fn test_non_finite_state_is_frozen_in_place() {
    let config = DebrisConfig::default();
    let ctx = TickContext {
        integrator: &NanIntegrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).with_energy(2.0), 7);
    let centers: Vec<Vec3> = system.fragments().iter().map(|f| f.center).collect();

    system.update(TICK, &ctx);
    for (fragment, center) in system.fragments().iter().zip(centers) {
        assert_eq!(fragment.center, center);
        assert_eq!(fragment.velocity, Vec3::ZERO);
        assert!(fragment.frozen);
        assert!(fragment.enabled);
    }
    for record in system.instances().records() {
        assert!(record.position.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_speed_is_clamped() {
    let config = DebrisConfig::default();
    let integrator = GridIntegrator::new(Arc::new(BlockGrid::new()));
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::new(Vec3::ZERO, 1000.0),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO), 8);
    for fragment in system.fragments_mut() {
        fragment.velocity = Vec3::new(500.0, 0.0, 0.0);
    }
    system.update(TICK, &ctx);
    for fragment in system.fragments() {
        assert!(fragment.velocity.length() <= config.max_fragment_speed + 1e-3);
    }
}

#[test]
fn test_freeze_on_still_ground() {
    let config = DebrisConfig::default();
    let integrator = StubIntegrator {
        moved: false,
        contacts: still_ground(),
    };
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO), 9);
    system.update(TICK, &ctx);
    assert!(system.fragments().iter().all(|f| f.frozen));
}

#[test]
fn test_no_freeze_on_moving_ground() {
    let config = DebrisConfig::default();
    let raft = BlockInstance::moving(IVec3::new(0, -1, 0), Vec3::new(0.5, 0.0, 0.0));
    let integrator = StubIntegrator {
        moved: false,
        contacts: GroundContacts {
            near: Some(BlockInstance::fixed(IVec3::new(1, -1, 0))),
            far: Some(raft),
        },
    };
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO), 10);
    system.update(TICK, &ctx);
    assert!(system.fragments().iter().all(|f| !f.frozen));
}

#[test]
fn test_no_freeze_while_moving() {
    let config = DebrisConfig::default();
    let integrator = StubIntegrator {
        moved: true,
        contacts: still_ground(),
    };
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO), 11);
    system.update(TICK, &ctx);
    assert!(system.fragments().iter().all(|f| !f.frozen));
}

#[test]
fn test_frozen_fragments_are_skipped() {
    let config = DebrisConfig::default();
    let integrator = GridIntegrator::new(Arc::new(BlockGrid::new()));
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).with_energy(1.0), 12);
    system.fragments_mut()[0].frozen = true;
    let frozen = system.fragments()[0].clone();
    let active_center = system.fragments()[1].center;
    system.update(0.5, &ctx);
    assert_eq!(system.fragments()[0], frozen);
    assert_ne!(system.fragments()[1].center, active_center);
}

// ============================================================================
// Falling Out of View
// ============================================================================

#[test]
fn test_fragments_below_view_are_disabled_and_hidden() {
    let config = DebrisConfig::default();
    let integrator = GridIntegrator::new(Arc::new(BlockGrid::new()));
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::new(Vec3::ZERO, 2.0),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO), 13);
    let slots = system.instances().len();
    for fragment in system.fragments_mut() {
        fragment.velocity = Vec3::new(0.0, -20.0, 0.0);
    }

    system.update(0.25, &ctx);

    assert_eq!(system.live_fragment_count(), 0);
    assert_eq!(system.instances().len(), slots, "slots survive disabling");
    assert!(system.instances().records().iter().all(|r| *r == FragmentInstance::HIDDEN));
    assert!(!system.bounds().is_valid());

    // Never re-enabled, even when the view moves down.
    let low = TickContext {
        view: ViewVolume::new(Vec3::new(0.0, -100.0, 0.0), 2.0),
        ..ctx
    };
    system.update(TICK, &low);
    assert_eq!(system.live_fragment_count(), 0);
}

// ============================================================================
// Crumble Timing and Translation
// ============================================================================

#[test]
fn test_pending_fragments_wait_for_their_delay() {
    let config = DebrisConfig::default();
    let integrator = GridIntegrator::new(Arc::new(BlockGrid::new()));
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).crumbling().with_energy(1.0), 14);
    let delays: Vec<f32> = system.fragments().iter().map(|f| f.spawn_delay).collect();

    system.update(0.1, &ctx);
    for (fragment, delay) in system.fragments().iter().zip(&delays) {
        if *delay > 0.1 {
            assert_eq!(fragment.center, fragment.spawn_center);
            assert!(!fragment.is_spawned());
        }
    }

    system.update(0.5, &ctx);
    assert!(system.fragments().iter().all(|f| f.is_spawned()));
    assert!(system.fragments().iter().all(|f| f.center != f.spawn_center));
}

#[test]
fn test_released_fragment_starts_at_translated_position() {
    let config = DebrisConfig::default();
    let integrator = StubIntegrator {
        moved: true,
        contacts: GroundContacts::NONE,
    };
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).crumbling(), 15);
    for fragment in system.fragments_mut() {
        fragment.spawn_delay = 0.05;
    }
    let offset = Vec3::new(2.0, 0.0, -1.0);
    system.set_translation(offset);

    let records = system.instances().records().to_vec();
    for (fragment, record) in system.fragments().iter().zip(&records) {
        assert_eq!(record.position, (fragment.spawn_center + offset).to_array());
    }

    system.update(0.1, &ctx);
    for fragment in system.fragments() {
        assert_eq!(fragment.center, fragment.spawn_center + offset);
    }
}

#[test]
fn test_release_timing_does_not_depend_on_tick_length() {
    let config = DebrisConfig::default();
    let integrator = GridIntegrator::new(Arc::new(BlockGrid::new()));
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let prepare = || {
        let mut system = build(ExplosionSettings::new(Vec3::ZERO).crumbling(), 16);
        for fragment in system.fragments_mut() {
            fragment.spawn_delay = 0.05;
            fragment.velocity = Vec3::ZERO;
        }
        system
    };

    // One long tick: only the 0.05 s after release is simulated.
    let mut coarse = prepare();
    coarse.update(0.1, &ctx);
    let expected = -config.gravity(1.0) * 0.05;
    for fragment in coarse.fragments() {
        assert!(fragment.is_spawned());
        assert!((fragment.velocity.y - expected).abs() < 1e-6, "vy {}", fragment.velocity.y);
    }

    // Two short ticks: released exactly at the end of the first.
    let mut fine = prepare();
    fine.update(0.05, &ctx);
    for fragment in fine.fragments() {
        assert!(fragment.is_spawned());
        assert_eq!(fragment.velocity, Vec3::ZERO);
        assert_eq!(fragment.center, fragment.spawn_center);
    }
    fine.update(0.05, &ctx);

    for (a, b) in coarse.fragments().iter().zip(fine.fragments()) {
        assert!((a.velocity - b.velocity).length() < 1e-6);
        assert!((a.center - b.center).length() < 1e-6);
    }
}

// ============================================================================
// Instance Packing
// ============================================================================

#[test]
fn test_slot_maps_to_fragment() {
    let config = DebrisConfig::default();
    let integrator = floor_integrator();
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO).with_energy(2.0).incandescent(), 16);
    run(&mut system, &ctx, 0.25);
    for (fragment, record) in system.fragments().iter().zip(system.instances().records()) {
        assert_eq!(*record, fragment.to_instance(system.opacity()));
    }
}

#[test]
fn test_update_marks_buffer_dirty_only_on_change() {
    let config = DebrisConfig::default();
    let integrator = StubIntegrator {
        moved: false,
        contacts: still_ground(),
    };
    let ctx = TickContext {
        integrator: &integrator,
        view: ViewVolume::default(),
        config: &config,
    };
    let mut system = build(ExplosionSettings::new(Vec3::ZERO), 17);
    system.update(TICK, &ctx);
    system.instances_mut().mark_clean();

    // Everything frozen and not fading: nothing to repack.
    system.update(TICK, &ctx);
    assert!(!system.instances().is_dirty());
}
