//! Particle advection tests
//!
//! Release staggering, stall expiry and bounds handling through the
//! public engine API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{UVec3, Vec3};
use tangiflow::{
    AdvectionEngine, AdvectionParams, Dataset, DatasetProvider, ReleaseOutcome, ScalarGrid,
    VectorField, VelocityOrientation,
};

fn dataset(dims: UVec3, velocity: impl Fn(UVec3) -> Vec3) -> Arc<dyn DatasetProvider> {
    let grid = ScalarGrid::from_fn(dims, Vec3::ONE, |_| 1.0).unwrap();
    let field = VectorField::from_fn(dims, velocity).unwrap();
    Arc::new(Dataset::new(grid).with_velocity(field).unwrap())
}

fn engine(params: AdvectionParams, provider: Arc<dyn DatasetProvider>) -> AdvectionEngine {
    let engine = AdvectionEngine::new(AdvectionParams {
        orientation: VelocityOrientation::Native,
        ..params
    });
    engine.set_dataset(Some(provider));
    engine
}

/// Delays are evenly spaced from zero across the release window
#[test]
fn test_release_staggering() {
    let params = AdvectionParams {
        capacity: 10,
        release_duration_ms: 500,
        ..Default::default()
    };
    let engine = engine(params, dataset(UVec3::splat(8), |_| Vec3::X));
    assert_eq!(engine.release(Vec3::splat(3.2)), ReleaseOutcome::Released(10));

    let delays: Vec<i64> = engine.with_pool(|pool| pool.list.iter().map(|p| p.delay_ms).collect());
    assert_eq!(delays, vec![0, 50, 100, 150, 200, 250, 300, 350, 400, 450]);
    // Only the first particle is drawn straight away
    assert_eq!(engine.emerged_positions().len(), 1);
}

/// Jitter keeps every particle inside the seed voxel but not on one spot
#[test]
fn test_release_jitter_within_seed_voxel() {
    let engine = engine(AdvectionParams::default(), dataset(UVec3::splat(8), |_| Vec3::X));
    engine.release(Vec3::new(2.7, 5.1, 0.4));
    engine.with_pool(|pool| {
        let first = pool.list[0].position;
        assert!(pool.list.iter().any(|p| p.position != first));
        for p in &pool.list {
            assert!(p.position.cmpge(Vec3::new(2.0, 5.0, 0.0)).all());
            assert!(p.position.cmplt(Vec3::new(3.0, 6.0, 1.0)).all());
        }
    });
}

/// Same jitter seed, same release
#[test]
fn test_release_is_deterministic_per_seed() {
    let provider = dataset(UVec3::splat(8), |_| Vec3::X);
    let a = engine(AdvectionParams::default(), Arc::clone(&provider));
    let b = engine(AdvectionParams::default(), provider);
    a.release(Vec3::splat(4.0));
    b.release(Vec3::splat(4.0));
    let pa: Vec<Vec3> = a.with_pool(|pool| pool.list.iter().map(|p| p.position).collect());
    let pb: Vec<Vec3> = b.with_pool(|pool| pool.list.iter().map(|p| p.position).collect());
    assert_eq!(pa, pb);
}

#[test]
fn test_out_of_bounds_release_leaves_pool_dead() {
    let engine = engine(AdvectionParams::default(), dataset(UVec3::new(8, 4, 2), |_| Vec3::X));
    for seed in [
        Vec3::new(8.0, 1.0, 1.0),
        Vec3::new(1.0, 4.0, 1.0),
        Vec3::new(1.0, 1.0, 2.0),
        Vec3::new(1.0, -0.5, 1.0),
        Vec3::splat(f32::NAN),
    ] {
        assert_eq!(engine.release(seed), ReleaseOutcome::OutOfBounds, "{:?}", seed);
    }
    engine.with_pool(|pool| assert!(pool.list.iter().all(|p| !p.valid)));
}

/// A stalled particle lives exactly the stall duration
#[test]
fn test_stall_expiry_timing() {
    let params = AdvectionParams {
        capacity: 1,
        stall_duration_ms: 250,
        ..Default::default()
    };
    // Still water in the left half, flow on the right
    let flow = dataset(UVec3::splat(8), |v| if v.x < 4 { Vec3::ZERO } else { Vec3::X });
    let engine = engine(params, flow);
    engine.release(Vec3::new(1.0, 1.0, 1.0));

    engine.tick_elapsed(1);
    let p = engine.with_pool(|pool| pool.list[0]);
    assert!(p.valid && p.is_stalled());
    assert_eq!(p.stall_ms, 250);

    for _ in 0..249 {
        engine.tick_elapsed(1);
        assert!(engine.any_valid(), "expired early");
    }
    engine.tick_elapsed(1);
    assert!(!engine.any_valid());
}

/// Moving particles flow through the field and die at the far wall
#[test]
fn test_particles_flow_out_of_grid() {
    let params = AdvectionParams {
        capacity: 20,
        release_duration_ms: 100,
        speed: 0.5,
        ..Default::default()
    };
    let engine = engine(params, dataset(UVec3::splat(8), |_| Vec3::X));
    let t0 = Instant::now();
    engine.release_at(Vec3::new(0.0, 4.0, 4.0), t0);

    engine.tick(t0 + Duration::from_millis(4));
    let moved = engine.with_pool(|pool| pool.list[0].position.x);
    assert!(moved >= 2.0, "{}", moved);

    engine.tick(t0 + Duration::from_millis(200));
    assert!(!engine.any_valid());
}

#[test]
fn test_reset_without_seed() {
    let engine = engine(AdvectionParams::default(), dataset(UVec3::splat(8), |_| Vec3::X));
    engine.release(Vec3::splat(1.0));
    engine.tick_elapsed(50);
    engine.reset();
    engine.with_pool(|pool| {
        assert!(pool
            .list
            .iter()
            .all(|p| !p.valid && p.delay_ms == 0 && p.stall_ms == 0 && p.position == Vec3::ZERO));
    });
}
