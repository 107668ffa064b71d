//! Particle release and advection through the dataset velocity field.
//!
//! The whole pool sits behind one mutex: every release, reset, tick and
//! snapshot holds it for a complete pass, so a reader never sees a pool
//! that is half re-seeded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{IVec3, UVec3, Vec3};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{AdvectionParams, VelocityOrientation};
use crate::dataset::DatasetProvider;
use crate::error::ReleaseOutcome;
use crate::particle::{Particle, ParticlePool};

/// Nearest-lower-voxel velocity lookup.
pub struct VelocitySampler<'a> {
    provider: &'a dyn DatasetProvider,
    dims: IVec3,
    orientation: VelocityOrientation,
}

impl<'a> VelocitySampler<'a> {
    pub fn new(provider: &'a dyn DatasetProvider, orientation: VelocityOrientation) -> Self {
        Self {
            provider,
            dims: provider.dimensions().as_ivec3(),
            orientation,
        }
    }

    /// Voxel containing `position`, if it lies inside the grid.
    pub fn voxel_at(&self, position: Vec3) -> Option<IVec3> {
        if !position.is_finite() {
            return None;
        }
        let voxel = position.floor().as_ivec3();
        (voxel.cmpge(IVec3::ZERO).all() && voxel.cmplt(self.dims).all()).then_some(voxel)
    }

    /// Velocity at the voxel containing `position`, in grid axis order.
    pub fn sample(&self, position: Vec3) -> Option<Vec3> {
        let voxel = self.voxel_at(position)?;
        self.provider
            .sample_velocity(voxel)
            .map(|v| self.orientation.apply(v))
    }
}

/// Advance one particle by `elapsed_ms`.
///
/// A delayed particle only counts down; time past the end of its delay is
/// spent moving. A stalled particle counts down and dies at zero. A moving
/// particle takes one step per millisecond and dies on leaving the grid.
pub fn tick_particle(
    p: &mut Particle,
    elapsed_ms: i64,
    sampler: &VelocitySampler<'_>,
    params: &AdvectionParams,
) {
    if !p.valid {
        return;
    }
    let mut elapsed = elapsed_ms.max(0);

    if p.delay_ms > 0 {
        p.delay_ms -= elapsed;
        if p.delay_ms < 0 {
            elapsed = -p.delay_ms;
            p.delay_ms = 0;
        } else {
            return;
        }
    }

    if p.stall_ms > 0 {
        p.stall_ms -= elapsed;
        if p.stall_ms <= 0 {
            p.invalidate();
        }
        return;
    }

    while elapsed > 0 {
        elapsed -= 1;

        let Some(velocity) = sampler.sample(p.position) else {
            p.invalidate();
            return;
        };

        if velocity.length() > params.velocity_threshold {
            p.position += velocity * params.speed;
        } else {
            p.stall_ms = params.stall_duration_ms;
            break;
        }
    }
}

struct EngineState {
    pool: ParticlePool,
    field: Option<Arc<dyn DatasetProvider>>,
    dims: UVec3,
    orientation: VelocityOrientation,
    rng: StdRng,
}

/// Owner of the particle pool and the velocity field it is advected through.
pub struct AdvectionEngine {
    params: AdvectionParams,
    state: Mutex<EngineState>,
}

impl AdvectionEngine {
    pub fn new(params: AdvectionParams) -> Self {
        let state = EngineState {
            pool: ParticlePool::new(params.capacity),
            field: None,
            dims: UVec3::ZERO,
            orientation: params.orientation,
            rng: StdRng::seed_from_u64(params.jitter_seed),
        };
        Self {
            params,
            state: Mutex::new(state),
        }
    }

    pub fn params(&self) -> &AdvectionParams {
        &self.params
    }

    /// Swap the dataset, killing every particle.
    ///
    /// Advection is only enabled when the provider carries a velocity field.
    pub fn set_dataset(&self, provider: Option<Arc<dyn DatasetProvider>>) {
        let mut state = self.state.lock();
        state.pool.invalidate_all();
        state.dims = provider
            .as_ref()
            .map(|p| p.dimensions())
            .unwrap_or(UVec3::ZERO);
        state.field = provider.filter(|p| p.has_velocity_field());
        log::debug!(
            "advection field {}",
            if state.field.is_some() { "attached" } else { "cleared" }
        );
    }

    pub fn has_velocity_field(&self) -> bool {
        self.state.lock().field.is_some()
    }

    pub fn set_orientation(&self, orientation: VelocityOrientation) {
        self.state.lock().orientation = orientation;
    }

    pub fn orientation(&self) -> VelocityOrientation {
        self.state.lock().orientation
    }

    /// Release the whole pool from a seed in voxel-index space.
    pub fn release(&self, seed: Vec3) -> ReleaseOutcome {
        self.release_at(seed, Instant::now())
    }

    /// Release with an explicit start time.
    ///
    /// Every particle starts at the seed voxel's corner plus a uniform
    /// `[0, 1)` jitter per axis, with delays spread evenly over the release
    /// window.
    pub fn release_at(&self, seed: Vec3, now: Instant) -> ReleaseOutcome {
        let mut state = self.state.lock();
        if state.field.is_none() {
            log::debug!("release ignored: no velocity data");
            return ReleaseOutcome::NoVelocityField;
        }
        let dims = state.dims.as_vec3();
        if !seed.is_finite() || seed.cmplt(Vec3::ZERO).any() || seed.cmpge(dims).any() {
            log::debug!("release ignored: seed {:?} outside bounds {:?}", seed, dims);
            return ReleaseOutcome::OutOfBounds;
        }

        let origin = seed.floor();
        let count = state.pool.capacity();
        let step = if count > 0 {
            self.params.release_duration_ms / count as i64
        } else {
            0
        };

        log::debug!("releasing {} particles at voxel {:?}", count, origin);
        let EngineState { pool, rng, .. } = &mut *state;
        for (i, p) in pool.list.iter_mut().enumerate() {
            let jitter = Vec3::new(rng.gen::<f32>(), rng.gen::<f32>(), rng.gen::<f32>());
            p.position = origin + jitter;
            p.last_update = now;
            p.delay_ms = i as i64 * step;
            p.stall_ms = 0;
            p.valid = true;
        }
        ReleaseOutcome::Released(count)
    }

    /// Kill every particle without needing a seed.
    pub fn reset(&self) {
        self.state.lock().pool.invalidate_all();
    }

    /// Advance each particle by the wall time since its last update.
    ///
    /// Whole milliseconds are consumed; the sub-millisecond remainder stays
    /// on the particle's clock.
    pub fn tick(&self, now: Instant) {
        let mut state = self.state.lock();
        let EngineState {
            pool,
            field,
            orientation,
            ..
        } = &mut *state;
        let Some(field) = field.as_deref() else {
            return;
        };
        let sampler = VelocitySampler::new(field, *orientation);
        for p in pool.list.iter_mut().filter(|p| p.valid) {
            let elapsed = now.saturating_duration_since(p.last_update).as_millis() as u64;
            p.last_update += Duration::from_millis(elapsed);
            tick_particle(p, elapsed as i64, &sampler, &self.params);
        }
    }

    /// Advance every particle by a fixed amount of time.
    pub fn tick_elapsed(&self, elapsed_ms: i64) {
        let mut state = self.state.lock();
        let EngineState {
            pool,
            field,
            orientation,
            ..
        } = &mut *state;
        let Some(field) = field.as_deref() else {
            return;
        };
        let sampler = VelocitySampler::new(field, *orientation);
        for p in pool.list.iter_mut() {
            tick_particle(p, elapsed_ms, &sampler, &self.params);
        }
    }

    /// Pause: move every clock to `now` without advancing any particle.
    pub fn hold(&self, now: Instant) {
        let mut state = self.state.lock();
        for p in state.pool.list.iter_mut().filter(|p| p.valid) {
            p.last_update = now;
        }
    }

    /// Run `f` with the pool locked.
    pub fn with_pool<R>(&self, f: impl FnOnce(&ParticlePool) -> R) -> R {
        f(&self.state.lock().pool)
    }

    pub fn any_valid(&self) -> bool {
        self.with_pool(ParticlePool::any_valid)
    }

    /// Positions of the particles to draw this frame.
    pub fn emerged_positions(&self) -> Vec<Vec3> {
        self.with_pool(|pool| pool.emerged().map(|p| p.position).collect())
    }

    /// Drawable positions and pool activity taken under a single lock.
    pub fn snapshot(&self) -> ParticleSnapshot {
        self.with_pool(|pool| ParticleSnapshot {
            positions: pool.emerged().map(|p| p.position).collect(),
            active: pool.any_valid(),
        })
    }
}

/// One consistent view of the pool for a render frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleSnapshot {
    pub positions: Vec<Vec3>,
    /// Any particle alive, emerged or still delayed
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, ScalarGrid, VectorField};

    fn provider(velocity: Vec3) -> Arc<dyn DatasetProvider> {
        let dims = UVec3::splat(16);
        let grid = ScalarGrid::from_fn(dims, Vec3::ONE, |_| 0.0).unwrap();
        let field = VectorField::uniform(dims, velocity).unwrap();
        Arc::new(Dataset::new(grid).with_velocity(field).unwrap())
    }

    fn engine(velocity: Vec3) -> AdvectionEngine {
        let engine = AdvectionEngine::new(AdvectionParams {
            orientation: VelocityOrientation::Native,
            ..Default::default()
        });
        engine.set_dataset(Some(provider(velocity)));
        engine
    }

    #[test]
    fn test_release_staggers_delays() {
        let engine = engine(Vec3::X);
        assert_eq!(engine.release(Vec3::splat(4.5)), ReleaseOutcome::Released(200));
        engine.with_pool(|pool| {
            let step = 700 / 200;
            for (i, p) in pool.list.iter().enumerate() {
                assert!(p.valid);
                assert_eq!(p.delay_ms, i as i64 * step);
                assert_eq!(p.stall_ms, 0);
                assert!(p.position.cmpge(Vec3::splat(4.0)).all());
                assert!(p.position.cmplt(Vec3::splat(5.0)).all());
            }
        });
    }

    #[test]
    fn test_release_out_of_bounds() {
        let engine = engine(Vec3::X);
        assert_eq!(engine.release(Vec3::new(16.0, 1.0, 1.0)), ReleaseOutcome::OutOfBounds);
        assert_eq!(engine.release(Vec3::new(-0.1, 1.0, 1.0)), ReleaseOutcome::OutOfBounds);
        assert_eq!(engine.with_pool(|p| p.valid_count()), 0);
    }

    #[test]
    fn test_release_without_velocity() {
        let engine = AdvectionEngine::new(AdvectionParams::default());
        assert_eq!(engine.release(Vec3::ONE), ReleaseOutcome::NoVelocityField);
        assert!(!engine.any_valid());
    }

    #[test]
    fn test_delay_overrun_moves() {
        let engine = engine(Vec3::X);
        engine.release(Vec3::splat(2.0));
        let start = engine.with_pool(|pool| pool.list[1].position);
        // Particle 1 has a 3 ms delay; 10 ms leaves 7 ms of motion
        engine.tick_elapsed(10);
        let p = engine.with_pool(|pool| pool.list[1]);
        assert_eq!(p.delay_ms, 0);
        assert!((p.position.x - (start.x + 7.0 * 0.15)).abs() < 1e-4);
    }

    #[test]
    fn test_delayed_particle_does_not_move() {
        let engine = engine(Vec3::X);
        engine.release(Vec3::splat(2.0));
        let start = engine.with_pool(|pool| pool.list[100].position);
        engine.tick_elapsed(10);
        let p = engine.with_pool(|pool| pool.list[100]);
        assert_eq!(p.position, start);
        assert_eq!(p.delay_ms, 300 - 10);
        assert!(!p.is_emerged());
    }

    #[test]
    fn test_leaving_grid_invalidates() {
        let engine = engine(Vec3::new(10.0, 0.0, 0.0));
        engine.release(Vec3::new(14.0, 2.0, 2.0));
        // 1.5 voxels per ms: out within a couple of steps
        engine.tick_elapsed(5);
        let first = engine.with_pool(|pool| pool.list[0]);
        assert!(!first.valid);
    }

    #[test]
    fn test_stall_then_expire() {
        let engine = engine(Vec3::ZERO);
        engine.release(Vec3::splat(3.0));
        engine.tick_elapsed(16);
        let p = engine.with_pool(|pool| pool.list[0]);
        assert!(p.valid);
        assert_eq!(p.stall_ms, 1000);

        engine.tick_elapsed(999);
        assert!(engine.with_pool(|pool| pool.list[0].valid));
        engine.tick_elapsed(1);
        assert!(!engine.with_pool(|pool| pool.list[0].valid));
    }

    #[test]
    fn test_orientation_swaps_components() {
        let engine = engine(Vec3::new(0.0, 1.0, 0.0));
        engine.set_orientation(VelocityOrientation::SwapXY);
        engine.release(Vec3::splat(4.0));
        let start = engine.with_pool(|pool| pool.list[0].position);
        engine.tick_elapsed(2);
        let p = engine.with_pool(|pool| pool.list[0].position);
        assert!((p.x - start.x - 0.3).abs() < 1e-5);
        assert_eq!(p.y, start.y);
    }

    #[test]
    fn test_reset_clears_pool() {
        let engine = engine(Vec3::X);
        engine.release(Vec3::splat(2.0));
        engine.reset();
        assert!(!engine.any_valid());
        assert!(engine.emerged_positions().is_empty());
    }

    #[test]
    fn test_snapshot_is_consistent_under_concurrent_release() {
        let engine = Arc::new(engine(Vec3::X));
        let writer = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for i in 0..500 {
                    if i % 2 == 0 {
                        engine.release(Vec3::splat(2.0));
                    } else {
                        engine.reset();
                    }
                }
            })
        };

        for _ in 0..500 {
            let snapshot = engine.snapshot();
            // A released pool always has its first particle emerged
            assert_eq!(snapshot.active, !snapshot.positions.is_empty());
        }
        writer.join().unwrap();

        engine.release(Vec3::splat(2.0));
        let snapshot = engine.snapshot();
        assert!(snapshot.active);
        assert_eq!(snapshot.positions.len(), 1);
    }

    #[test]
    fn test_new_dataset_kills_particles() {
        let engine = engine(Vec3::X);
        engine.release(Vec3::splat(2.0));
        engine.set_dataset(None);
        assert!(!engine.any_valid());
        assert!(!engine.has_velocity_field());
    }

    #[test]
    fn test_wall_clock_tick_keeps_remainder() {
        let engine = engine(Vec3::X);
        let t0 = Instant::now();
        engine.release_at(Vec3::splat(2.0), t0);
        let start = engine.with_pool(|pool| pool.list[0].position);

        engine.tick(t0 + Duration::from_micros(2500));
        engine.tick(t0 + Duration::from_micros(5000));
        let p = engine.with_pool(|pool| pool.list[0].position);
        // 2 ms then 3 ms: no time lost to truncation
        assert!((p.x - start.x - 5.0 * 0.15).abs() < 1e-4);
    }

    #[test]
    fn test_hold_pauses_motion() {
        let engine = engine(Vec3::X);
        let t0 = Instant::now();
        engine.release_at(Vec3::splat(2.0), t0);
        let start = engine.with_pool(|pool| pool.list[0].position);

        engine.hold(t0 + Duration::from_millis(500));
        engine.tick(t0 + Duration::from_millis(502));
        let p = engine.with_pool(|pool| pool.list[0].position);
        assert!((p.x - start.x - 2.0 * 0.15).abs() < 1e-4);
    }
}
