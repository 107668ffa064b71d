//! Advected marker particles and their fixed-size pool.

use std::time::Instant;

use glam::Vec3;

/// A single marker released into the velocity field.
#[derive(Clone, Copy, Debug)]
pub struct Particle {
    /// Position in voxel-index space
    pub position: Vec3,
    /// Whether the particle is alive
    pub valid: bool,
    /// Time left before the particle emerges (ms)
    pub delay_ms: i64,
    /// Time left before a stalled particle expires (ms), zero when moving
    pub stall_ms: i64,
    /// Timestamp of the last integration step
    pub last_update: Instant,
}

impl Particle {
    /// Dead particle at the origin.
    pub fn new(now: Instant) -> Self {
        Self {
            position: Vec3::ZERO,
            valid: false,
            delay_ms: 0,
            stall_ms: 0,
            last_update: now,
        }
    }

    /// Valid and past its release delay.
    pub fn is_emerged(&self) -> bool {
        self.valid && self.delay_ms <= 0
    }

    pub fn is_stalled(&self) -> bool {
        self.valid && self.stall_ms > 0
    }

    /// Mark dead and clear transient state.
    pub fn invalidate(&mut self) {
        self.position = Vec3::ZERO;
        self.valid = false;
        self.delay_ms = 0;
        self.stall_ms = 0;
    }
}

/// Pre-allocated particle pool, reused across releases.
pub struct ParticlePool {
    pub list: Vec<Particle>,
}

impl ParticlePool {
    /// Pool of `capacity` dead particles.
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Instant::now())
    }

    pub fn with_clock(capacity: usize, now: Instant) -> Self {
        Self {
            list: vec![Particle::new(now); capacity],
        }
    }

    /// Number of slots (alive or not).
    pub fn capacity(&self) -> usize {
        self.list.len()
    }

    pub fn valid_count(&self) -> usize {
        self.list.iter().filter(|p| p.valid).count()
    }

    pub fn any_valid(&self) -> bool {
        self.list.iter().any(|p| p.valid)
    }

    /// Particles that should be drawn this frame.
    pub fn emerged(&self) -> impl Iterator<Item = &Particle> {
        self.list.iter().filter(|p| p.is_emerged())
    }

    /// Kill every particle.
    pub fn invalidate_all(&mut self) {
        for p in &mut self.list {
            p.invalidate();
        }
    }
}
