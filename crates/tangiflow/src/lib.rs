//! Tangible volume slicing and particle advection
//!
//! The interactive core of a tangible-driven volume viewer: a clip-plane
//! state machine that turns tracked tangible and stylus poses into slicing
//! planes (camera, nearest-axis with hysteresis lock, stylus), and a
//! particle engine that releases markers into a velocity field and
//! advects them while the render thread keeps drawing.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! use glam::{Mat4, UVec3, Vec3};
//! use tangiflow::{Dataset, FrameOrchestrator, Pose, ScalarGrid, SessionConfig, VectorField};
//!
//! let dims = UVec3::splat(32);
//! let grid = ScalarGrid::from_fn(dims, Vec3::ONE, |v| v.z as f32).unwrap();
//! let flow = VectorField::uniform(dims, Vec3::new(0.0, 0.0, 1.0)).unwrap();
//! let dataset = Dataset::new(grid).with_velocity(flow).unwrap();
//!
//! let mut orchestrator = FrameOrchestrator::new(SessionConfig::default());
//! orchestrator.load_dataset(Arc::new(dataset)).unwrap();
//!
//! let controls = orchestrator.controls();
//! controls.set_pose(Pose::tangible_only(Mat4::from_translation(Vec3::new(0.0, 0.0, 200.0))));
//! controls.set_seed_point(0.0, 0.0, 200.0);
//! assert!(controls.release_particles().is_released());
//!
//! let frame = orchestrator.frame(Instant::now());
//! assert!(frame.clip_plane.is_some());
//! ```

pub mod advection;
pub mod clip;
pub mod clip_axis;
pub mod config;
pub mod constants;
pub mod cross_section;
pub mod dataset;
pub mod effector;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod particle;
pub mod render;
pub mod state;

pub use advection::{AdvectionEngine, ParticleSnapshot};
pub use clip::{ClipStateMachine, SlicePlane};
pub use clip_axis::{ClipAxes, ClipAxis};
pub use config::{
    AdvectionParams, ClipParams, Projection, SessionConfig, Settings, SlicingMode,
    VelocityOrientation,
};
pub use cross_section::CrossSection;
pub use dataset::{
    Dataset, DatasetInfo, DatasetProvider, FieldLayout, ScalarGrid, VectorField, VelocityOverlay,
};
pub use effector::{Effector, IsoProbe};
pub use error::{DatasetError, NoPlane, ReleaseOutcome};
pub use frame::{Controls, FrameOrchestrator};
pub use geometry::{ray_aabb_intersection, ray_plane_intersection, Aabb, DataFrame};
pub use glam::{Mat4, Vec3, Vec4};
pub use particle::{Particle, ParticlePool};
pub use render::{InstanceTransform, LineSet, RenderFrame, RenderItem, SliceItem, SurfaceItem};
pub use state::{Pose, SharedState, Synchronized};
