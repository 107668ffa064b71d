//! Session configuration: display settings, advection and clip tuning.

use std::path::Path;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// How the slicing plane is derived from the tracked poses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlicingMode {
    /// Screen-parallel plane at the clip distance
    #[default]
    Camera,
    /// Plane perpendicular to the data axis facing the viewer
    Axis,
    /// Plane attached to the stylus
    Stylus,
}

/// Component order of velocity vectors as stored by the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VelocityOrientation {
    /// Vectors are stored as (x, y, z)
    Native,
    /// Vectors are stored with X and Y exchanged
    #[default]
    SwapXY,
}

impl VelocityOrientation {
    /// Map a stored vector to grid axes.
    pub fn apply(self, v: Vec3) -> Vec3 {
        match self {
            VelocityOrientation::Native => v,
            VelocityOrientation::SwapXY => Vec3::new(v.y, v.x, v.z),
        }
    }
}

/// Perspective projection of the tracking camera.
///
/// Left-handed: the viewer looks along +Z, depth maps to [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Vertical field of view (radians)
    pub fov_y: f32,
    /// Viewport width / height
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 50.0,
            far: 2500.0,
        }
    }
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Same projection with a square aspect, used to render slice textures.
    pub fn square_matrix(&self) -> Mat4 {
        let mut proj = self.matrix();
        proj.x_axis.x = proj.y_axis.y;
        proj
    }

    /// Normalized depth of an eye-space distance along the view axis.
    pub fn depth_value(&self, eye_depth: f32) -> f32 {
        let range = self.far - self.near;
        self.far / range - (self.far * self.near / range) / eye_depth
    }

    /// Eye-space point at the center of the screen at the given depth.
    pub fn unproject_center(&self, eye_depth: f32) -> Vec3 {
        self.matrix()
            .inverse()
            .project_point3(Vec3::new(0.0, 0.0, self.depth_value(eye_depth)))
    }
}

/// Interactive display settings, changed from the UI thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Scale applied to the data around its center
    pub zoom_factor: f32,
    /// Eye-space depth of the camera/axis slicing plane
    pub clip_dist: f32,
    pub slicing_mode: SlicingMode,
    pub show_slice: bool,
    pub show_surface: bool,
    /// Iso-value as a fraction of the scalar range
    pub surface_percentage: f32,
    /// Low-resolution surface preview while the stylus button is held
    pub surface_preview: bool,
    /// Axis guide lines through the stylus effector
    pub show_crossing_lines: bool,
    pub projection: Projection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zoom_factor: 1.0,
            clip_dist: 200.0,
            slicing_mode: SlicingMode::default(),
            show_slice: true,
            show_surface: true,
            surface_percentage: 0.12,
            surface_preview: false,
            show_crossing_lines: true,
            projection: Projection::default(),
        }
    }
}

/// Particle advection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvectionParams {
    /// Particles in the pool
    pub capacity: usize,
    /// Displacement per millisecond per unit velocity
    pub speed: f32,
    /// Window over which release delays are staggered (ms)
    pub release_duration_ms: i64,
    /// Zero-velocity dwell time before expiry (ms)
    pub stall_duration_ms: i64,
    /// Minimum velocity magnitude that still moves a particle
    pub velocity_threshold: f32,
    pub orientation: VelocityOrientation,
    /// Seed for the release jitter generator
    pub jitter_seed: u64,
}

impl Default for AdvectionParams {
    fn default() -> Self {
        Self {
            capacity: PARTICLE_COUNT,
            speed: PARTICLE_SPEED,
            release_duration_ms: PARTICLE_RELEASE_DURATION_MS,
            stall_duration_ms: PARTICLE_STALL_DURATION_MS,
            velocity_threshold: VELOCITY_EPSILON,
            orientation: VelocityOrientation::default(),
            jitter_seed: 0x5eed,
        }
    }
}

/// Clip-plane computation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipParams {
    /// Weight of the newest sample in the camera depth filter
    pub camera_filter_weight: f32,
    /// Margin an axis must win by once a lock exists
    pub axis_hysteresis_margin: f32,
    /// Data-space tolerance for cross-section edges
    pub cross_section_epsilon: f32,
    /// Extra half-size of the stylus slice quad
    pub stylus_slice_margin: f32,
    /// Stylus origin to effector distance
    pub stylus_effector_dist: f32,
    /// Weight of the newest sample in the iso-value probe filter
    pub probe_filter_weight: f32,
}

impl Default for ClipParams {
    fn default() -> Self {
        Self {
            camera_filter_weight: CAMERA_FILTER_WEIGHT,
            axis_hysteresis_margin: AXIS_HYSTERESIS_MARGIN,
            cross_section_epsilon: CROSS_SECTION_EPSILON,
            stylus_slice_margin: STYLUS_SLICE_MARGIN,
            stylus_effector_dist: STYLUS_EFFECTOR_DIST,
            probe_filter_weight: PROBE_FILTER_WEIGHT,
        }
    }
}

/// Complete configuration of a visualization session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub settings: Settings,
    pub advection: AdvectionParams,
    pub clip: ClipParams,
}

impl SessionConfig {
    /// Save configuration to JSON file
    pub fn save_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_json(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }
}
