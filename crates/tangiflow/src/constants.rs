//! Tuning constants for the interactive slicing and advection layer.
//!
//! ## Units
//!
//! Eye-space lengths follow the pose source (millimetres for the tracked
//! tangible and stylus). Data-space lengths are grid cells scaled by the
//! dataset spacing. Times are whole milliseconds.
//!
//! These are the defaults behind [`crate::config`]; the structs there can
//! override every one of them.

// =============================================================================
// PARTICLES
// =============================================================================

/// Number of markers pre-allocated in the particle pool.
pub const PARTICLE_COUNT: usize = 200;

/// Displacement per millisecond per unit of sampled velocity.
pub const PARTICLE_SPEED: f32 = 0.15;

/// Window over which a release staggers particle emergence (ms).
pub const PARTICLE_RELEASE_DURATION_MS: i64 = 700;

/// Dwell time of a particle sitting in a zero-velocity cell before it expires (ms).
pub const PARTICLE_STALL_DURATION_MS: i64 = 1000;

/// Velocity magnitude at or below which a particle counts as stalled.
pub const VELOCITY_EPSILON: f32 = 0.001;

/// Uniform scale of a rendered particle marker.
pub const PARTICLE_MARKER_SCALE: f32 = 0.15;

// =============================================================================
// CLIP PLANES
// =============================================================================

/// Weight of the current sample in the camera-mode depth low-pass filter.
pub const CAMERA_FILTER_WEIGHT: f32 = 0.8;

/// Dot-product margin an axis must win by once a lock exists.
pub const AXIS_HYSTERESIS_MARGIN: f32 = 0.1;

/// Data-space tolerance for two cross-section points sharing a box face.
pub const CROSS_SECTION_EPSILON: f32 = 0.1;

/// Extra half-size added around the data for the stylus slice quad.
pub const STYLUS_SLICE_MARGIN: f32 = 60.0;

/// Distance from the stylus origin to its effector tip, before zoom.
pub const STYLUS_EFFECTOR_DIST: f32 = 24.0;

/// Far end of the effector ray interval.
pub const EFFECTOR_RAY_MAX: f32 = 10000.0;

/// Weight of the newest probe sample in the iso-value low-pass filter.
pub const PROBE_FILTER_WEIGHT: f32 = 0.5;

// =============================================================================
// DATASET
// =============================================================================

/// Physical size (eye units) the largest data extent is zoomed to by default.
pub const NATIVE_DATA_SIZE: f32 = 110.0;

/// Lower bound of the computed default zoom.
pub const MIN_ZOOM_FACTOR: f32 = 0.25;

// =============================================================================
// RENDER STYLING
// =============================================================================

/// Cross-section outline color [R, G, B].
pub const CROSS_SECTION_COLOR: [f32; 3] = [0.0, 1.0, 0.0];

/// Cross-section outline width (px).
pub const CROSS_SECTION_LINE_WIDTH: f32 = 5.0;

/// Bounding box outline color when a velocity field is attached.
pub const OUTLINE_COLOR_WITH_VELOCITY: [f32; 3] = [0.0, 1.0, 0.0];

/// Bounding box outline color without a velocity field.
pub const OUTLINE_COLOR_NO_VELOCITY: [f32; 3] = [1.0, 0.0, 0.0];

/// Bounding box outline width (px).
pub const OUTLINE_LINE_WIDTH: f32 = 2.0;

/// Length of the candidate clip-axis indicator.
pub const AXIS_INDICATOR_LENGTH: f32 = 150.0;

/// Width of the candidate clip-axis indicator (px).
pub const AXIS_INDICATOR_LINE_WIDTH: f32 = 5.0;

/// Volume opacity while particles are in flight.
pub const VOLUME_OPACITY_WITH_PARTICLES: f32 = 0.025;

/// Particle marker color [R, G, B].
pub const PARTICLE_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Effector color while inside the volume.
pub const EFFECTOR_COLOR_INSIDE: [f32; 3] = [0.5, 0.5, 0.5];

/// Effector color while outside the volume.
pub const EFFECTOR_COLOR_OUTSIDE: [f32; 3] = [1.0, 0.5, 0.5];

/// Crossing guide line width (px).
pub const CROSSING_LINE_WIDTH: f32 = 2.0;
