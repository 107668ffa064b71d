//! Error and outcome types.
//!
//! Only dataset loading produces real errors. Per-frame geometric failures
//! are reported as [`NoPlane`] values and absorbed by the orchestrator, and
//! particle release rejections are reported as [`ReleaseOutcome`].

use glam::UVec3;
use thiserror::Error;

/// Errors raised while loading or validating a dataset.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DatasetError {
    /// The scalar grid has a zero dimension
    #[error("Dataset grid is empty: {0:?}")]
    EmptyGrid(UVec3),

    /// The number of scalar values does not match the grid dimensions
    #[error("Scalar value count mismatch: expected {expected}, found {found}")]
    ScalarCountMismatch {
        /// Values implied by the dimensions
        expected: usize,
        /// Values actually supplied
        found: usize,
    },

    /// The velocity field is not co-registered with the scalar grid
    #[error(
        "Dimensions do not match: vel: {}x{}x{}, data: {}x{}x{}",
        velocity.x, velocity.y, velocity.z, data.x, data.y, data.z
    )]
    DimensionMismatch {
        /// Velocity field dimensions
        velocity: UVec3,
        /// Scalar grid dimensions
        data: UVec3,
    },

    /// The velocity field does not carry 3-component vectors
    #[error("Velocity data is not 3D (components = {0})")]
    NotThreeComponent(usize),

    /// The velocity field is missing some or all of its vectors
    #[error("Invalid velocity data: expected {expected} vector values, found {found}")]
    MissingVectors {
        /// Values implied by the dimensions
        expected: usize,
        /// Values actually supplied
        found: usize,
    },

    /// A velocity field was supplied before any scalar dataset
    #[error("No dataset currently loaded")]
    NoDatasetLoaded,
}

/// Type alias for dataset results.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Why no slicing plane was produced this frame.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NoPlane {
    /// Slicing is switched off or no dataset is loaded
    #[error("slicing disabled")]
    Disabled,
    /// The tangible is not tracked this frame
    #[error("tangible not visible")]
    TangibleHidden,
    /// The stylus is not tracked this frame
    #[error("stylus not visible")]
    StylusHidden,
    /// Axis mode has neither a candidate nor a locked axis
    #[error("no clip axis selected")]
    NoAxis,
    /// The stylus pose matrix cannot be inverted
    #[error("stylus pose is not invertible")]
    DegenerateStylus,
    /// The tangible pose matrix cannot be inverted
    #[error("tangible pose is not invertible")]
    DegenerateTangible,
}

/// Result of a particle release request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Every particle in the pool was re-seeded
    Released(usize),
    /// No seed point has been set
    NoSeed,
    /// The seed lies outside the data grid
    OutOfBounds,
    /// No velocity field is attached, so advection stays disabled
    NoVelocityField,
}

impl ReleaseOutcome {
    /// Whether particles were actually released.
    pub fn is_released(self) -> bool {
        matches!(self, ReleaseOutcome::Released(_))
    }
}
