//! Shared interactive state read by the render path and written by input.
//!
//! Each field is its own synchronized cell. Writers replace one cell at a
//! time and readers copy one cell at a time, so a reader may pair a fresh
//! plane with a slightly older pose, but never sees a torn value.

use glam::{Mat4, Vec3};
use parking_lot::Mutex;

use crate::clip::SlicePlane;
use crate::clip_axis::ClipAxes;
use crate::config::Settings;
use crate::cross_section::CrossSection;
use crate::dataset::DatasetInfo;
use crate::effector::Effector;

/// Mutex-guarded value with copy-in/copy-out access.
#[derive(Debug, Default)]
pub struct Synchronized<T> {
    inner: Mutex<T>,
}

impl<T> Synchronized<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    pub fn set(&self, value: T) {
        *self.inner.lock() = value;
    }

    /// Replace the value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.inner.lock(), value)
    }

    /// Run `f` with the value locked.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Mutate the value in place under the lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<T: Clone> Synchronized<T> {
    pub fn get(&self) -> T {
        self.inner.lock().clone()
    }
}

/// Tracked poses of the tangible and the stylus for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Tangible model matrix (object to eye)
    pub tangible: Mat4,
    /// Stylus model matrix (stylus to eye)
    pub stylus: Mat4,
    pub tangible_visible: bool,
    pub stylus_visible: bool,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            tangible: Mat4::IDENTITY,
            stylus: Mat4::IDENTITY,
            tangible_visible: false,
            stylus_visible: false,
        }
    }
}

impl Pose {
    /// Tangible visible at `tangible`, stylus hidden.
    pub fn tangible_only(tangible: Mat4) -> Self {
        Self {
            tangible,
            tangible_visible: true,
            ..Default::default()
        }
    }

    /// Both devices visible.
    pub fn both(tangible: Mat4, stylus: Mat4) -> Self {
        Self {
            tangible,
            stylus,
            tangible_visible: true,
            stylus_visible: true,
        }
    }
}

/// Stylus button and the iso-value preview it drives.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ButtonState {
    pub pressed: bool,
}

/// Cells shared between the input thread and the render thread.
#[derive(Debug, Default)]
pub struct SharedState {
    pub pose: Synchronized<Pose>,
    pub settings: Synchronized<Settings>,
    /// Eye-space placement of the slice quad
    pub slice_model_matrix: Synchronized<Mat4>,
    /// Last successfully computed slicing plane
    pub slice: Synchronized<Option<SlicePlane>>,
    pub clip_axes: Synchronized<ClipAxes>,
    /// Cross-section of the active plane, empty without one
    pub cross_section: Synchronized<CrossSection>,
    pub effector: Synchronized<Option<Effector>>,
    pub button: Synchronized<ButtonState>,
    /// Seed point for particle release (eye space)
    pub seed_point: Synchronized<Option<Vec3>>,
    /// Extents of the loaded dataset, if any
    pub dataset_info: Synchronized<Option<DatasetInfo>>,
    /// Default zoom derived from the loaded dataset
    pub computed_zoom_factor: Synchronized<f32>,
}

impl SharedState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Synchronized::new(settings),
            slice_model_matrix: Synchronized::new(Mat4::IDENTITY),
            computed_zoom_factor: Synchronized::new(1.0),
            ..Default::default()
        }
    }
}
