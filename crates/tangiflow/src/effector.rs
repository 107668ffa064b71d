//! Stylus effector tracking and the iso-value probe it drives.

use glam::{Mat4, Vec3};

use crate::config::ClipParams;
use crate::constants::EFFECTOR_RAY_MAX;
use crate::dataset::{DatasetInfo, DatasetProvider};
use crate::geometry::{is_invertible, Aabb, DataFrame};
use crate::state::Pose;

/// The stylus tip as seen by the data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Effector {
    /// Tip position in eye space
    pub position: Vec3,
    /// Tip position in data coordinates
    pub data_position: Vec3,
    /// Tip lies inside the data bounding box
    pub inside_volume: bool,
    /// Exit point (eye space) of the ray from the tip along the stylus axis
    pub intersection: Option<Vec3>,
    /// Stylus-local offset of the tip along -X, zoom applied
    pub offset: f32,
}

impl Effector {
    /// Locate the effector; needs both devices visible and invertible poses.
    pub fn locate(pose: &Pose, zoom: f32, info: &DatasetInfo, params: &ClipParams) -> Option<Self> {
        if !pose.stylus_visible || !pose.tangible_visible {
            return None;
        }
        if !is_invertible(&pose.stylus) || !is_invertible(&pose.tangible) {
            return None;
        }

        let frame = DataFrame::new(pose.tangible, zoom, info.half_extent());
        let size = 0.5 * (params.stylus_effector_dist + info.max_extent());
        let offset = size * zoom;
        let position = pose.stylus.transform_point3(Vec3::new(-offset, 0.0, 0.0));
        let data_position = frame.pos_to_data_coords(position);

        let bounds = Aabb::from_extent(info.extent());
        let inside_volume = bounds.contains(data_position);

        let intersection = if inside_volume {
            // Stylus +X runs from the tip back toward the handle
            let data_dir = frame.dir_to_data(pose.stylus.transform_vector3(Vec3::X));
            bounds
                .intersect_ray(data_position, data_dir, 0.0, EFFECTOR_RAY_MAX)
                .filter(|&(_, tmax)| tmax > 0.0)
                .map(|(_, tmax)| frame.data_coords_to_pos(data_position + data_dir * tmax))
        } else {
            None
        };

        Some(Self {
            position,
            data_position,
            inside_volume,
            intersection,
            offset,
        })
    }

    /// Transforms of three guide lines through the tip, one per data axis.
    ///
    /// Each is a unit segment along its axis, scaled to the data extent and
    /// centered on the tip's projection onto the data mid-plane.
    pub fn crossing_lines(&self, model: Mat4, zoom: f32, info: &DatasetInfo) -> [Mat4; 3] {
        let local = model.inverse().transform_point3(self.position);
        let half = 0.5 * info.extent() * zoom;
        let line = |keep: Vec3, scale: Vec3| {
            model * Mat4::from_scale_rotation_translation(scale, glam::Quat::IDENTITY, local * keep)
        };
        [
            line(Vec3::new(0.0, 1.0, 1.0), Vec3::new(half.x, 0.0, 0.0)),
            line(Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, half.y, 0.0)),
            line(Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.0, 0.0, half.z)),
        ]
    }
}

/// Low-pass filtered scalar probe mapping the value under the effector to
/// an iso-surface percentage.
#[derive(Clone, Debug)]
pub struct IsoProbe {
    weight: f32,
    previous: Option<f32>,
}

impl IsoProbe {
    pub fn new(weight: f32) -> Self {
        Self {
            weight,
            previous: None,
        }
    }

    /// Forget the filter memory.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Filtered value of a new sample; the first sample passes through.
    pub fn filter(&mut self, value: f32) -> f32 {
        let filtered = match self.previous {
            Some(prev) => prev + self.weight * (value - prev),
            None => value,
        };
        self.previous = Some(filtered);
        filtered
    }

    /// Sample the dataset at `data_position` and return the iso percentage.
    pub fn probe(&mut self, provider: &dyn DatasetProvider, data_position: Vec3) -> Option<f32> {
        let value = self.filter(provider.sample_scalar(data_position)?);
        let (lo, hi) = provider.scalar_range();
        if hi <= lo {
            return Some(0.0);
        }
        Some(((value - lo) / (hi - lo)).clamp(0.0, 1.0))
    }
}
