//! Intersection of the slicing plane with the data bounding box.

use glam::Vec3;

use crate::geometry::{ray_plane_intersection, DataFrame};

/// Points closer than this (data units) are merged, e.g. at box corners.
const DUPLICATE_EPSILON: f32 = 1e-4;

/// Polygon where a plane cuts the twelve box edges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CrossSection {
    /// Intersection points in eye space
    pub points: Vec<Vec3>,
    /// The same points in data coordinates
    pub data_points: Vec<Vec3>,
}

impl CrossSection {
    /// Intersect an eye-space plane with the box `[0, extent]` in data space.
    ///
    /// The twelve edges are tested as three families of four parallel rays,
    /// keeping hits with `t` in `[0, 1]` along each edge.
    pub fn extract(plane_point: Vec3, plane_normal: Vec3, frame: &DataFrame, extent: Vec3) -> Self {
        let (ex, ey, ez) = (extent.x, extent.y, extent.z);
        let families: [(Vec3, [Vec3; 4]); 3] = [
            (
                Vec3::new(ex, 0.0, 0.0),
                [
                    Vec3::ZERO,
                    Vec3::new(0.0, ey, 0.0),
                    Vec3::new(0.0, 0.0, ez),
                    Vec3::new(0.0, ey, ez),
                ],
            ),
            (
                Vec3::new(0.0, ey, 0.0),
                [
                    Vec3::ZERO,
                    Vec3::new(ex, 0.0, 0.0),
                    Vec3::new(0.0, 0.0, ez),
                    Vec3::new(ex, 0.0, ez),
                ],
            ),
            (
                Vec3::new(0.0, 0.0, ez),
                [
                    Vec3::ZERO,
                    Vec3::new(ex, 0.0, 0.0),
                    Vec3::new(0.0, ey, 0.0),
                    Vec3::new(ex, ey, 0.0),
                ],
            ),
        ];

        let mut section = CrossSection::default();
        for (edge, corners) in families {
            let dir = frame.dir_to_eye(edge);
            for corner in corners {
                let origin = frame.data_coords_to_pos(corner);
                let Some(t) = ray_plane_intersection(origin, dir, plane_point, plane_normal) else {
                    continue;
                };
                if !(0.0..=1.0).contains(&t) {
                    continue;
                }
                let data_point = corner + edge * t;
                if section
                    .data_points
                    .iter()
                    .any(|p| p.distance_squared(data_point) < DUPLICATE_EPSILON * DUPLICATE_EPSILON)
                {
                    continue;
                }
                section.points.push(origin + dir * t);
                section.data_points.push(data_point);
            }
        }
        section
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Fewer than three points bound no area.
    pub fn is_empty(&self) -> bool {
        self.points.len() < 3
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.data_points.clear();
    }

    /// Outline segments in eye space.
    ///
    /// Two points are joined when they agree on one data axis within
    /// `epsilon`, i.e. lie on a common box face.
    pub fn edges(&self, epsilon: f32) -> Vec<(Vec3, Vec3)> {
        let mut lines = Vec::new();
        for i in 0..self.points.len() {
            for j in (i + 1)..self.points.len() {
                let d = (self.data_points[i] - self.data_points[j]).abs();
                if d.x < epsilon || d.y < epsilon || d.z < epsilon {
                    lines.push((self.points[i], self.points[j]));
                }
            }
        }
        lines
    }
}
