//! Geometry kernel: ray intersections and eye/data coordinate transforms.
//!
//! Eye space is the tracker's camera frame (viewer looking along +Z).
//! Data space has its origin on the corner of the volume, one unit per grid
//! cell scaled by the dataset spacing.

use glam::{Mat3, Mat4, Vec3};

/// Determinant magnitude below which a pose matrix is treated as singular.
const SINGULAR_DETERMINANT: f32 = 1e-12;

/// Intersect a ray with a plane.
///
/// Returns the ray parameter `t` of the hit, or `None` when the ray is
/// parallel to the plane. `t` is not range checked.
pub fn ray_plane_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    plane_point: Vec3,
    plane_normal: Vec3,
) -> Option<f32> {
    let dot = ray_dir.dot(plane_normal);
    if dot == 0.0 || !dot.is_finite() {
        return None;
    }
    let t = -(ray_origin.dot(plane_normal) - plane_normal.dot(plane_point)) / dot;
    t.is_finite().then_some(t)
}

/// Entry and exit parameters of a ray against one slab, ordered.
///
/// A zero direction component gives infinite bounds, or NaN when the origin
/// lies exactly on a slab face. NaN slabs are reported as `None`.
fn slab(min: f32, max: f32, origin: f32, dir: f32) -> Option<(f32, f32)> {
    let a = (min - origin) / dir;
    let b = (max - origin) / dir;
    if a.is_nan() || b.is_nan() {
        return None;
    }
    Some(if a > b { (b, a) } else { (a, b) })
}

/// Slab test of a ray against an axis-aligned box.
///
/// `tmin`/`tmax` carry the caller's accepted interval in and the narrowed
/// interval out. They are left untouched when the ray misses. Zero
/// direction components produce infinite slabs through IEEE division; a
/// ray lying in a face plane of any axis is a miss.
pub fn ray_aabb_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    aabb_min: Vec3,
    aabb_max: Vec3,
    tmin: &mut f32,
    tmax: &mut f32,
) -> bool {
    let mut near = f32::NEG_INFINITY;
    let mut far = f32::INFINITY;
    for axis in 0..3 {
        let bounds = slab(aabb_min[axis], aabb_max[axis], ray_origin[axis], ray_dir[axis]);
        let Some((t_near, t_far)) = bounds else {
            return false;
        };
        if near > t_far || t_near > far {
            return false;
        }
        near = near.max(t_near);
        far = far.min(t_far);
    }

    if near > *tmax || far < *tmin {
        return false;
    }
    if *tmin < near {
        *tmin = near;
    }
    if *tmax > far {
        *tmax = far;
    }
    true
}

/// Axis-aligned box in data space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box from the origin to `extent`.
    pub fn from_extent(extent: Vec3) -> Self {
        Self::new(Vec3::ZERO, extent)
    }

    /// Half-open containment: `min <= p < max` on every axis.
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmplt(self.max).all()
    }

    /// Ray intersection narrowing `[tmin, tmax]`, returning the narrowed interval.
    pub fn intersect_ray(
        &self,
        origin: Vec3,
        dir: Vec3,
        tmin: f32,
        tmax: f32,
    ) -> Option<(f32, f32)> {
        let (mut lo, mut hi) = (tmin, tmax);
        ray_aabb_intersection(origin, dir, self.min, self.max, &mut lo, &mut hi).then_some((lo, hi))
    }
}

/// Whether a pose matrix can be inverted reliably.
pub fn is_invertible(m: &Mat4) -> bool {
    let det = m.determinant();
    det.is_finite() && det.abs() > SINGULAR_DETERMINANT && m.is_finite()
}

/// Normal matrix (inverse transpose of the upper 3x3).
pub fn normal_matrix(m: &Mat4) -> Mat3 {
    Mat3::from_mat4(m.inverse().transpose())
}

/// Component of `v` along unit vector `n`.
pub fn project_on(v: Vec3, n: Vec3) -> Vec3 {
    n * v.dot(n)
}

/// Component of `v` orthogonal to unit vector `n`.
pub fn project_on_plane(v: Vec3, n: Vec3) -> Vec3 {
    v - project_on(v, n)
}

/// Mapping between eye space and data space for one tangible pose.
///
/// Eye to data undoes the model transform, undoes the zoom scale, then
/// shifts by the half extent because the data origin is the volume corner.
#[derive(Clone, Copy, Debug)]
pub struct DataFrame {
    model: Mat4,
    model_inverse: Mat4,
    zoom: f32,
    half_extent: Vec3,
}

impl DataFrame {
    pub fn new(model: Mat4, zoom: f32, half_extent: Vec3) -> Self {
        Self {
            model,
            model_inverse: model.inverse(),
            zoom,
            half_extent,
        }
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn model_inverse(&self) -> Mat4 {
        self.model_inverse
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn half_extent(&self) -> Vec3 {
        self.half_extent
    }

    /// Whether this frame's model matrix and zoom admit an exact inverse.
    pub fn is_valid(&self) -> bool {
        is_invertible(&self.model) && self.zoom.is_finite() && self.zoom != 0.0
    }

    /// Model matrix with the zoom scale applied, as used for drawing data-space geometry.
    pub fn zoomed_model(&self) -> Mat4 {
        self.model * Mat4::from_scale(Vec3::splat(self.zoom))
    }

    /// Eye-space position to data coordinates.
    pub fn pos_to_data_coords(&self, pos: Vec3) -> Vec3 {
        self.model_inverse.transform_point3(pos) / self.zoom + self.half_extent
    }

    /// Data coordinates to eye-space position.
    pub fn data_coords_to_pos(&self, data_coords: Vec3) -> Vec3 {
        self.model
            .transform_point3((data_coords - self.half_extent) * self.zoom)
    }

    /// Eye-space direction to data-space direction.
    pub fn dir_to_data(&self, dir: Vec3) -> Vec3 {
        self.model_inverse.transform_vector3(dir) / self.zoom
    }

    /// Data-space direction to eye-space direction.
    pub fn dir_to_eye(&self, dir: Vec3) -> Vec3 {
        self.model.transform_vector3(dir * self.zoom)
    }
}
