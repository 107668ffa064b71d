//! Clip-plane state machine.
//!
//! Computes the slicing plane for the active [`SlicingMode`] from the
//! current poses. The machine owns all per-mode memory: the camera-mode
//! depth filter, the axis-mode candidate/locked axes and the last
//! cross-section. Losing visibility resets the memory of the mode that
//! needed it; switching modes resets all of it.

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

use crate::clip_axis::{ClipAxes, ClipAxis};
use crate::config::{ClipParams, Settings, SlicingMode};
use crate::cross_section::CrossSection;
use crate::dataset::DatasetInfo;
use crate::error::NoPlane;
use crate::geometry::{is_invertible, normal_matrix, project_on, project_on_plane, DataFrame};
use crate::state::Pose;

/// A slicing plane ready for clipping and cross-section rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlicePlane {
    /// A point on the plane (eye space)
    pub point: Vec3,
    /// Unit plane normal (eye space)
    pub normal: Vec3,
    /// Slice texture transform: rotation into the plane's view, translated
    /// to the plane center in data coordinates
    pub render_matrix: Mat4,
    /// Size handed to the slice texture renderer
    pub extent_size: f32,
    /// Eye-space placement of the slice quad
    pub model_matrix: Mat4,
}

impl SlicePlane {
    /// Plane equation `(n, -n·p)` for clipping primitives.
    pub fn equation(&self) -> Vec4 {
        self.normal.extend(-self.normal.dot(self.point))
    }

    /// Signed distance of an eye-space point from the plane.
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p - self.point)
    }

    fn is_finite(&self) -> bool {
        self.point.is_finite()
            && self.normal.is_finite()
            && self.render_matrix.is_finite()
            && self.extent_size.is_finite()
    }
}

/// Upper 3x3 of `m` as a 4x4 with no translation.
fn rotation_part(m: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(m))
}

/// Per-session clip-plane computation with its filter and lock memory.
#[derive(Clone, Debug)]
pub struct ClipStateMachine {
    params: ClipParams,
    last_mode: Option<SlicingMode>,
    /// Filtered slice origin (tangible space) from the previous visible frame
    camera_prev: Option<Vec3>,
    axes: ClipAxes,
    slice_depth: f32,
    cross_section: CrossSection,
}

impl ClipStateMachine {
    pub fn new(params: ClipParams) -> Self {
        Self {
            params,
            last_mode: None,
            camera_prev: None,
            axes: ClipAxes::default(),
            slice_depth: 0.0,
            cross_section: CrossSection::default(),
        }
    }

    pub fn params(&self) -> &ClipParams {
        &self.params
    }

    /// Drop all filter, lock and cross-section memory.
    pub fn reset(&mut self) {
        self.camera_prev = None;
        self.axes = ClipAxes::default();
        self.slice_depth = 0.0;
        self.cross_section.clear();
    }

    pub fn axes(&self) -> ClipAxes {
        self.axes
    }

    /// Filtered camera-mode origin retained from the last visible frame.
    pub fn camera_filter_state(&self) -> Option<Vec3> {
        self.camera_prev
    }

    /// Eye depth of the last camera-mode plane.
    pub fn slice_depth(&self) -> f32 {
        self.slice_depth
    }

    pub fn cross_section(&self) -> &CrossSection {
        &self.cross_section
    }

    /// Compute this frame's plane for `settings.slicing_mode`.
    ///
    /// On success the cross-section is refreshed. When nothing is tracked it
    /// is cleared; a degenerate pose leaves it as it was.
    pub fn compute(
        &mut self,
        pose: &Pose,
        settings: &Settings,
        info: &DatasetInfo,
    ) -> Result<SlicePlane, NoPlane> {
        let mode = settings.slicing_mode;
        if self.last_mode != Some(mode) {
            if self.last_mode.is_some() {
                log::debug!("slicing mode changed to {:?}", mode);
            }
            self.reset();
            self.last_mode = Some(mode);
        }

        let result = match mode {
            SlicingMode::Camera => self.compute_camera(pose, settings, info),
            SlicingMode::Axis => self.compute_axis(pose, settings, info),
            SlicingMode::Stylus => self.compute_stylus(pose, settings, info),
        };

        match result {
            Ok(plane) => {
                if mode != SlicingMode::Axis {
                    self.cross_section = self.extract(&plane, pose, settings, info);
                }
            }
            Err(NoPlane::DegenerateStylus | NoPlane::DegenerateTangible) => {}
            Err(_) => self.cross_section.clear(),
        }
        result
    }

    fn extract(
        &self,
        plane: &SlicePlane,
        pose: &Pose,
        settings: &Settings,
        info: &DatasetInfo,
    ) -> CrossSection {
        let frame = DataFrame::new(pose.tangible, settings.zoom_factor, info.half_extent());
        CrossSection::extract(plane.point, plane.normal, &frame, info.extent())
    }

    /// Screen-parallel plane at the clip distance.
    ///
    /// The plane origin is low-pass filtered along the screen normal only;
    /// the first visible frame seeds the filter unfiltered.
    pub fn compute_camera(
        &mut self,
        pose: &Pose,
        settings: &Settings,
        info: &DatasetInfo,
    ) -> Result<SlicePlane, NoPlane> {
        if !pose.tangible_visible {
            self.camera_prev = None;
            return Err(NoPlane::TangibleHidden);
        }
        let model = pose.tangible;
        if !is_invertible(&model) {
            return Err(NoPlane::DegenerateTangible);
        }
        let model_inverse = model.inverse();
        let zoom = settings.zoom_factor;
        let projection = &settings.projection;

        let mut render_matrix = rotation_part((projection.matrix() * model).inverse());

        let screen_pos = Vec3::new(0.0, 0.0, settings.clip_dist);
        let mut pos = model_inverse.transform_point3(screen_pos);

        // Screen normal in tangible space
        let n = (Mat3::from_mat4(model).transpose() * Vec3::Z).normalize();

        if let Some(prev) = self.camera_prev {
            let w = self.params.camera_filter_weight;
            pos += -project_on(pos, n) + project_on(pos * w + prev * (1.0 - w), n);
        }
        self.camera_prev = Some(pos);

        self.slice_depth = model.transform_point3(pos).z;

        let point = projection.unproject_center(self.slice_depth);
        let frame = DataFrame::new(model, zoom, info.half_extent());
        render_matrix.w_axis = frame.pos_to_data_coords(point).extend(1.0);

        let size = 0.5 * info.max_extent() * zoom;
        let model_matrix = Mat4::from_scale_rotation_translation(
            Vec3::new(size, size, 0.0),
            Quat::IDENTITY,
            point,
        );

        Ok(SlicePlane {
            point,
            normal: -Vec3::Z,
            render_matrix,
            extent_size: self.slice_depth,
            model_matrix,
        })
    }

    /// Candidate axis from the tangible's orientation, with hysteresis.
    fn update_candidate(&mut self, normal_matrix: &Mat3) {
        let dots = [Vec3::X, Vec3::Y, Vec3::Z]
            .map(|a| (*normal_matrix * a).normalize().dot(Vec3::Z));
        let margin = if self.axes.locked.is_none() {
            0.0
        } else {
            self.params.axis_hysteresis_margin
        };

        for i in 0..3 {
            let (j, k) = ((i + 1) % 3, (i + 2) % 3);
            if dots[i].abs() > dots[j].abs() + margin && dots[i].abs() > dots[k].abs() + margin {
                self.axes.candidate = ClipAxis::from_dot(i, dots[i]);
                break;
            }
        }

        if let Some(dir) = self.axes.locked.direction() {
            let dot = (*normal_matrix * dir).normalize().dot(Vec3::Z);
            if dot > 0.0 {
                log::debug!("clip axis lock flipped from {:?}", self.axes.locked);
                self.axes.locked = self.axes.locked.flipped();
            }
        }
    }

    /// Plane perpendicular to the data axis that best faces the viewer.
    ///
    /// A locked axis only flips sign. It is released when the tangible is
    /// lost or the cross-section comes out empty.
    pub fn compute_axis(
        &mut self,
        pose: &Pose,
        settings: &Settings,
        info: &DatasetInfo,
    ) -> Result<SlicePlane, NoPlane> {
        if !pose.tangible_visible {
            self.axes = ClipAxes::default();
            return Err(NoPlane::TangibleHidden);
        }
        let model = pose.tangible;
        if !is_invertible(&model) {
            return Err(NoPlane::DegenerateTangible);
        }
        let nm = normal_matrix(&model);
        self.update_candidate(&nm);

        let active = self.axes.active();
        let Some(axis) = active.direction() else {
            return Err(NoPlane::NoAxis);
        };
        let rot = active.slice_rotation();
        let zoom = settings.zoom_factor;
        let projection = &settings.projection;

        // Clip point projected onto the axis line through the data center
        let local = model
            .inverse()
            .transform_point3(projection.unproject_center(settings.clip_dist));
        let abs_axis = axis.abs();
        let local_on_axis = abs_axis * abs_axis.dot(local);
        let point = model.transform_point3(local_on_axis);

        let frame = DataFrame::new(model, zoom, info.half_extent());
        let data_coords = frame.pos_to_data_coords(point);

        let size = 0.5 * info.max_extent();
        let proj = projection.square_matrix();
        let mut render_matrix =
            rotation_part((proj * Mat4::from_rotation_translation(rot, data_coords)).inverse());
        render_matrix.w_axis = data_coords.extend(1.0);

        let model_matrix = model
            * Mat4::from_scale_rotation_translation(
                zoom * Vec3::new(size, size, 0.0),
                rot,
                local_on_axis,
            );

        let plane = SlicePlane {
            point,
            normal: (nm * axis).normalize(),
            render_matrix,
            extent_size: proj.y_axis.y.abs() * size * zoom,
            model_matrix,
        };

        self.cross_section =
            CrossSection::extract(plane.point, plane.normal, &frame, info.extent());
        let locked = if self.cross_section.is_empty() {
            ClipAxis::None
        } else {
            active
        };
        if locked != self.axes.locked {
            log::debug!("clip axis lock {:?} -> {:?}", self.axes.locked, locked);
        }
        self.axes.locked = locked;

        Ok(plane)
    }

    /// Plane attached to the stylus, shifted within its own plane so it
    /// passes through the projection of the data center.
    pub fn compute_stylus(
        &mut self,
        pose: &Pose,
        settings: &Settings,
        info: &DatasetInfo,
    ) -> Result<SlicePlane, NoPlane> {
        if !pose.stylus_visible {
            return Err(NoPlane::StylusHidden);
        }
        let stylus = pose.stylus;
        if !is_invertible(&stylus) {
            log::warn!("stylus pose is not invertible, skipping slice");
            return Err(NoPlane::DegenerateStylus);
        }
        let model = pose.tangible;
        if !is_invertible(&model) {
            return Err(NoPlane::DegenerateTangible);
        }
        let zoom = settings.zoom_factor;
        let size = 0.5 * (self.params.stylus_slice_margin + info.max_extent());

        // Data center in stylus space, projected onto the stylus clip plane
        let data_center = stylus.inverse().transform_point3(model.transform_point3(Vec3::ZERO));
        let offset = project_on_plane(data_center, Vec3::Z);
        let plane_matrix = stylus * Mat4::from_translation(offset);

        let proj = settings.projection.square_matrix();
        let mut render_matrix = rotation_part((proj * plane_matrix.inverse() * model).inverse());

        let point = plane_matrix.transform_point3(Vec3::ZERO);
        let frame = DataFrame::new(model, zoom, info.half_extent());
        render_matrix.w_axis = frame.pos_to_data_coords(point).extend(1.0);

        let plane = SlicePlane {
            point,
            normal: (normal_matrix(&stylus) * Vec3::Z).normalize(),
            render_matrix,
            extent_size: proj.y_axis.y.abs() * size * zoom,
            model_matrix: plane_matrix * Mat4::from_scale(zoom * Vec3::new(size, size, 0.0)),
        };

        if !plane.is_finite() {
            log::warn!("stylus slice produced non-finite values, skipping");
            return Err(NoPlane::DegenerateStylus);
        }
        Ok(plane)
    }
}
