//! Render-ready snapshot of one frame.
//!
//! Everything here is already in eye space with styling attached; a
//! renderer draws it without further geometric work and never calls back.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3, Vec4};

use crate::clip::SlicePlane;
use crate::clip_axis::ClipAxes;
use crate::config::{Settings, SlicingMode};
use crate::constants::*;
use crate::cross_section::CrossSection;
use crate::dataset::DatasetInfo;
use crate::effector::Effector;
use crate::geometry::DataFrame;
use crate::state::Pose;

/// Per-instance transform and color, laid out for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceTransform {
    pub fn new(model: Mat4, color: [f32; 3]) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: [color[0], color[1], color[2], 1.0],
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }
}

/// A transformed primitive with flat styling.
///
/// Lines are unit segments along local +X; boxes are the unit cube `[0, 1]^3`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderItem {
    pub transform: Mat4,
    pub color: [f32; 3],
    pub line_width: f32,
}

/// Eye-space line segments sharing one style.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineSet {
    pub segments: Vec<(Vec3, Vec3)>,
    pub color: [f32; 3],
    pub line_width: f32,
}

impl LineSet {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Slice texture quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SliceItem {
    /// Eye-space placement of the quad
    pub model_matrix: Mat4,
    /// Texture transform handed to the slice sampler
    pub render_matrix: Mat4,
    pub extent_size: f32,
}

/// Iso-surface parameters for this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfaceItem {
    pub visible: bool,
    pub percentage: f32,
    /// Low-resolution preview requested while the probe is active
    pub preview: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderFrame {
    pub tangible_visible: bool,
    pub stylus_visible: bool,
    /// Tangible model matrix with zoom applied, placing the data center
    pub data_model: Mat4,
    /// Data bounding box
    pub outline: Option<RenderItem>,
    pub slice: Option<SliceItem>,
    pub cross_section: LineSet,
    pub particles: Vec<InstanceTransform>,
    /// Candidate axis preview shown before a lock is taken
    pub axis_indicator: Option<RenderItem>,
    pub effector: Option<RenderItem>,
    pub crossing_lines: Vec<RenderItem>,
    /// Clip equation for the iso-surface
    pub clip_plane: Option<Vec4>,
    /// Clip equation for the volume, dropped while particles are in flight
    pub volume_clip_plane: Option<Vec4>,
    pub volume_opacity: f32,
    pub surface: SurfaceItem,
}

/// Borrowed state a [`RenderFrame`] is built from.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    pub pose: &'a Pose,
    pub settings: &'a Settings,
    pub info: &'a DatasetInfo,
    pub slice: Option<&'a SlicePlane>,
    pub axes: ClipAxes,
    pub cross_section: &'a CrossSection,
    pub effector: Option<&'a Effector>,
    /// Emerged particle positions (voxel-index space)
    pub particles: &'a [Vec3],
    /// Any particle alive, emerged or not
    pub particles_active: bool,
    pub has_velocity: bool,
    pub cross_section_epsilon: f32,
}

impl RenderFrame {
    pub fn build(scene: &Scene) -> Self {
        let Scene { pose, settings, info, .. } = *scene;
        let zoom = settings.zoom_factor;
        let data = DataFrame::new(pose.tangible, zoom, info.half_extent());

        let mut frame = RenderFrame {
            tangible_visible: pose.tangible_visible,
            stylus_visible: pose.stylus_visible,
            data_model: data.zoomed_model(),
            volume_opacity: if scene.particles_active {
                VOLUME_OPACITY_WITH_PARTICLES
            } else {
                1.0
            },
            surface: SurfaceItem {
                visible: settings.show_surface,
                percentage: settings.surface_percentage,
                preview: settings.surface_preview,
            },
            ..Default::default()
        };

        if let Some(plane) = scene.slice.filter(|_| settings.show_slice) {
            frame.clip_plane = Some(plane.equation());
            if !scene.particles_active {
                frame.volume_clip_plane = frame.clip_plane;
                frame.slice = Some(SliceItem {
                    model_matrix: plane.model_matrix,
                    render_matrix: plane.render_matrix,
                    extent_size: plane.extent_size,
                });
            }
            frame.cross_section = LineSet {
                segments: scene.cross_section.edges(scene.cross_section_epsilon),
                color: CROSS_SECTION_COLOR,
                line_width: CROSS_SECTION_LINE_WIDTH,
            };
        }

        if pose.tangible_visible {
            frame.outline = Some(outline(&data, info, scene.has_velocity));
            frame.particles = scene
                .particles
                .iter()
                .map(|&p| particle_marker(&data, info, p))
                .collect();
            frame.axis_indicator = axis_indicator(pose, settings, scene.axes);
        }

        if let Some(effector) = scene.effector {
            frame.effector = Some(RenderItem {
                transform: pose.stylus
                    * Mat4::from_translation(Vec3::new(-effector.offset, 0.0, 0.0)),
                color: if effector.inside_volume {
                    EFFECTOR_COLOR_INSIDE
                } else {
                    EFFECTOR_COLOR_OUTSIDE
                },
                line_width: 0.0,
            });
            if settings.show_crossing_lines && effector.inside_volume {
                let colors = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
                frame.crossing_lines = effector
                    .crossing_lines(pose.tangible, zoom, info)
                    .into_iter()
                    .zip(colors)
                    .map(|(transform, color)| RenderItem {
                        transform,
                        color,
                        line_width: CROSSING_LINE_WIDTH,
                    })
                    .collect();
            }
        }

        frame
    }
}

fn outline(data: &DataFrame, info: &DatasetInfo, has_velocity: bool) -> RenderItem {
    RenderItem {
        transform: data.zoomed_model()
            * Mat4::from_translation(-info.half_extent())
            * Mat4::from_scale(info.extent()),
        color: if has_velocity {
            OUTLINE_COLOR_WITH_VELOCITY
        } else {
            OUTLINE_COLOR_NO_VELOCITY
        },
        line_width: OUTLINE_LINE_WIDTH,
    }
}

fn particle_marker(data: &DataFrame, info: &DatasetInfo, voxel_pos: Vec3) -> InstanceTransform {
    let local = voxel_pos * info.spacing - info.half_extent();
    let model = data.zoomed_model()
        * Mat4::from_translation(local)
        * Mat4::from_scale(Vec3::splat(PARTICLE_MARKER_SCALE));
    InstanceTransform::new(model, PARTICLE_COLOR)
}

fn axis_indicator(pose: &Pose, settings: &Settings, axes: ClipAxes) -> Option<RenderItem> {
    if settings.slicing_mode != SlicingMode::Axis
        || !settings.show_slice
        || !axes.locked.is_none()
    {
        return None;
    }
    let dir = axes.candidate.direction()?;
    let rot = Quat::from_rotation_arc(Vec3::X, dir);
    Some(RenderItem {
        transform: pose.tangible
            * Mat4::from_scale_rotation_translation(
                Vec3::splat(AXIS_INDICATOR_LENGTH),
                rot,
                Vec3::ZERO,
            ),
        color: axes.candidate.color(),
        line_width: AXIS_INDICATOR_LINE_WIDTH,
    })
}
