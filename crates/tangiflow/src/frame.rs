//! Per-frame glue: pose → effector → clip plane → particles → render snapshot.
//!
//! [`FrameOrchestrator`] lives on the render thread and owns the per-session
//! clip and probe memory. [`Controls`] is the handle handed to the input
//! thread; it only touches shared cells and the advection engine, both of
//! which are safe to use concurrently with a running frame.

use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Vec3};

use crate::advection::AdvectionEngine;
use crate::clip::ClipStateMachine;
use crate::config::{SessionConfig, Settings, SlicingMode};
use crate::cross_section::CrossSection;
use crate::dataset::{validate_provider, DatasetInfo, DatasetProvider, VectorField, VelocityOverlay};
use crate::effector::{Effector, IsoProbe};
use crate::error::{DatasetError, NoPlane, ReleaseOutcome, Result};
use crate::geometry::DataFrame;
use crate::render::{RenderFrame, Scene};
use crate::state::{ButtonState, Pose, SharedState};

/// Drives one session frame by frame.
pub struct FrameOrchestrator {
    shared: Arc<SharedState>,
    engine: Arc<AdvectionEngine>,
    clip: ClipStateMachine,
    probe: IsoProbe,
    dataset: Option<Arc<dyn DatasetProvider>>,
    info: Option<DatasetInfo>,
    button_was_pressed: bool,
}

impl FrameOrchestrator {
    pub fn new(config: SessionConfig) -> Self {
        let SessionConfig {
            settings,
            advection,
            clip,
        } = config;
        Self {
            shared: Arc::new(SharedState::new(settings)),
            engine: Arc::new(AdvectionEngine::new(advection)),
            probe: IsoProbe::new(clip.probe_filter_weight),
            clip: ClipStateMachine::new(clip),
            dataset: None,
            info: None,
            button_was_pressed: false,
        }
    }

    /// Handle for the input thread.
    pub fn controls(&self) -> Controls {
        Controls {
            shared: Arc::clone(&self.shared),
            engine: Arc::clone(&self.engine),
        }
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn engine(&self) -> &Arc<AdvectionEngine> {
        &self.engine
    }

    pub fn clip_state(&self) -> &ClipStateMachine {
        &self.clip
    }

    pub fn dataset_info(&self) -> Option<DatasetInfo> {
        self.info
    }

    /// Install a new dataset.
    ///
    /// Validation happens first; a rejected provider leaves the previous
    /// dataset, particles and zoom untouched.
    pub fn load_dataset(&mut self, provider: Arc<dyn DatasetProvider>) -> Result<DatasetInfo> {
        if let Err(e) = validate_provider(provider.as_ref()) {
            log::warn!("dataset rejected: {}", e);
            return Err(e);
        }

        let info = DatasetInfo::from_provider(provider.as_ref());
        let zoom = info.default_zoom();
        log::info!(
            "dataset loaded: {}x{}x{}, spacing {:?}, velocity {}, zoom {:.3}",
            info.dims.x,
            info.dims.y,
            info.dims.z,
            info.spacing,
            provider.has_velocity_field(),
            zoom
        );

        self.engine.set_dataset(Some(Arc::clone(&provider)));
        self.clip.reset();
        self.probe.reset();
        self.shared.computed_zoom_factor.set(zoom);
        self.shared.settings.update(|s| s.zoom_factor = zoom);
        self.shared.dataset_info.set(Some(info));
        self.shared.slice.set(None);
        self.shared.cross_section.set(CrossSection::default());
        self.dataset = Some(provider);
        self.info = Some(info);
        Ok(info)
    }

    /// Attach a velocity field to the loaded dataset.
    ///
    /// Live particles are killed and advection is enabled on success. On
    /// failure the dataset, zoom and slice stay as they were.
    pub fn load_velocity(&mut self, field: VectorField) -> Result<()> {
        let Some(base) = self.dataset.as_ref() else {
            log::warn!("velocity rejected: {}", DatasetError::NoDatasetLoaded);
            return Err(DatasetError::NoDatasetLoaded);
        };
        let overlay = match VelocityOverlay::new(Arc::clone(base), field) {
            Ok(overlay) => overlay,
            Err(e) => {
                log::warn!("velocity rejected: {}", e);
                return Err(e);
            }
        };
        let provider: Arc<dyn DatasetProvider> = Arc::new(overlay);

        log::info!("velocity field attached");
        self.engine.set_dataset(Some(Arc::clone(&provider)));
        self.dataset = Some(provider);
        Ok(())
    }

    /// Apply a pose update from the render thread itself.
    pub fn set_pose(&self, pose: Pose) {
        self.shared.pose.set(pose);
    }

    /// Run one frame at time `now`.
    ///
    /// The pose is read once and fully applied before the plane is
    /// recomputed; the plane is settled before particles are ticked.
    pub fn frame(&mut self, now: Instant) -> RenderFrame {
        let pose = self.shared.pose.get();

        let Some(info) = self.info else {
            self.engine.hold(now);
            return RenderFrame {
                tangible_visible: pose.tangible_visible,
                stylus_visible: pose.stylus_visible,
                ..Default::default()
            };
        };

        let zoom = self.shared.settings.with(|s| s.zoom_factor);
        let effector = Effector::locate(&pose, zoom, &info, self.clip.params());
        self.shared.effector.set(effector);
        self.update_probe(effector.as_ref());

        let settings = self.shared.settings.get();
        self.update_slice(&pose, &settings, &info);

        if pose.tangible_visible {
            self.engine.tick(now);
        } else {
            self.engine.hold(now);
        }

        let slice = self.shared.slice.get();
        let cross_section = self.shared.cross_section.get();
        let particles = self.engine.snapshot();
        RenderFrame::build(&Scene {
            pose: &pose,
            settings: &settings,
            info: &info,
            slice: slice.as_ref(),
            axes: self.clip.axes(),
            cross_section: &cross_section,
            effector: effector.as_ref(),
            particles: &particles.positions,
            particles_active: particles.active,
            has_velocity: self.engine.has_velocity_field(),
            cross_section_epsilon: self.clip.params().cross_section_epsilon,
        })
    }

    /// Sample the iso-value under the effector while the button is held.
    fn update_probe(&mut self, effector: Option<&Effector>) {
        let ButtonState { pressed } = self.shared.button.get();
        if pressed && !self.button_was_pressed {
            self.probe.reset();
        }
        self.button_was_pressed = pressed;
        if !pressed {
            return;
        }

        let (Some(effector), Some(dataset)) = (effector, self.dataset.as_deref()) else {
            return;
        };
        if !effector.inside_volume {
            return;
        }
        if let Some(percentage) = self.probe.probe(dataset, effector.data_position) {
            self.shared.settings.update(|s| {
                s.surface_percentage = percentage;
                s.surface_preview = true;
            });
        }
    }

    /// Recompute the slicing plane and publish it.
    ///
    /// Degenerate poses keep the previously published plane.
    fn update_slice(&mut self, pose: &Pose, settings: &Settings, info: &DatasetInfo) {
        let result = if settings.show_slice {
            self.clip.compute(pose, settings, info)
        } else {
            self.clip.reset();
            Err(NoPlane::Disabled)
        };
        self.shared.clip_axes.set(self.clip.axes());

        match result {
            Ok(plane) => {
                self.shared.slice_model_matrix.set(plane.model_matrix);
                self.shared.slice.set(Some(plane));
                self.shared.cross_section.set(self.clip.cross_section().clone());
            }
            Err(NoPlane::DegenerateStylus | NoPlane::DegenerateTangible) => {
                log::trace!("keeping previous slice: {:?}", result);
            }
            Err(_) => {
                self.shared.slice.set(None);
                self.shared.cross_section.set(CrossSection::default());
            }
        }
    }
}

/// Cloneable control surface for the input thread.
#[derive(Clone)]
pub struct Controls {
    shared: Arc<SharedState>,
    engine: Arc<AdvectionEngine>,
}

impl Controls {
    pub fn set_pose(&self, pose: Pose) {
        self.shared.pose.set(pose);
    }

    /// Update both poses and their visibility in one write.
    pub fn set_poses(
        &self,
        tangible: Mat4,
        stylus: Mat4,
        tangible_visible: bool,
        stylus_visible: bool,
    ) {
        self.set_pose(Pose {
            tangible,
            stylus,
            tangible_visible,
            stylus_visible,
        });
    }

    /// Store the eye-space seed used by [`Controls::release_particles`].
    pub fn set_seed_point(&self, x: f32, y: f32, z: f32) {
        self.shared.seed_point.set(Some(Vec3::new(x, y, z)));
    }

    pub fn clear_seed_point(&self) {
        self.shared.seed_point.set(None);
    }

    /// Release from the stored seed point.
    pub fn release_particles(&self) -> ReleaseOutcome {
        match self.shared.seed_point.get() {
            Some(seed) => self.release_particles_at(seed),
            None => ReleaseOutcome::NoSeed,
        }
    }

    /// Release from an eye-space seed using the current pose and zoom.
    pub fn release_particles_at(&self, seed: Vec3) -> ReleaseOutcome {
        let Some(info) = self.shared.dataset_info.get() else {
            return ReleaseOutcome::NoVelocityField;
        };
        let tangible = self.shared.pose.with(|p| p.tangible);
        let zoom = self.shared.settings.with(|s| s.zoom_factor);
        let frame = DataFrame::new(tangible, zoom, info.half_extent());
        if !frame.is_valid() {
            return ReleaseOutcome::OutOfBounds;
        }
        let voxel = frame.pos_to_data_coords(seed) / info.spacing;
        self.engine.release(voxel)
    }

    pub fn reset_particles(&self) {
        self.engine.reset();
    }

    /// Press or release the stylus button.
    ///
    /// Releasing ends the surface preview and returns the committed
    /// iso percentage.
    pub fn set_button_pressed(&self, pressed: bool) -> Option<f32> {
        let was_pressed = self.shared.button.replace(ButtonState { pressed }).pressed;
        if pressed || !was_pressed {
            return None;
        }
        let percentage = self.shared.settings.update(|s| {
            s.surface_preview = false;
            s.surface_percentage
        });
        Some(percentage)
    }

    pub fn set_slicing_mode(&self, mode: SlicingMode) {
        self.shared.settings.update(|s| s.slicing_mode = mode);
    }

    pub fn set_zoom(&self, zoom: f32) {
        self.shared.settings.update(|s| s.zoom_factor = zoom);
    }

    pub fn set_clip_dist(&self, clip_dist: f32) {
        self.shared.settings.update(|s| s.clip_dist = clip_dist);
    }

    pub fn set_show_slice(&self, show: bool) {
        self.shared.settings.update(|s| s.show_slice = show);
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Settings {
        self.shared.settings.get()
    }
}
