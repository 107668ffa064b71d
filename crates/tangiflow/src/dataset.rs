//! Dataset provider contract and an in-memory implementation.
//!
//! The core never parses files. It consumes a materialized scalar grid plus
//! an optional co-registered velocity field, and refuses velocity data whose
//! layout disagrees with the grid.

use std::sync::Arc;

use glam::{IVec3, UVec3, Vec3};

use crate::constants::{MIN_ZOOM_FACTOR, NATIVE_DATA_SIZE};
use crate::error::{DatasetError, Result};

/// Layout of a vector field attached to a dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    pub dims: UVec3,
    /// Components per vector
    pub components: usize,
}

/// Read-only access to a loaded volume.
pub trait DatasetProvider: Send + Sync {
    /// Grid dimensions in voxels.
    fn dimensions(&self) -> UVec3;

    /// Physical spacing between voxels.
    fn spacing(&self) -> Vec3;

    /// Layout of the velocity field, if one is attached.
    fn velocity_layout(&self) -> Option<FieldLayout>;

    fn has_velocity_field(&self) -> bool {
        self.velocity_layout().is_some()
    }

    /// Stored velocity vector at a voxel, `None` outside the grid or without a field.
    fn sample_velocity(&self, voxel: IVec3) -> Option<Vec3>;

    /// Trilinearly interpolated scalar at a data-space position.
    fn sample_scalar(&self, data_coords: Vec3) -> Option<f32>;

    /// Minimum and maximum scalar values.
    fn scalar_range(&self) -> (f32, f32);
}

/// Check that a provider's velocity field, if any, matches its grid.
pub fn validate_provider(provider: &dyn DatasetProvider) -> Result<()> {
    let dims = provider.dimensions();
    if dims.min_element() == 0 {
        return Err(DatasetError::EmptyGrid(dims));
    }
    if let Some(layout) = provider.velocity_layout() {
        validate_layout(layout, dims)?;
    }
    Ok(())
}

fn validate_layout(layout: FieldLayout, dims: UVec3) -> Result<()> {
    if layout.dims != dims {
        return Err(DatasetError::DimensionMismatch {
            velocity: layout.dims,
            data: dims,
        });
    }
    if layout.components != 3 {
        return Err(DatasetError::NotThreeComponent(layout.components));
    }
    Ok(())
}

/// Linear index of a voxel, x fastest.
fn voxel_index(dims: UVec3, voxel: IVec3) -> Option<usize> {
    if voxel.cmplt(IVec3::ZERO).any() || voxel.as_uvec3().cmpge(dims).any() {
        return None;
    }
    let v = voxel.as_uvec3();
    Some((v.z as usize * dims.y as usize + v.y as usize) * dims.x as usize + v.x as usize)
}

/// Dense scalar volume.
#[derive(Clone, Debug)]
pub struct ScalarGrid {
    dims: UVec3,
    spacing: Vec3,
    values: Vec<f32>,
    range: (f32, f32),
}

impl ScalarGrid {
    pub fn new(dims: UVec3, spacing: Vec3, values: Vec<f32>) -> Result<Self> {
        if dims.min_element() == 0 {
            return Err(DatasetError::EmptyGrid(dims));
        }
        let expected = dims.x as usize * dims.y as usize * dims.z as usize;
        if values.len() != expected {
            return Err(DatasetError::ScalarCountMismatch {
                expected,
                found: values.len(),
            });
        }
        let range = values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Ok(Self {
            dims,
            spacing,
            values,
            range,
        })
    }

    /// Grid filled with a function of the voxel index.
    pub fn from_fn(dims: UVec3, spacing: Vec3, f: impl Fn(UVec3) -> f32) -> Result<Self> {
        let mut values = Vec::with_capacity(dims.x as usize * dims.y as usize * dims.z as usize);
        for z in 0..dims.z {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    values.push(f(UVec3::new(x, y, z)));
                }
            }
        }
        Self::new(dims, spacing, values)
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    pub fn get(&self, voxel: IVec3) -> Option<f32> {
        voxel_index(self.dims, voxel).map(|i| self.values[i])
    }

    /// Trilinear sample; neighbours past the far edge clamp to the edge.
    pub fn sample(&self, data_coords: Vec3) -> Option<f32> {
        let p = data_coords / self.spacing;
        let max = (self.dims - UVec3::ONE).as_vec3();
        if p.cmplt(Vec3::ZERO).any() || p.cmpgt(max).any() || !p.is_finite() {
            return None;
        }
        let base = p.floor().as_ivec3();
        let f = p - p.floor();
        let hi = self.dims.as_ivec3() - IVec3::ONE;
        let at = |dx: i32, dy: i32, dz: i32| {
            let v = (base + IVec3::new(dx, dy, dz)).min(hi);
            self.get(v).unwrap_or(0.0)
        };
        let c00 = at(0, 0, 0) * (1.0 - f.x) + at(1, 0, 0) * f.x;
        let c10 = at(0, 1, 0) * (1.0 - f.x) + at(1, 1, 0) * f.x;
        let c01 = at(0, 0, 1) * (1.0 - f.x) + at(1, 0, 1) * f.x;
        let c11 = at(0, 1, 1) * (1.0 - f.x) + at(1, 1, 1) * f.x;
        let c0 = c00 * (1.0 - f.y) + c10 * f.y;
        let c1 = c01 * (1.0 - f.y) + c11 * f.y;
        Some(c0 * (1.0 - f.z) + c1 * f.z)
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }
}

/// Dense vector volume with an explicit component count.
#[derive(Clone, Debug)]
pub struct VectorField {
    dims: UVec3,
    components: usize,
    data: Vec<f32>,
}

impl VectorField {
    /// Field from interleaved components, validated for length.
    pub fn new(dims: UVec3, components: usize, data: Vec<f32>) -> Result<Self> {
        let expected = dims.x as usize * dims.y as usize * dims.z as usize * components;
        if data.len() != expected || data.is_empty() {
            return Err(DatasetError::MissingVectors {
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            dims,
            components,
            data,
        })
    }

    /// 3-component field filled with a function of the voxel index.
    pub fn from_fn(dims: UVec3, f: impl Fn(UVec3) -> Vec3) -> Result<Self> {
        let mut data = Vec::with_capacity(dims.x as usize * dims.y as usize * dims.z as usize * 3);
        for z in 0..dims.z {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    data.extend_from_slice(&f(UVec3::new(x, y, z)).to_array());
                }
            }
        }
        Self::new(dims, 3, data)
    }

    /// Constant 3-component field.
    pub fn uniform(dims: UVec3, v: Vec3) -> Result<Self> {
        Self::from_fn(dims, |_| v)
    }

    pub fn layout(&self) -> FieldLayout {
        FieldLayout {
            dims: self.dims,
            components: self.components,
        }
    }

    pub fn get(&self, voxel: IVec3) -> Option<Vec3> {
        if self.components < 3 {
            return None;
        }
        let i = voxel_index(self.dims, voxel)? * self.components;
        Some(Vec3::new(self.data[i], self.data[i + 1], self.data[i + 2]))
    }
}

/// Scalar grid with an optional velocity field.
#[derive(Clone, Debug)]
pub struct Dataset {
    scalars: ScalarGrid,
    velocity: Option<VectorField>,
}

impl Dataset {
    pub fn new(scalars: ScalarGrid) -> Self {
        Self {
            scalars,
            velocity: None,
        }
    }

    /// Attach a velocity field after checking it against the grid.
    pub fn with_velocity(mut self, field: VectorField) -> Result<Self> {
        validate_layout(field.layout(), self.scalars.dims())?;
        self.velocity = Some(field);
        Ok(self)
    }

    pub fn scalars(&self) -> &ScalarGrid {
        &self.scalars
    }

    pub fn velocity(&self) -> Option<&VectorField> {
        self.velocity.as_ref()
    }
}

impl DatasetProvider for Dataset {
    fn dimensions(&self) -> UVec3 {
        self.scalars.dims()
    }

    fn spacing(&self) -> Vec3 {
        self.scalars.spacing()
    }

    fn velocity_layout(&self) -> Option<FieldLayout> {
        self.velocity.as_ref().map(VectorField::layout)
    }

    fn sample_velocity(&self, voxel: IVec3) -> Option<Vec3> {
        self.velocity.as_ref()?.get(voxel)
    }

    fn sample_scalar(&self, data_coords: Vec3) -> Option<f32> {
        self.scalars.sample(data_coords)
    }

    fn scalar_range(&self) -> (f32, f32) {
        self.scalars.range()
    }
}

/// A loaded provider with a separately loaded velocity field on top.
///
/// Scalars and extents come from the base provider; velocity lookups go to
/// the attached field, replacing any field the base carried.
pub struct VelocityOverlay {
    base: Arc<dyn DatasetProvider>,
    field: VectorField,
}

impl VelocityOverlay {
    /// Attach `field` to `base` after checking it against the base grid.
    pub fn new(base: Arc<dyn DatasetProvider>, field: VectorField) -> Result<Self> {
        validate_layout(field.layout(), base.dimensions())?;
        Ok(Self { base, field })
    }
}

impl DatasetProvider for VelocityOverlay {
    fn dimensions(&self) -> UVec3 {
        self.base.dimensions()
    }

    fn spacing(&self) -> Vec3 {
        self.base.spacing()
    }

    fn velocity_layout(&self) -> Option<FieldLayout> {
        Some(self.field.layout())
    }

    fn sample_velocity(&self, voxel: IVec3) -> Option<Vec3> {
        self.field.get(voxel)
    }

    fn sample_scalar(&self, data_coords: Vec3) -> Option<f32> {
        self.base.sample_scalar(data_coords)
    }

    fn scalar_range(&self) -> (f32, f32) {
        self.base.scalar_range()
    }
}

/// Derived extents of a loaded dataset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DatasetInfo {
    pub dims: UVec3,
    pub spacing: Vec3,
}

impl DatasetInfo {
    pub fn from_provider(provider: &dyn DatasetProvider) -> Self {
        Self {
            dims: provider.dimensions(),
            spacing: provider.spacing(),
        }
    }

    /// Physical size of the volume.
    pub fn extent(&self) -> Vec3 {
        self.dims.as_vec3() * self.spacing
    }

    /// Offset of the volume center from its corner origin.
    ///
    /// Uses the integer half of each dimension, so odd grids are centered
    /// half a voxel off.
    pub fn half_extent(&self) -> Vec3 {
        (self.dims / 2).as_vec3() * self.spacing
    }

    /// Largest physical extent.
    pub fn max_extent(&self) -> f32 {
        self.extent().max_element()
    }

    /// Zoom that brings the largest extent to a comfortable on-screen size.
    pub fn default_zoom(&self) -> f32 {
        (NATIVE_DATA_SIZE / self.max_extent()).max(MIN_ZOOM_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(dims: UVec3) -> ScalarGrid {
        ScalarGrid::from_fn(dims, Vec3::ONE, |v| v.x as f32).unwrap()
    }

    #[test]
    fn test_scalar_count_mismatch() {
        let err = ScalarGrid::new(UVec3::new(2, 2, 2), Vec3::ONE, vec![0.0; 7]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::ScalarCountMismatch {
                expected: 8,
                found: 7
            }
        );
    }

    #[test]
    fn test_empty_grid_rejected() {
        assert!(matches!(
            ScalarGrid::new(UVec3::new(0, 2, 2), Vec3::ONE, vec![]),
            Err(DatasetError::EmptyGrid(_))
        ));
    }

    #[test]
    fn test_velocity_dimension_mismatch() {
        let field = VectorField::uniform(UVec3::new(4, 4, 2), Vec3::X).unwrap();
        let err = Dataset::new(grid(UVec3::splat(4))).with_velocity(field).unwrap_err();
        assert!(matches!(err, DatasetError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_velocity_arity_rejected() {
        let dims = UVec3::splat(2);
        let field = VectorField::new(dims, 2, vec![0.0; 16]).unwrap();
        let err = Dataset::new(grid(dims)).with_velocity(field).unwrap_err();
        assert_eq!(err, DatasetError::NotThreeComponent(2));
    }

    #[test]
    fn test_missing_vectors_rejected() {
        let err = VectorField::new(UVec3::splat(2), 3, vec![]).unwrap_err();
        assert!(matches!(err, DatasetError::MissingVectors { expected: 24, found: 0 }));
    }

    #[test]
    fn test_velocity_lookup_order() {
        let dims = UVec3::new(3, 2, 2);
        let field = VectorField::from_fn(dims, |v| v.as_vec3()).unwrap();
        let ds = Dataset::new(grid(dims)).with_velocity(field).unwrap();
        assert_eq!(ds.sample_velocity(IVec3::new(2, 1, 1)), Some(Vec3::new(2.0, 1.0, 1.0)));
        assert_eq!(ds.sample_velocity(IVec3::new(3, 0, 0)), None);
        assert_eq!(ds.sample_velocity(IVec3::new(-1, 0, 0)), None);
    }

    #[test]
    fn test_velocity_overlay_keeps_base_scalars() {
        let dims = UVec3::new(3, 2, 2);
        let base: Arc<dyn DatasetProvider> = Arc::new(Dataset::new(grid(dims)));
        let field = VectorField::uniform(dims, Vec3::Z).unwrap();
        let overlay = VelocityOverlay::new(Arc::clone(&base), field).unwrap();

        assert!(!base.has_velocity_field());
        assert!(overlay.has_velocity_field());
        assert_eq!(overlay.sample_velocity(IVec3::new(2, 1, 1)), Some(Vec3::Z));
        assert_eq!(overlay.sample_scalar(Vec3::new(1.5, 0.0, 0.0)), Some(1.5));
        assert_eq!(overlay.scalar_range(), base.scalar_range());
        assert!(validate_provider(&overlay).is_ok());
    }

    #[test]
    fn test_velocity_overlay_rejects_mismatch() {
        let base: Arc<dyn DatasetProvider> = Arc::new(Dataset::new(grid(UVec3::splat(4))));
        let field = VectorField::uniform(UVec3::new(4, 4, 3), Vec3::X).unwrap();
        assert!(matches!(
            VelocityOverlay::new(base, field),
            Err(DatasetError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_trilinear_sample() {
        let g = grid(UVec3::splat(4));
        assert!((g.sample(Vec3::new(1.5, 1.0, 2.25)).unwrap() - 1.5).abs() < 1e-6);
        assert_eq!(g.sample(Vec3::new(3.0, 3.0, 3.0)), Some(3.0));
        assert!(g.sample(Vec3::new(3.5, 0.0, 0.0)).is_none());
        assert_eq!(g.range(), (0.0, 3.0));
    }

    #[test]
    fn test_info_extents() {
        let info = DatasetInfo {
            dims: UVec3::new(65, 32, 10),
            spacing: Vec3::new(1.0, 2.0, 0.5),
        };
        assert_eq!(info.extent(), Vec3::new(65.0, 64.0, 5.0));
        assert_eq!(info.half_extent(), Vec3::new(32.0, 32.0, 2.5));
        assert!((info.default_zoom() - 110.0 / 65.0).abs() < 1e-6);

        let huge = DatasetInfo {
            dims: UVec3::splat(1000),
            spacing: Vec3::ONE,
        };
        assert_eq!(huge.default_zoom(), MIN_ZOOM_FACTOR);
    }
}
