//! Baked distance-field volume.
//!
//! Immutable once built. Consumers share it through `Arc<VolumeData>`; the
//! GPU copy is a cubic Rgba32Float 3D texture with the same cell order.

use glam::{Vec3, Vec4};
use swarm_core::constants::VOLUME_CELL_BYTES;
use swarm_core::math::{grid_index, grid_index_clamped};
use thiserror::Error;

/// One packed cell: gradient in xyz, normalised distance in w.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VolumeCell {
    pub gradient: [f32; 3],
    pub distance: f32,
}

impl VolumeCell {
    pub fn new(gradient: Vec3, distance: f32) -> Self {
        Self {
            gradient: gradient.to_array(),
            distance,
        }
    }

    pub fn gradient(&self) -> Vec3 {
        Vec3::from_array(self.gradient)
    }

    fn to_vec4(self) -> Vec4 {
        self.gradient().extend(self.distance)
    }

    fn from_vec4(v: Vec4) -> Self {
        Self::new(v.truncate(), v.w)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum VolumeError {
    #[error("invalid volume resolution {0} (must be at least 2)")]
    InvalidResolution(u32),

    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
}

/// A baked R×R×R grid of packed cells spanning `[-extent, extent]^3` in the
/// sampler's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeData {
    resolution: u32,
    extent: f32,
    cells: Vec<VolumeCell>,
}

impl VolumeData {
    /// Wrap already-packed cells. `cells` must be in `x + R*(y + R*z)` order.
    pub fn from_cells(
        resolution: u32,
        extent: f32,
        cells: Vec<VolumeCell>,
    ) -> Result<Self, VolumeError> {
        if resolution < 2 {
            return Err(VolumeError::InvalidResolution(resolution));
        }
        let expected = (resolution as usize).pow(3);
        if cells.len() != expected {
            return Err(VolumeError::CellCountMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            resolution,
            extent,
            cells,
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    pub fn cells(&self) -> &[VolumeCell] {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Size of the packed cell array in bytes.
    pub fn byte_size(&self) -> u64 {
        self.cells.len() as u64 * VOLUME_CELL_BYTES
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    /// Cell at integer grid coordinates. Panics if out of range.
    pub fn cell(&self, x: u32, y: u32, z: u32) -> VolumeCell {
        self.cells[grid_index(self.resolution, x, y, z)]
    }

    pub fn distance(&self, x: u32, y: u32, z: u32) -> f32 {
        self.cell(x, y, z).distance
    }

    /// Smallest and largest stored distance.
    pub fn distance_range(&self) -> (f32, f32) {
        self.cells
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c.distance), hi.max(c.distance))
            })
    }

    /// Trilinear lookup at a point in the volume's local space.
    /// Points outside `[-extent, extent]^3` read the clamped edge.
    pub fn sample(&self, local: Vec3) -> VolumeCell {
        let max = (self.resolution - 1) as f32;
        let g = ((local / self.extent + Vec3::ONE) * 0.5 * max).clamp(Vec3::ZERO, Vec3::splat(max));
        let base = g.floor();
        let t = g - base;
        let (bx, by, bz) = (base.x as i64, base.y as i64, base.z as i64);

        let fetch = |dx: i64, dy: i64, dz: i64| {
            self.cells[grid_index_clamped(self.resolution, bx + dx, by + dy, bz + dz)].to_vec4()
        };

        let c00 = fetch(0, 0, 0).lerp(fetch(1, 0, 0), t.x);
        let c10 = fetch(0, 1, 0).lerp(fetch(1, 1, 0), t.x);
        let c01 = fetch(0, 0, 1).lerp(fetch(1, 0, 1), t.x);
        let c11 = fetch(0, 1, 1).lerp(fetch(1, 1, 1), t.x);
        let c0 = c00.lerp(c10, t.y);
        let c1 = c01.lerp(c11, t.y);
        VolumeCell::from_vec4(c0.lerp(c1, t.z))
    }
}
