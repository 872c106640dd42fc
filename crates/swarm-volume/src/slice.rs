//! Axis-aligned slice extraction for inspecting a baked volume.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::volume::VolumeData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SliceMode {
    /// Grey ramp of the stored distance.
    #[default]
    Distance,
    /// Gradient remapped from [-1, 1] to [0, 1].
    Gradient,
}

/// Extract an R×R RGBA slice perpendicular to Z.
///
/// `depth` is normalised over the volume's Z span and clamped to [0, 1].
/// Texels are in `x + R*y` order; alpha is always 1.
pub fn extract_slice(volume: &VolumeData, depth: f32, mode: SliceMode) -> Vec<[f32; 4]> {
    let r = volume.resolution();
    let e = volume.extent();
    let span = (r - 1) as f32;
    let z = (depth.clamp(0.0, 1.0) * 2.0 - 1.0) * e;

    let mut texels = Vec::with_capacity((r * r) as usize);
    for yi in 0..r {
        for xi in 0..r {
            let local = Vec3::new(
                (2.0 * xi as f32 / span - 1.0) * e,
                (2.0 * yi as f32 / span - 1.0) * e,
                z,
            );
            let cell = volume.sample(local);
            let rgb = match mode {
                SliceMode::Distance => Vec3::splat(cell.distance),
                SliceMode::Gradient => cell.gradient() * 0.5 + Vec3::splat(0.5),
            };
            texels.push(rgb.extend(1.0).to_array());
        }
    }
    texels
}
