use std::time::Instant;

use glam::{Affine3A, Vec3};
use swarm_core::constants::PROBE_ITERATIONS;
use swarm_core::math::{clamp_resolution, grid_index, grid_index_clamped};

use crate::occupancy::OccupancyQuery;
use crate::volume::{VolumeCell, VolumeData};

/// Bakes a distance field by probing an occupancy query on a cubic grid.
///
/// The grid spans `[-extent, extent]^3` in the sampler's local space; `origin`
/// maps local points into the space the query answers in. Baking is pure:
/// the same query, resolution, extent and origin always give the same cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSampler {
    resolution: u32,
    extent: f32,
    origin: Affine3A,
}

impl VolumeSampler {
    /// Resolution is clamped into the supported range; extent must be positive
    /// and is raised to `f32::MIN_POSITIVE` otherwise.
    pub fn new(resolution: u32, extent: f32) -> Self {
        let clamped = clamp_resolution(resolution);
        if clamped != resolution {
            log::warn!(
                "VolumeSampler: resolution {} clamped to {}",
                resolution,
                clamped
            );
        }
        Self {
            resolution: clamped,
            extent: extent.max(f32::MIN_POSITIVE),
            origin: Affine3A::IDENTITY,
        }
    }

    pub fn with_origin(mut self, origin: Affine3A) -> Self {
        self.origin = origin;
        self
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn extent(&self) -> f32 {
        self.extent
    }

    pub fn origin(&self) -> Affine3A {
        self.origin
    }

    /// Local-space position of a voxel centre.
    pub fn voxel_local(&self, xi: u32, yi: u32, zi: u32) -> Vec3 {
        let span = (self.resolution - 1) as f32;
        let coord = |i: u32| 2.0 * i as f32 / span - 1.0;
        Vec3::new(coord(xi), coord(yi), coord(zi)) * self.extent
    }

    /// World-space position of a voxel centre.
    pub fn voxel_world(&self, xi: u32, yi: u32, zi: u32) -> Vec3 {
        self.origin.transform_point3(self.voxel_local(xi, yi, zi))
    }

    /// Fixed-step bisection on the probe radius around `point`.
    ///
    /// Starts at `extent` with step `extent / 2` and runs exactly
    /// [`PROBE_ITERATIONS`] steps, shrinking on overlap and growing otherwise.
    /// Resolution of the result is `extent / 2^10`; the result never goes
    /// below that or above `2 * extent`.
    pub fn search_distance<Q: OccupancyQuery + ?Sized>(&self, query: &Q, point: Vec3) -> f32 {
        let mut r = self.extent;
        let mut s = self.extent * 0.5;
        for _ in 0..PROBE_ITERATIONS {
            r += if query.is_occupied(point, r) { -s } else { s };
            s *= 0.5;
        }
        r
    }

    /// First pass: normalised distance for every voxel, `x + R*(y + R*z)` order.
    pub fn sample_distances<Q: OccupancyQuery + ?Sized>(&self, query: &Q) -> Vec<f32> {
        let r = self.resolution;
        let mut df = vec![0.0f32; (r as usize).pow(3)];
        for zi in 0..r {
            for yi in 0..r {
                for xi in 0..r {
                    let pt = self.voxel_world(xi, yi, zi);
                    df[grid_index(r, xi, yi, zi)] =
                        self.search_distance(query, pt) * 0.5 / self.extent;
                }
            }
        }
        df
    }

    /// Sample the query and pack distances with their gradients.
    pub fn bake<Q: OccupancyQuery + ?Sized>(&self, query: &Q) -> VolumeData {
        let start = Instant::now();
        let distances = self.sample_distances(query);
        let cells = compute_gradients(self.resolution, &distances);
        log::debug!(
            "VolumeSampler: baked {}^3 cells (extent {}) in {:.1} ms",
            self.resolution,
            self.extent,
            start.elapsed().as_secs_f64() * 1000.0
        );

        match VolumeData::from_cells(self.resolution, self.extent, cells) {
            Ok(volume) => volume,
            // resolution >= 2 and cells.len() == R^3 by construction
            Err(e) => unreachable!("sampler produced an invalid volume: {e}"),
        }
    }
}

/// Second pass: six-tap central differences over already-sampled distances.
///
/// `grad.axis = (d[+1] - d[-1]) * (R - 1) / 2`. Out-of-range neighbours clamp
/// to the edge cell, so boundary cells see a one-sided difference at half
/// scale.
pub fn compute_gradients(resolution: u32, distances: &[f32]) -> Vec<VolumeCell> {
    let r = resolution;
    let dds2 = (r - 1) as f32 / 2.0;
    let at = |x: i64, y: i64, z: i64| distances[grid_index_clamped(r, x, y, z)];

    let mut cells = vec![VolumeCell::default(); distances.len()];
    for zi in 0..r as i64 {
        for yi in 0..r as i64 {
            for xi in 0..r as i64 {
                let gradient = Vec3::new(
                    at(xi + 1, yi, zi) - at(xi - 1, yi, zi),
                    at(xi, yi + 1, zi) - at(xi, yi - 1, zi),
                    at(xi, yi, zi + 1) - at(xi, yi, zi - 1),
                ) * dds2;
                let index = grid_index_clamped(r, xi, yi, zi);
                cells[index] = VolumeCell::new(gradient, distances[index]);
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::{Collider, ColliderScene};

    #[test]
    fn test_voxel_local_spans_extent() {
        let s = VolumeSampler::new(5, 2.0);
        assert_eq!(s.voxel_local(0, 0, 0), Vec3::splat(-2.0));
        assert_eq!(s.voxel_local(4, 4, 4), Vec3::splat(2.0));
        assert_eq!(s.voxel_local(2, 2, 2), Vec3::ZERO);
    }

    #[test]
    fn test_voxel_world_applies_origin() {
        let s = VolumeSampler::new(3, 1.0)
            .with_origin(Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(s.voxel_world(1, 1, 1), Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(s.voxel_world(0, 1, 1), Vec3::new(9.0, 0.0, 0.0));
    }

    #[test]
    fn test_search_converges_on_shell_radius() {
        // Hollow shell of radius 0.3 around the origin: a probe at the origin
        // touches it once its radius reaches 0.3.
        let extent = 1.0;
        let s = VolumeSampler::new(8, extent);
        let shell = |_p: Vec3, r: f32| r >= 0.3;
        let d = s.search_distance(&shell, Vec3::ZERO);
        assert!(
            (d - 0.3).abs() <= extent / 1024.0,
            "converged to {d}, expected 0.3"
        );
    }

    #[test]
    fn test_search_converges_on_sphere_gap() {
        let s = VolumeSampler::new(8, 1.0);
        let scene = ColliderScene::new(vec![Collider::Sphere {
            center: Vec3::ZERO,
            radius: 0.3,
        }]);
        let d = s.search_distance(&scene, Vec3::new(1.0, 0.0, 0.0));
        assert!((d - 0.7).abs() <= 1.0 / 1024.0, "converged to {d}");
    }

    #[test]
    fn test_search_is_fixed_iteration() {
        // Always occupied: r = E - E/2 - E/4 - ... - E/1024 = E/1024
        let s = VolumeSampler::new(4, 1.0);
        let always = |_p: Vec3, _r: f32| true;
        assert!((s.search_distance(&always, Vec3::ZERO) - 1.0 / 1024.0).abs() < 1e-7);
        // Never occupied: r = E + E/2 + ... + E/1024 = 2E - E/1024
        let never = |_p: Vec3, _r: f32| false;
        assert!((s.search_distance(&never, Vec3::ZERO) - (2.0 - 1.0 / 1024.0)).abs() < 1e-6);
    }

    #[test]
    fn test_boundary_gradient_uses_clamped_neighbor() {
        // Hand-built 3x3x3 field: d = x^2 + 10*y + 100*z
        let r = 3;
        let mut df = vec![0.0f32; 27];
        for z in 0..3u32 {
            for y in 0..3u32 {
                for x in 0..3u32 {
                    df[grid_index(r, x, y, z)] = (x * x) as f32 + 10.0 * y as f32 + 100.0 * z as f32;
                }
            }
        }
        let cells = compute_gradients(r, &df);
        let scale = (r - 1) as f32 / 2.0; // 1.0

        // xi = 0: (d[1] - d[0]) * scale, not mirrored, not zero-padded
        let c = cells[grid_index(r, 0, 1, 1)];
        let expected = (df[grid_index(r, 1, 1, 1)] - df[grid_index(r, 0, 1, 1)]) * scale;
        assert_eq!(c.gradient[0], expected);
        assert_eq!(c.gradient[0], 1.0);

        // Interior: (d[2] - d[0]) * scale = 4
        assert_eq!(cells[grid_index(r, 1, 1, 1)].gradient[0], 4.0);

        // xi = 2: (d[2] - d[1]) * scale = 3
        assert_eq!(cells[grid_index(r, 2, 1, 1)].gradient[0], 3.0);

        // y boundary: one-sided 10 instead of central 20
        assert_eq!(cells[grid_index(r, 1, 0, 1)].gradient[1], 10.0);
        assert_eq!(cells[grid_index(r, 1, 1, 1)].gradient[1], 20.0);
        assert_eq!(cells[grid_index(r, 1, 1, 2)].gradient[2], 100.0);

        // Distance passes through untouched
        assert_eq!(c.distance, df[grid_index(r, 0, 1, 1)]);
    }

    #[test]
    fn test_bake_point_occupant_5x5x5() {
        let s = VolumeSampler::new(5, 1.0);
        let scene = ColliderScene::new(vec![Collider::Sphere {
            center: Vec3::ZERO,
            radius: 0.2,
        }]);
        let v = s.bake(&scene);
        assert_eq!(v.resolution(), 5);
        assert_eq!(v.cell_count(), 125);

        let center = v.distance(2, 2, 2);
        let (lo, hi) = v.distance_range();
        assert_eq!(center, lo, "centre cell should hold the smallest distance");

        for &(x, y, z) in &[
            (0, 0, 0),
            (4, 0, 0),
            (0, 4, 0),
            (0, 0, 4),
            (4, 4, 0),
            (4, 0, 4),
            (0, 4, 4),
            (4, 4, 4),
        ] {
            assert_eq!(v.distance(x, y, z), hi, "corner ({x},{y},{z}) should be largest");
        }

        // Corner: |(1,1,1)| - 0.2 ≈ 1.532, normalised by 0.5 / extent
        let corner_expected = (3.0f32.sqrt() - 0.2) * 0.5;
        assert!((hi - corner_expected).abs() <= 0.5 / 1024.0 + 1e-6);
    }

    #[test]
    fn test_bake_gradient_points_away_from_occupant() {
        let s = VolumeSampler::new(9, 1.0);
        let scene = ColliderScene::new(vec![Collider::Sphere {
            center: Vec3::ZERO,
            radius: 0.25,
        }]);
        let v = s.bake(&scene);
        let g = v.cell(6, 4, 4).gradient();
        assert!(g.x > 0.0);
        assert!(g.y.abs() < 1e-3 && g.z.abs() < 1e-3);
    }

    #[test]
    fn test_bake_is_deterministic() {
        let s = VolumeSampler::new(4, 0.5);
        let scene = ColliderScene::new(vec![Collider::Cuboid {
            center: Vec3::new(0.1, 0.0, 0.0),
            half_extents: Vec3::splat(0.1),
        }]);
        assert_eq!(s.bake(&scene), s.bake(&scene));
    }
}
