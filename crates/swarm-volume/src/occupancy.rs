use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Sphere-overlap test against an external scene.
///
/// The sampler only ever asks "does a sphere of `radius` around `point`
/// touch anything?"; how that is answered is up to the implementor.
pub trait OccupancyQuery {
    fn is_occupied(&self, point: Vec3, radius: f32) -> bool;
}

impl<F> OccupancyQuery for F
where
    F: Fn(Vec3, f32) -> bool,
{
    fn is_occupied(&self, point: Vec3, radius: f32) -> bool {
        self(point, radius)
    }
}

/// Primitive colliders for bake scenes. All coordinates are world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Collider {
    Sphere { center: Vec3, radius: f32 },
    /// Axis-aligned box.
    Cuboid { center: Vec3, half_extents: Vec3 },
    Point { position: Vec3 },
}

impl Collider {
    /// Unsigned distance from `point` to the collider surface (0 inside).
    pub fn distance(&self, point: Vec3) -> f32 {
        match *self {
            Collider::Sphere { center, radius } => ((point - center).length() - radius).max(0.0),
            Collider::Cuboid {
                center,
                half_extents,
            } => ((point - center).abs() - half_extents)
                .max(Vec3::ZERO)
                .length(),
            Collider::Point { position } => (point - position).length(),
        }
    }

    pub fn overlaps_sphere(&self, point: Vec3, radius: f32) -> bool {
        self.distance(point) < radius
    }
}

/// A flat list of colliders queried linearly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColliderScene {
    pub colliders: Vec<Collider>,
}

impl ColliderScene {
    pub fn new(colliders: Vec<Collider>) -> Self {
        Self { colliders }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl OccupancyQuery for ColliderScene {
    fn is_occupied(&self, point: Vec3, radius: f32) -> bool {
        self.colliders
            .iter()
            .any(|c| c.overlaps_sphere(point, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_overlap() {
        let c = Collider::Sphere {
            center: Vec3::ZERO,
            radius: 0.5,
        };
        assert!(c.overlaps_sphere(Vec3::new(1.0, 0.0, 0.0), 0.6));
        assert!(!c.overlaps_sphere(Vec3::new(1.0, 0.0, 0.0), 0.4));
        // Probe centre inside the sphere always overlaps
        assert!(c.overlaps_sphere(Vec3::new(0.1, 0.0, 0.0), 0.001));
    }

    #[test]
    fn test_cuboid_distance() {
        let c = Collider::Cuboid {
            center: Vec3::new(1.0, 0.0, 0.0),
            half_extents: Vec3::splat(0.5),
        };
        assert!((c.distance(Vec3::new(2.5, 0.0, 0.0)) - 1.0).abs() < 1e-6);
        assert_eq!(c.distance(Vec3::new(1.2, 0.1, -0.3)), 0.0);
        let corner = c.distance(Vec3::new(2.5, 1.5, 0.0));
        assert!((corner - 2.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_point_collider() {
        let c = Collider::Point {
            position: Vec3::new(0.0, 2.0, 0.0),
        };
        assert!(c.overlaps_sphere(Vec3::ZERO, 2.01));
        assert!(!c.overlaps_sphere(Vec3::ZERO, 1.99));
    }

    #[test]
    fn test_empty_scene_never_occupied() {
        let scene = ColliderScene::default();
        assert!(!scene.is_occupied(Vec3::ZERO, 100.0));
    }

    #[test]
    fn test_closure_query() {
        let q = |p: Vec3, r: f32| p.length() < r;
        assert!(q.is_occupied(Vec3::X, 2.0));
        assert!(!q.is_occupied(Vec3::X, 0.5));
    }
}
