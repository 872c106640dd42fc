use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::{CRAWLING_MAX_DELTA, FLOATING_MAX_DELTA, SWIRLING_MAX_DELTA};

/// Rigid pose with scale. Used for the sampler origin and the swarm's
/// local-to-world transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Pose {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn local_to_world(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn world_to_local(&self) -> Affine3A {
        self.local_to_world().inverse()
    }
}

/// The simulation variants a swarm can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwarmVariant {
    /// Instances crawl along the zero-crossing of a distance field.
    Crawling,
    /// Instances float toward an attractor with explicit velocity.
    Floating,
    /// Instances are re-laid every frame along a moving noise field.
    Swirling,
}

impl SwarmVariant {
    /// Largest delta time integrated by one tick.
    pub fn max_delta(self) -> f32 {
        match self {
            SwarmVariant::Crawling => CRAWLING_MAX_DELTA,
            SwarmVariant::Floating => FLOATING_MAX_DELTA,
            SwarmVariant::Swirling => SWIRLING_MAX_DELTA,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SwarmVariant::Crawling => "crawling",
            SwarmVariant::Floating => "floating",
            SwarmVariant::Swirling => "swirling",
        }
    }
}

/// Time supplied by the caller for one tick. There is no ambient clock.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameClock {
    /// Seconds since the caller's epoch.
    pub time: f32,
    /// Seconds since the previous tick (unclamped).
    pub delta_time: f32,
}

impl FrameClock {
    pub fn new(time: f32, delta_time: f32) -> Self {
        Self { time, delta_time }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_roundtrip() {
        let pose = Pose {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::splat(2.0),
        };
        let p = Vec3::new(0.3, -0.4, 0.5);
        let back = pose
            .world_to_local()
            .transform_point3(pose.local_to_world().transform_point3(p));
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn test_variant_max_delta() {
        assert_eq!(SwarmVariant::Crawling.max_delta(), 1.0 / 15.0);
        assert_eq!(SwarmVariant::Floating.max_delta(), 1.0 / 30.0);
    }
}
