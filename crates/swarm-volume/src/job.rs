use serde::{Deserialize, Serialize};
use swarm_core::types::Pose;
use thiserror::Error;

use crate::occupancy::{Collider, ColliderScene};
use crate::sampler::VolumeSampler;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to parse bake job RON: {0}")]
    ParseError(String),
}

/// A bake request: grid parameters plus the scene to probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeJob {
    pub resolution: u32,
    /// Half-size of the sampled cube in local units.
    pub extent: f32,
    /// Maps sampler-local points into the colliders' space.
    pub origin: Pose,
    pub colliders: Vec<Collider>,
}

impl Default for BakeJob {
    fn default() -> Self {
        Self {
            resolution: 32,
            extent: 0.5,
            origin: Pose::default(),
            colliders: Vec::new(),
        }
    }
}

impl BakeJob {
    pub fn from_ron_str(ron_str: &str) -> Result<Self, JobError> {
        let options = ron::Options::default();
        options
            .from_str(ron_str)
            .map_err(|e| JobError::ParseError(e.to_string()))
    }

    pub fn sampler(&self) -> VolumeSampler {
        VolumeSampler::new(self.resolution, self.extent).with_origin(self.origin.local_to_world())
    }

    pub fn scene(&self) -> ColliderScene {
        ColliderScene::new(self.colliders.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_parse_job() {
        let src = r#"(
            resolution: 16,
            extent: 1.5,
            origin: (translation: (0.0, 1.0, 0.0)),
            colliders: [
                Sphere(center: (0.0, 1.0, 0.0), radius: 0.5),
                Cuboid(center: (1.0, 0.0, 0.0), half_extents: (0.1, 0.2, 0.3)),
                Point(position: (0.0, 0.0, 0.0)),
            ],
        )"#;
        let job = BakeJob::from_ron_str(src).expect("parse");
        assert_eq!(job.resolution, 16);
        assert_eq!(job.colliders.len(), 3);
        assert_eq!(job.origin.translation, Vec3::new(0.0, 1.0, 0.0));

        let sampler = job.sampler();
        assert_eq!(sampler.extent(), 1.5);
        assert_eq!(sampler.resolution(), 16);
        assert_eq!(sampler.voxel_world(0, 0, 0), Vec3::new(-1.5, -0.5, -1.5));
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let job = BakeJob::from_ron_str("(colliders: [])").expect("parse");
        assert_eq!(job.resolution, 32);
        assert_eq!(job.extent, 0.5);
        assert!(job.scene().is_empty());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            BakeJob::from_ron_str("(resolution: -3)"),
            Err(JobError::ParseError(_))
        ));
    }
}
