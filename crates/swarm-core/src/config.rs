//! Serializable swarm configuration, loaded from RON.
//!
//! Defaults follow the stock swarm presets. Out-of-range values are clamped
//! silently by [`SwarmConfig::sanitized`]; nothing here rejects a value.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gradient::CosineGradient;
use crate::math::{clamp_divisions, clamp_segments, history_length, tube_index_count};
use crate::types::{Pose, SwarmVariant};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse swarm config RON: {0}")]
    SwarmParseError(String),
}

/// Tube template mesh parameters. Only the counts matter to the simulation;
/// the mesh itself is built by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TubeTemplate {
    /// Vertices per ring.
    pub divisions: u32,
    /// Segments along the tube.
    pub segments: u32,
}

impl Default for TubeTemplate {
    fn default() -> Self {
        Self {
            divisions: 6,
            segments: 256,
        }
    }
}

impl TubeTemplate {
    pub fn divisions(&self) -> u32 {
        clamp_divisions(self.divisions)
    }

    pub fn segments(&self) -> u32 {
        clamp_segments(self.segments)
    }

    pub fn history_length(&self) -> u32 {
        history_length(self.segments)
    }

    pub fn index_count(&self) -> u32 {
        tube_index_count(self.divisions, self.segments)
    }
}

/// Per-draw material parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    /// Tube radius in local units.
    pub radius: f32,
    /// Fraction of the history drawn, [0, 1].
    pub trim: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            radius: 0.005,
            trim: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlingParams {
    pub speed: f32,
    pub initial_spread: f32,
    /// Pull-back strength toward the field's zero-crossing.
    pub constraint: f32,
    pub noise_frequency: f32,
    pub noise_spread: f32,
    pub noise_motion: f32,
}

impl Default for CrawlingParams {
    fn default() -> Self {
        Self {
            speed: 0.75,
            initial_spread: 0.4,
            constraint: 6.0,
            noise_frequency: 4.0,
            noise_spread: 0.5,
            noise_motion: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatingParams {
    /// Attractor position in world space.
    pub attractor_position: Vec3,
    pub attractor_spread: f32,
    pub attractor_force: f32,
    /// 0 = every instance gets the full force, 1 = force uniform in [0, force].
    pub force_randomness: f32,
    /// Exponential drag coefficient (per second).
    pub drag: f32,
    pub head_noise_force: f32,
    pub head_noise_frequency: f32,
    pub trail_noise_velocity: f32,
    pub trail_noise_frequency: f32,
    pub noise_spread: f32,
    pub noise_motion: f32,
}

impl Default for FloatingParams {
    fn default() -> Self {
        Self {
            attractor_position: Vec3::ZERO,
            attractor_spread: 0.01,
            attractor_force: 5.0,
            force_randomness: 0.5,
            drag: 2.0,
            head_noise_force: 0.5,
            head_noise_frequency: 0.5,
            trail_noise_velocity: 0.01,
            trail_noise_frequency: 0.5,
            noise_spread: 0.5,
            noise_motion: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwirlingParams {
    pub spread: f32,
    /// Total tube length; each segment covers `length / segments`.
    pub length: f32,
    pub noise_frequency: f32,
    pub noise_motion: Vec3,
}

impl Default for SwirlingParams {
    fn default() -> Self {
        Self {
            spread: 1.0,
            length: 10.0,
            noise_frequency: 4.0,
            noise_motion: Vec3::new(0.0, 0.2, 0.0),
        }
    }
}

/// Variant-specific dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VariantParams {
    Crawling(CrawlingParams),
    Floating(FloatingParams),
    Swirling(SwirlingParams),
}

impl VariantParams {
    pub fn variant(&self) -> SwarmVariant {
        match self {
            VariantParams::Crawling(_) => SwarmVariant::Crawling,
            VariantParams::Floating(_) => SwarmVariant::Floating,
            VariantParams::Swirling(_) => SwarmVariant::Swirling,
        }
    }
}

impl Default for VariantParams {
    fn default() -> Self {
        VariantParams::Floating(FloatingParams::default())
    }
}

/// Complete description of one swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Requested instance count; floored to a multiple of the workgroup width.
    pub instance_count: u32,
    pub random_seed: u32,
    pub template: TubeTemplate,
    pub render: RenderParams,
    /// Required at initialisation; `None` is a fatal precondition failure.
    pub gradient: Option<CosineGradient>,
    pub transform: Pose,
    pub variant: VariantParams,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            instance_count: 1000,
            random_seed: 0,
            template: TubeTemplate::default(),
            render: RenderParams::default(),
            gradient: Some(CosineGradient::default()),
            transform: Pose::default(),
            variant: VariantParams::default(),
        }
    }
}

impl SwarmConfig {
    /// Parse a swarm config from a RON string.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, ConfigError> {
        let options = ron::Options::default();
        options
            .from_str(ron_str)
            .map_err(|e| ConfigError::SwarmParseError(e.to_string()))
    }

    /// Copy with negative magnitudes raised to zero and `trim` clamped to [0, 1].
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        out.render.radius = out.render.radius.max(0.0);
        out.render.trim = out.render.trim.clamp(0.0, 1.0);
        match &mut out.variant {
            VariantParams::Crawling(p) => {
                p.speed = p.speed.max(0.0);
                p.noise_frequency = p.noise_frequency.max(0.0);
                p.noise_spread = p.noise_spread.max(0.0);
            }
            VariantParams::Floating(p) => {
                p.attractor_spread = p.attractor_spread.max(0.0);
                p.force_randomness = p.force_randomness.clamp(0.0, 1.0);
                p.drag = p.drag.clamp(0.0, 6.0);
                p.head_noise_force = p.head_noise_force.max(0.0);
                p.head_noise_frequency = p.head_noise_frequency.max(0.0);
                p.trail_noise_velocity = p.trail_noise_velocity.max(0.0);
                p.trail_noise_frequency = p.trail_noise_frequency.max(0.0);
                p.noise_spread = p.noise_spread.max(0.0);
            }
            VariantParams::Swirling(_) => {}
        }
        out
    }
}
