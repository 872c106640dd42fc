//! The per-variant half of a swarm: which kernels run, which buffers they
//! need and what the host computes for them each tick.

use std::sync::Arc;

use glam::Affine3A;
use swarm_core::types::SwarmVariant;
use swarm_core::SwarmError;
use swarm_volume::VolumeData;

use crate::kernel::KernelSet;
use crate::uniforms::HistoryUniforms;

/// Driver state a policy may read when building uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyContext {
    pub history: HistoryUniforms,
    pub random_seed: u32,
    /// Caller time in seconds.
    pub time: f32,
    /// Inverse of the swarm's transform.
    pub world_to_local: Affine3A,
}

pub trait UpdatePolicy {
    fn variant(&self) -> SwarmVariant;

    fn kernels(&self) -> KernelSet;

    /// Largest delta one tick integrates.
    fn max_delta(&self) -> f32 {
        self.variant().max_delta()
    }

    /// Whether the variant keeps a per-instance velocity buffer.
    fn uses_velocity(&self) -> bool {
        false
    }

    /// Distance field the kernels sample, if any.
    fn volume(&self) -> Option<&Arc<VolumeData>> {
        None
    }

    /// Check required references before anything is allocated.
    fn validate(&self) -> Result<(), SwarmError> {
        Ok(())
    }

    /// Restore host-side state to its seeded start. Called by initialise and
    /// reset.
    fn restart(&mut self, _random_seed: u32) {}

    /// Uniform block for the init kernel.
    fn init_uniforms(&self, ctx: &PolicyContext) -> Vec<u8>;

    /// Uniform block for this tick's update and reconstruct dispatches.
    /// `delta` is already clamped and positive.
    fn update_uniforms(&mut self, ctx: &PolicyContext, delta: f32) -> Vec<u8>;

    /// Called after the tick's dispatches are recorded.
    fn after_tick(&mut self, _delta: f32) {}
}
