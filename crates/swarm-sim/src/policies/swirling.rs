use glam::Vec3;
use swarm_core::config::SwirlingParams;
use swarm_core::math::clamp_segments;
use swarm_core::types::SwarmVariant;

use crate::kernel::{Kernel, KernelSet};
use crate::policy::{PolicyContext, UpdatePolicy};
use crate::uniforms::SwirlingUniforms;

/// Every tick re-lays each tube along a drifting noise field. No state
/// survives between ticks apart from the noise offset.
#[derive(Debug, Clone)]
pub struct SwirlingPolicy {
    params: SwirlingParams,
    segments: u32,
    noise_offset: Vec3,
}

impl SwirlingPolicy {
    /// `segments` is the tube template's segment count (clamped).
    pub fn new(params: SwirlingParams, segments: u32) -> Self {
        Self {
            params,
            segments: clamp_segments(segments),
            noise_offset: Vec3::ZERO,
        }
    }

    pub fn params(&self) -> &SwirlingParams {
        &self.params
    }

    pub fn noise_offset(&self) -> Vec3 {
        self.noise_offset
    }

    pub fn step_width(&self) -> f32 {
        self.params.length / self.segments as f32
    }

    fn uniforms(&self, ctx: &PolicyContext) -> SwirlingUniforms {
        SwirlingUniforms {
            history: ctx.history,
            noise_offset: self.noise_offset.to_array(),
            spread: self.params.spread,
            step_width: self.step_width(),
            noise_frequency: self.params.noise_frequency,
            random_seed: ctx.random_seed,
            _pad: 0,
        }
    }
}

impl UpdatePolicy for SwirlingPolicy {
    fn variant(&self) -> SwarmVariant {
        SwarmVariant::Swirling
    }

    fn kernels(&self) -> KernelSet {
        KernelSet {
            init: None,
            update: Kernel::SwirlingUpdate,
            reconstruct: Kernel::SwirlingReconstruct,
        }
    }

    fn restart(&mut self, _random_seed: u32) {
        self.noise_offset = Vec3::ZERO;
    }

    fn init_uniforms(&self, ctx: &PolicyContext) -> Vec<u8> {
        bytemuck::bytes_of(&self.uniforms(ctx)).to_vec()
    }

    fn update_uniforms(&mut self, ctx: &PolicyContext, delta: f32) -> Vec<u8> {
        self.noise_offset += self.params.noise_motion * delta;
        bytemuck::bytes_of(&self.uniforms(ctx)).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::reference::decode;
    use crate::policies::test_support::context;

    #[test]
    fn test_step_width() {
        let params = SwirlingParams {
            length: 8.0,
            ..SwirlingParams::default()
        };
        assert_eq!(SwirlingPolicy::new(params, 16).step_width(), 0.5);
        // Segment count is clamped like the template's
        assert_eq!(SwirlingPolicy::new(params, 1).step_width(), 2.0);
    }

    #[test]
    fn test_noise_offset_advances_before_dispatch() {
        let params = SwirlingParams {
            noise_motion: Vec3::new(0.0, 2.0, 0.0),
            ..SwirlingParams::default()
        };
        let mut policy = SwirlingPolicy::new(params, 16);
        let ctx = context(64, 0.0);
        let u: SwirlingUniforms = decode(&policy.update_uniforms(&ctx, 0.25)).expect("decode");
        assert_eq!(u.noise_offset, [0.0, 0.5, 0.0]);
        let u: SwirlingUniforms = decode(&policy.update_uniforms(&ctx, 0.25)).expect("decode");
        assert_eq!(u.noise_offset, [0.0, 1.0, 0.0]);

        policy.restart(9);
        assert_eq!(policy.noise_offset(), Vec3::ZERO);
    }

    #[test]
    fn test_has_no_init_kernel() {
        let policy = SwirlingPolicy::new(SwirlingParams::default(), 16);
        assert!(policy.kernels().init.is_none());
        assert!(!policy.uses_velocity());
    }
}
