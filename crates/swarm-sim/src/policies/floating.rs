use glam::Vec3;
use swarm_core::config::FloatingParams;
use swarm_core::types::SwarmVariant;

use crate::kernel::{Kernel, KernelSet};
use crate::policy::{PolicyContext, UpdatePolicy};
use crate::uniforms::FloatingUniforms;

/// Instances carry a velocity and are pulled toward a jittered attractor.
#[derive(Debug, Clone)]
pub struct FloatingPolicy {
    params: FloatingParams,
    noise_offset: Vec3,
}

impl FloatingPolicy {
    pub fn new(params: FloatingParams) -> Self {
        Self {
            params,
            noise_offset: Vec3::ZERO,
        }
    }

    pub fn params(&self) -> &FloatingParams {
        &self.params
    }

    pub fn noise_offset(&self) -> Vec3 {
        self.noise_offset
    }

    fn uniforms(&self, ctx: &PolicyContext, delta: f32) -> FloatingUniforms {
        let p = &self.params;
        let attractor = ctx.world_to_local.transform_point3(p.attractor_position);
        FloatingUniforms {
            history: ctx.history,
            attractor: attractor.extend(p.attractor_spread).to_array(),
            force: [
                p.attractor_force * (1.0 - p.force_randomness),
                p.attractor_force,
            ],
            drag: (-p.drag * delta).exp(),
            delta_time: delta,
            head_noise_force: p.head_noise_force,
            head_noise_frequency: p.head_noise_frequency,
            trail_noise_velocity: p.trail_noise_velocity,
            trail_noise_frequency: p.trail_noise_frequency,
            noise_offset: self.noise_offset.to_array(),
            noise_spread: p.noise_spread / ctx.history.instance_count.max(1) as f32,
            random_seed: ctx.random_seed,
            _pad: [0; 3],
        }
    }
}

impl UpdatePolicy for FloatingPolicy {
    fn variant(&self) -> SwarmVariant {
        SwarmVariant::Floating
    }

    fn kernels(&self) -> KernelSet {
        KernelSet {
            init: Some(Kernel::FloatingInit),
            update: Kernel::FloatingUpdate,
            reconstruct: Kernel::FloatingReconstruct,
        }
    }

    fn uses_velocity(&self) -> bool {
        true
    }

    fn restart(&mut self, random_seed: u32) {
        self.noise_offset = Vec3::ONE * random_seed as f32;
    }

    fn init_uniforms(&self, ctx: &PolicyContext) -> Vec<u8> {
        bytemuck::bytes_of(&self.uniforms(ctx, 0.0)).to_vec()
    }

    fn update_uniforms(&mut self, ctx: &PolicyContext, delta: f32) -> Vec<u8> {
        bytemuck::bytes_of(&self.uniforms(ctx, delta)).to_vec()
    }

    fn after_tick(&mut self, delta: f32) {
        self.noise_offset += Vec3::ONE * self.params.noise_motion * delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::reference::decode;
    use crate::policies::test_support::context;
    use glam::Affine3A;

    #[test]
    fn test_drag_law() {
        let params = FloatingParams {
            drag: 2.0,
            ..FloatingParams::default()
        };
        let mut policy = FloatingPolicy::new(params);
        let u: FloatingUniforms =
            decode(&policy.update_uniforms(&context(64, 0.0), 1.0 / 30.0)).expect("decode");
        assert!((u.drag - (-2.0f32 / 30.0).exp()).abs() < 1e-6);
        assert_eq!(u.delta_time, 1.0 / 30.0);
    }

    #[test]
    fn test_force_range() {
        let params = FloatingParams {
            attractor_force: 4.0,
            force_randomness: 0.25,
            ..FloatingParams::default()
        };
        let policy = FloatingPolicy::new(params);
        let u: FloatingUniforms = decode(&policy.init_uniforms(&context(64, 0.0))).expect("decode");
        assert_eq!(u.force, [3.0, 4.0]);
    }

    #[test]
    fn test_attractor_in_local_space_with_spread() {
        let params = FloatingParams {
            attractor_position: Vec3::new(5.0, 0.0, 0.0),
            attractor_spread: 0.2,
            ..FloatingParams::default()
        };
        let policy = FloatingPolicy::new(params);
        let mut ctx = context(64, 0.0);
        ctx.world_to_local = Affine3A::from_translation(Vec3::new(-1.0, 0.0, 0.0));
        let u: FloatingUniforms = decode(&policy.init_uniforms(&ctx)).expect("decode");
        assert_eq!(u.attractor, [4.0, 0.0, 0.0, 0.2]);
    }

    #[test]
    fn test_noise_offset_seeded_then_advanced_after_tick() {
        let params = FloatingParams {
            noise_motion: 0.5,
            ..FloatingParams::default()
        };
        let mut policy = FloatingPolicy::new(params);
        policy.restart(7);
        assert_eq!(policy.noise_offset(), Vec3::splat(7.0));

        let ctx = context(64, 0.0);
        let u: FloatingUniforms = decode(&policy.update_uniforms(&ctx, 0.02)).expect("decode");
        // The tick sees the offset from before its own advance
        assert_eq!(u.noise_offset, [7.0; 3]);
        policy.after_tick(0.02);
        assert!((policy.noise_offset() - Vec3::splat(7.01)).length() < 1e-5);
    }

    #[test]
    fn test_noise_spread_divided_by_instance_count() {
        let params = FloatingParams {
            noise_spread: 64.0,
            ..FloatingParams::default()
        };
        let policy = FloatingPolicy::new(params);
        let u: FloatingUniforms = decode(&policy.init_uniforms(&context(128, 0.0))).expect("decode");
        assert_eq!(u.noise_spread, 0.5);
    }
}
