use std::sync::Arc;

use swarm_core::config::CrawlingParams;
use swarm_core::types::SwarmVariant;
use swarm_core::SwarmError;
use swarm_volume::VolumeData;

use crate::kernel::{Kernel, KernelSet};
use crate::policy::{PolicyContext, UpdatePolicy};
use crate::uniforms::CrawlingUniforms;

/// Instances crawl over the zero-crossing of a baked distance field.
#[derive(Debug, Clone)]
pub struct CrawlingPolicy {
    params: CrawlingParams,
    volume: Option<Arc<VolumeData>>,
}

impl CrawlingPolicy {
    pub fn new(params: CrawlingParams, volume: Option<Arc<VolumeData>>) -> Self {
        Self { params, volume }
    }

    pub fn params(&self) -> &CrawlingParams {
        &self.params
    }

    fn uniforms(&self, ctx: &PolicyContext, delta: f32) -> CrawlingUniforms {
        let p = &self.params;
        CrawlingUniforms {
            history: ctx.history,
            random_seed: ctx.random_seed,
            speed: p.speed * delta,
            constraint: p.constraint,
            initial_spread: p.initial_spread,
            noise_frequency: p.noise_frequency,
            noise_spread: p.noise_spread / ctx.history.instance_count.max(1) as f32,
            noise_offset: ctx.time * p.noise_motion,
            volume_extent: self.volume.as_ref().map_or(0.0, |v| v.extent()),
        }
    }
}

impl UpdatePolicy for CrawlingPolicy {
    fn variant(&self) -> SwarmVariant {
        SwarmVariant::Crawling
    }

    fn kernels(&self) -> KernelSet {
        KernelSet {
            init: Some(Kernel::CrawlingInit),
            update: Kernel::CrawlingUpdate,
            reconstruct: Kernel::CrawlingReconstruct,
        }
    }

    fn volume(&self) -> Option<&Arc<VolumeData>> {
        self.volume.as_ref()
    }

    fn validate(&self) -> Result<(), SwarmError> {
        match self.volume {
            Some(_) => Ok(()),
            None => Err(SwarmError::MissingReference("distance-field volume")),
        }
    }

    fn init_uniforms(&self, ctx: &PolicyContext) -> Vec<u8> {
        bytemuck::bytes_of(&self.uniforms(ctx, 0.0)).to_vec()
    }

    fn update_uniforms(&mut self, ctx: &PolicyContext, delta: f32) -> Vec<u8> {
        bytemuck::bytes_of(&self.uniforms(ctx, delta)).to_vec()
    }
}
