//! Uniform blocks uploaded per dispatch and per draw.
//!
//! Layouts must match the structs in the kernel and tube shaders. Every
//! block leads with [`HistoryUniforms`] so kernels share one prefix.

use swarm_core::gradient::GradientUniforms;

/// Ring geometry for one tick. Offsets are element offsets, not bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HistoryUniforms {
    pub instance_count: u32,
    pub history_length: u32,
    pub offset0: u32,
    pub offset1: u32,
    pub offset2: u32,
    pub index_offset: u32,
    pub _pad: [u32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CrawlingUniforms {
    pub history: HistoryUniforms,
    pub random_seed: u32,
    /// `speed * dt`.
    pub speed: f32,
    pub constraint: f32,
    pub initial_spread: f32,
    pub noise_frequency: f32,
    /// `noise_spread / instance_count`.
    pub noise_spread: f32,
    /// `time * noise_motion`.
    pub noise_offset: f32,
    /// Half-size of the bound distance-field volume.
    pub volume_extent: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FloatingUniforms {
    pub history: HistoryUniforms,
    /// Attractor in swarm-local space, spread in w.
    pub attractor: [f32; 4],
    /// (min, max) per-instance attractor force.
    pub force: [f32; 2],
    /// `exp(-drag * dt)`.
    pub drag: f32,
    pub delta_time: f32,
    pub head_noise_force: f32,
    pub head_noise_frequency: f32,
    pub trail_noise_velocity: f32,
    pub trail_noise_frequency: f32,
    pub noise_offset: [f32; 3],
    /// `noise_spread / instance_count`.
    pub noise_spread: f32,
    pub random_seed: u32,
    pub _pad: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SwirlingUniforms {
    pub history: HistoryUniforms,
    pub noise_offset: [f32; 3],
    pub spread: f32,
    /// `length / segments`.
    pub step_width: f32,
    pub noise_frequency: f32,
    pub random_seed: u32,
    pub _pad: u32,
}

/// Per-draw parameters for the tube shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub local_to_world: [[f32; 4]; 4],
    pub world_to_local: [[f32; 4]; 4],
    pub gradient: GradientUniforms,
    pub radius: f32,
    pub instance_count: u32,
    pub history_length: u32,
    pub index_offset: u32,
    /// `trim * history_length`, truncated.
    pub index_limit: u32,
    pub _pad: [u32; 3],
}

/// Largest uniform block any dispatch or draw uploads.
pub const MAX_UNIFORM_BYTES: usize = std::mem::size_of::<DrawUniforms>();
