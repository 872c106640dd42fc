//! Compute/draw seam between the swarm drivers and a GPU (or a stand-in).
//!
//! Drivers never touch device objects directly: they create buffers by id,
//! resolve [`Kernel`]s to handles once, and record dispatches and indirect
//! draws in order. Ordering between an update dispatch, its reconstruct
//! dispatch and the draw is the order of calls on one backend.

pub mod cpu;
pub mod gpu;

pub(crate) mod reference;

use std::sync::Arc;

use swarm_core::SwarmError;
use swarm_volume::VolumeData;

use crate::kernel::{Kernel, KernelHandle};
use crate::uniforms::DrawUniforms;

/// Opaque buffer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u32);

/// Opaque uploaded-volume id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Per-instance state read and written by kernels.
    Storage,
    /// Indexed indirect draw arguments.
    Indirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: &'static str,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Resources bound to one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    pub positions: BufferId,
    pub velocities: Option<BufferId>,
    pub tangents: BufferId,
    pub normals: BufferId,
    pub volume: Option<VolumeId>,
}

/// One indirect instanced draw of the tube template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRequest {
    pub args: BufferId,
    pub positions: BufferId,
    pub tangents: BufferId,
    pub normals: BufferId,
    pub uniforms: DrawUniforms,
}

pub trait ComputeBackend {
    /// Allocate a zero-initialised buffer. Fails if `size` exceeds what the
    /// device can hold.
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId, SwarmError>;

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), SwarmError>;

    /// Release a buffer. Releasing an unknown id is ignored.
    fn release_buffer(&mut self, id: BufferId);

    fn upload_volume(&mut self, volume: &Arc<VolumeData>) -> Result<VolumeId, SwarmError>;

    fn release_volume(&mut self, id: VolumeId);

    fn resolve_kernel(&mut self, kernel: Kernel) -> Result<KernelHandle, SwarmError>;

    /// Record one dispatch of `groups` workgroups along X.
    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        uniforms: &[u8],
        bindings: &Bindings,
        groups: u32,
    ) -> Result<(), SwarmError>;

    /// Record one indirect instanced draw after every dispatch issued so far.
    fn draw_indirect(&mut self, request: &DrawRequest) -> Result<(), SwarmError>;
}

/// Indexed indirect draw descriptor:
/// `{index_count, instance_count, first_index, base_vertex, first_instance}`.
pub fn draw_args(index_count: u32, instance_count: u32) -> [u32; 5] {
    [index_count, instance_count, 0, 0, 0]
}
