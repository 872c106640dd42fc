//! Host-side backend: runs the reference kernels on plain vectors and keeps a
//! record of every dispatch and draw. Used by tests and headless runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use swarm_core::constants::HISTORY_ELEMENT_BYTES;
use swarm_core::SwarmError;
use swarm_volume::VolumeData;

use super::reference::{self, KernelIo};
use super::{BufferDesc, BufferId, BufferUsage, Bindings, ComputeBackend, DrawRequest, VolumeId};
use crate::kernel::{Kernel, KernelHandle};
use crate::uniforms::{DrawUniforms, HistoryUniforms};

/// Default per-buffer size limit, matching the wgpu default `max_buffer_size`.
pub const DEFAULT_MAX_BUFFER_SIZE: u64 = 256 << 20;

struct CpuBuffer {
    label: &'static str,
    usage: BufferUsage,
    size: u64,
    data: Vec<[f32; 4]>,
}

/// One recorded dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub kernel: Kernel,
    pub groups: u32,
    pub uniforms: Vec<u8>,
}

/// One recorded indirect draw, with the argument block as read at draw time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRecord {
    pub args: [u32; 5],
    pub uniforms: DrawUniforms,
}

pub struct CpuBackend {
    buffers: HashMap<u32, CpuBuffer>,
    volumes: HashMap<u32, Arc<VolumeData>>,
    kernels: Vec<Kernel>,
    available: HashSet<Kernel>,
    max_buffer_size: u64,
    next_id: u32,
    dispatches: Vec<DispatchRecord>,
    draws: Vec<DrawRecord>,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    /// Backend with every kernel available and the default size limit.
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            volumes: HashMap::new(),
            kernels: Vec::new(),
            available: Kernel::ALL.into_iter().collect(),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            next_id: 1,
            dispatches: Vec::new(),
            draws: Vec::new(),
        }
    }

    pub fn with_max_buffer_size(mut self, max_buffer_size: u64) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// Restrict the kernels this backend can resolve.
    pub fn with_kernels(mut self, kernels: &[Kernel]) -> Self {
        self.available = kernels.iter().copied().collect();
        self
    }

    pub fn dispatches(&self) -> &[DispatchRecord] {
        &self.dispatches
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn clear_records(&mut self) {
        self.dispatches.clear();
        self.draws.clear();
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_volumes(&self) -> usize {
        self.volumes.len()
    }

    /// Total bytes held by live buffers.
    pub fn allocated_bytes(&self) -> u64 {
        self.buffers.values().map(|b| b.size).sum()
    }

    /// Buffer contents as 16-byte elements.
    pub fn buffer(&self, id: BufferId) -> Option<&[[f32; 4]]> {
        self.buffers.get(&id.0).map(|b| b.data.as_slice())
    }

    /// Label the buffer was created with.
    pub fn buffer_label(&self, id: BufferId) -> Option<&'static str> {
        self.buffers.get(&id.0).map(|b| b.label)
    }

    fn read_args(&self, id: BufferId) -> Result<[u32; 5], SwarmError> {
        let buffer = self
            .buffers
            .get(&id.0)
            .ok_or(SwarmError::UnknownResource(id.0))?;
        if buffer.usage != BufferUsage::Indirect || buffer.size < 20 {
            return Err(SwarmError::BufferOverrun {
                id: id.0,
                offset: 0,
                len: 20,
                size: buffer.size,
            });
        }
        let bytes: &[u8] = bytemuck::cast_slice(&buffer.data);
        Ok(bytemuck::pod_read_unaligned(&bytes[..20]))
    }

    fn require(&self, id: BufferId, elements: u64) -> Result<(), SwarmError> {
        let buffer = self
            .buffers
            .get(&id.0)
            .ok_or(SwarmError::UnknownResource(id.0))?;
        let needed = elements * HISTORY_ELEMENT_BYTES;
        if buffer.size < needed {
            return Err(SwarmError::BufferOverrun {
                id: id.0,
                offset: 0,
                len: needed,
                size: buffer.size,
            });
        }
        Ok(())
    }

    fn take(&mut self, id: BufferId) -> Vec<[f32; 4]> {
        self.buffers
            .get_mut(&id.0)
            .map(|b| std::mem::take(&mut b.data))
            .unwrap_or_default()
    }

    fn restore(&mut self, id: BufferId, data: Vec<[f32; 4]>) {
        if let Some(buffer) = self.buffers.get_mut(&id.0) {
            buffer.data = data;
        }
    }
}

impl ComputeBackend for CpuBackend {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId, SwarmError> {
        if desc.size > self.max_buffer_size {
            return Err(SwarmError::BufferAllocation(format!(
                "{} needs {} bytes, limit is {}",
                desc.label, desc.size, self.max_buffer_size
            )));
        }
        let id = self.next_id;
        self.next_id += 1;
        let elements = desc.size.div_ceil(HISTORY_ELEMENT_BYTES) as usize;
        self.buffers.insert(
            id,
            CpuBuffer {
                label: desc.label,
                usage: desc.usage,
                size: desc.size,
                data: vec![[0.0; 4]; elements],
            },
        );
        Ok(BufferId(id))
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), SwarmError> {
        let buffer = self
            .buffers
            .get_mut(&id.0)
            .ok_or(SwarmError::UnknownResource(id.0))?;
        let end = offset + data.len() as u64;
        if end > buffer.size {
            return Err(SwarmError::BufferOverrun {
                id: id.0,
                offset,
                len: data.len() as u64,
                size: buffer.size,
            });
        }
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut buffer.data);
        bytes[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn release_buffer(&mut self, id: BufferId) {
        if self.buffers.remove(&id.0).is_none() {
            log::warn!("CpuBackend: release of unknown buffer {}", id.0);
        }
    }

    fn upload_volume(&mut self, volume: &Arc<VolumeData>) -> Result<VolumeId, SwarmError> {
        let id = self.next_id;
        self.next_id += 1;
        self.volumes.insert(id, Arc::clone(volume));
        Ok(VolumeId(id))
    }

    fn release_volume(&mut self, id: VolumeId) {
        if self.volumes.remove(&id.0).is_none() {
            log::warn!("CpuBackend: release of unknown volume {}", id.0);
        }
    }

    fn resolve_kernel(&mut self, kernel: Kernel) -> Result<KernelHandle, SwarmError> {
        if !self.available.contains(&kernel) {
            return Err(SwarmError::KernelUnavailable(kernel.entry_point()));
        }
        let index = match self.kernels.iter().position(|&k| k == kernel) {
            Some(index) => index,
            None => {
                self.kernels.push(kernel);
                self.kernels.len() - 1
            }
        };
        Ok(KernelHandle(index as u32))
    }

    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        uniforms: &[u8],
        bindings: &Bindings,
        groups: u32,
    ) -> Result<(), SwarmError> {
        let kernel_id = *self
            .kernels
            .get(kernel.0 as usize)
            .ok_or(SwarmError::UnknownResource(kernel.0))?;

        let history: HistoryUniforms = reference::decode(uniforms)?;
        let elements = history.instance_count as u64 * history.history_length as u64;
        self.require(bindings.positions, elements)?;
        self.require(bindings.tangents, elements)?;
        self.require(bindings.normals, elements)?;
        if let Some(velocities) = bindings.velocities {
            self.require(velocities, history.instance_count as u64)?;
        }
        let volume = match bindings.volume {
            Some(id) => Some(Arc::clone(
                self.volumes
                    .get(&id.0)
                    .ok_or(SwarmError::UnknownResource(id.0))?,
            )),
            None => None,
        };

        self.dispatches.push(DispatchRecord {
            kernel: kernel_id,
            groups,
            uniforms: uniforms.to_vec(),
        });

        let mut positions = self.take(bindings.positions);
        let mut tangents = self.take(bindings.tangents);
        let mut normals = self.take(bindings.normals);
        let mut velocities = bindings.velocities.map(|id| self.take(id));

        let result = reference::run(
            kernel_id,
            uniforms,
            KernelIo {
                positions: &mut positions,
                velocities: velocities.as_deref_mut(),
                tangents: &mut tangents,
                normals: &mut normals,
                volume: volume.as_deref(),
            },
            groups,
        );

        self.restore(bindings.positions, positions);
        self.restore(bindings.tangents, tangents);
        self.restore(bindings.normals, normals);
        if let (Some(id), Some(data)) = (bindings.velocities, velocities) {
            self.restore(id, data);
        }
        result
    }

    fn draw_indirect(&mut self, request: &DrawRequest) -> Result<(), SwarmError> {
        let args = self.read_args(request.args)?;
        for id in [request.positions, request.tangents, request.normals] {
            if !self.buffers.contains_key(&id.0) {
                return Err(SwarmError::UnknownResource(id.0));
            }
        }
        self.draws.push(DrawRecord {
            args,
            uniforms: request.uniforms,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(size: u64) -> BufferDesc {
        BufferDesc {
            label: "test-storage",
            size,
            usage: BufferUsage::Storage,
        }
    }

    #[test]
    fn test_create_write_release() {
        let mut backend = CpuBackend::new();
        let id = backend.create_buffer(&storage(64)).expect("create");
        backend
            .write_buffer(id, 16, bytemuck::cast_slice(&[1.0f32, 2.0, 3.0, 4.0]))
            .expect("write");
        let data = backend.buffer(id).expect("live buffer");
        assert_eq!(data.len(), 4);
        assert_eq!(data[1], [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(data[0], [0.0; 4]);
        assert_eq!(backend.allocated_bytes(), 64);

        backend.release_buffer(id);
        assert_eq!(backend.live_buffers(), 0);
        // Second release is ignored
        backend.release_buffer(id);
    }

    #[test]
    fn test_write_overrun_rejected() {
        let mut backend = CpuBackend::new();
        let id = backend.create_buffer(&storage(16)).expect("create");
        let result = backend.write_buffer(id, 8, &[0u8; 16]);
        assert!(matches!(result, Err(SwarmError::BufferOverrun { .. })));
    }

    #[test]
    fn test_size_limit_is_allocation_failure() {
        let mut backend = CpuBackend::new().with_max_buffer_size(1024);
        let result = backend.create_buffer(&storage(2048));
        assert!(matches!(result, Err(SwarmError::BufferAllocation(_))));
    }

    #[test]
    fn test_resolve_is_stable_and_filtered() {
        let mut backend = CpuBackend::new().with_kernels(&[Kernel::SwirlingUpdate]);
        let a = backend.resolve_kernel(Kernel::SwirlingUpdate).expect("resolve");
        let b = backend.resolve_kernel(Kernel::SwirlingUpdate).expect("resolve");
        assert_eq!(a, b);
        assert!(matches!(
            backend.resolve_kernel(Kernel::CrawlingInit),
            Err(SwarmError::KernelUnavailable("CrawlingInit"))
        ));
    }

    #[test]
    fn test_dispatch_unknown_handle() {
        let mut backend = CpuBackend::new();
        let id = backend.create_buffer(&storage(16)).expect("create");
        let bindings = Bindings {
            positions: id,
            velocities: None,
            tangents: id,
            normals: id,
            volume: None,
        };
        let result = backend.dispatch(KernelHandle(9), &[0u8; 64], &bindings, 1);
        assert!(matches!(result, Err(SwarmError::UnknownResource(9))));
    }

    #[test]
    fn test_draw_reads_args_block() {
        let mut backend = CpuBackend::new();
        let args = backend
            .create_buffer(&BufferDesc {
                label: "test-args",
                size: 20,
                usage: BufferUsage::Indirect,
            })
            .expect("create");
        backend
            .write_buffer(args, 0, bytemuck::cast_slice(&[36u32, 64, 0, 0, 0]))
            .expect("write");
        let store = backend.create_buffer(&storage(16)).expect("create");
        let request = DrawRequest {
            args,
            positions: store,
            tangents: store,
            normals: store,
            uniforms: bytemuck::Zeroable::zeroed(),
        };
        backend.draw_indirect(&request).expect("draw");
        assert_eq!(backend.draws()[0].args, [36, 64, 0, 0, 0]);
    }
}
