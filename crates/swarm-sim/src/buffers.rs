use std::sync::Arc;

use swarm_core::constants::{DRAW_ARGS_WORDS, HISTORY_ELEMENT_BYTES};
use swarm_core::SwarmError;
use swarm_volume::VolumeData;

use crate::backend::{
    draw_args, Bindings, BufferDesc, BufferId, BufferUsage, ComputeBackend, VolumeId,
};
use crate::ring::HistoryRing;

/// Byte size of the indexed indirect draw block.
pub const DRAW_ARGS_SIZE: u64 = (DRAW_ARGS_WORDS * 4) as u64;

/// Every device resource one swarm owns.
///
/// Created once at initialise and released exactly once by
/// [`release`](Self::release), which consumes the set. Sizes never change in
/// between.
#[derive(Debug)]
pub struct SwarmBuffers {
    draw_args: BufferId,
    positions: BufferId,
    velocities: Option<BufferId>,
    tangents: BufferId,
    normals: BufferId,
    volume: Option<VolumeId>,
}

impl SwarmBuffers {
    /// Allocate the draw block and history channels, write the draw arguments
    /// and upload `volume` if given.
    ///
    /// On failure everything allocated so far is released again.
    pub fn allocate(
        backend: &mut dyn ComputeBackend,
        ring: &HistoryRing,
        index_count: u32,
        uses_velocity: bool,
        volume: Option<&Arc<VolumeData>>,
    ) -> Result<Self, SwarmError> {
        let mut created: Vec<BufferId> = Vec::new();
        let result = Self::allocate_into(
            backend,
            ring,
            index_count,
            uses_velocity,
            volume,
            &mut created,
        );
        if result.is_err() {
            for id in created {
                backend.release_buffer(id);
            }
        }
        result
    }

    fn allocate_into(
        backend: &mut dyn ComputeBackend,
        ring: &HistoryRing,
        index_count: u32,
        uses_velocity: bool,
        volume: Option<&Arc<VolumeData>>,
        created: &mut Vec<BufferId>,
    ) -> Result<Self, SwarmError> {
        let channel = ring.channel_bytes();
        let mut create = |label: &'static str, size: u64, usage: BufferUsage| {
            let id = backend.create_buffer(&BufferDesc { label, size, usage })?;
            created.push(id);
            Ok::<_, SwarmError>(id)
        };

        let draw_args_id = create("swarm-draw-args", DRAW_ARGS_SIZE, BufferUsage::Indirect)?;
        let positions = create("swarm-positions", channel, BufferUsage::Storage)?;
        let tangents = create("swarm-tangents", channel, BufferUsage::Storage)?;
        let normals = create("swarm-normals", channel, BufferUsage::Storage)?;
        let velocities = if uses_velocity {
            let bytes = ring.instance_count() as u64 * HISTORY_ELEMENT_BYTES;
            Some(create("swarm-velocities", bytes, BufferUsage::Storage)?)
        } else {
            None
        };

        let args = draw_args(index_count, ring.instance_count());
        backend.write_buffer(draw_args_id, 0, bytemuck::cast_slice(&args))?;

        let volume = match volume {
            Some(v) => Some(backend.upload_volume(v)?),
            None => None,
        };

        log::info!(
            "SwarmBuffers: {} instances x {} slots, {} KB per channel{}{}",
            ring.instance_count(),
            ring.history_length(),
            channel / 1024,
            if uses_velocity { ", velocities" } else { "" },
            if volume.is_some() { ", volume" } else { "" },
        );

        Ok(Self {
            draw_args: draw_args_id,
            positions,
            velocities,
            tangents,
            normals,
            volume,
        })
    }

    pub fn draw_args(&self) -> BufferId {
        self.draw_args
    }

    pub fn positions(&self) -> BufferId {
        self.positions
    }

    pub fn velocities(&self) -> Option<BufferId> {
        self.velocities
    }

    pub fn tangents(&self) -> BufferId {
        self.tangents
    }

    pub fn normals(&self) -> BufferId {
        self.normals
    }

    pub fn volume(&self) -> Option<VolumeId> {
        self.volume
    }

    /// Dispatch bindings for this set.
    pub fn bindings(&self) -> Bindings {
        Bindings {
            positions: self.positions,
            velocities: self.velocities,
            tangents: self.tangents,
            normals: self.normals,
            volume: self.volume,
        }
    }

    pub fn release(self, backend: &mut dyn ComputeBackend) {
        backend.release_buffer(self.draw_args);
        backend.release_buffer(self.positions);
        backend.release_buffer(self.tangents);
        backend.release_buffer(self.normals);
        if let Some(id) = self.velocities {
            backend.release_buffer(id);
        }
        if let Some(id) = self.volume {
            backend.release_volume(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::cpu::CpuBackend;
    use swarm_volume::VolumeCell;

    #[test]
    fn test_allocate_sizes_and_args() {
        let mut backend = CpuBackend::new();
        let ring = HistoryRing::new(1001, 16);
        let buffers =
            SwarmBuffers::allocate(&mut backend, &ring, 612, true, None).expect("allocate");

        assert_eq!(backend.live_buffers(), 5);
        let channel = 960 * 17 * 16;
        assert_eq!(
            backend.allocated_bytes(),
            DRAW_ARGS_SIZE + 3 * channel + 960 * 16
        );
        let args: &[u8] = bytemuck::cast_slice(backend.buffer(buffers.draw_args()).expect("args"));
        let words: [u32; 5] = bytemuck::pod_read_unaligned(&args[..20]);
        assert_eq!(words, [612, 960, 0, 0, 0]);

        buffers.release(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_volume_uploaded_and_released() {
        let mut backend = CpuBackend::new();
        let ring = HistoryRing::new(64, 4);
        let volume = Arc::new(
            VolumeData::from_cells(2, 1.0, vec![VolumeCell::default(); 8]).expect("volume"),
        );
        let buffers = SwarmBuffers::allocate(&mut backend, &ring, 36, false, Some(&volume))
            .expect("allocate");
        assert!(buffers.volume().is_some());
        assert!(buffers.velocities().is_none());
        assert_eq!(backend.live_volumes(), 1);
        buffers.release(&mut backend);
        assert_eq!(backend.live_volumes(), 0);
    }

    #[test]
    fn test_failed_allocation_leaves_nothing_behind() {
        // Room for the draw block but not for a history channel
        let mut backend = CpuBackend::new().with_max_buffer_size(1024);
        let ring = HistoryRing::new(4096, 256);
        let result = SwarmBuffers::allocate(&mut backend, &ring, 36, true, None);
        assert!(matches!(result, Err(SwarmError::BufferAllocation(_))));
        assert_eq!(backend.live_buffers(), 0);
    }
}
