//! wgpu backend.
//!
//! Kernels are WGSL modules, one per [`Kernel`], either the built-in set or
//! a directory of overrides, each prefixed with a constants preamble. Every
//! compute pipeline shares one bind group layout:
//!
//! | binding | resource                                   |
//! |---------|--------------------------------------------|
//! | 0       | uniform block (dynamic offset into a ring)  |
//! | 1       | positions (storage, read_write)             |
//! | 2       | velocities (storage, read_write)            |
//! | 3       | tangents (storage, read_write)              |
//! | 4       | normals (storage, read_write)               |
//! | 5       | distance-field volume (`texture_3d<f32>`)   |
//! | 6       | non-filtering sampler                       |
//!
//! Slots a dispatch does not use are bound to small dummies. Dispatches are
//! recorded into one lazily-created encoder and go to the queue on
//! [`WgpuBackend::submit`]. Draws are kept until the caller's render pass
//! calls [`WgpuBackend::encode_draws`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use swarm_core::constants::{HISTORY_TAPS, THREAD_GROUP_WIDTH, VOLUME_CELL_BYTES};
use swarm_core::SwarmError;
use swarm_volume::VolumeData;

use super::{BufferDesc, BufferId, BufferUsage, Bindings, ComputeBackend, DrawRequest, VolumeId};
use crate::kernel::{Kernel, KernelHandle};
use crate::uniforms::DrawUniforms;

/// Bytes reserved per uniform block; also the dynamic offset alignment.
pub const UNIFORM_STRIDE: u64 = 256;

/// Uniform blocks that fit in the ring before an implicit submit.
const UNIFORM_RING_SLOTS: u64 = 64;

/// WGSL source for each kernel.
#[derive(Debug, Clone, Default)]
pub struct KernelSources {
    sources: HashMap<Kernel, String>,
}

impl KernelSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kernel: Kernel, source: impl Into<String>) {
        self.sources.insert(kernel, source.into());
    }

    pub fn get(&self, kernel: Kernel) -> Option<&str> {
        self.sources.get(&kernel).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Kernels shipped with the crate.
    pub fn builtin() -> Self {
        let mut sources = Self::new();
        for (kernel, body) in BUILTIN_KERNELS {
            sources.insert(kernel, format!("{}\n{}", COMMON_WGSL, body));
        }
        sources
    }

    /// Read `<file_stem>.wgsl` for every kernel present in `dir`, each
    /// prefixed with `common.wgsl` when the directory has one.
    /// Missing files are skipped; the kernel then fails to resolve.
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let common_path = dir.join("common.wgsl");
        let common = if common_path.is_file() {
            std::fs::read_to_string(&common_path)?
        } else {
            String::new()
        };

        let mut sources = Self::new();
        for kernel in Kernel::ALL {
            let path = dir.join(format!("{}.wgsl", kernel.file_stem()));
            if path.is_file() {
                let body = std::fs::read_to_string(&path)?;
                let source = if common.is_empty() {
                    body
                } else {
                    format!("{}\n{}", common, body)
                };
                sources.insert(kernel, source);
                log::debug!("KernelSources: loaded {}", path.display());
            }
        }
        log::info!(
            "KernelSources: {} of {} kernels found in {}",
            sources.len(),
            Kernel::ALL.len(),
            dir.display()
        );
        Ok(sources)
    }
}

const COMMON_WGSL: &str = include_str!("../../../../shaders/swarm/common.wgsl");

const BUILTIN_KERNELS: [(Kernel, &str); 8] = [
    (Kernel::CrawlingInit, include_str!("../../../../shaders/swarm/crawling_init.wgsl")),
    (Kernel::CrawlingUpdate, include_str!("../../../../shaders/swarm/crawling_update.wgsl")),
    (
        Kernel::CrawlingReconstruct,
        include_str!("../../../../shaders/swarm/crawling_reconstruct.wgsl"),
    ),
    (Kernel::FloatingInit, include_str!("../../../../shaders/swarm/floating_init.wgsl")),
    (Kernel::FloatingUpdate, include_str!("../../../../shaders/swarm/floating_update.wgsl")),
    (
        Kernel::FloatingReconstruct,
        include_str!("../../../../shaders/swarm/floating_reconstruct.wgsl"),
    ),
    (Kernel::SwirlingUpdate, include_str!("../../../../shaders/swarm/swirling_update.wgsl")),
    (
        Kernel::SwirlingReconstruct,
        include_str!("../../../../shaders/swarm/swirling_reconstruct.wgsl"),
    ),
];

/// Constants shared with every kernel module.
fn constants_preamble() -> String {
    format!(
        "const THREAD_GROUP_WIDTH: u32 = {}u;\nconst HISTORY_TAPS: u32 = {}u;\n",
        THREAD_GROUP_WIDTH, HISTORY_TAPS,
    )
}

struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

struct GpuVolume {
    view: wgpu::TextureView,
    texture: wgpu::Texture,
}

struct PendingDraw {
    bind_group: wgpu::BindGroup,
    // Owned per draw; the dispatch ring may be recycled before the draw is
    // encoded.
    _uniforms: wgpu::Buffer,
    args: BufferId,
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    sources: KernelSources,
    compute_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    render_layout: wgpu::BindGroupLayout,
    uniform_ring: wgpu::Buffer,
    uniform_cursor: u64,
    dummy_storage: wgpu::Buffer,
    dummy_volume: GpuVolume,
    sampler: wgpu::Sampler,
    pipelines: Vec<(Kernel, wgpu::ComputePipeline)>,
    buffers: HashMap<u32, GpuBuffer>,
    volumes: HashMap<u32, GpuVolume>,
    next_id: u32,
    encoder: Option<wgpu::CommandEncoder>,
    pending_draws: Vec<PendingDraw>,
}

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(
    visibility: wgpu::ShaderStages,
    dynamic: bool,
    min_size: u64,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: wgpu::BufferSize::new(min_size),
        },
        count: None,
    }
}

fn create_volume_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    resolution: u32,
    texels: &[u8],
) -> GpuVolume {
    let size = wgpu::Extent3d {
        width: resolution,
        height: resolution,
        depth_or_array_layers: resolution,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D3,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        texels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(resolution * VOLUME_CELL_BYTES as u32),
            rows_per_image: Some(resolution),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuVolume {
        view,
        texture,
    }
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, sources: KernelSources) -> Self {
        let compute = wgpu::ShaderStages::COMPUTE;
        let compute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("swarm-compute-bind-group-layout"),
            entries: &[
                uniform_entry(compute, true, UNIFORM_STRIDE),
                storage_entry(1, compute, false),
                storage_entry(2, compute, false),
                storage_entry(3, compute, false),
                storage_entry(4, compute, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 5,
                    visibility: compute,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 6,
                    visibility: compute,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("swarm-compute-pipeline-layout"),
            bind_group_layouts: &[&compute_layout],
            push_constant_ranges: &[],
        });

        let vertex = wgpu::ShaderStages::VERTEX;
        let render_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("swarm-render-bind-group-layout"),
            entries: &[
                uniform_entry(
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    false,
                    std::mem::size_of::<DrawUniforms>() as u64,
                ),
                storage_entry(1, vertex, true),
                storage_entry(2, vertex, true),
                storage_entry(3, vertex, true),
            ],
        });

        let uniform_ring = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("swarm-uniform-ring"),
            size: UNIFORM_STRIDE * UNIFORM_RING_SLOTS,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let dummy_storage = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("swarm-dummy-storage"),
            size: 16,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        let dummy_volume = create_volume_texture(
            &device,
            &queue,
            "swarm-dummy-volume",
            1,
            &[0u8; VOLUME_CELL_BYTES as usize],
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("swarm-volume-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            device,
            queue,
            sources,
            compute_layout,
            pipeline_layout,
            render_layout,
            uniform_ring,
            uniform_cursor: 0,
            dummy_storage,
            dummy_volume,
            sampler,
            pipelines: Vec::new(),
            buffers: HashMap::new(),
            volumes: HashMap::new(),
            next_id: 1,
            encoder: None,
            pending_draws: Vec::new(),
        }
    }

    /// Layout the caller's tube render pipeline must use for group 0:
    /// draw uniforms (one buffer per draw) then positions, tangents and
    /// normals.
    pub fn render_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.render_layout
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Buffer behind an id, e.g. for a readback copy.
    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(&id.0).map(|b| &b.buffer)
    }

    /// Submit every dispatch recorded so far and recycle the uniform ring.
    /// Pending draws keep their own uniforms and survive this.
    pub fn submit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
        self.uniform_cursor = 0;
    }

    /// Record every pending draw into `pass` with `pipeline`, oldest first.
    pub fn encode_draws(&mut self, pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline) {
        if self.pending_draws.is_empty() {
            return;
        }
        pass.set_pipeline(pipeline);
        for draw in self.pending_draws.drain(..) {
            let Some(args) = self.buffers.get(&draw.args.0) else {
                log::warn!("WgpuBackend: draw args buffer {} released before draw", draw.args.0);
                continue;
            };
            pass.set_bind_group(0, &draw.bind_group, &[]);
            pass.draw_indexed_indirect(&args.buffer, 0);
        }
    }

    /// Drop pending draws without recording them. For headless runs.
    pub fn discard_draws(&mut self) -> usize {
        let count = self.pending_draws.len();
        self.pending_draws.clear();
        count
    }

    /// Block until the queue has drained.
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Stage one uniform block and return its dynamic offset.
    fn push_uniforms(&mut self, bytes: &[u8]) -> Result<u32, SwarmError> {
        if bytes.len() as u64 > UNIFORM_STRIDE {
            return Err(SwarmError::InvalidUniforms {
                expected: UNIFORM_STRIDE as usize,
                actual: bytes.len(),
            });
        }
        if self.uniform_cursor + UNIFORM_STRIDE > UNIFORM_STRIDE * UNIFORM_RING_SLOTS {
            self.submit();
        }
        let mut block = [0u8; UNIFORM_STRIDE as usize];
        block[..bytes.len()].copy_from_slice(bytes);
        let offset = self.uniform_cursor;
        self.queue.write_buffer(&self.uniform_ring, offset, &block);
        self.uniform_cursor += UNIFORM_STRIDE;
        Ok(offset as u32)
    }

    fn storage(&self, id: BufferId) -> Result<&wgpu::Buffer, SwarmError> {
        self.buffers
            .get(&id.0)
            .map(|b| &b.buffer)
            .ok_or(SwarmError::UnknownResource(id.0))
    }

    fn uniform_binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.uniform_ring,
            offset: 0,
            size: wgpu::BufferSize::new(UNIFORM_STRIDE),
        })
    }

    fn compile(&self, kernel: Kernel) -> Result<wgpu::ComputePipeline, SwarmError> {
        let body = self
            .sources
            .get(kernel)
            .ok_or(SwarmError::KernelUnavailable(kernel.entry_point()))?;
        let source = format!("{}\n{}", constants_preamble(), body);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(kernel.file_stem()),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(kernel.entry_point()),
            layout: Some(&self.pipeline_layout),
            module: &module,
            entry_point: Some(kernel.entry_point()),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(SwarmError::ShaderCompilationFailed(format!(
                "{}: {}",
                kernel.entry_point(),
                error
            )));
        }
        log::debug!("WgpuBackend: compiled {}", kernel.entry_point());
        Ok(pipeline)
    }
}

impl ComputeBackend for WgpuBackend {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferId, SwarmError> {
        let limits = self.device.limits();
        let over_storage_limit = desc.usage == BufferUsage::Storage
            && desc.size > limits.max_storage_buffer_binding_size as u64;
        if desc.size > limits.max_buffer_size || over_storage_limit {
            return Err(SwarmError::BufferAllocation(format!(
                "{} needs {} bytes, device allows {} (storage binding {})",
                desc.label, desc.size, limits.max_buffer_size, limits.max_storage_buffer_binding_size
            )));
        }
        let usage = match desc.usage {
            BufferUsage::Storage => {
                wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC
            }
            BufferUsage::Indirect => wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size,
            usage,
            mapped_at_creation: false,
        });
        let id = self.next_id;
        self.next_id += 1;
        self.buffers.insert(
            id,
            GpuBuffer {
                buffer,
                size: desc.size,
            },
        );
        Ok(BufferId(id))
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), SwarmError> {
        let buffer = self
            .buffers
            .get(&id.0)
            .ok_or(SwarmError::UnknownResource(id.0))?;
        // Copies must be a multiple of 4 bytes.
        let len = (data.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if offset + len > buffer.size {
            return Err(SwarmError::BufferOverrun {
                id: id.0,
                offset,
                len: data.len() as u64,
                size: buffer.size,
            });
        }
        if len == data.len() as u64 {
            self.queue.write_buffer(&buffer.buffer, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(len as usize, 0);
            self.queue.write_buffer(&buffer.buffer, offset, &padded);
        }
        Ok(())
    }

    fn release_buffer(&mut self, id: BufferId) {
        match self.buffers.remove(&id.0) {
            Some(buffer) => buffer.buffer.destroy(),
            None => log::warn!("WgpuBackend: release of unknown buffer {}", id.0),
        }
    }

    fn upload_volume(&mut self, volume: &Arc<VolumeData>) -> Result<VolumeId, SwarmError> {
        let limit = self.device.limits().max_texture_dimension_3d;
        if volume.resolution() > limit {
            return Err(SwarmError::BufferAllocation(format!(
                "volume resolution {} exceeds 3D texture limit {}",
                volume.resolution(),
                limit
            )));
        }
        let gpu = create_volume_texture(
            &self.device,
            &self.queue,
            "swarm-volume",
            volume.resolution(),
            volume.as_bytes(),
        );
        let id = self.next_id;
        self.next_id += 1;
        self.volumes.insert(id, gpu);
        Ok(VolumeId(id))
    }

    fn release_volume(&mut self, id: VolumeId) {
        match self.volumes.remove(&id.0) {
            Some(volume) => volume.texture.destroy(),
            None => log::warn!("WgpuBackend: release of unknown volume {}", id.0),
        }
    }

    fn resolve_kernel(&mut self, kernel: Kernel) -> Result<KernelHandle, SwarmError> {
        if let Some(index) = self.pipelines.iter().position(|(k, _)| *k == kernel) {
            return Ok(KernelHandle(index as u32));
        }
        let pipeline = self.compile(kernel)?;
        self.pipelines.push((kernel, pipeline));
        Ok(KernelHandle((self.pipelines.len() - 1) as u32))
    }

    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        uniforms: &[u8],
        bindings: &Bindings,
        groups: u32,
    ) -> Result<(), SwarmError> {
        if kernel.0 as usize >= self.pipelines.len() {
            return Err(SwarmError::UnknownResource(kernel.0));
        }
        let uniform_offset = self.push_uniforms(uniforms)?;

        let volume_view = match bindings.volume {
            Some(id) => {
                &self
                    .volumes
                    .get(&id.0)
                    .ok_or(SwarmError::UnknownResource(id.0))?
                    .view
            }
            None => &self.dummy_volume.view,
        };
        let velocities = match bindings.velocities {
            Some(id) => self.storage(id)?,
            None => &self.dummy_storage,
        };
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("swarm-compute-bind-group"),
            layout: &self.compute_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.storage(bindings.positions)?.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: velocities.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.storage(bindings.tangents)?.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.storage(bindings.normals)?.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(volume_view),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let (kernel_id, pipeline) = &self.pipelines[kernel.0 as usize];
        let device = &self.device;
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("swarm-compute-encoder"),
            })
        });
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel_id.entry_point()),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[uniform_offset]);
        pass.dispatch_workgroups(groups, 1, 1);
        Ok(())
    }

    fn draw_indirect(&mut self, request: &DrawRequest) -> Result<(), SwarmError> {
        if !self.buffers.contains_key(&request.args.0) {
            return Err(SwarmError::UnknownResource(request.args.0));
        }
        let uniforms = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("swarm-draw-uniforms"),
            contents: bytemuck::bytes_of(&request.uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("swarm-render-bind-group"),
            layout: &self.render_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.storage(request.positions)?.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.storage(request.tangents)?.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.storage(request.normals)?.as_entire_binding(),
                },
            ],
        });
        self.pending_draws.push(PendingDraw {
            bind_group,
            _uniforms: uniforms,
            args: request.args,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_carries_group_width() {
        let preamble = constants_preamble();
        assert!(preamble.contains("const THREAD_GROUP_WIDTH: u32 = 64u;"));
        assert!(preamble.contains("const HISTORY_TAPS: u32 = 3u;"));
    }

    #[test]
    fn test_sources_from_dir_skips_missing() {
        let dir = std::env::temp_dir().join(format!("swarm-kernels-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        std::fs::write(dir.join("swirling_update.wgsl"), "// update").expect("write");
        std::fs::write(dir.join("unrelated.wgsl"), "// ignored").expect("write");

        let sources = KernelSources::from_dir(&dir).expect("read dir");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources.get(Kernel::SwirlingUpdate), Some("// update"));
        assert!(sources.get(Kernel::SwirlingReconstruct).is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sources_from_dir_prepends_common() {
        let dir = std::env::temp_dir().join(format!("swarm-kernels-common-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        std::fs::write(dir.join("common.wgsl"), "// common").expect("write");
        std::fs::write(dir.join("floating_init.wgsl"), "// init").expect("write");

        let sources = KernelSources::from_dir(&dir).expect("read dir");
        assert_eq!(sources.get(Kernel::FloatingInit), Some("// common\n// init"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_builtin_sources_cover_every_kernel() {
        let sources = KernelSources::builtin();
        assert_eq!(sources.len(), Kernel::ALL.len());
        for kernel in Kernel::ALL {
            let source = sources.get(kernel).expect("builtin kernel");
            assert!(source.contains(&format!("fn {}(", kernel.entry_point())));
            assert!(source.contains("struct History {"));
        }
    }

    /// Headless device, or None on machines without an adapter.
    fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None)).ok()
    }

    #[test]
    fn test_pending_draws_survive_uniform_ring_recycling() {
        let Some((device, queue)) = headless_device() else {
            eprintln!("no wgpu adapter, skipping");
            return;
        };
        let mut backend = WgpuBackend::new(Arc::new(device), Arc::new(queue), KernelSources::new());
        let storage = |backend: &mut WgpuBackend, label| {
            backend
                .create_buffer(&BufferDesc {
                    label,
                    size: 1024,
                    usage: BufferUsage::Storage,
                })
                .expect("storage buffer")
        };
        let positions = storage(&mut backend, "positions");
        let tangents = storage(&mut backend, "tangents");
        let normals = storage(&mut backend, "normals");
        let args = backend
            .create_buffer(&BufferDesc {
                label: "args",
                size: 20,
                usage: BufferUsage::Indirect,
            })
            .expect("args buffer");

        let draws = UNIFORM_RING_SLOTS as usize + 8;
        for _ in 0..draws {
            backend
                .draw_indirect(&DrawRequest {
                    args,
                    positions,
                    tangents,
                    normals,
                    uniforms: bytemuck::Zeroable::zeroed(),
                })
                .expect("draw");
        }
        // Draws leave the dispatch ring alone
        assert_eq!(backend.uniform_cursor, 0);

        // Filling the ring forces a recycle; recorded draws are kept
        for _ in 0..=UNIFORM_RING_SLOTS {
            backend.push_uniforms(&[1u8; 64]).expect("push");
        }
        assert_eq!(backend.uniform_cursor, UNIFORM_STRIDE);
        assert_eq!(backend.pending_draws.len(), draws);
        for draw in &backend.pending_draws {
            assert_eq!(
                draw._uniforms.size(),
                std::mem::size_of::<DrawUniforms>() as u64
            );
        }
        assert_eq!(backend.discard_draws(), draws);
    }

    #[test]
    fn test_uniform_stride_fits_largest_block() {
        assert!(crate::uniforms::MAX_UNIFORM_BYTES as u64 <= UNIFORM_STRIDE);
    }
}
