//! Single source of truth for shared constants.
//! Values that the compute kernels also depend on are injected into the
//! WGSL preamble by the wgpu backend.

/// Threads per compute workgroup. Instance counts are floored to a multiple of this.
pub const THREAD_GROUP_WIDTH: u32 = 64;

/// Fixed number of bisection steps per distance probe.
pub const PROBE_ITERATIONS: u32 = 10;

/// Smallest grid resolution the sampler accepts.
pub const MIN_RESOLUTION: u32 = 2;

/// Largest grid resolution the sampler accepts (256^3 cells = 256 MB of f32x4).
pub const MAX_RESOLUTION: u32 = 256;

/// Tube template segment bounds.
pub const MIN_SEGMENTS: u32 = 4;
pub const MAX_SEGMENTS: u32 = 4096;

/// Tube template ring division bounds.
pub const MIN_DIVISIONS: u32 = 2;
pub const MAX_DIVISIONS: u32 = 64;

/// Bytes per history element (vec4<f32>, w unused).
pub const HISTORY_ELEMENT_BYTES: u64 = 16;

/// Bytes per baked volume cell (gradient.xyz, distance).
pub const VOLUME_CELL_BYTES: u64 = 16;

/// Number of u32 words in an indexed indirect draw descriptor.
pub const DRAW_ARGS_WORDS: usize = 5;

/// Number of ring slots a kernel can address in one tick (offset0..offset2).
pub const HISTORY_TAPS: u32 = 3;

/// Largest frame step the crawling variant integrates in one tick.
pub const CRAWLING_MAX_DELTA: f32 = 1.0 / 15.0;

/// Largest frame step the floating variant integrates in one tick.
pub const FLOATING_MAX_DELTA: f32 = 1.0 / 30.0;

/// Largest frame step the swirling variant advances its noise field in one tick.
pub const SWIRLING_MAX_DELTA: f32 = 1.0 / 30.0;
