pub mod backend;
pub mod buffers;
pub mod driver;
pub mod kernel;
pub mod policies;
pub mod policy;
pub mod ring;
pub mod swarm;
pub mod uniforms;

mod noise;

pub use backend::cpu::CpuBackend;
pub use backend::gpu::{KernelSources, WgpuBackend};
pub use backend::ComputeBackend;
pub use buffers::SwarmBuffers;
pub use driver::{DriverSettings, SwarmDriver, TickReport};
pub use kernel::Kernel;
pub use policies::{CrawlingPolicy, FloatingPolicy, SwirlingPolicy};
pub use policy::{PolicyContext, UpdatePolicy};
pub use ring::HistoryRing;
pub use swarm::Swarm;
