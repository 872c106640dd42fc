pub mod job;
pub mod occupancy;
pub mod sampler;
pub mod slice;
pub mod volume;

pub use job::{BakeJob, JobError};
pub use occupancy::{Collider, ColliderScene, OccupancyQuery};
pub use sampler::{compute_gradients, VolumeSampler};
pub use slice::{extract_slice, SliceMode};
pub use volume::{VolumeCell, VolumeData, VolumeError};
