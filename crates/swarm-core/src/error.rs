use thiserror::Error;

/// Errors that can occur while setting up or driving a swarm.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("missing required reference: {0}")]
    MissingReference(&'static str),

    #[error("GPU buffer allocation failed: {0}")]
    BufferAllocation(String),

    #[error("access of {len} bytes at offset {offset} overruns buffer {id} ({size} bytes)")]
    BufferOverrun {
        id: u32,
        offset: u64,
        len: u64,
        size: u64,
    },

    #[error("compute kernel {0} is not available on this backend")]
    KernelUnavailable(&'static str),

    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    #[error("unknown GPU resource handle {0}")]
    UnknownResource(u32),

    #[error("uniform block size mismatch: expected {expected} bytes, got {actual}")]
    InvalidUniforms { expected: usize, actual: usize },

    #[error("swarm driver has not been initialized")]
    NotInitialized,
}
