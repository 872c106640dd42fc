pub mod config;
pub mod constants;
pub mod error;
pub mod gradient;
pub mod math;
pub mod types;

pub use error::SwarmError;
pub use gradient::CosineGradient;
