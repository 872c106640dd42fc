pub mod compat;
pub mod compress;
pub mod error;
pub mod format;
pub mod load;
pub mod save;

pub use error::PersistError;
pub use format::VolumeHeader;
pub use load::{load, load_from_path, LoadedVolume};
pub use save::{save, save_to_path};
