use std::path::Path;

use swarm_volume::{VolumeCell, VolumeData};

use crate::compat;
use crate::compress;
use crate::error::PersistError;
use crate::format::*;

/// Parsed volume asset.
pub struct LoadedVolume {
    pub header: VolumeHeader,
    pub volume: VolumeData,
    /// Compatibility warnings (e.g., unknown flag bits).
    pub warnings: Vec<String>,
}

/// Load and parse a volume asset from raw bytes.
pub fn load(bytes: &[u8]) -> Result<LoadedVolume, PersistError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PersistError::FileTooSmall(bytes.len(), HEADER_SIZE));
    }

    let header: VolumeHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
    let warnings = compat::validate_header(&header)?;

    let payload_end = HEADER_SIZE + header.payload_size as usize;
    if bytes.len() < payload_end {
        return Err(PersistError::TruncatedFile {
            expected: payload_end,
            actual: bytes.len(),
        });
    }
    let stored = &bytes[HEADER_SIZE..payload_end];

    let expected = header.raw_payload_size();
    let raw = if header.is_compressed() {
        compress::decompress_payload(stored, expected)?
    } else if stored.len() != expected {
        return Err(PersistError::InvalidPayloadSize {
            expected,
            actual: stored.len(),
        });
    } else {
        stored.to_vec()
    };

    let cells: Vec<VolumeCell> = raw
        .chunks_exact(CELL_SIZE)
        .map(bytemuck::pod_read_unaligned)
        .collect();
    let volume = VolumeData::from_cells(header.resolution, header.extent, cells)?;

    for warning in &warnings {
        log::warn!("{}", warning);
    }

    Ok(LoadedVolume {
        header,
        volume,
        warnings,
    })
}

/// Read and parse a volume asset from `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<LoadedVolume, PersistError> {
    let bytes = std::fs::read(path.as_ref())?;
    let loaded = load(&bytes)?;
    log::info!(
        "Loaded volume asset {} ({}^3 cells, extent {})",
        path.as_ref().display(),
        loaded.header.resolution,
        loaded.header.extent
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save;
    use glam::Vec3;
    use swarm_core::math::grid_index;

    fn patterned_volume(resolution: u32) -> VolumeData {
        let mut cells = vec![VolumeCell::default(); (resolution as usize).pow(3)];
        for z in 0..resolution {
            for y in 0..resolution {
                for x in 0..resolution {
                    cells[grid_index(resolution, x, y, z)] = VolumeCell::new(
                        Vec3::new(x as f32, -(y as f32), z as f32 * 0.5),
                        (x + y * 3 + z * 7) as f32 * 0.01,
                    );
                }
            }
        }
        VolumeData::from_cells(resolution, 0.75, cells).expect("valid volume")
    }

    #[test]
    fn test_save_load_preserves_cells() {
        let volume = patterned_volume(5);
        for compress in [false, true] {
            let saved = save::save(&volume, compress);
            let loaded = load(&saved).expect("load should succeed");
            assert_eq!(loaded.volume, volume);
            assert!(loaded.warnings.is_empty());
            assert_eq!(loaded.header.is_compressed(), compress);
        }
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut data = save::save(&patterned_volume(2), false);
        data[0..4].copy_from_slice(b"NOPE");
        assert!(matches!(load(&data), Err(PersistError::InvalidMagic)));
    }

    #[test]
    fn test_file_too_small_rejected() {
        let result = load(&[0u8; 10]);
        assert!(matches!(result, Err(PersistError::FileTooSmall(10, 32))));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut data = save::save(&patterned_volume(3), true);
        data.truncate(data.len() - 4);
        assert!(matches!(
            load(&data),
            Err(PersistError::TruncatedFile { .. })
        ));
    }

    #[test]
    fn test_uncompressed_size_mismatch_rejected() {
        let mut data = save::save(&patterned_volume(2), false);
        // Claim one cell fewer than stored
        let short = (7 * CELL_SIZE) as u32;
        data[20..24].copy_from_slice(&short.to_le_bytes());
        assert!(matches!(
            load(&data),
            Err(PersistError::InvalidPayloadSize {
                expected: 128,
                actual: 112
            })
        ));
    }

    #[test]
    fn test_path_roundtrip() {
        let path = std::env::temp_dir().join(format!(
            "swarm_persist_test_{}.dfv",
            std::process::id()
        ));
        let volume = patterned_volume(4);
        let written = save::save_to_path(&path, &volume, true).expect("write");
        assert!(written > HEADER_SIZE);
        let loaded = load_from_path(&path).expect("read");
        assert_eq!(loaded.volume, volume);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_from_path("/nonexistent/dir/volume.dfv");
        assert!(matches!(result, Err(PersistError::Io(_))));
    }
}
