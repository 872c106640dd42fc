use std::path::Path;

use swarm_volume::VolumeData;

use crate::compress;
use crate::error::PersistError;
use crate::format::*;

/// Serialize a baked volume into the asset binary format.
///
/// Layout: header (32B) + cell payload, LZ4-compressed when `compress` is set.
pub fn save(volume: &VolumeData, compress: bool) -> Vec<u8> {
    let raw = volume.as_bytes();
    let payload = if compress {
        compress::compress_payload(raw)
    } else {
        raw.to_vec()
    };

    let header = VolumeHeader {
        magic: MAGIC,
        version: FORMAT_VERSION,
        flags: if compress { FLAG_LZ4 } else { 0 },
        resolution: volume.resolution(),
        extent: volume.extent(),
        cell_count: volume.cell_count() as u32,
        payload_size: payload.len() as u32,
        _reserved: [0; 2],
    };

    let mut output = Vec::with_capacity(HEADER_SIZE + payload.len());
    output.extend_from_slice(bytemuck::bytes_of(&header));
    output.extend_from_slice(&payload);
    output
}

/// Serialize and write a volume asset to `path`.
pub fn save_to_path(
    path: impl AsRef<Path>,
    volume: &VolumeData,
    compress: bool,
) -> Result<usize, PersistError> {
    let bytes = save(volume, compress);
    std::fs::write(path.as_ref(), &bytes)?;
    log::info!(
        "Saved volume asset {} ({}^3 cells, {} bytes{})",
        path.as_ref().display(),
        volume.resolution(),
        bytes.len(),
        if compress { ", lz4" } else { "" }
    );
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use swarm_volume::VolumeCell;

    fn flat_volume(resolution: u32) -> VolumeData {
        let cells = vec![VolumeCell::new(Vec3::ZERO, 0.25); (resolution as usize).pow(3)];
        VolumeData::from_cells(resolution, 2.0, cells).expect("valid volume")
    }

    #[test]
    fn test_save_header_fields_correct() {
        let data = save(&flat_volume(3), false);
        let header: VolumeHeader = bytemuck::pod_read_unaligned(&data[..HEADER_SIZE]);
        assert_eq!(header.magic, MAGIC);
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.flags, 0);
        assert_eq!(header.resolution, 3);
        assert_eq!(header.extent, 2.0);
        assert_eq!(header.cell_count, 27);
        assert_eq!(header.payload_size as usize, 27 * CELL_SIZE);
        assert_eq!(data.len(), HEADER_SIZE + 27 * CELL_SIZE);
    }

    #[test]
    fn test_uncompressed_payload_is_little_endian_cells() {
        let data = save(&flat_volume(2), false);
        let w = f32::from_le_bytes(
            data[HEADER_SIZE + 12..HEADER_SIZE + 16]
                .try_into()
                .expect("4-byte slice"),
        );
        assert_eq!(w, 0.25);
    }

    #[test]
    fn test_compressed_flag_and_size() {
        let data = save(&flat_volume(8), true);
        let header: VolumeHeader = bytemuck::pod_read_unaligned(&data[..HEADER_SIZE]);
        assert!(header.is_compressed());
        assert_eq!(header.payload_size as usize, data.len() - HEADER_SIZE);
        assert!(data.len() < HEADER_SIZE + 512 * CELL_SIZE);
    }
}
