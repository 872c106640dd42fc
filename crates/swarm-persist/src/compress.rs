use crate::error::PersistError;

/// Compress a cell payload using LZ4 (size-prepended block).
pub fn compress_payload(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

/// Decompress an LZ4-compressed payload, validating the output size.
///
/// The size prefix is checked against `expected` before anything is
/// allocated.
pub fn decompress_payload(compressed: &[u8], expected: usize) -> Result<Vec<u8>, PersistError> {
    let Some((prefix, body)) = compressed.split_first_chunk::<4>() else {
        return Err(PersistError::DecompressError(format!(
            "payload of {} bytes has no size prefix",
            compressed.len()
        )));
    };
    let declared = u32::from_le_bytes(*prefix) as usize;
    if declared != expected {
        return Err(PersistError::InvalidPayloadSize {
            expected,
            actual: declared,
        });
    }

    let mut decompressed = vec![0u8; expected];
    let written = lz4_flex::block::decompress_into(body, &mut decompressed)
        .map_err(|e| PersistError::DecompressError(e.to_string()))?;
    if written != expected {
        return Err(PersistError::InvalidPayloadSize {
            expected,
            actual: written,
        });
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompress_validates_length() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let compressed = compress_payload(&data);
        assert_eq!(
            decompress_payload(&compressed, data.len()).expect("decompress"),
            data
        );
        assert!(matches!(
            decompress_payload(&compressed, 100),
            Err(PersistError::InvalidPayloadSize {
                expected: 100,
                actual: 4096
            })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let result = decompress_payload(&[1, 2], 16);
        assert!(matches!(result, Err(PersistError::DecompressError(_))));
    }

    #[test]
    fn test_oversized_prefix_rejected_before_allocating() {
        let mut crafted = u32::MAX.to_le_bytes().to_vec();
        crafted.extend_from_slice(&[0x10, 0x00]);
        assert!(matches!(
            decompress_payload(&crafted, 64),
            Err(PersistError::InvalidPayloadSize {
                expected: 64,
                actual
            }) if actual == u32::MAX as usize
        ));
    }

    #[test]
    fn test_short_body_rejected() {
        let data = vec![7u8; 1024];
        let compressed = compress_payload(&data);
        let truncated = &compressed[..compressed.len() / 2];
        assert!(decompress_payload(truncated, data.len()).is_err());
    }

    #[test]
    fn test_smooth_field_compresses() {
        // Constant cells, as in the far field of a bake
        let cell: [u8; 16] = bytemuck::cast([0.0f32, 0.0, 0.0, 0.5]);
        let data: Vec<u8> = cell.iter().copied().cycle().take(16 * 4096).collect();
        let compressed = compress_payload(&data);
        assert!(compressed.len() < data.len() / 10);
    }
}
