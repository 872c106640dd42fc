use crate::error::PersistError;
use crate::format::{VolumeHeader, FORMAT_VERSION, KNOWN_FLAGS, MAGIC};

/// Validate a volume header and return any compatibility warnings.
///
/// Returns Ok(warnings) on success, Err on fatal errors.
/// Unknown flag bits produce a warning, not an error.
pub fn validate_header(header: &VolumeHeader) -> Result<Vec<String>, PersistError> {
    if header.magic != MAGIC {
        return Err(PersistError::InvalidMagic);
    }

    if header.version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(header.version));
    }

    let expected_cells = (header.resolution as u64).pow(3);
    if header.resolution < 2 || header.cell_count as u64 != expected_cells {
        return Err(PersistError::CellCountMismatch {
            resolution: header.resolution,
            cell_count: header.cell_count,
        });
    }

    let mut warnings = Vec::new();

    let unknown = header.flags & !KNOWN_FLAGS;
    if unknown != 0 {
        warnings.push(format!(
            "Volume header carries unknown flag bits {unknown:#06x}; they are ignored."
        ));
    }

    if header.extent.is_nan() || header.extent <= 0.0 {
        warnings.push(format!(
            "Volume extent {} is not positive; lookups will be degenerate.",
            header.extent
        ));
    }

    Ok(warnings)
}
