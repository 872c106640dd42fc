use swarm_core::constants::VOLUME_CELL_BYTES;

/// Magic bytes identifying a distance-field volume asset.
pub const MAGIC: [u8; 4] = *b"DFVL";

/// Current volume format version.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Payload is LZ4-compressed with the decompressed size prepended.
pub const FLAG_LZ4: u16 = 1 << 0;

/// Every flag bit this version understands.
pub const KNOWN_FLAGS: u16 = FLAG_LZ4;

/// Bytes per stored cell (gradient.xyz, distance as four little-endian f32).
pub const CELL_SIZE: usize = VOLUME_CELL_BYTES as usize;

/// Volume asset header. Fixed 32 bytes, repr(C) for byte-level serialization.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VolumeHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub flags: u16,
    pub resolution: u32,
    pub extent: f32,
    pub cell_count: u32,
    /// Bytes of payload following the header, as stored (compressed or not).
    pub payload_size: u32,
    pub _reserved: [u32; 2],
}

impl VolumeHeader {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_LZ4 != 0
    }

    /// Decompressed payload length implied by `cell_count`.
    pub fn raw_payload_size(&self) -> usize {
        self.cell_count as usize * CELL_SIZE
    }
}
