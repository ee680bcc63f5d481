use crc::{Crc, CRC_32_ISO_HDLC};

const STANDARD: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC32(bytes) -> 4 bytes LE, used by the pre-ESS ("v1") sign/seal
/// checksum (spec §4.1, §4.4).
pub fn crc32(bytes: &[u8]) -> [u8; 4] {
    STANDARD.checksum(bytes).to_le_bytes()
}
