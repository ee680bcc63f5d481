use crate::byte_helper::u16_to_bytes;

/// Encodes a UTF-8 string as UTF-16LE with no byte-order mark.
pub fn utf8_to_utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .flat_map(|unit| u16_to_bytes(unit))
        .collect()
}

/// Decodes a UTF-16LE byte buffer (no BOM expected) into a UTF-8 `String`,
/// using the Unicode replacement character for unpaired surrogates.
pub fn utf16le_to_utf8(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Uppercases a UTF-16LE buffer using Unicode simple uppercase, not a
/// locale-sensitive mapping.
pub fn upper_utf16le(bytes: &[u8]) -> Vec<u8> {
    let s = utf16le_to_utf8(bytes);
    utf8_to_utf16le(&s.to_uppercase())
}
