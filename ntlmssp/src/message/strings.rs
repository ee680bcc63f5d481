use ntlmssp_core::NtlmError;

use crate::crypto::{utf16le_to_utf8, utf8_to_utf16le};

/// Encodes `s` per the negotiated string encoding (spec §4.3, "String
/// encoding rule"): UTF-16LE when Unicode is negotiated, otherwise OEM
/// (codepage-437-compatible 8-bit). Only the ASCII subset of CP437 is
/// modelled, which is what every caller in practice needs for
/// domain/user/workstation names.
pub fn encode_string(s: &str, unicode: bool) -> Result<Vec<u8>, NtlmError> {
    if unicode {
        Ok(utf8_to_utf16le(s))
    } else if s.is_ascii() {
        Ok(s.as_bytes().to_vec())
    } else {
        Err(NtlmError::decode_bad_flag_combo(
            "OEM encoding requires an ASCII string",
        ))
    }
}

/// Decodes a wire string per the negotiated encoding.
pub fn decode_string(bytes: &[u8], unicode: bool) -> String {
    if unicode {
        utf16le_to_utf8(bytes)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
