use ntlmssp_core::NtlmError;

use crate::crypto::{des_block, md4, upper_utf16le, utf8_to_utf16le};

/// `LMOWFv1(password)`: uppercased, null-padded ASCII password (at most 14
/// chars) split into two 7-byte DES keys, each encrypting the fixed magic
/// block `"KGS!@#$%"` (spec §4.2).
pub fn lmowf_v1(password: &str) -> Result<[u8; 16], NtlmError> {
    if !password.is_ascii() {
        return Err(NtlmError::crypto_internal(
            "LMOWFv1 requires an ASCII password",
        ));
    }
    let upper = password.to_ascii_uppercase();
    let mut padded = [0x00u8; 14];
    let bytes = upper.as_bytes();
    let take = bytes.len().min(14);
    padded[0..take].copy_from_slice(&bytes[0..take]);
    if bytes.len() > 14 {
        // MS-NLMP truncates rather than failing; callers with longer
        // passwords get the NTLMv1-disabled path in practice (LM_COMPAT_LEVEL >= 1).
    }

    const MAGIC: &[u8; 8] = b"KGS!@#$%";
    let k1: [u8; 7] = padded[0..7].try_into().unwrap();
    let k2: [u8; 7] = padded[7..14].try_into().unwrap();

    let r1 = des_block(&k1, MAGIC)?;
    let r2 = des_block(&k2, MAGIC)?;

    let mut out = [0u8; 16];
    out[0..8].copy_from_slice(&r1);
    out[8..16].copy_from_slice(&r2);
    Ok(out)
}

/// `NTOWFv1(password)`: MD4 of the UTF-16LE password (spec §4.2).
pub fn ntowf_v1(password: &str) -> [u8; 16] {
    md4(&utf8_to_utf16le(password))
}

/// `NTOWFv2(NTOWFv1, user, domain)`:
/// `HMAC-MD5(NTOWFv1, UPPER(user) || domain)` in UTF-16LE (spec §4.2).
pub fn ntowf_v2(ntowf_v1: &[u8; 16], user: &str, domain: &str) -> Result<[u8; 16], NtlmError> {
    let user_utf16 = utf8_to_utf16le(user);
    let user_upper = upper_utf16le(&user_utf16);
    let mut message = user_upper;
    message.extend_from_slice(&utf8_to_utf16le(domain));
    crate::crypto::hmac_md5(ntowf_v1, &message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lmowfv1_vector() {
        let key = lmowf_v1("Password").unwrap();
        assert_eq!(
            key,
            [
                0xe5, 0x2c, 0xac, 0x67, 0x41, 0x9a, 0x9a, 0x22, 0x4a, 0x3b, 0x10, 0x8f, 0x3f, 0xa6,
                0xcb, 0x6d
            ]
        );
    }

    #[test]
    fn ntowfv1_vector() {
        let key = ntowf_v1("Password");
        assert_eq!(
            key,
            [
                0xa4, 0xf4, 0x9c, 0x40, 0x65, 0x10, 0xbd, 0xca, 0xb6, 0x82, 0x4e, 0xe7, 0xc3, 0x0f,
                0xd8, 0x52
            ]
        );
    }
}
