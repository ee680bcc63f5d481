use digest::Digest;
use hmac::{Hmac, Mac};
use md4::Md4;
use md5::Md5;
use ntlmssp_core::NtlmError;

/// MD4(bytes) -> 16 bytes.
pub fn md4(bytes: &[u8]) -> [u8; 16] {
    Md4::digest(bytes).into()
}

/// MD5(bytes) -> 16 bytes.
pub fn md5(bytes: &[u8]) -> [u8; 16] {
    Md5::digest(bytes).into()
}

/// HMAC-MD5(key, bytes) -> 16 bytes.
///
/// `key` may be any length; `hmac::Hmac` pads/hashes oversized keys
/// internally per RFC 2104, so this never fails in practice, but a
/// construction failure still surfaces as `CryptoInternal` per spec §4.2
/// ("any primitive returning an error ... surfaces as a single INTERNAL
/// key-derivation error").
pub fn hmac_md5(key: &[u8], bytes: &[u8]) -> Result<[u8; 16], NtlmError> {
    let mut mac = <Hmac<Md5>>::new_from_slice(key)
        .map_err(|e| NtlmError::crypto_internal(format!("hmac-md5 key init: {e}")))?;
    mac.update(bytes);
    Ok(mac.finalize().into_bytes().into())
}
