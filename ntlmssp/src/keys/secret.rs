use std::ops::Deref;

use ntlmssp_core::NtlmError;
use zeroize::Zeroizing;

/// An opaque fixed-size secret: 0, 8, or 16 bytes (spec §3). Zeroised on
/// drop; the zero-length case models "absent" (e.g. an LMv1 response that
/// was never computed because a caller opted out of LM compatibility).
#[derive(Clone)]
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self, NtlmError> {
        match bytes.len() {
            0 | 8 | 16 => Ok(Self(Zeroizing::new(bytes))),
            other => Err(NtlmError::crypto_internal(format!(
                "secret key length must be 0, 8, or 16 bytes, got {other}"
            ))),
        }
    }

    pub fn empty() -> Self {
        Self(Zeroizing::new(Vec::new()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for SecretKey {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 16]> for SecretKey {
    fn from(value: [u8; 16]) -> Self {
        Self(Zeroizing::new(value.to_vec()))
    }
}

impl From<[u8; 8]> for SecretKey {
    fn from(value: [u8; 8]) -> Self {
        Self(Zeroizing::new(value.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_lengths() {
        assert!(SecretKey::new(vec![0u8; 3]).is_err());
        assert!(SecretKey::new(vec![0u8; 8]).is_ok());
        assert!(SecretKey::new(vec![0u8; 16]).is_ok());
        assert!(SecretKey::new(Vec::new()).is_ok());
    }
}
