use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;
use ntlmssp_core::NtlmError;

/// Expands a 7-byte DES key to the classic 8-byte form by inserting an
/// odd-parity bit after each group of 7 source bits (spec §4.1).
fn extend_des_key(key: &[u8; 7]) -> [u8; 8] {
    let mut result = [0u8; 8];

    result[0] = key[0] >> 1;
    result[1] = ((key[0] & 0x01) << 6) | (key[1] >> 2);
    result[2] = ((key[1] & 0x03) << 5) | (key[2] >> 3);
    result[3] = ((key[2] & 0x07) << 4) | (key[3] >> 4);
    result[4] = ((key[3] & 0x0F) << 3) | (key[4] >> 5);
    result[5] = ((key[4] & 0x1F) << 2) | (key[5] >> 6);
    result[6] = ((key[5] & 0x3F) << 1) | (key[6] >> 7);
    result[7] = key[6] & 0x7F;

    for byte in result.iter_mut() {
        *byte <<= 1;
    }

    result
}

/// Encrypts a single 8-byte block with a 7-byte (56-bit) key.
pub fn des_block(key7: &[u8; 7], block8: &[u8; 8]) -> Result<[u8; 8], NtlmError> {
    let expanded = extend_des_key(key7);
    let des = Des::new_from_slice(&expanded)
        .map_err(|e| NtlmError::crypto_internal(format!("des key expansion: {e}")))?;
    let mut result = *block8;
    des.encrypt_block_b2b(block8.into(), (&mut result).into());
    Ok(result)
}

/// `DESL(K, D)`: pads a 16-byte key to 21 bytes with zeros, splits it into
/// three 7-byte sub-keys, DES-encrypts `D` with each, and concatenates the
/// three 8-byte blocks into a 24-byte response (spec §4.2).
pub fn desl(key16: &[u8; 16], block8: &[u8; 8]) -> Result<[u8; 24], NtlmError> {
    let mut padded = [0u8; 21];
    padded[0..16].copy_from_slice(key16);

    let k1: [u8; 7] = padded[0..7].try_into().unwrap();
    let k2: [u8; 7] = padded[7..14].try_into().unwrap();
    let k3: [u8; 7] = padded[14..21].try_into().unwrap();

    let r1 = des_block(&k1, block8)?;
    let r2 = des_block(&k2, block8)?;
    let r3 = des_block(&k3, block8)?;

    let mut out = [0u8; 24];
    out[0..8].copy_from_slice(&r1);
    out[8..16].copy_from_slice(&r2);
    out[16..24].copy_from_slice(&r3);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lmowfv1_vector() {
        // LMOWFv1("Password") = DES(pw[0..7], "KGS!@#$%") || DES(pw[7..14], "KGS!@#$%")
        let mut password = [0x20u8; 14];
        let src = b"PASSWORD";
        password[0..src.len()].copy_from_slice(src);

        let magic = b"KGS!@#$%";
        let k1: [u8; 7] = password[0..7].try_into().unwrap();
        let k2: [u8; 7] = password[7..14].try_into().unwrap();

        let r1 = des_block(&k1, magic).unwrap();
        let r2 = des_block(&k2, magic).unwrap();

        let mut key = [0u8; 16];
        key[0..8].copy_from_slice(&r1);
        key[8..16].copy_from_slice(&r2);

        assert_eq!(
            key,
            [
                0xe5, 0x2c, 0xac, 0x67, 0x41, 0x9a, 0x9a, 0x22, 0x4a, 0x3b, 0x10, 0x8f, 0x3f, 0xa6,
                0xcb, 0x6d
            ]
        );
    }
}
