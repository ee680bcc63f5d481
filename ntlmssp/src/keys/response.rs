use ntlmssp_core::NtlmError;

use crate::crypto::{desl, hmac_md5, md4, md5};
use crate::flags::NegotiateFlags;

/// `LMv1 response(ResponseKeyLM, server_chal, client_chal, use_ess)` (spec §4.2).
///
/// Under ESS the 24-byte buffer is `client_chal || 16 zero bytes`; otherwise
/// it's `DESL(ResponseKeyLM, server_chal)`.
pub fn lmv1_response(
    response_key_lm: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
    use_ess: bool,
) -> Result<[u8; 24], NtlmError> {
    if use_ess {
        let mut out = [0u8; 24];
        out[0..8].copy_from_slice(client_challenge);
        Ok(out)
    } else {
        desl(response_key_lm, server_challenge)
    }
}

/// `NTv1 response(ResponseKeyNT, server_chal, client_chal, use_ess)` (spec §4.2).
pub fn ntv1_response(
    response_key_nt: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
    use_ess: bool,
) -> Result<[u8; 24], NtlmError> {
    if use_ess {
        let mut combined = [0u8; 16];
        combined[0..8].copy_from_slice(server_challenge);
        combined[8..16].copy_from_slice(client_challenge);
        let digest = md5(&combined);
        let session_nonce_hash: [u8; 8] = digest[0..8].try_into().unwrap();
        desl(response_key_nt, &session_nonce_hash)
    } else {
        desl(response_key_nt, server_challenge)
    }
}

/// `LMv2 response(ResponseKeyNTv2, server_chal, client_chal)` -> 24 bytes
/// (spec §4.2): `HMAC-MD5(key, server_chal || client_chal) || client_chal`.
pub fn lmv2_response(
    response_key_ntv2: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
) -> Result<[u8; 24], NtlmError> {
    let mut message = Vec::with_capacity(16);
    message.extend_from_slice(server_challenge);
    message.extend_from_slice(client_challenge);
    let hmac = hmac_md5(response_key_ntv2, &message)?;

    let mut out = [0u8; 24];
    out[0..16].copy_from_slice(&hmac);
    out[16..24].copy_from_slice(client_challenge);
    Ok(out)
}

/// `NTv2 response(ResponseKeyNTv2, server_chal, client_chal, time, target_info)`
/// (spec §4.2). Returns `NTProofStr || temp`.
///
/// `temp = 0x01, 0x01, six zero bytes, time(8 LE), client_chal, four zero
/// bytes, target_info, four zero bytes`.
pub fn ntv2_response(
    response_key_ntv2: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
    time: u64,
    target_info: &[u8],
) -> Result<Vec<u8>, NtlmError> {
    let mut temp = Vec::with_capacity(28 + target_info.len());
    temp.push(0x01);
    temp.push(0x01);
    temp.extend_from_slice(&[0u8; 6]);
    temp.extend_from_slice(&time.to_le_bytes());
    temp.extend_from_slice(client_challenge);
    temp.extend_from_slice(&[0u8; 4]);
    temp.extend_from_slice(target_info);
    temp.extend_from_slice(&[0u8; 4]);

    let mut proof_input = Vec::with_capacity(8 + temp.len());
    proof_input.extend_from_slice(server_challenge);
    proof_input.extend_from_slice(&temp);
    let nt_proof_str = hmac_md5(response_key_ntv2, &proof_input)?;

    let mut out = Vec::with_capacity(16 + temp.len());
    out.extend_from_slice(&nt_proof_str);
    out.extend_from_slice(&temp);
    Ok(out)
}

/// `SessionBaseKey v1 = MD4(ResponseKeyNT)` (spec §4.2).
pub fn session_base_key_v1(response_key_nt: &[u8; 16]) -> [u8; 16] {
    md4(response_key_nt)
}

/// `SessionBaseKey v2 = HMAC-MD5(ResponseKeyNTv2, NTProofStr)` (spec §4.2).
pub fn session_base_key_v2(
    response_key_ntv2: &[u8; 16],
    nt_proof_str: &[u8; 16],
) -> Result<[u8; 16], NtlmError> {
    hmac_md5(response_key_ntv2, nt_proof_str)
}

/// `KXKEY` dispatch (spec §4.2): chooses among ESS/NonNtSessionKey/LmKey/plain
/// based on the negotiated flag set.
///
/// The `LmKey` branch is exercised only by legacy interop, not by any
/// MS-NLMP §4.2 vector; its DES key construction is preserved verbatim per
/// spec §9's open question rather than "improved".
pub fn key_exchange_key(
    flags: NegotiateFlags,
    session_base_key: &[u8; 16],
    lm_response: &[u8],
    response_key_lm: &[u8; 16],
    server_challenge: &[u8; 8],
) -> Result<[u8; 16], NtlmError> {
    if flags.ess() {
        let mut message = Vec::with_capacity(16);
        message.extend_from_slice(server_challenge);
        message.extend_from_slice(&lm_response[0..8.min(lm_response.len())]);
        hmac_md5(session_base_key, &message)
    } else if flags.contains(NegotiateFlags::REQUEST_NON_NT_SESSION_KEY) {
        des_ecb_kxkey(response_key_lm, lm_response, 0xBD)
    } else if flags.contains(NegotiateFlags::NEGOTIATE_LM_KEY) {
        des_ecb_kxkey(response_key_lm, lm_response, 0xBD)
    } else {
        Ok(*session_base_key)
    }
}

/// The DES-ECB construction shared by the `NonNtSessionKey`/`LmKey`
/// branches of KXKEY (MS-NLMP §3.4.5.1): a key built from the first 8
/// bytes of ResponseKeyLM (second half padded with a fixed byte) encrypts
/// the first 8 bytes of the LM response.
fn des_ecb_kxkey(
    response_key_lm: &[u8; 16],
    lm_response: &[u8],
    pad_byte: u8,
) -> Result<[u8; 16], NtlmError> {
    let mut k1 = [0u8; 7];
    k1.copy_from_slice(&response_key_lm[0..7]);
    let mut k2 = [0u8; 7];
    k2[0] = response_key_lm[7];
    k2[1..].fill(pad_byte);

    let mut block = [0u8; 8];
    let take = lm_response.len().min(8);
    block[0..take].copy_from_slice(&lm_response[0..take]);

    let r1 = crate::crypto::des_block(&k1, &block)?;
    let r2 = crate::crypto::des_block(&k2, &block)?;

    let mut out = [0u8; 16];
    out[0..8].copy_from_slice(&r1);
    out[8..16].copy_from_slice(&r2);
    Ok(out)
}
