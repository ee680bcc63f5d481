//! The exported context token (spec §6): an opaque, self-describing byte
//! string that lets an established session be handed off to another
//! process or persisted across a restart.

use ntlmssp_core::NtlmError;

use crate::flags::NegotiateFlags;

use super::signseal::{DirectionState, SignSealSession};

const VERSION: u32 = 1;
const RC4_STATE_SIZE: usize = 256 + 1 + 1;
const DIRECTION_STATE_SIZE: usize = 16 + 16 + 4 + RC4_STATE_SIZE;

/// An established session exported as an opaque byte string (spec §6,
/// "Exported context token"). Carries everything needed to resume wrapping,
/// unwrapping, signing, and verifying without redoing the handshake.
pub struct ExportedContext {
    pub flags: NegotiateFlags,
    pub exported_session_key: [u8; 16],
    pub sign_seal: SignSealSession,
    pub channel_bindings_digest: Option<[u8; 16]>,
}

impl ExportedContext {
    pub fn encode(&self) -> Vec<u8> {
        let (outgoing, incoming) = self.sign_seal.export_raw();

        let mut out = Vec::with_capacity(4 + 4 + 16 + 2 * DIRECTION_STATE_SIZE + 1 + 16);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&self.exported_session_key);
        encode_direction(&mut out, &outgoing);
        encode_direction(&mut out, &incoming);
        match self.channel_bindings_digest {
            Some(digest) => {
                out.push(1);
                out.extend_from_slice(&digest);
            }
            None => out.push(0),
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, NtlmError> {
        if bytes.len() < 4 {
            return Err(NtlmError::decode_truncated("exported context token version tag"));
        }
        let version = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if version != VERSION {
            return Err(NtlmError::decode_bad_header(format!(
                "unrecognised exported context token version {version}"
            )));
        }

        let min_len = 4 + 4 + 16 + 2 * DIRECTION_STATE_SIZE + 1;
        if bytes.len() < min_len {
            return Err(NtlmError::decode_truncated("exported context token body"));
        }

        let mut cursor = 4;
        let flags = NegotiateFlags::from_bits_retain(u32::from_le_bytes(
            bytes[cursor..cursor + 4].try_into().unwrap(),
        ));
        cursor += 4;

        let exported_session_key: [u8; 16] = bytes[cursor..cursor + 16].try_into().unwrap();
        cursor += 16;

        let outgoing = decode_direction(&bytes[cursor..cursor + DIRECTION_STATE_SIZE]);
        cursor += DIRECTION_STATE_SIZE;
        let incoming = decode_direction(&bytes[cursor..cursor + DIRECTION_STATE_SIZE]);
        cursor += DIRECTION_STATE_SIZE;

        let has_bindings = bytes[cursor];
        cursor += 1;
        let channel_bindings_digest = match has_bindings {
            0 => None,
            1 => {
                if bytes.len() < cursor + 16 {
                    return Err(NtlmError::decode_truncated(
                        "exported context token channel bindings digest",
                    ));
                }
                Some(bytes[cursor..cursor + 16].try_into().unwrap())
            }
            other => {
                return Err(NtlmError::decode_bad_header(format!(
                    "invalid channel bindings presence byte {other}"
                )))
            }
        };

        Ok(Self {
            flags,
            exported_session_key,
            sign_seal: SignSealSession::from_raw(flags, outgoing, incoming),
            channel_bindings_digest,
        })
    }
}

fn encode_direction(out: &mut Vec<u8>, state: &DirectionState) {
    out.extend_from_slice(&state.sign_key);
    out.extend_from_slice(&state.seal_key);
    out.extend_from_slice(&state.seq_num.to_le_bytes());
    out.extend_from_slice(&state.rc4_sbox);
    out.push(state.rc4_i);
    out.push(state.rc4_j);
}

fn decode_direction(bytes: &[u8]) -> DirectionState {
    let sign_key: [u8; 16] = bytes[0..16].try_into().unwrap();
    let seal_key: [u8; 16] = bytes[16..32].try_into().unwrap();
    let seq_num = u32::from_le_bytes(bytes[32..36].try_into().unwrap());
    let rc4_sbox: [u8; 256] = bytes[36..292].try_into().unwrap();
    let rc4_i = bytes[292];
    let rc4_j = bytes[293];
    DirectionState {
        sign_key,
        seal_key,
        seq_num,
        rc4_sbox,
        rc4_i,
        rc4_j,
    }
}
