//! The binary message codec for the three NTLM messages (spec §4.3).

pub mod authenticate;
pub mod av_pair;
pub mod challenge;
pub mod negotiate;
pub mod security_buffer;
pub mod strings;
pub mod version;

pub use authenticate::AuthenticateMessage;
pub use challenge::ChallengeMessage;
pub use negotiate::NegotiateMessage;
pub use version::Version;

use ntlmssp_core::NtlmError;

pub const NTLM_SIGNATURE: &[u8; 8] = b"NTLMSSP\0";
const FIXED_HEADER_SIZE: usize = 12; // signature (8) + message type (4)

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Negotiate = 1,
    Challenge = 2,
    Authenticate = 3,
}

/// Reads and validates the fixed `signature || message_type` header,
/// returning the message type and the bytes that follow it.
///
/// `DECODE_BAD_HEADER` on signature mismatch or an unrecognised type
/// (spec §4.3, "Error conditions").
fn read_header(bytes: &[u8]) -> Result<(MessageType, &[u8]), NtlmError> {
    if bytes.len() < FIXED_HEADER_SIZE {
        return Err(NtlmError::decode_truncated(
            "message shorter than the fixed 12-byte header",
        ));
    }
    if &bytes[0..8] != NTLM_SIGNATURE {
        return Err(NtlmError::decode_bad_header("bad NTLMSSP signature"));
    }
    let message_type = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let message_type = match message_type {
        1 => MessageType::Negotiate,
        2 => MessageType::Challenge,
        3 => MessageType::Authenticate,
        other => {
            return Err(NtlmError::decode_bad_header(format!(
                "unknown message type {other}"
            )))
        }
    };
    Ok((message_type, &bytes[FIXED_HEADER_SIZE..]))
}

fn write_header(out: &mut Vec<u8>, message_type: MessageType) {
    out.extend_from_slice(NTLM_SIGNATURE);
    out.extend_from_slice(&(message_type as u32).to_le_bytes());
}

/// Validates the string-encoding flag combination (spec §4.3,
/// `DECODE_BAD_FLAG_COMBO`: "both OEM and UNICODE cleared").
fn check_encoding_flags(flags: crate::flags::NegotiateFlags) -> Result<(), NtlmError> {
    use crate::flags::NegotiateFlags;
    if !flags.intersects(NegotiateFlags::NEGOTIATE_UNICODE | NegotiateFlags::NEGOTIATE_OEM) {
        Err(NtlmError::decode_bad_flag_combo(
            "neither NEGOTIATE_UNICODE nor NEGOTIATE_OEM is set",
        ))
    } else {
        Ok(())
    }
}

/// The three NTLM protocol messages (spec §2, §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NtlmMessage {
    Negotiate(NegotiateMessage),
    Challenge(ChallengeMessage),
    Authenticate(AuthenticateMessage),
}

impl NtlmMessage {
    pub fn parse(bytes: &[u8]) -> Result<Self, NtlmError> {
        let (message_type, _) = read_header(bytes)?;
        match message_type {
            MessageType::Negotiate => Ok(Self::Negotiate(NegotiateMessage::decode(bytes)?)),
            MessageType::Challenge => Ok(Self::Challenge(ChallengeMessage::decode(bytes)?)),
            MessageType::Authenticate => {
                Ok(Self::Authenticate(AuthenticateMessage::decode(bytes)?))
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Negotiate(m) => m.encode(),
            Self::Challenge(m) => m.encode(),
            Self::Authenticate(m) => m.encode(),
        }
    }
}
