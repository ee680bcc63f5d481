use ntlmssp_core::NtlmError;

use crate::flags::NegotiateFlags;

use super::av_pair::AvPair;
use super::security_buffer::SecurityBuffer;
use super::strings::{decode_string, encode_string};
use super::version::Version;
use super::{read_header, write_header, MessageType};

/// The server's response to a Negotiate message (spec §2, §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeMessage {
    pub target_name: Option<String>,
    pub flags: NegotiateFlags,
    pub server_challenge: [u8; 8],
    pub target_info: Vec<AvPair>,
    pub version: Option<Version>,
}

impl ChallengeMessage {
    pub fn encode(&self) -> Vec<u8> {
        let unicode = self.flags.unicode();
        let target_name_bytes = self
            .target_name
            .as_deref()
            .map(|s| encode_string(s, unicode).unwrap_or_default())
            .unwrap_or_default();
        let target_info_bytes = AvPair::encode_sequence(&self.target_info);

        let version_len = if self.flags.contains(NegotiateFlags::NEGOTIATE_VERSION) {
            8
        } else {
            0
        };
        // header(12) + target_name secbuf(8) + flags(4) + challenge(8) +
        // reserved(8) + target_info secbuf(8) + optional version.
        let fixed_len = 12 + 8 + 4 + 8 + 8 + 8 + version_len;

        let target_name_buf =
            SecurityBuffer::new(target_name_bytes.len() as u16, fixed_len as u32);
        let target_info_buf = SecurityBuffer::new(
            target_info_bytes.len() as u16,
            fixed_len as u32 + target_name_bytes.len() as u32,
        );

        let mut out = Vec::with_capacity(fixed_len + target_name_bytes.len() + target_info_bytes.len());
        write_header(&mut out, MessageType::Challenge);
        out.extend_from_slice(&target_name_buf.write_header());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&self.server_challenge);
        out.extend_from_slice(&[0u8; 8]); // Reserved
        out.extend_from_slice(&target_info_buf.write_header());
        if let Some(version) = self.version {
            out.extend_from_slice(&version.to_bytes());
        }
        out.extend_from_slice(&target_name_bytes);
        out.extend_from_slice(&target_info_bytes);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, NtlmError> {
        let (message_type, rest) = read_header(bytes)?;
        if message_type != MessageType::Challenge {
            return Err(NtlmError::decode_bad_header("not a Challenge message"));
        }
        if rest.len() < 8 + 4 + 8 + 8 + 8 {
            return Err(NtlmError::decode_truncated("Challenge message too short"));
        }
        let (_, target_name_buf) = SecurityBuffer::parse(&rest[0..8])
            .map_err(|_| NtlmError::decode_bad_header("bad target name sec-buf"))?;
        let flags = NegotiateFlags::from_bits_truncate(u32::from_le_bytes(
            rest[8..12].try_into().unwrap(),
        ));
        super::check_encoding_flags(flags)?;
        let server_challenge: [u8; 8] = rest[12..20].try_into().unwrap();
        // rest[20..28] is the reserved field, ignored.
        let (_, target_info_buf) = SecurityBuffer::parse(&rest[28..36])
            .map_err(|_| NtlmError::decode_bad_header("bad target info sec-buf"))?;

        let version = if flags.contains(NegotiateFlags::NEGOTIATE_VERSION) && rest.len() >= 44 {
            Some(Version::from_bytes(&rest[36..44].try_into().unwrap()))
        } else {
            None
        };

        let unicode = flags.unicode();
        let target_name = if target_name_buf.length == 0 {
            None
        } else {
            Some(decode_string(target_name_buf.resolve(bytes)?, unicode))
        };
        let target_info = if target_info_buf.length == 0 {
            Vec::new()
        } else {
            AvPair::decode_sequence(target_info_buf.resolve(bytes)?)?
        };

        Ok(Self {
            target_name,
            flags,
            server_challenge,
            target_info,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_target_info() {
        let msg = ChallengeMessage {
            target_name: Some("DOMAIN".to_string()),
            flags: NegotiateFlags::NEGOTIATE_UNICODE
                | NegotiateFlags::NEGOTIATE_TARGET_INFO
                | NegotiateFlags::NEGOTIATE_EXTENDED_SESSIONSECURITY,
            server_challenge: [0x11; 8],
            target_info: vec![
                AvPair::NbDomainName(b"D\0O\0".to_vec()),
                AvPair::Timestamp(0x01d0_0000_dead_beef),
            ],
            version: None,
        };
        let bytes = msg.encode();
        let decoded = ChallengeMessage::decode(&bytes).unwrap();
        assert_eq!(decoded.target_name, msg.target_name);
        assert_eq!(decoded.server_challenge, msg.server_challenge);
        assert_eq!(decoded.target_info.len(), msg.target_info.len() + 1); // + EOL
    }

    #[test]
    fn round_trips_without_target_info() {
        let msg = ChallengeMessage {
            target_name: None,
            flags: NegotiateFlags::NEGOTIATE_OEM,
            server_challenge: [0xaa; 8],
            target_info: Vec::new(),
            version: None,
        };
        let bytes = msg.encode();
        let decoded = ChallengeMessage::decode(&bytes).unwrap();
        assert_eq!(decoded.server_challenge, msg.server_challenge);
        assert!(decoded.target_info.is_empty());
    }
}
