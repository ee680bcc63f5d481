use ntlmssp_core::NtlmError;

use crate::flags::NegotiateFlags;

use super::security_buffer::SecurityBuffer;
use super::strings::{decode_string, encode_string};
use super::version::Version;
use super::{read_header, write_header, MessageType};

/// The first message an initiator sends (spec §2, §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiateMessage {
    pub flags: NegotiateFlags,
    pub domain_name: Option<String>,
    pub workstation: Option<String>,
    pub version: Option<Version>,
}

impl NegotiateMessage {
    pub fn encode(&self) -> Vec<u8> {
        let unicode = self.flags.unicode();
        let domain_bytes = self
            .domain_name
            .as_deref()
            .map(|s| encode_string(s, unicode).unwrap_or_default())
            .unwrap_or_default();
        let workstation_bytes = self
            .workstation
            .as_deref()
            .map(|s| encode_string(s, unicode).unwrap_or_default())
            .unwrap_or_default();

        // Fixed part: header(12) + flags(4) + domain sec-buf(8) +
        // workstation sec-buf(8) + optional version(8).
        let version_len = if self.flags.contains(NegotiateFlags::NEGOTIATE_VERSION) {
            8
        } else {
            0
        };
        let fixed_len = 12 + 4 + 8 + 8 + version_len;

        let domain_buf = SecurityBuffer::new(domain_bytes.len() as u16, fixed_len as u32);
        let workstation_buf = SecurityBuffer::new(
            workstation_bytes.len() as u16,
            fixed_len as u32 + domain_bytes.len() as u32,
        );

        let mut out = Vec::with_capacity(fixed_len + domain_bytes.len() + workstation_bytes.len());
        write_header(&mut out, MessageType::Negotiate);
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&domain_buf.write_header());
        out.extend_from_slice(&workstation_buf.write_header());
        if let Some(version) = self.version {
            out.extend_from_slice(&version.to_bytes());
        }
        out.extend_from_slice(&domain_bytes);
        out.extend_from_slice(&workstation_bytes);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, NtlmError> {
        let (message_type, rest) = read_header(bytes)?;
        if message_type != MessageType::Negotiate {
            return Err(NtlmError::decode_bad_header("not a Negotiate message"));
        }
        if rest.len() < 4 + 8 + 8 {
            return Err(NtlmError::decode_truncated("Negotiate message too short"));
        }
        let flags = NegotiateFlags::from_bits_truncate(u32::from_le_bytes(
            rest[0..4].try_into().unwrap(),
        ));
        super::check_encoding_flags(flags)?;
        let (_, domain_buf) =
            SecurityBuffer::parse(&rest[4..12]).map_err(|_| NtlmError::decode_bad_header("bad domain sec-buf"))?;
        let (_, workstation_buf) = SecurityBuffer::parse(&rest[12..20])
            .map_err(|_| NtlmError::decode_bad_header("bad workstation sec-buf"))?;

        let version = if flags.contains(NegotiateFlags::NEGOTIATE_VERSION) && rest.len() >= 28 {
            Some(Version::from_bytes(&rest[20..28].try_into().unwrap()))
        } else {
            None
        };

        let unicode = flags.unicode();
        let domain_name = if domain_buf.length == 0 {
            None
        } else {
            Some(decode_string(domain_buf.resolve(bytes)?, unicode))
        };
        let workstation = if workstation_buf.length == 0 {
            None
        } else {
            Some(decode_string(workstation_buf.resolve(bytes)?, unicode))
        };

        Ok(Self {
            flags,
            domain_name,
            workstation,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_without_optional_fields() {
        let msg = NegotiateMessage {
            flags: NegotiateFlags::NEGOTIATE_UNICODE | NegotiateFlags::NEGOTIATE_NTLM,
            domain_name: None,
            workstation: None,
            version: None,
        };
        let bytes = msg.encode();
        assert_eq!(NegotiateMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn round_trips_with_domain_and_version() {
        let msg = NegotiateMessage {
            flags: NegotiateFlags::NEGOTIATE_OEM
                | NegotiateFlags::NEGOTIATE_VERSION
                | NegotiateFlags::NEGOTIATE_DOMAIN_SUPPLIED,
            domain_name: Some("DOMAIN".to_string()),
            workstation: Some("WS01".to_string()),
            version: Some(Version::default()),
        };
        let bytes = msg.encode();
        assert_eq!(NegotiateMessage::decode(&bytes).unwrap(), msg);
    }
}
