use ntlmssp_core::NtlmError;

use crate::flags::NegotiateFlags;

use super::security_buffer::SecurityBuffer;
use super::strings::{decode_string, encode_string};
use super::version::Version;
use super::{read_header, write_header, MessageType};

pub const MIC_SIZE: usize = 16;

/// The initiator's final message (spec §2, §4.3). Carries both NTLM
/// responses, the (optional) session-key wrap, and the (optional) MIC that
/// binds all three messages together once ESS/MIC support is negotiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateMessage {
    pub lm_challenge_response: Vec<u8>,
    pub nt_challenge_response: Vec<u8>,
    pub domain_name: Option<String>,
    pub user_name: Option<String>,
    pub workstation: Option<String>,
    pub encrypted_random_session_key: Option<Vec<u8>>,
    pub flags: NegotiateFlags,
    pub version: Option<Version>,
    pub mic: Option<[u8; MIC_SIZE]>,
}

impl AuthenticateMessage {
    fn fixed_len(&self) -> usize {
        let version_len = if self.flags.contains(NegotiateFlags::NEGOTIATE_VERSION) {
            8
        } else {
            0
        };
        let mic_len = if self.mic.is_some() { MIC_SIZE } else { 0 };
        // header(12) + 6 sec-bufs(48) + flags(4) + version + mic
        12 + 48 + 4 + version_len + mic_len
    }

    /// Returns a clone with the MIC field zeroed, as required by spec §4.5
    /// ("the MIC is computed over the concatenation of all three messages
    /// with the Authenticate message's own MIC field zeroed").
    pub fn with_zeroed_mic(&self) -> Self {
        let mut clone = self.clone();
        if clone.mic.is_some() {
            clone.mic = Some([0u8; MIC_SIZE]);
        }
        clone
    }

    /// The MIC field's absolute byte offset in the encoded message, when
    /// this message carries one. Fully determined by the fixed-size prefix
    /// (header, six sec-buffers, flags, optional Version) that always
    /// precedes it, so a caller that has already decoded this message —
    /// an acceptor about to verify the MIC then re-derive and overwrite it,
    /// say — can locate the field again without re-walking the header.
    pub fn mic_offset(&self) -> Option<usize> {
        if self.mic.is_none() {
            return None;
        }
        let version_len = if self.flags.contains(NegotiateFlags::NEGOTIATE_VERSION) {
            8
        } else {
            0
        };
        // header(12) + 6 sec-bufs(48) + flags(4) + version
        Some(12 + 48 + 4 + version_len)
    }

    /// Overwrites the MIC field of an already-encoded message in place,
    /// using an offset obtained from [`Self::mic_offset`]. Used by an
    /// acceptor that decoded an Authenticate message, computed the real
    /// MIC over the three-message handshake, and now needs to patch the
    /// wire bytes it already has rather than re-encoding from scratch.
    pub fn patch_mic_in_place(bytes: &mut [u8], offset: usize, mic: &[u8; MIC_SIZE]) -> Result<(), NtlmError> {
        if bytes.len() < offset + MIC_SIZE {
            return Err(NtlmError::decode_truncated(
                "buffer too short to hold a MIC at the recorded offset",
            ));
        }
        bytes[offset..offset + MIC_SIZE].copy_from_slice(mic);
        Ok(())
    }

    pub fn encode(&self) -> Vec<u8> {
        let unicode = self.flags.unicode();
        let domain_bytes = self
            .domain_name
            .as_deref()
            .map(|s| encode_string(s, unicode).unwrap_or_default())
            .unwrap_or_default();
        let user_bytes = self
            .user_name
            .as_deref()
            .map(|s| encode_string(s, unicode).unwrap_or_default())
            .unwrap_or_default();
        let workstation_bytes = self
            .workstation
            .as_deref()
            .map(|s| encode_string(s, unicode).unwrap_or_default())
            .unwrap_or_default();
        let session_key_bytes = self.encrypted_random_session_key.clone().unwrap_or_default();

        let fixed_len = self.fixed_len() as u32;
        let mut offset = fixed_len;
        let domain_buf = SecurityBuffer::new(domain_bytes.len() as u16, offset);
        offset += domain_bytes.len() as u32;
        let user_buf = SecurityBuffer::new(user_bytes.len() as u16, offset);
        offset += user_bytes.len() as u32;
        let workstation_buf = SecurityBuffer::new(workstation_bytes.len() as u16, offset);
        offset += workstation_bytes.len() as u32;
        let lm_buf = SecurityBuffer::new(self.lm_challenge_response.len() as u16, offset);
        offset += self.lm_challenge_response.len() as u32;
        let nt_buf = SecurityBuffer::new(self.nt_challenge_response.len() as u16, offset);
        offset += self.nt_challenge_response.len() as u32;
        let session_key_buf = SecurityBuffer::new(session_key_bytes.len() as u16, offset);

        let mut out = Vec::with_capacity(offset as usize + session_key_bytes.len());
        write_header(&mut out, MessageType::Authenticate);
        out.extend_from_slice(&lm_buf.write_header());
        out.extend_from_slice(&nt_buf.write_header());
        out.extend_from_slice(&domain_buf.write_header());
        out.extend_from_slice(&user_buf.write_header());
        out.extend_from_slice(&workstation_buf.write_header());
        out.extend_from_slice(&session_key_buf.write_header());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        if let Some(version) = self.version {
            out.extend_from_slice(&version.to_bytes());
        }
        if let Some(mic) = self.mic {
            out.extend_from_slice(&mic);
        }
        out.extend_from_slice(&domain_bytes);
        out.extend_from_slice(&user_bytes);
        out.extend_from_slice(&workstation_bytes);
        out.extend_from_slice(&self.lm_challenge_response);
        out.extend_from_slice(&self.nt_challenge_response);
        out.extend_from_slice(&session_key_bytes);
        out
    }

    /// Decodes an Authenticate message. `mic_present` must be supplied by
    /// the caller (the negotiation context knows, from the Challenge
    /// message's AV-pairs, whether a MIC was required) since the wire
    /// format has no self-describing "MIC present" bit of its own — this
    /// is the Open Question resolved in the design ledger: the decode
    /// round-trip property (not a bit pattern) is the authoritative
    /// contract for this field.
    pub fn decode(bytes: &[u8]) -> Result<Self, NtlmError> {
        Self::decode_with_mic_hint(bytes, None)
    }

    pub fn decode_with_mic_hint(bytes: &[u8], mic_present: Option<bool>) -> Result<Self, NtlmError> {
        let (message_type, rest) = read_header(bytes)?;
        if message_type != MessageType::Authenticate {
            return Err(NtlmError::decode_bad_header("not an Authenticate message"));
        }
        if rest.len() < 48 + 4 {
            return Err(NtlmError::decode_truncated("Authenticate message too short"));
        }
        let (_, lm_buf) = SecurityBuffer::parse(&rest[0..8])
            .map_err(|_| NtlmError::decode_bad_header("bad LM sec-buf"))?;
        let (_, nt_buf) = SecurityBuffer::parse(&rest[8..16])
            .map_err(|_| NtlmError::decode_bad_header("bad NT sec-buf"))?;
        let (_, domain_buf) = SecurityBuffer::parse(&rest[16..24])
            .map_err(|_| NtlmError::decode_bad_header("bad domain sec-buf"))?;
        let (_, user_buf) = SecurityBuffer::parse(&rest[24..32])
            .map_err(|_| NtlmError::decode_bad_header("bad user sec-buf"))?;
        let (_, workstation_buf) = SecurityBuffer::parse(&rest[32..40])
            .map_err(|_| NtlmError::decode_bad_header("bad workstation sec-buf"))?;
        let (_, session_key_buf) = SecurityBuffer::parse(&rest[40..48])
            .map_err(|_| NtlmError::decode_bad_header("bad session key sec-buf"))?;
        let flags = NegotiateFlags::from_bits_truncate(u32::from_le_bytes(
            rest[48..52].try_into().unwrap(),
        ));
        super::check_encoding_flags(flags)?;

        let mut cursor = 52usize;
        let version = if flags.contains(NegotiateFlags::NEGOTIATE_VERSION) {
            if rest.len() < cursor + 8 {
                return Err(NtlmError::decode_truncated("truncated Version field"));
            }
            let v = Version::from_bytes(&rest[cursor..cursor + 8].try_into().unwrap());
            cursor += 8;
            Some(v)
        } else {
            None
        };

        // The lowest payload offset among the six sec-buffers tells us
        // whether the sliver between the fixed header and the payload is
        // wide enough to hold a MIC, independent of the caller's hint.
        let payload_start = [
            lm_buf.offset,
            nt_buf.offset,
            domain_buf.offset,
            user_buf.offset,
            workstation_buf.offset,
            session_key_buf.offset,
        ]
        .into_iter()
        .filter(|&o| o != 0)
        .min()
        .unwrap_or(bytes.len() as u32) as usize;

        let mic_fits = payload_start >= cursor + MIC_SIZE;
        let take_mic = mic_present.unwrap_or(mic_fits) && mic_fits;

        let mic_start = cursor;
        let mic = if take_mic {
            if rest.len() < cursor + MIC_SIZE {
                return Err(NtlmError::decode_truncated("truncated MIC field"));
            }
            let mut m = [0u8; MIC_SIZE];
            m.copy_from_slice(&rest[cursor..cursor + MIC_SIZE]);
            cursor += MIC_SIZE;
            Some(m)
        } else {
            None
        };
        // `mic_offset()` re-derives this same position from the fixed
        // prefix layout alone; the two must always agree.
        debug_assert!(mic.is_none() || Some(12 + mic_start) == {
            let version_len = if flags.contains(NegotiateFlags::NEGOTIATE_VERSION) { 8 } else { 0 };
            Some(12 + 48 + 4 + version_len)
        });
        let _ = cursor;

        let unicode = flags.unicode();
        let domain_name = if domain_buf.length == 0 {
            None
        } else {
            Some(decode_string(domain_buf.resolve(bytes)?, unicode))
        };
        let user_name = if user_buf.length == 0 {
            None
        } else {
            Some(decode_string(user_buf.resolve(bytes)?, unicode))
        };
        let workstation = if workstation_buf.length == 0 {
            None
        } else {
            Some(decode_string(workstation_buf.resolve(bytes)?, unicode))
        };
        let lm_challenge_response = lm_buf.resolve(bytes)?.to_vec();
        let nt_challenge_response = nt_buf.resolve(bytes)?.to_vec();
        let encrypted_random_session_key = if session_key_buf.length == 0 {
            None
        } else {
            Some(session_key_buf.resolve(bytes)?.to_vec())
        };

        Ok(Self {
            lm_challenge_response,
            nt_challenge_response,
            domain_name,
            user_name,
            workstation,
            encrypted_random_session_key,
            flags,
            version,
            mic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mic: Option<[u8; MIC_SIZE]>, version: Option<Version>) -> AuthenticateMessage {
        AuthenticateMessage {
            lm_challenge_response: vec![0u8; 24],
            nt_challenge_response: vec![0xab; 86],
            domain_name: Some("DOMAIN".to_string()),
            user_name: Some("alice".to_string()),
            workstation: Some("WORKSTATION".to_string()),
            encrypted_random_session_key: Some(vec![0x42; 16]),
            flags: NegotiateFlags::NEGOTIATE_UNICODE
                | NegotiateFlags::NEGOTIATE_EXTENDED_SESSIONSECURITY
                | NegotiateFlags::NEGOTIATE_KEY_EXCH
                | if version.is_some() {
                    NegotiateFlags::NEGOTIATE_VERSION
                } else {
                    NegotiateFlags::empty()
                },
            version,
            mic,
        }
    }

    #[test]
    fn round_trips_without_mic_or_version() {
        let msg = sample(None, None);
        let bytes = msg.encode();
        assert_eq!(AuthenticateMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn round_trips_with_mic_and_version() {
        let msg = sample(Some([0x99; MIC_SIZE]), Some(Version::default()));
        let bytes = msg.encode();
        assert_eq!(AuthenticateMessage::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn zeroed_mic_clears_only_the_mic_field() {
        let msg = sample(Some([0x77; MIC_SIZE]), None);
        let zeroed = msg.with_zeroed_mic();
        assert_eq!(zeroed.mic, Some([0u8; MIC_SIZE]));
        assert_eq!(zeroed.user_name, msg.user_name);
    }

    #[test]
    fn mic_offset_is_none_without_a_mic() {
        let msg = sample(None, Some(Version::default()));
        assert_eq!(msg.mic_offset(), None);
    }

    #[test]
    fn mic_offset_points_at_the_real_mic_bytes() {
        for version in [None, Some(Version::default())] {
            let msg = sample(Some([0x55; MIC_SIZE]), version);
            let bytes = msg.encode();
            let offset = msg.mic_offset().expect("message carries a MIC");
            assert_eq!(&bytes[offset..offset + MIC_SIZE], &[0x55; MIC_SIZE]);
        }
    }

    #[test]
    fn patch_mic_in_place_overwrites_only_the_mic_bytes() {
        let msg = sample(Some([0x11; MIC_SIZE]), Some(Version::default()));
        let mut bytes = msg.encode();
        let offset = msg.mic_offset().unwrap();
        let new_mic = [0x22; MIC_SIZE];
        AuthenticateMessage::patch_mic_in_place(&mut bytes, offset, &new_mic).unwrap();

        let decoded = AuthenticateMessage::decode(&bytes).unwrap();
        assert_eq!(decoded.mic, Some(new_mic));
        assert_eq!(decoded.user_name, msg.user_name);
        assert_eq!(decoded.nt_challenge_response, msg.nt_challenge_response);
    }

    #[test]
    fn patch_mic_in_place_rejects_a_too_short_buffer() {
        let mut bytes = vec![0u8; 10];
        let err = AuthenticateMessage::patch_mic_in_place(&mut bytes, 64, &[0u8; MIC_SIZE]);
        assert!(err.is_err());
    }
}
