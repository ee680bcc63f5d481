use nom::bytes::complete::take;
use nom::number::complete::{le_u16, le_u32};
use nom::IResult;
use ntlmssp_core::NtlmError;

/// A security buffer triple: length, maxlen (always == length on write),
/// and an offset relative to the start of the containing message
/// (spec §4.3, "Wire layout").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityBuffer {
    pub length: u16,
    pub offset: u32,
}

impl SecurityBuffer {
    pub fn new(length: u16, offset: u32) -> Self {
        Self { length, offset }
    }

    /// Parses the fixed 8-byte (len, maxlen, offset) header.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, length) = le_u16(input)?;
        let (input, _maxlen) = le_u16(input)?;
        let (input, offset) = le_u32(input)?;
        Ok((input, Self { length, offset }))
    }

    /// Writes the fixed 8-byte header (maxlen mirrors length).
    pub fn write_header(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..2].copy_from_slice(&self.length.to_le_bytes());
        out[2..4].copy_from_slice(&self.length.to_le_bytes());
        out[4..8].copy_from_slice(&self.offset.to_le_bytes());
        out
    }

    /// Resolves the bytes this buffer points at, relative to the start of
    /// `message` (spec §4.3, "Compute all offsets relative to the start of
    /// the message buffer").
    pub fn resolve<'a>(&self, message: &'a [u8]) -> Result<&'a [u8], NtlmError> {
        let offset = self.offset as usize;
        let length = self.length as usize;
        let end = offset
            .checked_add(length)
            .ok_or_else(|| NtlmError::decode_bad_offset("security buffer offset overflowed"))?;

        if offset < 8 && self.length != 0 {
            // the fixed 8-byte signature+type header can never itself be payload
            return Err(NtlmError::decode_bad_offset(
                "security buffer overlaps the fixed message header",
            ));
        }
        if end > message.len() {
            return Err(NtlmError::decode_truncated(format!(
                "security buffer [{offset}..{end}) exceeds message length {}",
                message.len()
            )));
        }
        Ok(&message[offset..end])
    }
}

/// A slice of the not-yet-relocated take-header combinator, kept for parity
/// with the teacher's `parse_ntlm_buffer_fields` nom helper.
pub(crate) fn take_bytes(input: &[u8], n: usize) -> IResult<&[u8], &[u8]> {
    take(n)(input)
}
