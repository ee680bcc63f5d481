use bitflags::bitflags;
use ntlmssp_core::NtlmError;

use crate::byte_helper::{u16_to_bytes, u32_to_bytes, u64_to_bytes};

pub const AV_EOL: u16 = 0;
pub const AV_NB_COMPUTER_NAME: u16 = 1;
pub const AV_NB_DOMAIN_NAME: u16 = 2;
pub const AV_DNS_COMPUTER_NAME: u16 = 3;
pub const AV_DNS_DOMAIN_NAME: u16 = 4;
pub const AV_DNS_TREE_NAME: u16 = 5;
pub const AV_FLAGS: u16 = 6;
pub const AV_TIMESTAMP: u16 = 7;
pub const AV_SINGLE_HOST: u16 = 8;
pub const AV_TARGET_NAME: u16 = 9;
pub const AV_CHANNEL_BINDINGS: u16 = 10;

const FLAGS_SIZE: usize = 4;
const TIMESTAMP_SIZE: usize = 8;
pub const SINGLE_HOST_DATA_SIZE: usize = 48;
const CHANNEL_BINDINGS_SIZE: usize = 16;

/// The `Flags` bits carried *inside* an AV-pair (distinct from the
/// message-level `NegotiateFlags`). Supplemental to spec.md: needed to
/// decide whether a received Authenticate message's MIC field should be
/// trusted (spec §4.5).
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MsvAvFlags: u32 {
        const MESSAGE_INTEGRITY_CHECK = 0x0000_0002;
    }
}

/// `Single_Host_Data`: machine-specific info a client may attach so a
/// server on the same host can process it (supplemental, MS-NLMP §2.2.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleHostData {
    pub custom_data: u32,
    pub machine_id: [u8; 32],
}

impl SingleHostData {
    pub fn to_bytes(self) -> [u8; SINGLE_HOST_DATA_SIZE] {
        let mut out = [0u8; SINGLE_HOST_DATA_SIZE];
        out[0..4].copy_from_slice(&u32_to_bytes(SINGLE_HOST_DATA_SIZE as u32));
        // bytes 4..8 (Z4) stay zero
        out[8..12].copy_from_slice(&u32_to_bytes(1)); // DataPresent
        out[12..16].copy_from_slice(&u32_to_bytes(self.custom_data));
        out[16..48].copy_from_slice(&self.machine_id);
        out
    }

    pub fn from_bytes(bytes: &[u8; SINGLE_HOST_DATA_SIZE]) -> Self {
        let mut custom_data_bytes = [0u8; 4];
        custom_data_bytes.copy_from_slice(&bytes[12..16]);
        let mut machine_id = [0u8; 32];
        machine_id.copy_from_slice(&bytes[16..48]);
        Self {
            custom_data: u32::from_le_bytes(custom_data_bytes),
            machine_id,
        }
    }
}

/// One AV-pair record (spec §3, "AV-pair sequence").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvPair {
    Eol,
    NbComputerName(Vec<u8>),
    NbDomainName(Vec<u8>),
    DnsComputerName(Vec<u8>),
    DnsDomainName(Vec<u8>),
    DnsTreeName(Vec<u8>),
    Flags(u32),
    Timestamp(u64),
    SingleHost([u8; SINGLE_HOST_DATA_SIZE]),
    TargetName(Vec<u8>),
    ChannelBindings([u8; CHANNEL_BINDINGS_SIZE]),
}

impl AvPair {
    pub fn id(&self) -> u16 {
        match self {
            Self::Eol => AV_EOL,
            Self::NbComputerName(_) => AV_NB_COMPUTER_NAME,
            Self::NbDomainName(_) => AV_NB_DOMAIN_NAME,
            Self::DnsComputerName(_) => AV_DNS_COMPUTER_NAME,
            Self::DnsDomainName(_) => AV_DNS_DOMAIN_NAME,
            Self::DnsTreeName(_) => AV_DNS_TREE_NAME,
            Self::Flags(_) => AV_FLAGS,
            Self::Timestamp(_) => AV_TIMESTAMP,
            Self::SingleHost(_) => AV_SINGLE_HOST,
            Self::TargetName(_) => AV_TARGET_NAME,
            Self::ChannelBindings(_) => AV_CHANNEL_BINDINGS,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        let (len, value): (usize, Vec<u8>) = match self {
            Self::Eol => (0, Vec::new()),
            Self::NbComputerName(v)
            | Self::NbDomainName(v)
            | Self::DnsComputerName(v)
            | Self::DnsDomainName(v)
            | Self::DnsTreeName(v)
            | Self::TargetName(v) => (v.len(), v.clone()),
            Self::Flags(v) => (FLAGS_SIZE, u32_to_bytes(*v).to_vec()),
            Self::Timestamp(v) => (TIMESTAMP_SIZE, u64_to_bytes(*v).to_vec()),
            Self::SingleHost(v) => (SINGLE_HOST_DATA_SIZE, v.to_vec()),
            Self::ChannelBindings(v) => (CHANNEL_BINDINGS_SIZE, v.to_vec()),
        };
        out.extend_from_slice(&u16_to_bytes(self.id()));
        out.extend_from_slice(&u16_to_bytes(len as u16));
        out.extend_from_slice(&value);
    }

    /// Encodes a full AV-pair sequence, terminated by EOL, in the wire
    /// order spec §4.3 names: NbDomain, NbComputer, DnsDomain, DnsComputer,
    /// DnsTree, Timestamp (if present), Flags (if present), SingleHost (if
    /// present), ChannelBindings (if present), TargetName (if present), EOL.
    pub fn encode_sequence(pairs: &[AvPair]) -> Vec<u8> {
        let mut out = Vec::new();
        for pair in pairs {
            pair.write_to(&mut out);
        }
        if !matches!(pairs.last(), Some(AvPair::Eol)) {
            AvPair::Eol.write_to(&mut out);
        }
        out
    }

    /// Parses a full AV-pair sequence out of a TargetInfo buffer, checking
    /// every declared length against the remaining buffer
    /// (`DECODE_OVERLONG_AV`, spec §4.3).
    pub fn decode_sequence(buffer: &[u8]) -> Result<Vec<AvPair>, NtlmError> {
        let mut pairs = Vec::new();
        let mut cursor = buffer;
        loop {
            if cursor.len() < 4 {
                return Err(NtlmError::decode_overlong_av(
                    "AV-pair header truncated before EOL",
                ));
            }
            let av_type = u16::from_le_bytes([cursor[0], cursor[1]]);
            let len = u16::from_le_bytes([cursor[2], cursor[3]]) as usize;
            cursor = &cursor[4..];

            if len > cursor.len() {
                return Err(NtlmError::decode_overlong_av(format!(
                    "AV-pair {av_type} declares length {len} but only {} bytes remain",
                    cursor.len()
                )));
            }
            let value = &cursor[0..len];
            cursor = &cursor[len..];

            let pair = match av_type {
                AV_EOL => {
                    if len != 0 {
                        return Err(NtlmError::decode_overlong_av("EOL AV-pair must be empty"));
                    }
                    pairs.push(AvPair::Eol);
                    break;
                }
                AV_NB_COMPUTER_NAME => AvPair::NbComputerName(value.to_vec()),
                AV_NB_DOMAIN_NAME => AvPair::NbDomainName(value.to_vec()),
                AV_DNS_COMPUTER_NAME => AvPair::DnsComputerName(value.to_vec()),
                AV_DNS_DOMAIN_NAME => AvPair::DnsDomainName(value.to_vec()),
                AV_DNS_TREE_NAME => AvPair::DnsTreeName(value.to_vec()),
                AV_TARGET_NAME => AvPair::TargetName(value.to_vec()),
                AV_FLAGS => {
                    if len != FLAGS_SIZE {
                        return Err(NtlmError::decode_overlong_av("bad Flags AV-pair length"));
                    }
                    AvPair::Flags(u32::from_le_bytes(value.try_into().unwrap()))
                }
                AV_TIMESTAMP => {
                    if len != TIMESTAMP_SIZE {
                        return Err(NtlmError::decode_overlong_av("bad Timestamp AV-pair length"));
                    }
                    AvPair::Timestamp(u64::from_le_bytes(value.try_into().unwrap()))
                }
                AV_SINGLE_HOST => {
                    if len != SINGLE_HOST_DATA_SIZE {
                        return Err(NtlmError::decode_overlong_av("bad SingleHost AV-pair length"));
                    }
                    AvPair::SingleHost(value.try_into().unwrap())
                }
                AV_CHANNEL_BINDINGS => {
                    if len != CHANNEL_BINDINGS_SIZE {
                        return Err(NtlmError::decode_overlong_av(
                            "bad ChannelBindings AV-pair length",
                        ));
                    }
                    AvPair::ChannelBindings(value.try_into().unwrap())
                }
                other => {
                    return Err(NtlmError::decode_overlong_av(format!(
                        "unknown AV-pair id {other}"
                    )))
                }
            };
            pairs.push(pair);
        }
        Ok(pairs)
    }

    pub fn find_flags(pairs: &[AvPair]) -> MsvAvFlags {
        pairs
            .iter()
            .find_map(|p| match p {
                AvPair::Flags(bits) => Some(MsvAvFlags::from_bits_truncate(*bits)),
                _ => None,
            })
            .unwrap_or_else(MsvAvFlags::empty)
    }

    pub fn find_timestamp(pairs: &[AvPair]) -> Option<u64> {
        pairs.iter().find_map(|p| match p {
            AvPair::Timestamp(t) => Some(*t),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_sequence() {
        let pairs = vec![
            AvPair::NbDomainName(b"DOMAIN".to_vec()),
            AvPair::NbComputerName(b"SERVER".to_vec()),
            AvPair::Timestamp(1234),
        ];
        let buffer = AvPair::encode_sequence(&pairs);
        let decoded = AvPair::decode_sequence(&buffer).unwrap();
        assert_eq!(decoded[0], pairs[0]);
        assert_eq!(decoded[1], pairs[1]);
        assert_eq!(decoded[2], pairs[2]);
        assert_eq!(decoded[3], AvPair::Eol);
    }

    #[test]
    fn overlong_length_is_rejected() {
        // AV-pair header claims 100 bytes of value but none are present.
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&u16_to_bytes(AV_NB_DOMAIN_NAME));
        buffer.extend_from_slice(&u16_to_bytes(100));
        assert!(AvPair::decode_sequence(&buffer).is_err());
    }

    #[test]
    fn single_host_data_round_trips() {
        let data = SingleHostData {
            custom_data: 0x2000,
            machine_id: [0xaa; 32],
        };
        let bytes = data.to_bytes();
        assert_eq!(SingleHostData::from_bytes(&bytes), data);
    }
}
