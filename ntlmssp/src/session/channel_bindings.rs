use crate::crypto::md5;

/// `gss_channel_bindings_struct` (RFC 2744 §3.11), the 5-tuple NTLM hashes
/// into the `AV_CHANNEL_BINDINGS` AV-pair to bind an authentication to a
/// specific outer-channel endpoint (spec §4.5, "Channel bindings").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelBindings {
    pub initiator_addrtype: u32,
    pub initiator_address: Vec<u8>,
    pub acceptor_addrtype: u32,
    pub acceptor_address: Vec<u8>,
    pub application_data: Vec<u8>,
}

impl ChannelBindings {
    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.initiator_addrtype.to_le_bytes());
        out.extend_from_slice(&(self.initiator_address.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.initiator_address);
        out.extend_from_slice(&self.acceptor_addrtype.to_le_bytes());
        out.extend_from_slice(&(self.acceptor_address.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.acceptor_address);
        out.extend_from_slice(&(self.application_data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.application_data);
        out
    }

    /// MD5 digest of the serialized struct, the value carried in the
    /// 16-byte `AV_CHANNEL_BINDINGS` AV-pair.
    pub fn digest(&self) -> [u8; 16] {
        md5(&self.serialize())
    }
}
