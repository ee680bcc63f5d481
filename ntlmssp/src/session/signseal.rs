use ntlmssp_core::NtlmError;
use subtle::ConstantTimeEq;

use crate::crypto::{crc32, hmac_md5, md5, Rc4Stream};
use crate::flags::NegotiateFlags;
use crate::keys::{seal_key, sign_key, Direction};

pub const SIGNATURE_SIZE: usize = 16;

/// The one context-option OID this core recognises (spec §6,
/// "Context-option OIDs"): `set_sec_context_option` dispatches on this
/// before validating the raw value bytes it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOption {
    SetSeqNum,
}

/// Rekey the sealing stream after this many bytes have crossed it in either
/// direction (spec §4.4, "Rekeying").
const REKEY_THRESHOLD_BYTES: u64 = 1 << 30;

/// Computes the handshake-binding MIC placed in the Authenticate message's
/// MIC field (spec §4.5): `HMAC-MD5(ExportedSessionKey, Negotiate ||
/// Challenge || Authenticate-with-MIC-zeroed)`. Distinct from the
/// per-message signatures `get_mic`/`wrap` below, which protect individual
/// application messages once the session is established.
pub fn compute_handshake_mic(
    exported_session_key: &[u8; 16],
    negotiate: &[u8],
    challenge: &[u8],
    authenticate_with_zeroed_mic: &[u8],
) -> Result<[u8; SIGNATURE_SIZE], NtlmError> {
    let mut message =
        Vec::with_capacity(negotiate.len() + challenge.len() + authenticate_with_zeroed_mic.len());
    message.extend_from_slice(negotiate);
    message.extend_from_slice(challenge);
    message.extend_from_slice(authenticate_with_zeroed_mic);
    hmac_md5(exported_session_key, &message)
}

/// One direction (client-to-server or server-to-client) of an established
/// sign/seal session (spec §4.4, "Sign/seal session state").
pub struct SignSealDirection {
    sign_key: [u8; 16],
    seal_key: [u8; 16],
    rc4: Rc4Stream,
    seq_num: u32,
    bytes_since_rekey: u64,
    ess: bool,
    seal_negotiated: bool,
    datagram: bool,
}

impl SignSealDirection {
    pub fn new(exported_session_key: &[u8; 16], flags: NegotiateFlags, direction: Direction) -> Self {
        let sign_key_value = sign_key(exported_session_key, direction);
        let seal_key_value = seal_key(exported_session_key, flags, direction);
        Self {
            sign_key: sign_key_value,
            seal_key: seal_key_value,
            rc4: Rc4Stream::new(&seal_key_value),
            seq_num: 0,
            bytes_since_rekey: 0,
            ess: flags.ess(),
            seal_negotiated: flags.contains(NegotiateFlags::NEGOTIATE_SEAL),
            datagram: flags.contains(NegotiateFlags::NEGOTIATE_DATAGRAM),
        }
    }

    fn rc4_process(&mut self, data: &mut [u8]) {
        self.rc4.process(data);
        if !self.datagram {
            self.bytes_since_rekey += data.len() as u64;
            if self.bytes_since_rekey >= REKEY_THRESHOLD_BYTES {
                self.seal_key = md5(&self.seal_key);
                self.rc4.rekey(&self.seal_key);
                self.bytes_since_rekey = 0;
            }
        }
    }

    /// Connectionless mode has no shared stream to continue: every message
    /// carries its own sequence number and reseeds a fresh per-message
    /// keystream so messages can be processed out of order (spec §4.4,
    /// "Datagram mode").
    fn reseed_for_datagram(&mut self, seq_num: u32) -> Result<(), NtlmError> {
        let per_message_key = hmac_md5(&self.seal_key, &seq_num.to_le_bytes())?;
        self.rc4.rekey(&per_message_key);
        Ok(())
    }

    fn set_seq_num(&mut self, seq_num: u32) {
        self.seq_num = seq_num;
    }

    fn next_seq_num(&mut self, explicit: Option<u32>) -> u32 {
        match explicit {
            Some(seq) => seq,
            None => {
                let seq = self.seq_num;
                self.seq_num = self.seq_num.wrapping_add(1);
                seq
            }
        }
    }

    fn make_signature(
        &mut self,
        plaintext: &[u8],
        seq_num: u32,
    ) -> Result<[u8; SIGNATURE_SIZE], NtlmError> {
        let mut sig = [0u8; SIGNATURE_SIZE];
        sig[0..4].copy_from_slice(&1u32.to_le_bytes());

        if self.ess {
            let mut message = seq_num.to_le_bytes().to_vec();
            message.extend_from_slice(plaintext);
            let full = hmac_md5(&self.sign_key, &message)?;
            let mut checksum: [u8; 8] = full[0..8].try_into().unwrap();
            if self.seal_negotiated {
                self.rc4_process(&mut checksum);
            }
            sig[4..12].copy_from_slice(&checksum);
            sig[12..16].copy_from_slice(&seq_num.to_le_bytes());
        } else {
            let mut tail = [0u8; 12]; // random pad(4) || checksum(4) || seq_num(4)
            tail[4..8].copy_from_slice(&crc32(plaintext));
            tail[8..12].copy_from_slice(&seq_num.to_le_bytes());
            if self.seal_negotiated {
                self.rc4_process(&mut tail);
            }
            sig[4..16].copy_from_slice(&tail);
        }
        Ok(sig)
    }

    /// `GSS_Wrap`: encrypts `plaintext` and returns it alongside the
    /// signature over the original data (spec §4.4, "wrap").
    pub fn wrap(
        &mut self,
        plaintext: &[u8],
        explicit_seq_num: Option<u32>,
    ) -> Result<(Vec<u8>, [u8; SIGNATURE_SIZE]), NtlmError> {
        let seq_num = self.next_seq_num(explicit_seq_num);
        if self.datagram {
            self.reseed_for_datagram(seq_num)?;
        }
        let mut ciphertext = plaintext.to_vec();
        if self.seal_negotiated {
            self.rc4_process(&mut ciphertext);
        }
        let signature = self.make_signature(plaintext, seq_num)?;
        Ok((ciphertext, signature))
    }

    /// `GSS_Unwrap`: decrypts `ciphertext` and verifies its signature
    /// against the recovered plaintext (spec §4.4, "unwrap").
    pub fn unwrap(
        &mut self,
        ciphertext: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
        explicit_seq_num: Option<u32>,
    ) -> Result<Vec<u8>, NtlmError> {
        let seq_num = self.next_seq_num(explicit_seq_num);
        if self.datagram {
            self.reseed_for_datagram(seq_num)?;
        }
        let mut plaintext = ciphertext.to_vec();
        if self.seal_negotiated {
            self.rc4_process(&mut plaintext);
        }
        let expected = self.make_signature(&plaintext, seq_num)?;
        if expected.ct_eq(signature).unwrap_u8() != 1 {
            return Err(NtlmError::BadSignature);
        }
        Ok(plaintext)
    }

    /// `GSS_GetMIC`: signs `message` without encrypting it.
    pub fn get_mic(
        &mut self,
        message: &[u8],
        explicit_seq_num: Option<u32>,
    ) -> Result<[u8; SIGNATURE_SIZE], NtlmError> {
        let seq_num = self.next_seq_num(explicit_seq_num);
        if self.datagram {
            self.reseed_for_datagram(seq_num)?;
        }
        self.make_signature(message, seq_num)
    }

    /// `GSS_VerifyMIC`: recomputes the signature over `message` and
    /// compares it in constant time.
    pub fn verify_mic(
        &mut self,
        message: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
        explicit_seq_num: Option<u32>,
    ) -> Result<(), NtlmError> {
        let seq_num = self.next_seq_num(explicit_seq_num);
        if self.datagram {
            self.reseed_for_datagram(seq_num)?;
        }
        let expected = self.make_signature(message, seq_num)?;
        if expected.ct_eq(signature).unwrap_u8() != 1 {
            return Err(NtlmError::MicMismatch);
        }
        Ok(())
    }
}

/// The raw, reconstructable state of one direction, used by the exported
/// context token (spec §6).
pub(crate) struct DirectionState {
    pub sign_key: [u8; 16],
    pub seal_key: [u8; 16],
    pub seq_num: u32,
    pub rc4_sbox: [u8; 256],
    pub rc4_i: u8,
    pub rc4_j: u8,
}

impl SignSealDirection {
    pub(crate) fn export_raw(&self) -> DirectionState {
        let (rc4_sbox, rc4_i, rc4_j) = self.rc4.export_state();
        DirectionState {
            sign_key: self.sign_key,
            seal_key: self.seal_key,
            seq_num: self.seq_num,
            rc4_sbox,
            rc4_i,
            rc4_j,
        }
    }

    pub(crate) fn from_raw(flags: NegotiateFlags, raw: DirectionState) -> Self {
        Self {
            sign_key: raw.sign_key,
            seal_key: raw.seal_key,
            rc4: Rc4Stream::from_state(raw.rc4_sbox, raw.rc4_i, raw.rc4_j),
            seq_num: raw.seq_num,
            bytes_since_rekey: 0,
            ess: flags.ess(),
            seal_negotiated: flags.contains(NegotiateFlags::NEGOTIATE_SEAL),
            datagram: flags.contains(NegotiateFlags::NEGOTIATE_DATAGRAM),
        }
    }
}

/// Both directions of an established sign/seal session (spec §4.4).
pub struct SignSealSession {
    outgoing: SignSealDirection,
    incoming: SignSealDirection,
}

impl SignSealSession {
    pub fn new(exported_session_key: &[u8; 16], flags: NegotiateFlags, is_initiator: bool) -> Self {
        let (out_dir, in_dir) = if is_initiator {
            (Direction::ClientToServer, Direction::ServerToClient)
        } else {
            (Direction::ServerToClient, Direction::ClientToServer)
        };
        Self {
            outgoing: SignSealDirection::new(exported_session_key, flags, out_dir),
            incoming: SignSealDirection::new(exported_session_key, flags, in_dir),
        }
    }

    pub fn wrap(&mut self, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; SIGNATURE_SIZE]), NtlmError> {
        self.outgoing.wrap(plaintext, None)
    }

    pub fn unwrap(
        &mut self,
        ciphertext: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<Vec<u8>, NtlmError> {
        self.incoming.unwrap(ciphertext, signature, None)
    }

    pub fn get_mic(&mut self, message: &[u8]) -> Result<[u8; SIGNATURE_SIZE], NtlmError> {
        self.outgoing.get_mic(message, None)
    }

    pub fn verify_mic(
        &mut self,
        message: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<(), NtlmError> {
        self.incoming.verify_mic(message, signature, None)
    }

    /// `SET_SEQ_NUM` (spec §6): overrides the starting sequence number for
    /// both directions instead of the default zero.
    pub fn set_starting_seq_num(&mut self, seq_num: u32) {
        self.outgoing.set_seq_num(seq_num);
        self.incoming.set_seq_num(seq_num);
    }

    /// `set_sec_context_option` (spec §6): applies a context-option OID's
    /// raw wire value. A value of the wrong length for its OID is a
    /// defective token, not a silently-ignored no-op.
    pub fn set_sec_context_option(&mut self, option: ContextOption, value: &[u8]) -> Result<(), NtlmError> {
        match option {
            ContextOption::SetSeqNum => {
                if value.len() != 4 {
                    return Err(NtlmError::decode_bad_header(format!(
                        "SET_SEQ_NUM requires a 4-byte value, got {}",
                        value.len()
                    )));
                }
                let seq_num = u32::from_le_bytes(value.try_into().unwrap());
                self.set_starting_seq_num(seq_num);
                Ok(())
            }
        }
    }

    pub(crate) fn export_raw(&self) -> (DirectionState, DirectionState) {
        (self.outgoing.export_raw(), self.incoming.export_raw())
    }

    pub(crate) fn from_raw(
        flags: NegotiateFlags,
        outgoing: DirectionState,
        incoming: DirectionState,
    ) -> Self {
        Self {
            outgoing: SignSealDirection::from_raw(flags, outgoing),
            incoming: SignSealDirection::from_raw(flags, incoming),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> NegotiateFlags {
        NegotiateFlags::NEGOTIATE_SIGN
            | NegotiateFlags::NEGOTIATE_SEAL
            | NegotiateFlags::NEGOTIATE_EXTENDED_SESSIONSECURITY
            | NegotiateFlags::NEGOTIATE_128
    }

    #[test]
    fn wrap_then_unwrap_recovers_plaintext() {
        let key = [0x42u8; 16];
        let mut client = SignSealSession::new(&key, flags(), true);
        let mut server = SignSealSession::new(&key, flags(), false);

        let (ciphertext, signature) = client.wrap(b"hello server").unwrap();
        let plaintext = server.unwrap(&ciphertext, &signature).unwrap();
        assert_eq!(plaintext, b"hello server");
    }

    #[test]
    fn tampered_ciphertext_fails_verification() {
        let key = [0x11u8; 16];
        let mut client = SignSealSession::new(&key, flags(), true);
        let mut server = SignSealSession::new(&key, flags(), false);

        let (mut ciphertext, signature) = client.wrap(b"important data").unwrap();
        ciphertext[0] ^= 0xff;
        assert!(server.unwrap(&ciphertext, &signature).is_err());
    }

    #[test]
    fn get_mic_then_verify_mic_round_trips() {
        let key = [0x99u8; 16];
        let mut client = SignSealSession::new(&key, flags(), true);
        let mut server = SignSealSession::new(&key, flags(), false);

        let message = b"unencrypted but authenticated";
        let mic = client.get_mic(message).unwrap();
        assert!(server.verify_mic(message, &mic).is_ok());
    }

    #[test]
    fn non_ess_v1_wrap_round_trips() {
        let key = [0x07u8; 16];
        let plain_flags = NegotiateFlags::NEGOTIATE_SIGN | NegotiateFlags::NEGOTIATE_SEAL;
        let mut client = SignSealSession::new(&key, plain_flags, true);
        let mut server = SignSealSession::new(&key, plain_flags, false);

        let (ciphertext, signature) = client.wrap(b"legacy client").unwrap();
        let plaintext = server.unwrap(&ciphertext, &signature).unwrap();
        assert_eq!(plaintext, b"legacy client");
    }

    #[test]
    fn set_seq_num_option_overrides_starting_sequence() {
        let key = [0x5au8; 16];
        let mut client = SignSealSession::new(&key, flags(), true);
        let mut server = SignSealSession::new(&key, flags(), false);

        client
            .set_sec_context_option(ContextOption::SetSeqNum, &100u32.to_le_bytes())
            .unwrap();
        server
            .set_sec_context_option(ContextOption::SetSeqNum, &100u32.to_le_bytes())
            .unwrap();

        let (ciphertext, signature) = client.wrap(b"after seq override").unwrap();
        assert_eq!(
            server.unwrap(&ciphertext, &signature).unwrap(),
            b"after seq override"
        );
    }

    #[test]
    fn set_seq_num_option_rejects_wrong_length() {
        let key = [0x5au8; 16];
        let mut session = SignSealSession::new(&key, flags(), true);
        assert!(session
            .set_sec_context_option(ContextOption::SetSeqNum, &[0u8; 3])
            .is_err());
    }

    #[test]
    fn datagram_messages_can_be_processed_out_of_order() {
        let key = [0x33u8; 16];
        let datagram_flags = flags() | NegotiateFlags::NEGOTIATE_DATAGRAM;
        let mut client = SignSealDirection::new(&key, datagram_flags, Direction::ClientToServer);
        let mut server = SignSealDirection::new(&key, datagram_flags, Direction::ClientToServer);

        let (ct0, sig0) = client.wrap(b"first", Some(0)).unwrap();
        let (ct1, sig1) = client.wrap(b"second", Some(1)).unwrap();

        // Server processes message 1 before message 0; both still verify.
        assert_eq!(server.unwrap(&ct1, &sig1, Some(1)).unwrap(), b"second");
        assert_eq!(server.unwrap(&ct0, &sig0, Some(0)).unwrap(), b"first");
    }
}
