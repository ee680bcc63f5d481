use ntlmssp_core::NtlmError;
use rand::RngCore;

use crate::flags::NegotiateFlags;
use crate::keys::{
    key_exchange_key, lmowf_v1, lmv1_response, lmv2_response, ntowf_v1, ntowf_v2, ntv1_response,
    ntv2_response, session_base_key_v1, session_base_key_v2,
};
use crate::message::av_pair::{AvPair, MsvAvFlags};
use crate::message::{AuthenticateMessage, ChallengeMessage, NegotiateMessage, Version};

use super::channel_bindings::ChannelBindings;
use super::signseal::{compute_handshake_mic, SignSealSession};

/// `LM_COMPAT_LEVEL`-equivalent dial, supplied by the caller rather than
/// read from configuration (spec §9, Design Notes; ambient Configuration
/// section). `Lm0`/`Lm1` send both LM and NTLM(v1) responses; `Lm2` sends
/// NTLMv1 only; `Lm3` and above send NTLMv2 exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityLevel {
    Lm0,
    Lm1,
    Lm2,
    Lm3,
    Lm4,
    Lm5,
}

impl CompatibilityLevel {
    fn use_ntlmv2(self) -> bool {
        matches!(self, Self::Lm3 | Self::Lm4 | Self::Lm5)
    }

    fn send_lm(self) -> bool {
        matches!(self, Self::Lm0 | Self::Lm1)
    }
}

/// How the caller supplies the account secret. `NtHash` supports
/// pass-the-hash callers that never see the plaintext password.
#[derive(Clone)]
pub enum Secret {
    Password(String),
    NtHash([u8; 16]),
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub domain: String,
    pub secret: Secret,
}

impl Credentials {
    fn ntowf_v1(&self) -> Result<[u8; 16], NtlmError> {
        match &self.secret {
            Secret::Password(p) => Ok(ntowf_v1(p)),
            Secret::NtHash(h) => Ok(*h),
        }
    }

    fn lmowf_v1(&self) -> Result<[u8; 16], NtlmError> {
        match &self.secret {
            Secret::Password(p) => lmowf_v1(p),
            // There is no reduced LM hash derivable from an NT hash; an
            // NtHash credential can never produce an LM response.
            Secret::NtHash(_) => Err(NtlmError::config_error(
                "LM response requires a plaintext password",
            )),
        }
    }
}

/// Caller-supplied request parameters for the Negotiate message (spec §6,
/// context options).
#[derive(Debug, Clone)]
pub struct InitiatorConfig {
    pub requested_flags: NegotiateFlags,
    pub compat_level: CompatibilityLevel,
    pub os_version: Option<Version>,
    pub channel_bindings: Option<ChannelBindings>,
    /// `SET_SEQ_NUM`: overrides the sign/seal sequence counter's starting
    /// value instead of the default zero (spec §6).
    pub sequence_number_override: Option<u32>,
}

impl Default for InitiatorConfig {
    fn default() -> Self {
        Self {
            requested_flags: NegotiateFlags::NEGOTIATE_UNICODE
                | NegotiateFlags::NEGOTIATE_NTLM
                | NegotiateFlags::REQUEST_TARGET
                | NegotiateFlags::NEGOTIATE_EXTENDED_SESSIONSECURITY
                | NegotiateFlags::NEGOTIATE_128
                | NegotiateFlags::NEGOTIATE_56
                | NegotiateFlags::NEGOTIATE_VERSION
                | NegotiateFlags::NEGOTIATE_TARGET_INFO,
            compat_level: CompatibilityLevel::Lm3,
            os_version: None,
            channel_bindings: None,
            sequence_number_override: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitiatorState {
    New,
    NegotiateSent,
    Established,
}

/// The initiator side of the negotiation state machine (spec §4.5):
/// `New -> NegotiateSent -> Established`.
pub struct InitiatorContext {
    state: InitiatorState,
    credentials: Credentials,
    config: InitiatorConfig,
    negotiate_bytes: Option<Vec<u8>>,
    negotiated_flags: Option<NegotiateFlags>,
    exported_session_key: Option<[u8; 16]>,
    sign_seal: Option<SignSealSession>,
}

impl InitiatorContext {
    pub fn new(credentials: Credentials, config: InitiatorConfig) -> Self {
        Self {
            state: InitiatorState::New,
            credentials,
            config,
            negotiate_bytes: None,
            negotiated_flags: None,
            exported_session_key: None,
            sign_seal: None,
        }
    }

    /// Builds the Negotiate message and transitions `New -> NegotiateSent`.
    pub fn initiate(&mut self) -> Result<NegotiateMessage, NtlmError> {
        if self.state != InitiatorState::New {
            return Err(NtlmError::unexpected_state(
                "initiate() called outside the New state",
            ));
        }
        let msg = NegotiateMessage {
            flags: self.config.requested_flags,
            domain_name: None,
            workstation: None,
            version: self.config.os_version,
        };
        self.negotiate_bytes = Some(msg.encode());
        self.state = InitiatorState::NegotiateSent;
        Ok(msg)
    }

    /// Consumes a received Challenge message, derives every key, and builds
    /// the Authenticate message, transitioning `NegotiateSent ->
    /// Established`.
    pub fn accept_challenge(
        &mut self,
        challenge: &ChallengeMessage,
        challenge_bytes: &[u8],
    ) -> Result<AuthenticateMessage, NtlmError> {
        if self.state != InitiatorState::NegotiateSent {
            return Err(NtlmError::unexpected_state(
                "accept_challenge() called outside the NegotiateSent state",
            ));
        }
        let negotiate_bytes = self
            .negotiate_bytes
            .clone()
            .ok_or_else(|| NtlmError::unexpected_state("no Negotiate message was sent"))?;

        let negotiated_flags = self.config.requested_flags & challenge.flags;
        let use_ess = negotiated_flags.ess();
        let use_v2 = self.config.compat_level.use_ntlmv2();

        let mut client_challenge = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut client_challenge);

        let nt_hash_v1 = self.credentials.ntowf_v1()?;

        let (lm_response, nt_response, response_key_lm, session_base_key) = if use_v2 {
            let mut target_info = challenge.target_info.clone();
            if let Some(bindings) = &self.config.channel_bindings {
                target_info.retain(|av| !matches!(av, AvPair::ChannelBindings(_)));
                let eol_index = target_info
                    .iter()
                    .position(|av| matches!(av, AvPair::Eol))
                    .unwrap_or(target_info.len());
                target_info.insert(eol_index, AvPair::ChannelBindings(bindings.digest()));
            }
            let target_info_av = AvPair::encode_sequence(&target_info);

            let nt_hash_v2 =
                ntowf_v2(&nt_hash_v1, &self.credentials.username, &self.credentials.domain)?;
            let time = current_ntlm_time(&challenge.target_info);

            let nt_response = ntv2_response(
                &nt_hash_v2,
                &challenge.server_challenge,
                &client_challenge,
                time,
                &target_info_av,
            )?;
            let lm_response =
                lmv2_response(&nt_hash_v2, &challenge.server_challenge, &client_challenge)?
                    .to_vec();
            let nt_proof_str: [u8; 16] = nt_response[0..16].try_into().unwrap();
            let session_base_key = session_base_key_v2(&nt_hash_v2, &nt_proof_str)?;
            (lm_response, nt_response, nt_hash_v2, session_base_key)
        } else {
            let lm_hash = self.credentials.lmowf_v1()?;
            let nt_response = ntv1_response(
                &nt_hash_v1,
                &challenge.server_challenge,
                &client_challenge,
                use_ess,
            )?
            .to_vec();
            let lm_response = if self.config.compat_level.send_lm() {
                lmv1_response(&lm_hash, &challenge.server_challenge, &client_challenge, use_ess)?
                    .to_vec()
            } else {
                nt_response.clone()
            };
            let session_base_key = session_base_key_v1(&nt_hash_v1);
            (lm_response, nt_response, lm_hash, session_base_key)
        };

        let kxkey = key_exchange_key(
            negotiated_flags,
            &session_base_key,
            &lm_response,
            &response_key_lm,
            &challenge.server_challenge,
        )?;

        // Random Exported Session Key, RC4-wrapped under KXKEY, when key
        // exchange is negotiated; otherwise KXKEY *is* the session key
        // (spec §4.2, "ExportedSessionKey").
        let (exported_session_key, encrypted_random_session_key) =
            if negotiated_flags.contains(NegotiateFlags::NEGOTIATE_KEY_EXCH) {
                let mut exported = [0u8; 16];
                rand::thread_rng().fill_bytes(&mut exported);
                let mut rc4 = crate::crypto::Rc4Stream::new(&kxkey);
                let wrapped = rc4.process_to_vec(&exported);
                (exported, Some(wrapped))
            } else {
                (kxkey, None)
            };

        let wants_mic = AvPair::find_flags(&challenge.target_info)
            .contains(MsvAvFlags::MESSAGE_INTEGRITY_CHECK);

        let mut authenticate = AuthenticateMessage {
            lm_challenge_response: lm_response,
            nt_challenge_response: nt_response,
            domain_name: Some(self.credentials.domain.clone()),
            user_name: Some(self.credentials.username.clone()),
            workstation: None,
            encrypted_random_session_key,
            flags: negotiated_flags,
            version: self.config.os_version,
            mic: wants_mic.then_some([0u8; 16]),
        };

        if wants_mic {
            let zeroed = authenticate.with_zeroed_mic().encode();
            let mic = compute_handshake_mic(
                &exported_session_key,
                &negotiate_bytes,
                challenge_bytes,
                &zeroed,
            )?;
            authenticate.mic = Some(mic);
        }

        let mut sign_seal = SignSealSession::new(&exported_session_key, negotiated_flags, true);
        if let Some(seq) = self.config.sequence_number_override {
            sign_seal.set_starting_seq_num(seq);
        }

        self.negotiated_flags = Some(negotiated_flags);
        self.exported_session_key = Some(exported_session_key);
        self.sign_seal = Some(sign_seal);
        self.state = InitiatorState::Established;

        Ok(authenticate)
    }

    pub fn sign_seal(&mut self) -> Option<&mut SignSealSession> {
        self.sign_seal.as_mut()
    }

    pub fn exported_session_key(&self) -> Option<&[u8; 16]> {
        self.exported_session_key.as_ref()
    }

    pub fn negotiated_flags(&self) -> Option<NegotiateFlags> {
        self.negotiated_flags
    }

    pub fn is_established(&self) -> bool {
        self.state == InitiatorState::Established
    }

    /// `GSS_Export_sec_context` (spec §6): hands the established session off
    /// as an opaque token, consuming this context the way the GSS operation
    /// it mirrors invalidates the local one.
    pub fn export_context(self) -> Result<super::context_token::ExportedContext, NtlmError> {
        let flags = self
            .negotiated_flags
            .ok_or_else(|| NtlmError::unexpected_state("export_context() called before Established"))?;
        let exported_session_key = self.exported_session_key.ok_or_else(|| {
            NtlmError::unexpected_state("export_context() called before Established")
        })?;
        let sign_seal = self.sign_seal.ok_or_else(|| {
            NtlmError::unexpected_state("export_context() called before Established")
        })?;
        Ok(super::context_token::ExportedContext {
            flags,
            exported_session_key,
            sign_seal,
            channel_bindings_digest: self.config.channel_bindings.as_ref().map(|cb| cb.digest()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptorState {
    New,
    NegotiateReceived,
    Established,
}

/// A resolved identity and its NT hash, the acceptor-side equivalent of
/// [`Credentials`] (the acceptor never needs a plaintext password, only
/// the stored verifier).
#[derive(Clone)]
pub struct AccountRecord {
    pub username: String,
    pub domain: String,
    pub nt_hash: [u8; 16],
}

/// A caller-supplied lookup from (domain, username) to the stored NT hash.
/// Acquisition of this record is explicitly out of scope (spec §1
/// Non-goals, "credential caching"); the acceptor only consumes it.
pub trait AccountLookup {
    fn find(&self, domain: &str, username: &str) -> Option<AccountRecord>;
}

pub struct AcceptorContext<L: AccountLookup> {
    state: AcceptorState,
    lookup: L,
    server_challenge: [u8; 8],
    negotiated_flags: NegotiateFlags,
    negotiate_bytes: Option<Vec<u8>>,
    challenge_bytes: Option<Vec<u8>>,
    exported_session_key: Option<[u8; 16]>,
    sign_seal: Option<SignSealSession>,
    target_name: String,
    version: Option<Version>,
    expected_channel_bindings: Option<ChannelBindings>,
}

impl<L: AccountLookup> AcceptorContext<L> {
    pub fn new(lookup: L, target_name: String, version: Option<Version>) -> Self {
        let mut server_challenge = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut server_challenge);
        Self {
            state: AcceptorState::New,
            lookup,
            server_challenge,
            negotiated_flags: NegotiateFlags::empty(),
            negotiate_bytes: None,
            challenge_bytes: None,
            exported_session_key: None,
            sign_seal: None,
            target_name,
            version,
            expected_channel_bindings: None,
        }
    }

    /// Binds this acceptor to the outer secure channel it is running over
    /// (spec §4.2, "Channel bindings"): `receive_authenticate` rejects the
    /// handshake with [`NtlmError::CbMismatch`] unless the initiator's
    /// digest matches.
    pub fn with_channel_bindings(mut self, bindings: ChannelBindings) -> Self {
        self.expected_channel_bindings = Some(bindings);
        self
    }

    /// Consumes a received Negotiate message and builds the Challenge
    /// message, transitioning `New -> NegotiateReceived`.
    pub fn receive_negotiate(
        &mut self,
        negotiate: &NegotiateMessage,
        negotiate_bytes: &[u8],
    ) -> Result<ChallengeMessage, NtlmError> {
        if self.state != AcceptorState::New {
            return Err(NtlmError::unexpected_state(
                "receive_negotiate() called outside the New state",
            ));
        }
        self.negotiate_bytes = Some(negotiate_bytes.to_vec());

        let offered = NegotiateFlags::NEGOTIATE_UNICODE
            | NegotiateFlags::NEGOTIATE_NTLM
            | NegotiateFlags::REQUEST_TARGET
            | NegotiateFlags::NEGOTIATE_EXTENDED_SESSIONSECURITY
            | NegotiateFlags::NEGOTIATE_128
            | NegotiateFlags::NEGOTIATE_56
            | NegotiateFlags::NEGOTIATE_VERSION
            | NegotiateFlags::NEGOTIATE_TARGET_INFO
            | NegotiateFlags::NEGOTIATE_KEY_EXCH;
        self.negotiated_flags = negotiate.flags & offered;

        let target_info = vec![
            AvPair::NbDomainName(crate::crypto::utf8_to_utf16le(&self.target_name)),
            AvPair::Timestamp(current_filetime()),
            AvPair::Eol,
        ];

        let msg = ChallengeMessage {
            target_name: Some(self.target_name.clone()),
            flags: self.negotiated_flags,
            server_challenge: self.server_challenge,
            target_info,
            version: self.version,
        };
        self.challenge_bytes = Some(msg.encode());
        self.state = AcceptorState::NegotiateReceived;
        Ok(msg)
    }

    /// Consumes a received Authenticate message, verifies the NTLMv2
    /// response against the looked-up account, and establishes the
    /// session, transitioning `NegotiateReceived -> Established`.
    pub fn receive_authenticate(
        &mut self,
        authenticate: &AuthenticateMessage,
    ) -> Result<(), NtlmError> {
        if self.state != AcceptorState::NegotiateReceived {
            return Err(NtlmError::unexpected_state(
                "receive_authenticate() called outside the NegotiateReceived state",
            ));
        }
        let domain = authenticate.domain_name.as_deref().unwrap_or_default();
        let username = authenticate
            .user_name
            .as_deref()
            .ok_or_else(|| NtlmError::AuthNoUser("Authenticate message carries no user name".into()))?;
        let account = self
            .lookup
            .find(domain, username)
            .ok_or_else(|| NtlmError::AuthNoUser(username.to_string()))?;

        if authenticate.nt_challenge_response.len() < 16 {
            return Err(NtlmError::BadSignature);
        }
        let nt_proof_str: [u8; 16] = authenticate.nt_challenge_response[0..16].try_into().unwrap();
        let temp = &authenticate.nt_challenge_response[16..];

        let nt_hash_v2 = ntowf_v2(&account.nt_hash, &account.username, &account.domain)?;
        let mut proof_input = self.server_challenge.to_vec();
        proof_input.extend_from_slice(temp);
        let expected_proof = crate::crypto::hmac_md5(&nt_hash_v2, &proof_input)?;

        use subtle::ConstantTimeEq;
        if expected_proof.ct_eq(&nt_proof_str).unwrap_u8() != 1 {
            return Err(NtlmError::BadSignature);
        }

        if let Some(expected) = &self.expected_channel_bindings {
            // `temp` is ResponseVersion(1) || HiResponseVersion(1) || Z(6) ||
            // Time(8) || ClientChallenge(8) || Z(4) || AV-pairs || Z(4).
            const AV_PAIRS_OFFSET: usize = 1 + 1 + 6 + 8 + 8 + 4;
            if temp.len() < AV_PAIRS_OFFSET {
                return Err(NtlmError::decode_truncated(
                    "NTLMv2 temp structure too short to carry channel bindings",
                ));
            }
            let target_info = AvPair::decode_sequence(&temp[AV_PAIRS_OFFSET..])?;
            let received = target_info.iter().find_map(|av| match av {
                AvPair::ChannelBindings(digest) => Some(*digest),
                _ => None,
            });
            let matches = received
                .map(|digest| digest.ct_eq(&expected.digest()).unwrap_u8() == 1)
                .unwrap_or(false);
            if !matches {
                return Err(NtlmError::CbMismatch);
            }
        }

        let session_base_key = session_base_key_v2(&nt_hash_v2, &nt_proof_str)?;
        let kxkey = key_exchange_key(
            self.negotiated_flags,
            &session_base_key,
            &authenticate.lm_challenge_response,
            &nt_hash_v2,
            &self.server_challenge,
        )?;

        let exported_session_key = if let Some(wrapped) = &authenticate.encrypted_random_session_key
        {
            let mut rc4 = crate::crypto::Rc4Stream::new(&kxkey);
            let unwrapped = rc4.process_to_vec(wrapped);
            let mut key = [0u8; 16];
            key.copy_from_slice(&unwrapped[0..16.min(unwrapped.len())]);
            key
        } else {
            kxkey
        };

        if let (Some(mic), Some(negotiate_bytes), Some(challenge_bytes)) = (
            authenticate.mic,
            self.negotiate_bytes.clone(),
            self.challenge_bytes.clone(),
        ) {
            let zeroed = authenticate.with_zeroed_mic().encode();
            let expected_mic =
                compute_handshake_mic(&exported_session_key, &negotiate_bytes, &challenge_bytes, &zeroed)?;
            if expected_mic.ct_eq(&mic).unwrap_u8() != 1 {
                return Err(NtlmError::MicMismatch);
            }
        }

        self.exported_session_key = Some(exported_session_key);
        self.sign_seal = Some(SignSealSession::new(
            &exported_session_key,
            self.negotiated_flags,
            false,
        ));
        self.state = AcceptorState::Established;
        Ok(())
    }

    pub fn sign_seal(&mut self) -> Option<&mut SignSealSession> {
        self.sign_seal.as_mut()
    }

    pub fn exported_session_key(&self) -> Option<&[u8; 16]> {
        self.exported_session_key.as_ref()
    }

    pub fn is_established(&self) -> bool {
        self.state == AcceptorState::Established
    }

    /// `GSS_Export_sec_context` (spec §6), the acceptor-side counterpart of
    /// [`InitiatorContext::export_context`].
    pub fn export_context(self) -> Result<super::context_token::ExportedContext, NtlmError> {
        if self.state != AcceptorState::Established {
            return Err(NtlmError::unexpected_state(
                "export_context() called before Established",
            ));
        }
        let exported_session_key = self.exported_session_key.ok_or_else(|| {
            NtlmError::unexpected_state("export_context() called before Established")
        })?;
        let sign_seal = self.sign_seal.ok_or_else(|| {
            NtlmError::unexpected_state("export_context() called before Established")
        })?;
        Ok(super::context_token::ExportedContext {
            flags: self.negotiated_flags,
            exported_session_key,
            sign_seal,
            channel_bindings_digest: self.expected_channel_bindings.as_ref().map(|cb| cb.digest()),
        })
    }
}

/// Pulls the AV_TIMESTAMP out of a Challenge message's TargetInfo, or
/// falls back to the current time for servers that omit it (spec §4.2,
/// "time" input to NTLMv2Response).
fn current_ntlm_time(target_info: &[AvPair]) -> u64 {
    AvPair::find_timestamp(target_info).unwrap_or_else(current_filetime)
}

/// Windows FILETIME (100ns ticks since 1601-01-01) for the current
/// instant. There is no `DateTime::now()` available in every build
/// configuration this crate targets, so this goes through `SystemTime`.
fn current_filetime() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    const EPOCH_DIFF_100NS: u64 = 116_444_736_000_000_000;
    let since_unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    EPOCH_DIFF_100NS + since_unix.as_secs() * 10_000_000 + u64::from(since_unix.subsec_nanos()) / 100
}
