use std::fmt::{Display, Formatter};

/// The core's minor error taxonomy (spec §7), grouped by failure class.
///
/// Every variant is considered terminal by the session layer: once one is
/// produced, the conversation moves to a failed state and refuses further
/// calls (spec §7, "Propagation").
#[derive(Debug)]
pub enum NtlmError {
    // Input/parse
    DecodeBadHeader(String),
    DecodeBadOffset(String),
    DecodeTruncated(String),
    DecodeBadFlagCombo(String),
    DecodeOverlongAv(String),
    AuthNoUser(String),

    // Protocol/semantic
    UnexpectedState(String),
    OutOfSequence { expected: u32, actual: u32 },
    BadSignature,
    MicMismatch,
    CbMismatch,

    // Crypto
    CryptoInternal(String),

    // Configuration
    ConfigError(String),
    NoCredentials,
    CredentialExpired,

    // Resource
    OutOfMemory,
}

impl NtlmError {
    pub fn decode_bad_header<T: Into<String>>(msg: T) -> Self {
        Self::DecodeBadHeader(msg.into())
    }

    pub fn decode_bad_offset<T: Into<String>>(msg: T) -> Self {
        Self::DecodeBadOffset(msg.into())
    }

    pub fn decode_truncated<T: Into<String>>(msg: T) -> Self {
        Self::DecodeTruncated(msg.into())
    }

    pub fn decode_bad_flag_combo<T: Into<String>>(msg: T) -> Self {
        Self::DecodeBadFlagCombo(msg.into())
    }

    pub fn decode_overlong_av<T: Into<String>>(msg: T) -> Self {
        Self::DecodeOverlongAv(msg.into())
    }

    pub fn crypto_internal<T: Into<String>>(msg: T) -> Self {
        Self::CryptoInternal(msg.into())
    }

    pub fn unexpected_state<T: Into<String>>(msg: T) -> Self {
        Self::UnexpectedState(msg.into())
    }

    pub fn config_error<T: Into<String>>(msg: T) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl Display for NtlmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecodeBadHeader(x) => write!(f, "bad NTLM message header: {x}"),
            Self::DecodeBadOffset(x) => write!(f, "security buffer offset out of range: {x}"),
            Self::DecodeTruncated(x) => write!(f, "message truncated: {x}"),
            Self::DecodeBadFlagCombo(x) => write!(f, "invalid negotiate flag combination: {x}"),
            Self::DecodeOverlongAv(x) => write!(f, "AV-pair overruns TargetInfo buffer: {x}"),
            Self::AuthNoUser(x) => write!(f, "no matching user: {x}"),
            Self::UnexpectedState(x) => write!(f, "message received out of sequence: {x}"),
            Self::OutOfSequence { expected, actual } => write!(
                f,
                "out of sequence: expected seq {expected}, got {actual}"
            ),
            Self::BadSignature => write!(f, "signature verification failed"),
            Self::MicMismatch => write!(f, "message integrity code mismatch"),
            Self::CbMismatch => write!(f, "channel bindings mismatch"),
            Self::CryptoInternal(x) => write!(f, "internal crypto failure: {x}"),
            Self::ConfigError(x) => write!(f, "configuration error: {x}"),
            Self::NoCredentials => write!(f, "no credentials supplied"),
            Self::CredentialExpired => write!(f, "credentials expired"),
            Self::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

impl std::error::Error for NtlmError {}

pub type NtlmResult<T> = Result<T, NtlmError>;
