use crate::error::NtlmError;

/// GSS-style major status, returned alongside the minor [`NtlmError`] (spec §6).
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GssMajorCode {
    Complete = 0,
    ContinueNeeded = 1,
    Failure = 2,
    DefectiveToken = 3,
    BadSig = 4,
    NoCred = 5,
    CredentialsExpired = 6,
}

/// Windows NTSTATUS values the acceptor side reports, mirrored from
/// MS-NLMP/authentication outcomes relevant to NTLM.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtStatus {
    StatusSuccess = 0x0,
    SecIContinueNeeded = 0x0009_0312,
    StatusLogonFailure = 0xC000_006D,
    StatusAccessDenied = 0xC000_0022,
    UnknownError = 0xFFFF_FFFF,
}

impl GssMajorCode {
    /// Maps the minor error taxonomy onto the major code a dispatch layer
    /// (out of this core's scope) would surface to its own caller.
    pub fn for_error(err: &NtlmError) -> Self {
        match err {
            NtlmError::BadSignature => Self::BadSig,
            NtlmError::DecodeBadHeader(_)
            | NtlmError::DecodeBadOffset(_)
            | NtlmError::DecodeTruncated(_)
            | NtlmError::DecodeBadFlagCombo(_)
            | NtlmError::DecodeOverlongAv(_) => Self::DefectiveToken,
            NtlmError::NoCredentials | NtlmError::AuthNoUser(_) => Self::NoCred,
            NtlmError::CredentialExpired => Self::CredentialsExpired,
            _ => Self::Failure,
        }
    }
}
