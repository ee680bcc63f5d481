//! An implementation of the core of NTLMSSP (MS-NLMP): crypto primitives,
//! key derivation, the Negotiate/Challenge/Authenticate message codec, and
//! the sign/seal session layer, wired together by a negotiation state
//! machine for both the initiator and acceptor roles.
//!
//! Credential acquisition, transport, SPNEGO/mechanism negotiation, and
//! NTLM credential caching are all out of scope; this crate only speaks
//! the wire protocol and derives the keys MS-NLMP defines.

mod byte_helper;

pub mod crypto;
pub mod flags;
pub mod keys;
pub mod message;
pub mod session;

pub use flags::NegotiateFlags;
pub use message::{AuthenticateMessage, ChallengeMessage, NegotiateMessage, NtlmMessage};
pub use session::{
    AcceptorContext, AccountLookup, AccountRecord, CompatibilityLevel, ContextOption, Credentials,
    ExportedContext, InitiatorConfig, InitiatorContext, Secret, SignSealSession,
};

pub use ntlmssp_core::{NtlmError, NtlmResult};
