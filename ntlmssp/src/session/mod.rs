//! The sign/seal session layer and negotiation state machine (spec §4.4,
//! §4.5).

pub mod channel_bindings;
pub mod context;
pub mod context_token;
pub mod signseal;

pub use channel_bindings::ChannelBindings;
pub use context::{
    AcceptorContext, AccountLookup, AccountRecord, CompatibilityLevel, Credentials,
    InitiatorConfig, InitiatorContext, Secret,
};
pub use context_token::ExportedContext;
pub use signseal::{
    compute_handshake_mic, ContextOption, SignSealDirection, SignSealSession, SIGNATURE_SIZE,
};
