//! Key derivation (spec §4.2): turns identity + secret + challenges into
//! the derived keys and response blobs the protocol defines.

pub mod owf;
pub mod response;
pub mod secret;
pub mod signseal_keys;

pub use owf::{lmowf_v1, ntowf_v1, ntowf_v2};
pub use response::{
    key_exchange_key, lmv1_response, lmv2_response, ntv1_response, ntv2_response,
    session_base_key_v1, session_base_key_v2,
};
pub use secret::SecretKey;
pub use signseal_keys::{seal_key, sign_key, Direction};
