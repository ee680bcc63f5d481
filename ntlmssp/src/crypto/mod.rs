//! Fixed-function crypto primitives (spec §4.1). Pure functions over byte
//! buffers; no protocol knowledge lives here.

pub mod crc32;
pub mod des;
pub mod hash;
pub mod rc4;
pub mod unicode;

pub use crc32::crc32;
pub use des::{desl, des_block};
pub use hash::{hmac_md5, md4, md5};
pub use rc4::Rc4Stream;
pub use unicode::{upper_utf16le, utf16le_to_utf8, utf8_to_utf16le};
