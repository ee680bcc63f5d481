pub mod error;
pub mod logging;
pub mod nt_status;

pub use error::{NtlmError, NtlmResult};
pub use nt_status::{GssMajorCode, NtStatus};
