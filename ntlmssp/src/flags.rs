use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// The 32-bit NTLM negotiate flag set (spec §3, "Negotiation flag set").
    /// Bit names and values match MS-NLMP exactly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
    pub struct NegotiateFlags: u32 {
        const NEGOTIATE_UNICODE                 = 0x0000_0001;
        const NEGOTIATE_OEM                     = 0x0000_0002;
        const REQUEST_TARGET                    = 0x0000_0004;
        const NEGOTIATE_SIGN                    = 0x0000_0010;
        const NEGOTIATE_SEAL                    = 0x0000_0020;
        const NEGOTIATE_DATAGRAM                = 0x0000_0040;
        const NEGOTIATE_LM_KEY                  = 0x0000_0080;
        const NEGOTIATE_NTLM                    = 0x0000_0200;
        const NEGOTIATE_ANONYMOUS               = 0x0000_0800;
        const NEGOTIATE_DOMAIN_SUPPLIED         = 0x0000_1000;
        const NEGOTIATE_WORKSTATION_SUPPLIED    = 0x0000_2000;
        const NEGOTIATE_ALWAYS_SIGN             = 0x0000_8000;
        const TARGET_TYPE_DOMAIN                = 0x0001_0000;
        const TARGET_TYPE_SERVER                = 0x0002_0000;
        const NEGOTIATE_EXTENDED_SESSIONSECURITY = 0x0008_0000;
        const NEGOTIATE_IDENTIFY                = 0x0010_0000;
        const REQUEST_NON_NT_SESSION_KEY        = 0x0040_0000;
        const NEGOTIATE_TARGET_INFO             = 0x0080_0000;
        const NEGOTIATE_VERSION                 = 0x0200_0000;
        const NEGOTIATE_128                     = 0x2000_0000;
        const NEGOTIATE_KEY_EXCH                = 0x4000_0000;
        const NEGOTIATE_56                      = 0x8000_0000;
    }
}

impl NegotiateFlags {
    pub fn ess(&self) -> bool {
        self.contains(Self::NEGOTIATE_EXTENDED_SESSIONSECURITY)
    }

    pub fn unicode(&self) -> bool {
        self.contains(Self::NEGOTIATE_UNICODE)
    }
}
