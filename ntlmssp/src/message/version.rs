/// The OS-version quadruple reported in the optional Version field
/// (spec §3, §9 — modelled as an explicit field rather than process-global
/// state, defaulting to a fixed constant and overridable for reproducible
/// tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub build: u16,
    pub revision: u8,
}

/// Windows 7 SP1 (6.1.7601), the constant MS-NLMP's own examples use.
pub const DEFAULT_VERSION: Version = Version {
    major: 6,
    minor: 1,
    build: 7601,
    revision: 15,
};

impl Version {
    pub fn to_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = self.major;
        out[1] = self.minor;
        out[2..4].copy_from_slice(&self.build.to_le_bytes());
        // out[4..7] reserved, stays zero
        out[7] = self.revision;
        out
    }

    pub fn from_bytes(bytes: &[u8; 8]) -> Self {
        Self {
            major: bytes[0],
            minor: bytes[1],
            build: u16::from_le_bytes([bytes[2], bytes[3]]),
            revision: bytes[7],
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        DEFAULT_VERSION
    }
}
