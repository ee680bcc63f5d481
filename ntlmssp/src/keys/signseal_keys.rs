use crate::crypto::md5;
use crate::flags::NegotiateFlags;

const CLIENT_SIGN_MAGIC: &[u8] = b"session key to client-to-server signing key magic constant\0";
const SERVER_SIGN_MAGIC: &[u8] = b"session key to server-to-client signing key magic constant\0";
const CLIENT_SEAL_MAGIC: &[u8] = b"session key to client-to-server sealing key magic constant\0";
const SERVER_SEAL_MAGIC: &[u8] = b"session key to server-to-client sealing key magic constant\0";

/// Which end of the conversation a key is being derived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// `SIGNKEY(direction) = MD5(ExportedSessionKey || magic)` (spec §4.2).
pub fn sign_key(exported_session_key: &[u8; 16], direction: Direction) -> [u8; 16] {
    let magic = match direction {
        Direction::ClientToServer => CLIENT_SIGN_MAGIC,
        Direction::ServerToClient => SERVER_SIGN_MAGIC,
    };
    let mut message = exported_session_key.to_vec();
    message.extend_from_slice(magic);
    md5(&message)
}

/// `SEALKEY(flags, direction)` (spec §4.2): depends on the negotiated key
/// size (128/56/40-bit).
pub fn seal_key(
    exported_session_key: &[u8; 16],
    flags: NegotiateFlags,
    direction: Direction,
) -> [u8; 16] {
    let magic = match direction {
        Direction::ClientToServer => CLIENT_SEAL_MAGIC,
        Direction::ServerToClient => SERVER_SEAL_MAGIC,
    };

    let mut message = if flags.contains(NegotiateFlags::NEGOTIATE_128) {
        exported_session_key.to_vec()
    } else if flags.contains(NegotiateFlags::NEGOTIATE_56) {
        let mut m = exported_session_key[0..7].to_vec();
        m.extend_from_slice(&[0xe5, 0x38, 0xb0]);
        m
    } else {
        let mut m = exported_session_key[0..5].to_vec();
        m.extend_from_slice(&[0xe5, 0x38, 0xb0]);
        m
    };
    message.extend_from_slice(magic);
    md5(&message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_keys_differ_by_direction() {
        let key = [0x55u8; 16];
        let send = sign_key(&key, Direction::ClientToServer);
        let recv = sign_key(&key, Direction::ServerToClient);
        assert_ne!(send, recv);
    }

    #[test]
    fn seal_keys_differ_by_direction() {
        let key = [0x55u8; 16];
        let flags = NegotiateFlags::NEGOTIATE_128;
        let send = seal_key(&key, flags, Direction::ClientToServer);
        let recv = seal_key(&key, flags, Direction::ServerToClient);
        assert_ne!(send, recv);
    }
}
