/// A keyed RC4 stream, rekeyable in place. NTLM's sign/seal layer keeps one
/// of these per direction (spec §3, "Sign/seal session").
///
/// Implemented by hand rather than via a RustCrypto cipher type because the
/// exported context token (spec §6) must serialise the raw S-box and index
/// pair, which an opaque cipher type doesn't expose.
pub struct Rc4Stream {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4Stream {
    /// `rc4_init(key)`: runs the key-scheduling algorithm over a 16-byte key.
    pub fn new(key: &[u8; 16]) -> Self {
        let mut s = [0u8; 256];
        for (idx, slot) in s.iter_mut().enumerate() {
            *slot = idx as u8;
        }

        let mut j: u8 = 0;
        for i in 0..256usize {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }

        Self { s, i: 0, j: 0 }
    }

    /// Reconstructs a stream from previously exported state (spec §6's
    /// "256-byte S-box permutation || two byte indices").
    pub fn from_state(s: [u8; 256], i: u8, j: u8) -> Self {
        Self { s, i, j }
    }

    /// Exports the raw internal state for the exported context token.
    pub fn export_state(&self) -> ([u8; 256], u8, u8) {
        (self.s, self.i, self.j)
    }

    /// `rc4_update(state, bytes)`: encrypts (equivalently, decrypts) `data`
    /// in place against the running keystream (the pseudo-random generation
    /// algorithm).
    pub fn process(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.i = self.i.wrapping_add(1);
            self.j = self.j.wrapping_add(self.s[self.i as usize]);
            self.s.swap(self.i as usize, self.j as usize);
            let k = self.s[(self.s[self.i as usize].wrapping_add(self.s[self.j as usize])) as usize];
            *byte ^= k;
        }
    }

    /// Encrypts `data`, returning a new buffer, without disturbing the
    /// convention that `process` mutates in place (used where the caller
    /// already owns a mutable copy).
    pub fn process_to_vec(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.process(&mut out);
        out
    }

    /// Re-seeds the stream with a new key, discarding all prior keystream
    /// state (spec §4.4, "Rekeying").
    pub fn rekey(&mut self, key: &[u8; 16]) {
        *self = Self::new(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_is_identity() {
        let key = [0x55u8; 16];
        let plaintext = b"Plaintext message".to_vec();

        let mut enc = Rc4Stream::new(&key);
        let ciphertext = enc.process_to_vec(&plaintext);
        assert_ne!(ciphertext, plaintext);

        let mut dec = Rc4Stream::new(&key);
        let recovered = dec.process_to_vec(&ciphertext);
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn keystream_is_deterministic_for_a_given_key() {
        let key = [0x11u8; 16];
        let mut a = Rc4Stream::new(&key);
        let mut b = Rc4Stream::new(&key);
        let mut buf_a = [0u8; 32];
        let mut buf_b = [0u8; 32];
        a.process(&mut buf_a);
        b.process(&mut buf_b);
        assert_eq!(buf_a, buf_b);
    }

    #[test]
    fn rekey_discards_prior_state() {
        let key_a = [0x01u8; 16];
        let key_b = [0x02u8; 16];
        let mut stream = Rc4Stream::new(&key_a);
        let mut warm = [0u8; 10];
        stream.process(&mut warm);

        stream.rekey(&key_b);
        let mut fresh = Rc4Stream::new(&key_b);

        let mut buf_a = [0u8; 16];
        let mut buf_b = [0u8; 16];
        stream.process(&mut buf_a);
        fresh.process(&mut buf_b);
        assert_eq!(buf_a, buf_b);
    }

    #[test]
    fn exported_state_reconstructs_identical_stream() {
        let key = [0x9au8; 16];
        let mut a = Rc4Stream::new(&key);
        let mut warm = [0u8; 37];
        a.process(&mut warm);

        let (s, i, j) = a.export_state();
        let mut b = Rc4Stream::from_state(s, i, j);

        let mut buf_a = [0u8; 20];
        let mut buf_b = [0u8; 20];
        a.process(&mut buf_a);
        b.process(&mut buf_b);
        assert_eq!(buf_a, buf_b);
    }
}
