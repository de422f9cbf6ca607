//! RC4 stream cipher.
//!
//! The classical algorithm, unmodified: no key-length floor and no discarded
//! keystream prefix, so ciphertext stays compatible with other RC4
//! implementations. There is no integrity check; corrupted ciphertext
//! decrypts to garbage without error.
//!
//! Every call builds a fresh state from the key. Nothing carries over
//! between calls.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, CryptoResult};

#[derive(Zeroize, ZeroizeOnDrop)]
struct Rc4State {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4State {
    /// Key-scheduling algorithm
    fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (idx, slot) in s.iter_mut().enumerate() {
            *slot = idx as u8;
        }

        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }

        Self { s, i: 0, j: 0 }
    }

    /// Pseudo-random generation algorithm, one keystream byte
    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let idx = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[idx as usize]
    }

    fn apply(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= self.next_byte();
        }
    }
}

/// XOR `data` with the keystream for `key`, returning a new buffer
pub fn apply_keystream(key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    if key.is_empty() {
        return Err(CryptoError::EmptyCipherKey);
    }
    let mut out = data.to_vec();
    Rc4State::new(key).apply(&mut out);
    Ok(out)
}

pub fn encrypt(key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    apply_keystream(key, plaintext)
}

pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    apply_keystream(key, ciphertext)
}

/// The first `len` keystream bytes for `key`
pub fn keystream(key: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    apply_keystream(key, &vec![0u8; len])
}
