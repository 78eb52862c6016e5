//! AES-256-CBC encryption and PBKDF2 key derivation.
//!
//! The original tool hand-rolled both AES and a 1000-round XOR-mixing
//! key derivation (`crypto.c`'s `aes_encrypt_cbc`/`derive_key_from_password`).
//! This kernel's user-space tool uses the `aes`/`cbc` and `pbkdf2`/`sha2`
//! crates instead — the teacher's workspace already standardizes on
//! RustCrypto-style crates for anything cryptographic (`ed25519-dalek` in
//! the kernel's own security layer), so this follows the same family
//! rather than hand-rolling a block cipher in a user-space tool.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const KEY_SIZE: usize = 32;
const PBKDF2_ROUNDS: u32 = 100_000;

/// Derives a 256-bit key from `password` and `salt` with PBKDF2-HMAC-SHA256.
/// The original's 1000-round XOR mix is not a real KDF; this replaces it
/// wholesale rather than matching its round count.
pub fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

pub fn encrypt(key: &[u8; KEY_SIZE], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

pub fn decrypt(key: &[u8; KEY_SIZE], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>, cbc::cipher::block_padding::UnpadError> {
    Aes256CbcDec::new(&(*key).into(), &(*iv).into()).decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
}

/// Best-effort secure erase, mirroring the original's `secure_memset`.
pub fn wipe_key(key: &mut [u8; KEY_SIZE]) {
    key.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation_is_deterministic_given_the_same_salt() {
        let a = derive_key("hunter2", b"0123456789abcdef");
        let b = derive_key("hunter2", b"0123456789abcdef");
        assert_eq!(a, b);
    }

    #[test]
    fn key_derivation_differs_across_salts() {
        let a = derive_key("hunter2", b"0123456789abcdef");
        let b = derive_key("hunter2", b"fedcba9876543210");
        assert_ne!(a, b);
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = derive_key("correct horse", b"0123456789abcdef");
        let iv = [5u8; 16];
        let plaintext = b"Pentagon-level payload";
        let ciphertext = encrypt(&key, &iv, plaintext);
        let recovered = decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn zero_length_plaintext_round_trips() {
        let key = derive_key("pw", b"0123456789abcdef");
        let iv = [0u8; 16];
        let ciphertext = encrypt(&key, &iv, b"");
        let recovered = decrypt(&key, &iv, &ciphertext).unwrap();
        assert!(recovered.is_empty());
    }

    #[test]
    fn wrong_key_fails_to_unpad() {
        let iv = [1u8; 16];
        let right_key = derive_key("right", b"0123456789abcdef");
        let wrong_key = derive_key("wrong", b"0123456789abcdef");
        let ciphertext = encrypt(&right_key, &iv, b"some secret bytes, block aligned");
        assert!(decrypt(&wrong_key, &iv, &ciphertext).is_err() || decrypt(&wrong_key, &iv, &ciphertext).unwrap() != b"some secret bytes, block aligned");
    }
}
