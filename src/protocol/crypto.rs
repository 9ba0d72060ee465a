//! AES/CFB8 stream cipher wrappers for the upstream leg.
//!
//! CFB8 shifts its feedback register one byte per step, so both directions
//! are driven byte-by-byte rather than block-aligned. The shared secret
//! doubles as key and IV.

use aes::{cipher::generic_array::GenericArray, Aes128};
use cfb8::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::slice;

/// Key used for encryption.
#[derive(Copy, Clone)]
pub struct EncryptionKey([u8; 16]);

impl EncryptionKey {
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

/// Encrypting half of the upstream cipher pair.
pub struct StreamEncryptor(cfb8::Encryptor<Aes128>);

impl StreamEncryptor {
    pub fn new(key: EncryptionKey) -> Self {
        Self(cfb8::Encryptor::new(&key.0.into(), &key.0.into()))
    }

    /// Encrypts `data` in place.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            let block = slice::from_mut(byte);
            self.0.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

/// Decrypting half of the upstream cipher pair.
pub struct StreamDecryptor(cfb8::Decryptor<Aes128>);

impl StreamDecryptor {
    pub fn new(key: EncryptionKey) -> Self {
        Self(cfb8::Decryptor::new(&key.0.into(), &key.0.into()))
    }

    /// Decrypts `data` in place.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            let block = slice::from_mut(byte);
            self.0.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}
