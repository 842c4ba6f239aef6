//! AES-128-CBC with PKCS#7 padding.
//!
//! PDF Spec: Section 7.6.2 - AESV2 crypt filter. The 16-byte IV is stored in
//! front of the ciphertext by the caller.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES block size in bytes.
pub const BLOCK: usize = 16;

/// Ciphertext length for `len` plaintext bytes (padding always adds a block or less).
pub fn padded_len(len: usize) -> usize {
    (len / BLOCK + 1) * BLOCK
}

/// Encrypt with AES-128-CBC and PKCS#7 padding.
pub fn aes128_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    if key.len() != BLOCK {
        return Err("AES-128 key must be 16 bytes");
    }
    if iv.len() != BLOCK {
        return Err("IV must be 16 bytes");
    }

    let pad = BLOCK - data.len() % BLOCK;
    let mut buf = Vec::with_capacity(data.len() + pad);
    buf.extend_from_slice(data);
    buf.resize(data.len() + pad, pad as u8);

    let len = buf.len();
    Aes128CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .map_err(|_| "Encryption failed")?;
    Ok(buf)
}

/// Decrypt AES-128-CBC and strip PKCS#7 padding.
pub fn aes128_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, &'static str> {
    if key.len() != BLOCK {
        return Err("AES-128 key must be 16 bytes");
    }
    if iv.len() != BLOCK {
        return Err("IV must be 16 bytes");
    }
    if data.is_empty() || data.len() % BLOCK != 0 {
        return Err("Encrypted data length must be a non-zero multiple of 16");
    }

    let mut buf = data.to_vec();
    let plain = Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| "Decryption failed")?;

    let pad = plain[plain.len() - 1] as usize;
    if pad == 0 || pad > BLOCK || plain[plain.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err("Invalid PKCS#7 padding");
    }
    Ok(plain[..plain.len() - pad].to_vec())
}
