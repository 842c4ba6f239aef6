//! Standard security handler key derivation (revisions 2 to 4).
//!
//! PDF Spec: Section 7.6.3.3 - Algorithms 2 and 3, Section 7.6.3.4 - Algorithms 4 and 5

use super::rc4::rc4_crypt;
use md5::{Digest, Md5};

/// Password padding string (Algorithm 2, step a).
const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Pad or truncate a password to 32 bytes.
pub fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = PADDING;
    let n = password.len().min(32);
    padded[..n].copy_from_slice(&password[..n]);
    padded[n..].copy_from_slice(&PADDING[..32 - n]);
    padded
}

/// Re-hash the first `len` bytes of `hash` fifty times (R >= 3).
fn stretch(mut hash: Vec<u8>, len: usize) -> Vec<u8> {
    for _ in 0..50 {
        hash = Md5::digest(&hash[..len]).to_vec();
    }
    hash
}

/// RC4 `data` with the key XORed by each counter value in turn.
fn rc4_rounds(key: &[u8], mut data: Vec<u8>, rounds: std::ops::RangeInclusive<u8>) -> Vec<u8> {
    for round in rounds {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
        data = rc4_crypt(&round_key, &data);
    }
    data
}

/// Algorithm 2: file encryption key from the user password.
pub fn compute_encryption_key(
    password: &[u8],
    owner_hash: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u32,
    key_length: usize,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let key_length = key_length.min(16);

    let mut hasher = Md5::new();
    hasher.update(pad_password(password));
    hasher.update(owner_hash);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF; 4]);
    }
    let mut hash = hasher.finalize().to_vec();

    if revision >= 3 {
        hash = stretch(hash, key_length);
    }
    hash.truncate(key_length);
    hash
}

/// Algorithm 3: the `/O` value.
pub fn compute_owner_hash(
    owner_password: &[u8],
    user_password: &[u8],
    revision: u32,
    key_length: usize,
) -> Vec<u8> {
    let key_length = key_length.min(16);
    let password = if owner_password.is_empty() {
        user_password
    } else {
        owner_password
    };

    let mut hash = Md5::digest(pad_password(password)).to_vec();
    if revision >= 3 {
        hash = stretch(hash, key_length);
    }
    let key = &hash[..key_length];

    let result = rc4_crypt(key, &pad_password(user_password));
    if revision >= 3 {
        rc4_rounds(key, result, 1..=19)
    } else {
        result
    }
}

/// Algorithms 4 and 5: the `/U` value.
pub fn compute_user_hash(encryption_key: &[u8], file_id: &[u8], revision: u32) -> Vec<u8> {
    if revision < 3 {
        return rc4_crypt(encryption_key, &PADDING);
    }

    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let hash = hasher.finalize().to_vec();

    let mut result = rc4_crypt(encryption_key, &hash);
    result = rc4_rounds(encryption_key, result, 1..=19);
    // Arbitrary padding to 32 bytes
    result.resize(32, 0);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_password() {
        let padded = pad_password(b"abc");
        assert_eq!(&padded[..3], b"abc");
        assert_eq!(&padded[3..], &PADDING[..29]);
        assert_eq!(pad_password(b""), PADDING);
        assert_eq!(pad_password(&[b'x'; 40]), [b'x'; 32]);
    }

    #[test]
    fn test_key_lengths() {
        let o = compute_owner_hash(b"owner", b"user", 3, 16);
        assert_eq!(o.len(), 32);
        let key = compute_encryption_key(b"user", &o, -4, b"0123456789abcdef", 3, 16, true);
        assert_eq!(key.len(), 16);
        let key40 = compute_encryption_key(b"user", &o, -4, b"0123456789abcdef", 2, 5, true);
        assert_eq!(key40.len(), 5);
    }

    #[test]
    fn test_user_hash_r2_is_encrypted_padding() {
        let key = [1u8, 2, 3, 4, 5];
        let u = compute_user_hash(&key, b"", 2);
        assert_eq!(rc4_crypt(&key, &u), PADDING.to_vec());
    }

    #[test]
    fn test_user_hash_r3_length() {
        let u = compute_user_hash(&[9u8; 16], b"id", 3);
        assert_eq!(u.len(), 32);
        assert!(u[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_metadata_flag_changes_key_for_r4() {
        let o = compute_owner_hash(b"", b"", 4, 16);
        let a = compute_encryption_key(b"", &o, -1, b"id", 4, 16, true);
        let b = compute_encryption_key(b"", &o, -1, b"id", 4, 16, false);
        assert_ne!(a, b);
    }
}
