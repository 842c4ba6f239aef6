//! Standard security handler for writing.
//!
//! [`StandardCryptoHandler`] owns the file key and derives a per-object key
//! for every payload (Algorithm 1). [`StandardSecurity`] turns passwords into
//! a complete `/Encrypt` dictionary plus a handler for that dictionary.

use super::aes;
use super::algorithms;
use super::rc4::Rc4;
use super::{Algorithm, CryptoHandler};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use crate::writer::file_id::random_digest;
use md5::{Digest, Md5};

/// Crypto handler for the standard RC4 and AES-128 ciphers.
#[derive(Clone)]
pub struct StandardCryptoHandler {
    /// File encryption key (5 or 16 bytes)
    key: Vec<u8>,
    algorithm: Algorithm,
    encrypt_metadata: bool,
}

impl StandardCryptoHandler {
    /// Create a handler from an already derived file key.
    pub fn from_key(key: Vec<u8>, algorithm: Algorithm, encrypt_metadata: bool) -> Self {
        Self {
            key,
            algorithm,
            encrypt_metadata,
        }
    }

    /// The cipher in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The file encryption key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Algorithm 1: per-object key.
    ///
    /// MD5 over the file key, the low three bytes of the object number, the
    /// low two bytes of the generation, and `sAlT` for AES. The result is cut
    /// to `min(n + 5, 16)` bytes.
    fn object_key(&self, obj_num: u32, gen: u16) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(&self.key);
        hasher.update(&obj_num.to_le_bytes()[..3]);
        hasher.update(gen.to_le_bytes());
        if self.algorithm.is_aes() {
            hasher.update(b"sAlT");
        }
        let hash = hasher.finalize();
        let len = (self.key.len() + 5).min(16);
        hash[..len].to_vec()
    }

    fn encryption_error(obj_num: u32, reason: &str) -> Error {
        Error::Encryption {
            obj_num,
            reason: reason.to_string(),
        }
    }
}

impl CryptoHandler for StandardCryptoHandler {
    fn encrypt_size(&self, _obj_num: u32, _gen: u16, plaintext: &[u8]) -> usize {
        if self.algorithm.is_aes() {
            aes::BLOCK + aes::padded_len(plaintext.len())
        } else {
            plaintext.len()
        }
    }

    fn encrypt_content(
        &self,
        obj_num: u32,
        gen: u16,
        plaintext: &[u8],
        dest: &mut [u8],
    ) -> Result<usize> {
        let needed = self.encrypt_size(obj_num, gen, plaintext);
        if dest.len() < needed {
            return Err(Self::encryption_error(obj_num, "destination buffer too small"));
        }

        let key = self.object_key(obj_num, gen);
        if self.algorithm.is_aes() {
            let iv = random_digest();
            let ciphertext = aes::aes128_encrypt(&key, &iv, plaintext)
                .map_err(|e| Self::encryption_error(obj_num, e))?;
            dest[..aes::BLOCK].copy_from_slice(&iv);
            dest[aes::BLOCK..needed].copy_from_slice(&ciphertext);
        } else {
            dest[..needed].copy_from_slice(plaintext);
            Rc4::new(&key).apply(&mut dest[..needed]);
        }
        Ok(needed)
    }

    fn decrypt_content(&self, obj_num: u32, gen: u16, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.object_key(obj_num, gen);
        if self.algorithm.is_aes() {
            if ciphertext.len() < aes::BLOCK {
                return Err(Self::encryption_error(obj_num, "ciphertext shorter than IV"));
            }
            let (iv, body) = ciphertext.split_at(aes::BLOCK);
            aes::aes128_decrypt(&key, iv, body).map_err(|e| Self::encryption_error(obj_num, e))
        } else {
            let mut out = ciphertext.to_vec();
            Rc4::new(&key).apply(&mut out);
            Ok(out)
        }
    }

    fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }
}

/// Password-based security settings for a new `/Encrypt` dictionary.
#[derive(Debug, Clone)]
pub struct StandardSecurity {
    user_password: Vec<u8>,
    owner_password: Vec<u8>,
    permissions: i32,
    algorithm: Algorithm,
    encrypt_metadata: bool,
}

impl StandardSecurity {
    /// Security settings with the given passwords and `/P` permission bits.
    pub fn new(user_password: &str, owner_password: &str, permissions: i32, algorithm: Algorithm) -> Self {
        Self {
            user_password: user_password.as_bytes().to_vec(),
            owner_password: owner_password.as_bytes().to_vec(),
            permissions,
            algorithm,
            encrypt_metadata: true,
        }
    }

    /// Leave the XMP metadata stream unencrypted (AES only).
    pub fn with_encrypt_metadata(mut self, encrypt: bool) -> Self {
        self.encrypt_metadata = encrypt;
        self
    }

    /// The cipher these settings select.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Build the `/Encrypt` dictionary and its handler for a document whose
    /// first ID element is `file_id`.
    pub fn build(&self, file_id: &[u8]) -> (Dictionary, StandardCryptoHandler) {
        let (v, r) = self.algorithm.version_revision();
        let key_length = self.algorithm.key_length();
        let encrypt_metadata = self.encrypt_metadata || r < 4;

        let owner_hash = algorithms::compute_owner_hash(
            &self.owner_password,
            &self.user_password,
            r,
            key_length,
        );
        let key = algorithms::compute_encryption_key(
            &self.user_password,
            &owner_hash,
            self.permissions,
            file_id,
            r,
            key_length,
            encrypt_metadata,
        );
        let user_hash = algorithms::compute_user_hash(&key, file_id, r);

        let mut dict = Dictionary::new();
        dict.insert("Filter".to_string(), Object::Name("Standard".to_string()));
        dict.insert("V".to_string(), Object::Integer(v));
        dict.insert("R".to_string(), Object::Integer(i64::from(r)));
        dict.insert("Length".to_string(), Object::Integer((key_length * 8) as i64));
        if self.algorithm.is_aes() {
            let mut std_cf = Dictionary::new();
            std_cf.insert("CFM".to_string(), Object::Name("AESV2".to_string()));
            std_cf.insert("AuthEvent".to_string(), Object::Name("DocOpen".to_string()));
            std_cf.insert("Length".to_string(), Object::Integer(16));
            let mut cf = Dictionary::new();
            cf.insert("StdCF".to_string(), Object::Dictionary(std_cf));
            dict.insert("CF".to_string(), Object::Dictionary(cf));
            dict.insert("StmF".to_string(), Object::Name("StdCF".to_string()));
            dict.insert("StrF".to_string(), Object::Name("StdCF".to_string()));
        }
        dict.insert("O".to_string(), Object::String(owner_hash));
        dict.insert("U".to_string(), Object::String(user_hash));
        dict.insert("P".to_string(), Object::Integer(i64::from(self.permissions)));
        if !encrypt_metadata {
            dict.insert("EncryptMetadata".to_string(), Object::Boolean(false));
        }

        let handler = StandardCryptoHandler::from_key(key, self.algorithm, encrypt_metadata);
        (dict, handler)
    }
}
