//! PDF content encryption for the writer.
//!
//! The creator only ever talks to a [`CryptoHandler`]: a capability that
//! turns plaintext into ciphertext for a given object/generation number. The
//! [`Encryptor`] wraps that capability in the two-call protocol the writer
//! uses (query the exact output size, then fill a buffer of that size).
//!
//! The bundled [`StandardCryptoHandler`] implements the standard security
//! handler ciphers:
//!
//! - RC4-40 (V=1, R=2) and RC4-128 (V=2, R=3)
//! - AES-128 in CBC mode (V=4, R=4), 16-byte IV prepended
//!
//! [`StandardSecurity`] builds a fresh `/Encrypt` dictionary and a matching
//! handler from passwords.
//!
//! # References
//!
//! - PDF Spec Section 7.6.2: General Encryption Algorithm (Algorithm 1)
//! - PDF Spec Section 7.6.3: Standard Security Handler (Algorithms 2-5)

use crate::error::{Error, Result};
use std::borrow::Cow;

mod aes;
mod algorithms;
mod rc4;
mod standard;

pub use standard::{StandardCryptoHandler, StandardSecurity};

/// Encryption algorithm of the standard security handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// RC4 with 40-bit key (PDF 1.4, V=1, R=2)
    Rc4_40,
    /// RC4 with 128-bit key (PDF 1.5, V=2, R=3)
    Rc4_128,
    /// AES with 128-bit key in CBC mode (PDF 1.6, V=4, R=4)
    Aes128,
}

impl Algorithm {
    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        match self {
            Algorithm::Rc4_40 => 5,
            Algorithm::Rc4_128 | Algorithm::Aes128 => 16,
        }
    }

    /// `(V, R)` values for the encryption dictionary.
    pub fn version_revision(&self) -> (i64, u32) {
        match self {
            Algorithm::Rc4_40 => (1, 2),
            Algorithm::Rc4_128 => (2, 3),
            Algorithm::Aes128 => (4, 4),
        }
    }

    /// Whether this is an AES variant.
    pub fn is_aes(&self) -> bool {
        matches!(self, Algorithm::Aes128)
    }
}

/// Content encryption capability keyed by object and generation number.
///
/// Calls are stateless per object: the same handler may be shared by every
/// object of a save.
pub trait CryptoHandler: Send + Sync {
    /// Exact number of bytes `encrypt_content` will produce for `plaintext`.
    fn encrypt_size(&self, obj_num: u32, gen: u16, plaintext: &[u8]) -> usize;

    /// Encrypt `plaintext` into `dest`, returning the number of bytes written.
    fn encrypt_content(
        &self,
        obj_num: u32,
        gen: u16,
        plaintext: &[u8],
        dest: &mut [u8],
    ) -> Result<usize>;

    /// Decrypt a payload produced by `encrypt_content`.
    fn decrypt_content(&self, obj_num: u32, gen: u16, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Whether the XMP metadata stream is encrypted too.
    fn encrypt_metadata(&self) -> bool {
        true
    }
}

/// Applies an optional crypto handler to object content.
#[derive(Clone, Copy, Default)]
pub struct Encryptor<'h> {
    handler: Option<&'h dyn CryptoHandler>,
}

impl<'h> Encryptor<'h> {
    /// Wrap an optional handler. `None` passes content through unchanged.
    pub fn new(handler: Option<&'h dyn CryptoHandler>) -> Self {
        Self { handler }
    }

    /// An encryptor that never encrypts.
    pub fn none() -> Self {
        Self { handler: None }
    }

    /// Whether a handler is present.
    pub fn is_active(&self) -> bool {
        self.handler.is_some()
    }

    /// Encrypt `plaintext` for object `obj_num` with generation `gen`.
    ///
    /// Returns the input unchanged when no handler is present or the input
    /// is empty. Otherwise the handler is asked for the output size first and
    /// then fills a buffer of exactly that size.
    pub fn encrypt<'a>(&self, obj_num: u32, gen: u16, plaintext: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        let handler = match self.handler {
            Some(h) if !plaintext.is_empty() => h,
            _ => return Ok(Cow::Borrowed(plaintext)),
        };

        let size = handler.encrypt_size(obj_num, gen, plaintext);
        let mut dest = vec![0u8; size];
        let written = handler
            .encrypt_content(obj_num, gen, plaintext, &mut dest)
            .map_err(|e| match e {
                Error::Encryption { .. } => e,
                other => Error::Encryption {
                    obj_num,
                    reason: other.to_string(),
                },
            })?;
        if written > size {
            return Err(Error::Encryption {
                obj_num,
                reason: format!("handler wrote {} bytes into a {} byte buffer", written, size),
            });
        }
        dest.truncate(written);
        Ok(Cow::Owned(dest))
    }
}

impl std::fmt::Debug for Encryptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor")
            .field("active", &self.is_active())
            .finish()
    }
}
