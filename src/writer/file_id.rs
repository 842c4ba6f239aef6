//! Document `/ID` values.

use crate::object::Object;
use md5::{Digest, Md5};

/// The two-element `/ID` array of the trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileId {
    /// Permanent identifier, fixed when the file is first created
    pub first: Vec<u8>,
    /// Changing identifier, updated on every save
    pub second: Vec<u8>,
}

impl FileId {
    /// Create an ID from both halves.
    pub fn new(first: Vec<u8>, second: Vec<u8>) -> Self {
        Self { first, second }
    }

    /// The `[<first> <second>]` array.
    pub fn to_object(&self) -> Object {
        Object::Array(vec![
            Object::String(self.first.clone()),
            Object::String(self.second.clone()),
        ])
    }
}

/// Source of fresh ID halves.
pub trait IdGenerator {
    /// Produce a new identifier, conventionally 16 bytes.
    fn generate(&mut self) -> Vec<u8>;
}

impl<F> IdGenerator for F
where
    F: FnMut() -> Vec<u8>,
{
    fn generate(&mut self) -> Vec<u8> {
        self()
    }
}

/// MD5 over a random UUID and the current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&mut self) -> Vec<u8> {
        random_digest().to_vec()
    }
}

/// 16 unpredictable bytes.
pub(crate) fn random_digest() -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    hasher.update(now.as_nanos().to_le_bytes());

    let mut digest = [0u8; 16];
    digest.copy_from_slice(&hasher.finalize());
    digest
}
