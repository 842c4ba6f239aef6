//! Configuration for a save operation.

use bitflags::bitflags;

/// Default capacity of one object stream's uncompressed buffer (256 KiB).
pub const OBJECT_STREAM_MAX_LEN: usize = 256 * 1024;

bitflags! {
    /// Save mode flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CreateFlags: u32 {
        /// Append new and modified objects after the prior revision
        const INCREMENTAL = 1 << 0;
        /// Incremental save whose output omits the prior bytes; the caller appends it
        const NO_ORIGINAL = 1 << 1;
        /// Pack eligible objects into object streams and emit an xref stream
        const OBJECT_STREAM = 1 << 2;
        /// `create` only initializes; the caller drives `continue_with`
        const PROGRESSIVE = 1 << 3;
    }
}

/// Options for a single save.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Save mode flags.
    pub flags: CreateFlags,

    /// Flate-encode streams that have no `/Filter` yet.
    pub compress: bool,

    /// Generate a document ID when the document has none.
    pub generate_id: bool,

    /// Buffer length at which an object stream is flushed.
    pub object_stream_max_len: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveOptions {
    /// Full save, compressed, with a generated ID.
    pub fn new() -> Self {
        Self {
            flags: CreateFlags::empty(),
            compress: true,
            generate_id: true,
            object_stream_max_len: OBJECT_STREAM_MAX_LEN,
        }
    }

    /// Incremental save appended to the prior revision.
    pub fn incremental() -> Self {
        Self::new().with_flags(CreateFlags::INCREMENTAL)
    }

    /// Replace the flag set.
    pub fn with_flags(mut self, flags: CreateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Enable or disable object streams.
    pub fn with_object_streams(mut self, enable: bool) -> Self {
        self.flags.set(CreateFlags::OBJECT_STREAM, enable);
        self
    }

    /// Enable or disable progressive mode.
    pub fn with_progressive(mut self, enable: bool) -> Self {
        self.flags.set(CreateFlags::PROGRESSIVE, enable);
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compress(mut self, enable: bool) -> Self {
        self.compress = enable;
        self
    }

    /// Enable or disable ID generation.
    pub fn with_generate_id(mut self, enable: bool) -> Self {
        self.generate_id = enable;
        self
    }

    /// Set the object stream flush threshold.
    pub fn with_object_stream_max_len(mut self, len: usize) -> Self {
        self.object_stream_max_len = len.max(1);
        self
    }

    /// Whether this is an incremental save.
    pub fn is_incremental(&self) -> bool {
        self.flags.contains(CreateFlags::INCREMENTAL)
    }

    /// Whether object streams are enabled.
    pub fn use_object_streams(&self) -> bool {
        self.flags.contains(CreateFlags::OBJECT_STREAM)
    }
}
