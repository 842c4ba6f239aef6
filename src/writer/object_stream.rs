//! Object stream accumulator (PDF Spec: Section 7.5.7).
//!
//! Small objects are serialized into a shared buffer and flushed as one
//! `/Type /ObjStm` container, compressed and encrypted as a whole.

use super::flate::FlateEncoder;
use super::object_serializer::ObjectSerializer;
use super::sink::OutputSink;
use super::xref::ObjectNumbers;
use crate::config::OBJECT_STREAM_MAX_LEN;
use crate::encryption::Encryptor;
use crate::error::Result;
use crate::object::Object;

/// One object recorded in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStreamItem {
    /// Object number
    pub obj_num: u32,
    /// Offset of the object's bytes relative to the start of the body
    pub offset: usize,
}

/// Accumulates objects for one object stream at a time.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    items: Vec<ObjectStreamItem>,
    buffer: Vec<u8>,
    obj_num: u32,
    index: usize,
    max_len: usize,
    serializer: ObjectSerializer,
}

impl Default for ObjectStream {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStream {
    /// Create an accumulator with the default 256 KiB cap.
    pub fn new() -> Self {
        Self::with_max_len(OBJECT_STREAM_MAX_LEN)
    }

    /// Create an accumulator that reports full at `max_len` bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            items: Vec::new(),
            buffer: Vec::new(),
            obj_num: 0,
            index: 0,
            max_len: max_len.max(1),
            serializer: ObjectSerializer::new(),
        }
    }

    /// Whether more objects may be added before flushing.
    pub fn is_not_full(&self) -> bool {
        self.buffer.len() < self.max_len
    }

    /// Clear the items and buffer, zeroing the object number and index.
    pub fn start(&mut self) {
        self.items.clear();
        self.buffer.clear();
        self.obj_num = 0;
        self.index = 0;
    }

    /// Serialize `obj` into the container.
    pub fn compress_indirect_object(&mut self, obj_num: u32, obj: &Object) -> Result<()> {
        self.begin_item(obj_num);
        self.serializer.write_object(&mut self.buffer, obj, None)
    }

    /// Add an already serialized object body.
    pub fn compress_indirect_bytes(&mut self, obj_num: u32, body: &[u8]) {
        self.begin_item(obj_num);
        self.buffer.extend_from_slice(body);
    }

    fn begin_item(&mut self, obj_num: u32) {
        if !self.buffer.is_empty() {
            self.buffer.push(b' ');
        }
        self.items.push(ObjectStreamItem {
            obj_num,
            offset: self.buffer.len(),
        });
    }

    /// Objects in the current container, in insertion order.
    pub fn items(&self) -> &[ObjectStreamItem] {
        &self.items
    }

    /// Uncompressed body accumulated so far.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of the current container, 0 until it is flushed.
    pub fn obj_num(&self) -> u32 {
        self.obj_num
    }

    /// Sequence position of the container, zero after `start`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Flush the container and return its offset.
    ///
    /// Returns `None` without writing anything when no object was added.
    /// Items are kept so the caller can record their cross-reference
    /// entries before calling [`start`](Self::start).
    pub fn end<S: OutputSink + ?Sized>(
        &mut self,
        sink: &mut S,
        numbers: &mut ObjectNumbers,
        encryptor: &Encryptor<'_>,
        compress: bool,
    ) -> Result<Option<u64>> {
        if self.items.is_empty() {
            return Ok(None);
        }

        let offset = sink.offset();
        if self.obj_num == 0 {
            self.obj_num = numbers.allocate()?;
        }

        let mut payload = String::new();
        for item in &self.items {
            payload.push_str(&format!("{} {} ", item.obj_num, item.offset));
        }
        let first = payload.len();
        let mut payload = payload.into_bytes();
        payload.extend_from_slice(&self.buffer);

        let encoded = FlateEncoder::encode(&payload, compress, false)?;
        let deflated = encoded.used_new_buffer();
        let encrypted = encryptor.encrypt(self.obj_num, 0, encoded.as_bytes())?;

        let mut header = format!(
            "{} 0 obj\r\n<</Type /ObjStm /N {} /First {} /Length {}",
            self.obj_num,
            self.items.len(),
            first,
            encrypted.len()
        );
        if deflated {
            header.push_str("/Filter /FlateDecode");
        }
        header.push_str(">>stream\r\n");

        sink.write_str(&header)?;
        sink.write_block(&encrypted)?;
        sink.write_str("\r\nendstream\r\nendobj\r\n")?;

        log::debug!(
            "Flushed object stream {} 0 R with {} objects ({} -> {} bytes)",
            self.obj_num,
            self.items.len(),
            payload.len(),
            encrypted.len()
        );
        Ok(Some(offset))
    }
}
