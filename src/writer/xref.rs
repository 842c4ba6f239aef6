//! Cross-reference section builder.
//!
//! Entries are recorded while objects are written and emitted at the end of
//! the save, either as a classical `xref` table (PDF Spec: Section 7.5.4) or
//! as a cross-reference stream (Section 7.5.8).

use super::flate::FlateEncoder;
use super::object_serializer::ObjectSerializer;
use super::sink::OutputSink;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use std::collections::BTreeMap;

/// Allocator for new object numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectNumbers {
    last: u32,
}

impl ObjectNumbers {
    /// Start allocating after `last`.
    pub fn new(last: u32) -> Self {
        Self { last }
    }

    /// Hand out the next object number.
    pub fn allocate(&mut self) -> Result<u32> {
        self.last = self
            .last
            .checked_add(1)
            .ok_or(Error::ObjectNumberExhausted)?;
        Ok(self.last)
    }

    /// Highest number in use.
    pub fn last(&self) -> u32 {
        self.last
    }

    /// `/Size` of a section whose highest number is `last`.
    pub fn size(&self) -> Result<u32> {
        size_after(self.last)
    }
}

fn size_after(last: u32) -> Result<u32> {
    last.checked_add(1).ok_or(Error::ObjectNumberExhausted)
}

/// Location of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free slot
    Free,
    /// Uncompressed object at a byte offset
    Offset {
        /// Byte offset of `N G obj`
        offset: u64,
        /// Generation number
        gen: u16,
    },
    /// Object stored inside an object stream
    Compressed {
        /// Object number of the containing object stream
        stream: u32,
        /// Position within the container
        index: u32,
    },
}

/// Trailer data carried by a cross-reference stream.
#[derive(Debug, Clone, Copy)]
pub struct XrefStreamParams<'a> {
    /// Trailer entries (`/Root`, `/Info`, `/Encrypt`, `/ID`, ...)
    pub trailer: &'a Dictionary,
    /// Offset of the previous cross-reference section
    pub prev: Option<u64>,
    /// Cover every number from 0 instead of only recorded ones
    pub full: bool,
    /// Deflate the records with the PNG Up predictor
    pub compress: bool,
}

/// Accumulates cross-reference entries.
#[derive(Debug, Clone, Default)]
pub struct XrefBuilder {
    entries: BTreeMap<u32, XrefEntry>,
}

impl XrefBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an uncompressed object.
    pub fn add_offset(&mut self, obj_num: u32, offset: u64, gen: u16) -> Result<()> {
        self.insert(obj_num, XrefEntry::Offset { offset, gen })
    }

    /// Record an object stored in an object stream.
    pub fn add_compressed(&mut self, obj_num: u32, stream: u32, index: u32) -> Result<()> {
        self.insert(obj_num, XrefEntry::Compressed { stream, index })
    }

    /// Record a free slot.
    pub fn add_free(&mut self, obj_num: u32) -> Result<()> {
        self.insert(obj_num, XrefEntry::Free)
    }

    fn insert(&mut self, obj_num: u32, entry: XrefEntry) -> Result<()> {
        if self.entries.contains_key(&obj_num) {
            return Err(Error::DuplicateXrefEntry(obj_num));
        }
        self.entries.insert(obj_num, entry);
        Ok(())
    }

    /// Entry recorded for `obj_num`.
    pub fn entry(&self, obj_num: u32) -> Option<XrefEntry> {
        self.entries.get(&obj_num).copied()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded object numbers, ascending.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Contiguous runs `(start, count)` of recorded numbers, excluding 0.
    fn runs(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for &num in self.entries.keys().filter(|&&n| n != 0) {
            match runs.last_mut() {
                Some((start, count)) if u64::from(*start) + u64::from(*count) == u64::from(num) => {
                    *count += 1
                },
                _ => runs.push((num, 1)),
            }
        }
        runs
    }

    /// Write a classical `xref` table and return its offset.
    ///
    /// `Compressed` entries cannot be expressed here and are skipped. In
    /// `full` mode the table always lists object 0.
    pub fn write_table<S: OutputSink + ?Sized>(&self, sink: &mut S, full: bool) -> Result<u64> {
        if let Some((&last, _)) = self.entries.last_key_value() {
            size_after(last)?;
        }
        let start = sink.offset();
        let runs = self.runs();

        let mut out = String::from("xref\r\n");
        let starts_at_one = runs.first().is_some_and(|&(s, _)| s == 1);
        if full && !starts_at_one {
            out.push_str("0 1\r\n0000000000 65535 f\r\n");
        }
        for (first, count) in runs {
            if first == 1 {
                out.push_str(&format!("0 {}\r\n0000000000 65535 f\r\n", count + 1));
            } else {
                out.push_str(&format!("{} {}\r\n", first, count));
            }
            for num in first..first + count {
                match self.entries.get(&num) {
                    Some(XrefEntry::Offset { offset, gen }) => {
                        out.push_str(&format!("{:010} {:05} n\r\n", offset, gen))
                    },
                    _ => out.push_str("0000000000 00000 f\r\n"),
                }
            }
            sink.write_str(&out)?;
            out.clear();
        }
        sink.write_str(&out)?;
        Ok(start)
    }

    /// Write a cross-reference stream object and return its offset.
    ///
    /// The stream takes a fresh number from `numbers` and records its own
    /// offset before the records are packed, so it lists itself.
    pub fn write_stream<S: OutputSink + ?Sized>(
        &mut self,
        sink: &mut S,
        numbers: &mut ObjectNumbers,
        params: XrefStreamParams<'_>,
    ) -> Result<u64> {
        let start = sink.offset();
        let obj_num = numbers.allocate()?;
        let size = size_after(obj_num)?;
        self.add_offset(obj_num, start, 0)?;

        let index: Vec<(u32, u32)> = if params.full {
            vec![(0, size)]
        } else {
            self.runs()
        };

        let max_offset = self
            .entries
            .values()
            .filter_map(|e| match e {
                XrefEntry::Offset { offset, .. } => Some(*offset),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        let max_index = self
            .entries
            .values()
            .filter_map(|e| match e {
                XrefEntry::Compressed { index, .. } => Some(*index),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        let w2 = if max_offset > u64::from(u32::MAX) { 8 } else { 4 };
        let w3 = if max_index > u32::from(u16::MAX) { 4 } else { 2 };
        let columns = 1 + w2 + w3;

        let mut records = Vec::new();
        for &(first, count) in &index {
            for num in first..first + count {
                let (kind, field2, field3) = match self.entries.get(&num) {
                    Some(XrefEntry::Offset { offset, gen }) => (1u8, *offset, u32::from(*gen)),
                    Some(XrefEntry::Compressed { stream, index }) => {
                        (2u8, u64::from(*stream), *index)
                    },
                    Some(XrefEntry::Free) | None if num == 0 => (0u8, 0, 0xFFFF),
                    Some(XrefEntry::Free) | None => (0u8, 0, 0),
                };
                records.push(kind);
                records.extend_from_slice(&field2.to_be_bytes()[8 - w2..]);
                records.extend_from_slice(&field3.to_be_bytes()[4 - w3..]);
            }
        }

        let data = if params.compress {
            FlateEncoder::encode_png_up(&records, columns)?
        } else {
            records
        };

        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::Name("XRef".to_string()));
        dict.insert("W".to_string(), int_array(&[1, w2 as i64, w3 as i64]));
        let flat: Vec<i64> = index
            .iter()
            .flat_map(|&(s, c)| [i64::from(s), i64::from(c)])
            .collect();
        dict.insert("Index".to_string(), int_array(&flat));
        dict.insert("Size".to_string(), Object::Integer(i64::from(size)));
        if let Some(prev) = params.prev {
            dict.insert("Prev".to_string(), Object::Integer(prev as i64));
        }
        if params.compress {
            dict.insert("Filter".to_string(), Object::Name("FlateDecode".to_string()));
            let mut parms = Dictionary::new();
            parms.insert("Columns".to_string(), Object::Integer(columns as i64));
            parms.insert("Predictor".to_string(), Object::Integer(12));
            dict.insert("DecodeParms".to_string(), Object::Dictionary(parms));
        }
        dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
        for (key, value) in params.trailer {
            if !dict.contains_key(key) {
                dict.insert(key.clone(), value.clone());
            }
        }

        let mut out = format!("{} 0 obj\r\n", obj_num).into_bytes();
        ObjectSerializer::new().write_stream(&mut out, &dict, &data, None)?;
        out.extend_from_slice(b"\r\nendobj\r\n");
        sink.write_block(&out)?;

        log::debug!(
            "Wrote xref stream {} 0 R at {} ({} entries)",
            obj_num,
            start,
            self.entries.len()
        );
        Ok(start)
    }
}

fn int_array(values: &[i64]) -> Object {
    Object::Array(values.iter().map(|&v| Object::Integer(v)).collect())
}
