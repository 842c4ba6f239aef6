//! Shared helpers for the integration tests.
//!
//! These decode just enough of the written files (xref tables, xref streams,
//! object streams) to check offsets and contents.

#![allow(dead_code)]

use flate2::read::ZlibDecoder;
use pdf_creator::document::Document;
use pdf_creator::error::{Error, Result};
use pdf_creator::object::{Dictionary, Object};
use pdf_creator::writer::OutputSink;
use pdf_creator::CryptoHandler;
use std::collections::BTreeMap;
use std::io::Read;

/// Route `log` output through the test harness (`RUST_LOG=debug` to see it).
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Inflate a zlib buffer.
pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .expect("valid zlib data");
    out
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    find(&haystack[from..], needle).map(|p| p + from)
}

pub fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

pub fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// The number after the last `startxref`.
pub fn startxref(bytes: &[u8]) -> u64 {
    let pos = rfind(bytes, b"startxref\r\n").expect("startxref present") + 11;
    let end = find_from(bytes, b"\r\n", pos).expect("line end");
    std::str::from_utf8(&bytes[pos..end])
        .unwrap()
        .parse()
        .unwrap()
}

/// Read a decimal integer starting at `pos`.
fn read_int(bytes: &[u8], pos: usize) -> i64 {
    let end = bytes[pos..]
        .iter()
        .position(|b| !(b.is_ascii_digit() || *b == b'-'))
        .map_or(bytes.len(), |p| p + pos);
    std::str::from_utf8(&bytes[pos..end])
        .unwrap()
        .parse()
        .unwrap()
}

/// Value of `/Key n` inside the object starting at `obj_start`.
pub fn dict_int(bytes: &[u8], obj_start: usize, key: &str) -> Option<i64> {
    let dict_end = find_from(bytes, b">>stream\r\n", obj_start)
        .or_else(|| find_from(bytes, b"endobj", obj_start))?;
    let needle = format!("/{} ", key);
    let pos = find(&bytes[obj_start..dict_end], needle.as_bytes())? + obj_start + needle.len();
    Some(read_int(bytes, pos))
}

/// Integers of `/Key [a b c]` inside the object starting at `obj_start`.
pub fn dict_int_array(bytes: &[u8], obj_start: usize, key: &str) -> Vec<i64> {
    let needle = format!("/{} [", key);
    let pos = find_from(bytes, needle.as_bytes(), obj_start).expect("array key") + needle.len();
    let end = find_from(bytes, b"]", pos).unwrap();
    std::str::from_utf8(&bytes[pos..end])
        .unwrap()
        .split_whitespace()
        .map(|t| t.parse().unwrap())
        .collect()
}

/// Raw stream payload of the object starting at `obj_start`, using `/Length`.
pub fn stream_payload(bytes: &[u8], obj_start: usize) -> &[u8] {
    let len = dict_int(bytes, obj_start, "Length").expect("stream /Length") as usize;
    let start = find_from(bytes, b">>stream\r\n", obj_start).unwrap() + 10;
    let payload = &bytes[start..start + len];
    assert_eq!(&bytes[start + len..start + len + 11], b"\r\nendstream");
    payload
}

/// A resolved cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Free,
    Offset(u64),
    Compressed { stream: u32, index: u32 },
}

/// Parse the classical table at `at`.
pub fn parse_xref_table(bytes: &[u8], at: usize) -> BTreeMap<u32, Entry> {
    assert_eq!(&bytes[at..at + 6], b"xref\r\n");
    let end = find_from(bytes, b"trailer", at).expect("trailer after table");
    let text = std::str::from_utf8(&bytes[at + 6..end]).unwrap();
    let mut entries = BTreeMap::new();
    let mut lines = text.split("\r\n").filter(|l| !l.is_empty());
    while let Some(header) = lines.next() {
        let mut parts = header.split(' ');
        let first: u32 = parts.next().unwrap().parse().unwrap();
        let n: u32 = parts.next().unwrap().parse().unwrap();
        for num in first..first + n {
            let line = lines.next().expect("entry line");
            assert_eq!(line.len(), 18, "entry {:?}", line);
            let entry = if line.ends_with('n') {
                Entry::Offset(line[..10].parse().unwrap())
            } else {
                Entry::Free
            };
            entries.insert(num, entry);
        }
    }
    entries
}

/// Parse the cross-reference stream object at `at`.
pub fn parse_xref_stream(bytes: &[u8], at: usize) -> BTreeMap<u32, Entry> {
    let w = dict_int_array(bytes, at, "W");
    let index = dict_int_array(bytes, at, "Index");
    let payload = stream_payload(bytes, at);
    let (w1, w2, w3) = (w[0] as usize, w[1] as usize, w[2] as usize);
    let columns = w1 + w2 + w3;

    let compressed = find_from(bytes, b"/Filter /FlateDecode", at)
        .is_some_and(|p| p < find_from(bytes, b">>stream", at).unwrap());
    let records = if compressed {
        undo_png_up(&inflate(payload), columns)
    } else {
        payload.to_vec()
    };

    let field = |rec: &[u8]| rec.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    let mut entries = BTreeMap::new();
    let mut records = records.chunks(columns);
    for pair in index.chunks(2) {
        for num in pair[0]..pair[0] + pair[1] {
            let rec = records.next().expect("record for every index");
            let kind = rec[0];
            let f2 = field(&rec[w1..w1 + w2]);
            let f3 = field(&rec[w1 + w2..]);
            let entry = match kind {
                0 => Entry::Free,
                1 => Entry::Offset(f2),
                2 => Entry::Compressed {
                    stream: f2 as u32,
                    index: f3 as u32,
                },
                other => panic!("unknown record type {}", other),
            };
            entries.insert(num as u32, entry);
        }
    }
    entries
}

fn undo_png_up(data: &[u8], columns: usize) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    for row in data.chunks(columns + 1) {
        assert_eq!(row[0], 2, "PNG Up predictor tag");
        let prev_start = out.len().saturating_sub(columns);
        let has_prev = !out.is_empty();
        for (i, &b) in row[1..].iter().enumerate() {
            let above = if has_prev { out[prev_start + i] } else { 0 };
            out.push(b.wrapping_add(above));
        }
    }
    out
}

/// Header pairs and decoded body of the object stream at `at`.
pub fn parse_object_stream(bytes: &[u8], at: usize) -> (Vec<(u32, usize)>, Vec<u8>) {
    let n = dict_int(bytes, at, "N").unwrap() as usize;
    let first = dict_int(bytes, at, "First").unwrap() as usize;
    let payload = stream_payload(bytes, at);
    let dict_end = find_from(bytes, b">>stream", at).unwrap();
    let data = if find(&bytes[at..dict_end], b"/Filter /FlateDecode").is_some() {
        inflate(payload)
    } else {
        payload.to_vec()
    };
    let header = std::str::from_utf8(&data[..first]).unwrap();
    let nums: Vec<usize> = header
        .split_whitespace()
        .map(|t| t.parse().unwrap())
        .collect();
    assert_eq!(nums.len(), n * 2);
    let pairs = nums.chunks(2).map(|p| (p[0] as u32, p[1])).collect();
    (pairs, data[first..].to_vec())
}

/// Resolve every entry of the last cross-reference section.
pub fn parse_last_xref(bytes: &[u8]) -> BTreeMap<u32, Entry> {
    let at = startxref(bytes) as usize;
    if bytes[at..].starts_with(b"xref") {
        parse_xref_table(bytes, at)
    } else {
        parse_xref_stream(bytes, at)
    }
}

/// A dictionary with the given entries, in order.
pub fn dict(entries: &[(&str, Object)]) -> Dictionary {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn name(s: &str) -> Object {
    Object::Name(s.to_string())
}

/// A document with a catalog (object 1) and `count` small dictionaries.
pub fn small_objects_doc(count: usize) -> Document {
    let mut doc = Document::new();
    let root = doc
        .add_object(Object::Dictionary(dict(&[("Type", name("Catalog"))])))
        .unwrap();
    doc.set_root(root);
    for i in 0..count {
        doc.add_object(Object::Dictionary(dict(&[
            ("Type", name("Annot")),
            ("Subtype", name("Text")),
            ("Index", Object::Integer(i as i64)),
            ("Open", Object::Boolean(false)),
        ])))
        .unwrap();
    }
    doc
}

/// Deterministic ID halves: 16 bytes of a running counter.
pub fn counting_ids() -> impl FnMut() -> Vec<u8> {
    let mut n = 0u8;
    move || {
        n += 1;
        vec![n; 16]
    }
}

/// Sink that fails once `limit` bytes have been written.
pub struct FailingSink {
    pub written: Vec<u8>,
    pub limit: usize,
}

impl FailingSink {
    pub fn new(limit: usize) -> Self {
        Self {
            written: Vec::new(),
            limit,
        }
    }
}

impl OutputSink for FailingSink {
    fn offset(&self) -> u64 {
        self.written.len() as u64
    }

    fn write_block(&mut self, data: &[u8]) -> Result<()> {
        if self.written.len() + data.len() > self.limit {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.written.extend_from_slice(data);
        Ok(())
    }
}

/// XORs payloads with a key derived from the object number.
pub struct XorHandler;

impl XorHandler {
    fn key(obj_num: u32) -> u8 {
        (obj_num as u8).wrapping_mul(31).wrapping_add(7)
    }
}

impl CryptoHandler for XorHandler {
    fn encrypt_size(&self, _obj_num: u32, _gen: u16, plaintext: &[u8]) -> usize {
        plaintext.len()
    }

    fn encrypt_content(
        &self,
        obj_num: u32,
        _gen: u16,
        plaintext: &[u8],
        dest: &mut [u8],
    ) -> Result<usize> {
        for (d, s) in dest.iter_mut().zip(plaintext) {
            *d = s ^ Self::key(obj_num);
        }
        Ok(plaintext.len())
    }

    fn decrypt_content(&self, obj_num: u32, _gen: u16, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(ciphertext.iter().map(|b| b ^ Self::key(obj_num)).collect())
    }
}

/// Refuses every payload.
pub struct RefusingHandler;

impl CryptoHandler for RefusingHandler {
    fn encrypt_size(&self, _obj_num: u32, _gen: u16, plaintext: &[u8]) -> usize {
        plaintext.len()
    }

    fn encrypt_content(&self, obj_num: u32, _: u16, _: &[u8], _: &mut [u8]) -> Result<usize> {
        Err(Error::Encryption {
            obj_num,
            reason: "handler refused".to_string(),
        })
    }

    fn decrypt_content(&self, _: u32, _: u16, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}

/// Build a one-revision PDF holding `objects` (object 1 is the catalog) and
/// a document that was loaded from it, with every object unmodified.
///
/// `padding` bytes of comment are placed before the first object.
pub fn prior_document(objects: &[(u32, Object)], padding: usize) -> Document {
    use pdf_creator::document::PriorRevision;
    use pdf_creator::writer::ObjectSerializer;

    let serializer = ObjectSerializer::new();
    let mut bytes = b"%PDF-1.4\r\n%\xA1\xB3\xC5\xD7\r\n".to_vec();
    if padding > 0 {
        bytes.push(b'%');
        bytes.extend(std::iter::repeat(b'x').take(padding));
        bytes.extend_from_slice(b"\r\n");
    }

    let mut offsets = Vec::new();
    for (num, obj) in objects {
        offsets.push((*num, bytes.len() as u64, 0u16));
        bytes.extend_from_slice(format!("{} 0 obj\r\n", num).as_bytes());
        bytes.extend_from_slice(&serializer.serialize(obj).unwrap());
        bytes.extend_from_slice(b"\r\nendobj\r\n");
    }

    let size = objects.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;
    let xref_offset = bytes.len();
    bytes.extend_from_slice(b"xref\r\n");
    bytes.extend_from_slice(format!("0 {}\r\n", size).as_bytes());
    bytes.extend_from_slice(b"0000000000 65535 f\r\n");
    for num in 1..size {
        match offsets.iter().find(|(n, _, _)| *n == num) {
            Some((_, off, _)) => {
                bytes.extend_from_slice(format!("{:010} 00000 n\r\n", off).as_bytes())
            },
            None => bytes.extend_from_slice(b"0000000000 00000 f\r\n"),
        }
    }
    bytes.extend_from_slice(
        format!(
            "trailer\r\n<</Size {}/Root 1 0 R>>\r\nstartxref\r\n{}\r\n%%EOF\r\n",
            size, xref_offset
        )
        .as_bytes(),
    );

    let trailer = dict(&[
        ("Size", Object::Integer(i64::from(size))),
        ("Root", Object::Reference(pdf_creator::ObjectRef::new(1, 0))),
    ]);
    let prior = PriorRevision::from_bytes(bytes)
        .unwrap()
        .with_trailer(trailer)
        .with_offsets(offsets);
    let mut doc = Document::with_prior(prior);
    for (num, obj) in objects {
        doc.insert_object(*num, 0, obj.clone());
    }
    doc
}

/// Check that each of `numbers` resolves through the last xref section to
/// an object written before `startxref`.
pub fn assert_resolvable(bytes: &[u8], numbers: impl IntoIterator<Item = u32>) {
    let xref_at = startxref(bytes);
    let entries = parse_last_xref(bytes);
    for num in numbers {
        match entries.get(&num) {
            Some(Entry::Offset(off)) => {
                assert!(*off < xref_at, "object {} at {} after xref", num, off);
                let header = format!("{} ", num);
                assert!(
                    bytes[*off as usize..].starts_with(header.as_bytes()),
                    "object {} offset {} points elsewhere",
                    num,
                    off
                );
            },
            Some(Entry::Compressed { stream, index }) => {
                let Some(Entry::Offset(container)) = entries.get(stream) else {
                    panic!("container {} of object {} has no offset", stream, num);
                };
                assert!(*container < xref_at);
                let (pairs, _) = parse_object_stream(bytes, *container as usize);
                assert_eq!(pairs[*index as usize].0, num);
            },
            other => panic!("object {} has entry {:?}", num, other),
        }
    }
}
