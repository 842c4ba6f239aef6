//! PDF object serialization.
//!
//! Serializes PDF objects to their byte representation according to
//! PDF specification ISO 32000-1:2008, Section 7.3. Output is compact:
//! `<</Type /Page/Count 3>>`, `[1 2 3]`, `5 0 R`.

use crate::encryption::Encryptor;
use crate::error::Result;
use crate::object::{is_signature_dict, Dictionary, Object, ObjectRef};

/// Encrypts strings on behalf of one indirect object.
#[derive(Debug, Clone, Copy)]
pub struct ObjectCipher<'h> {
    encryptor: Encryptor<'h>,
    obj_num: u32,
    gen: u16,
}

impl<'h> ObjectCipher<'h> {
    /// Strings will be encrypted with the key of object `obj_num gen`.
    pub fn new(encryptor: Encryptor<'h>, obj_num: u32, gen: u16) -> Self {
        Self {
            encryptor,
            obj_num,
            gen,
        }
    }

    /// Object number the strings belong to.
    pub fn obj_num(&self) -> u32 {
        self.obj_num
    }

    /// Generation the strings belong to.
    pub fn gen(&self) -> u16 {
        self.gen
    }
}

/// Serializer for PDF objects.
///
/// References are rendered as `N G R` and never followed, so the serializer
/// needs no cycle detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Create a new object serializer.
    pub fn new() -> Self {
        Self
    }

    /// Serialize an object to bytes without encryption.
    pub fn serialize(&self, obj: &Object) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj, None)?;
        Ok(buf)
    }

    /// Append an object to `out`, encrypting strings when `cipher` is given.
    pub fn write_object(
        &self,
        out: &mut Vec<u8>,
        obj: &Object,
        cipher: Option<&ObjectCipher<'_>>,
    ) -> Result<()> {
        match obj {
            Object::Null => out.extend_from_slice(b"null"),
            Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => self.write_real(out, *r),
            Object::String(s) => match cipher {
                Some(c) => {
                    let encrypted = c.encryptor.encrypt(c.obj_num, c.gen, s)?;
                    self.write_string(out, &encrypted);
                },
                None => self.write_string(out, s),
            },
            Object::Name(n) => self.write_name(out, n),
            Object::Array(arr) => {
                out.push(b'[');
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    self.write_object(out, item, cipher)?;
                }
                out.push(b']');
            },
            Object::Dictionary(dict) => self.write_dictionary(out, dict, cipher)?,
            Object::Stream { dict, data } => {
                let mut dict = dict.clone();
                dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
                self.write_stream(out, &dict, data, cipher)?;
            },
            Object::Reference(r) => self.write_reference(out, *r),
        }
        Ok(())
    }

    /// Append `<<dict>>stream\r\n{data}\r\nendstream`.
    ///
    /// `data` is written as given; `/Length` must already match it.
    pub fn write_stream(
        &self,
        out: &mut Vec<u8>,
        dict: &Dictionary,
        data: &[u8],
        cipher: Option<&ObjectCipher<'_>>,
    ) -> Result<()> {
        self.write_dictionary(out, dict, cipher)?;
        out.extend_from_slice(b"stream\r\n");
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\nendstream");
        Ok(())
    }

    /// Append `/Key value` pairs without the surrounding `<<` `>>`.
    pub fn write_dict_entries(
        &self,
        out: &mut Vec<u8>,
        dict: &Dictionary,
        cipher: Option<&ObjectCipher<'_>>,
    ) -> Result<()> {
        let signature = is_signature_dict(dict);
        for (key, value) in dict {
            self.write_name(out, key);
            out.push(b' ');
            // Signature byte ranges are computed over the clear /Contents
            let cipher = if signature && key == "Contents" {
                None
            } else {
                cipher
            };
            self.write_object(out, value, cipher)?;
        }
        Ok(())
    }

    fn write_dictionary(
        &self,
        out: &mut Vec<u8>,
        dict: &Dictionary,
        cipher: Option<&ObjectCipher<'_>>,
    ) -> Result<()> {
        out.extend_from_slice(b"<<");
        self.write_dict_entries(out, dict, cipher)?;
        out.extend_from_slice(b">>");
        Ok(())
    }

    fn write_reference(&self, out: &mut Vec<u8>, r: ObjectRef) {
        out.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes());
    }

    /// Write a real number with at most five decimals.
    fn write_real(&self, out: &mut Vec<u8>, value: f64) {
        if value.fract() == 0.0 {
            out.extend_from_slice((value as i64).to_string().as_bytes());
        } else {
            let formatted = format!("{:.5}", value);
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            out.extend_from_slice(trimmed.as_bytes());
        }
    }

    /// Write a PDF string.
    ///
    /// Uses literal string syntax `(...)` with proper escaping,
    /// or hex string syntax `<...>` for binary data.
    fn write_string(&self, out: &mut Vec<u8>, data: &[u8]) {
        let is_printable = data
            .iter()
            .all(|&b| b == b'\n' || b == b'\r' || b == b'\t' || (0x20..=0x7E).contains(&b));

        if is_printable {
            out.push(b'(');
            for &byte in data {
                match byte {
                    b'(' => out.extend_from_slice(b"\\("),
                    b')' => out.extend_from_slice(b"\\)"),
                    b'\\' => out.extend_from_slice(b"\\\\"),
                    b'\n' => out.extend_from_slice(b"\\n"),
                    b'\r' => out.extend_from_slice(b"\\r"),
                    b'\t' => out.extend_from_slice(b"\\t"),
                    _ => out.push(byte),
                }
            }
            out.push(b')');
        } else {
            out.push(b'<');
            for byte in data {
                out.extend_from_slice(format!("{:02X}", byte).as_bytes());
            }
            out.push(b'>');
        }
    }

    /// Write a PDF name.
    ///
    /// Names start with `/` and escape special characters with `#xx`.
    fn write_name(&self, out: &mut Vec<u8>, name: &str) {
        out.push(b'/');
        for byte in name.bytes() {
            match byte {
                b'!'
                | b'"'
                | b'$'..=b'&'
                | b'\''..=b'.'
                | b'0'..=b'9'
                | b';'
                | b'<'
                | b'>'
                | b'?'
                | b'@'
                | b'A'..=b'Z'
                | b'^'..=b'z'
                | b'|'
                | b'~' => out.push(byte),
                _ => out.extend_from_slice(format!("#{:02X}", byte).as_bytes()),
            }
        }
    }
}

/// Helper functions for building PDF objects.
impl ObjectSerializer {
    /// Create a Name object.
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Create a String object from a Rust string.
    pub fn string(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec())
    }

    /// Create a Dictionary object.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(Self::dictionary(entries))
    }

    /// Create a bare Dictionary in the given key order.
    pub fn dictionary(entries: Vec<(&str, Object)>) -> Dictionary {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Create a Reference object.
    pub fn reference(id: u32, gen: u16) -> Object {
        Object::Reference(ObjectRef::new(id, gen))
    }
}
