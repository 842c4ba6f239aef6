//! Document object graph consumed by the creator.
//!
//! A [`Document`] owns numbered indirect objects plus the bits of trailer
//! state a save needs (root, info, ID, encryption). When the document was
//! loaded from an existing file, a [`PriorRevision`] describes the original
//! bytes and where each old object lives in them. Parsing those bytes is the
//! caller's job; the writer only copies byte ranges.

use crate::encryption::CryptoHandler;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::writer::FileId;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An indirect object held by the document.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    /// The object value
    pub object: Object,
    /// Generation number
    pub gen: u16,
    modified: bool,
}

impl IndirectObject {
    /// Whether the object changed since it was loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Encryption state of a document.
#[derive(Clone)]
pub struct DocumentEncryption {
    /// The `/Encrypt` dictionary
    pub dict: Dictionary,
    /// Object number of the dictionary, if it is an indirect object in the file
    pub obj_num: Option<u32>,
    /// Handler that encrypts content for this dictionary
    pub handler: Arc<dyn CryptoHandler>,
}

impl std::fmt::Debug for DocumentEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEncryption")
            .field("dict", &self.dict)
            .field("obj_num", &self.obj_num)
            .finish_non_exhaustive()
    }
}

/// In-memory document graph.
#[derive(Debug, Clone, Default)]
pub struct Document {
    objects: BTreeMap<u32, IndirectObject>,
    root: Option<ObjectRef>,
    info: Option<ObjectRef>,
    id: Option<FileId>,
    encryption: Option<DocumentEncryption>,
    prior: Option<PriorRevision>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document on top of an existing file revision.
    pub fn with_prior(prior: PriorRevision) -> Self {
        Self {
            prior: Some(prior),
            ..Self::default()
        }
    }

    /// Add a new object under the next free number.
    pub fn add_object(&mut self, object: Object) -> Result<ObjectRef> {
        let id = self
            .last_object_number()
            .checked_add(1)
            .ok_or(Error::ObjectNumberExhausted)?;
        self.objects.insert(
            id,
            IndirectObject {
                object,
                gen: 0,
                modified: true,
            },
        );
        Ok(ObjectRef::new(id, 0))
    }

    /// Insert an object loaded from the prior revision. It starts unmodified.
    pub fn insert_object(&mut self, id: u32, gen: u16, object: Object) {
        self.objects.insert(
            id,
            IndirectObject {
                object,
                gen,
                modified: false,
            },
        );
    }

    /// Replace (or create) an object and mark it modified.
    pub fn set_object(&mut self, id: u32, object: Object) {
        let gen = self.generation(id);
        self.objects.insert(
            id,
            IndirectObject {
                object,
                gen,
                modified: true,
            },
        );
    }

    /// Mark an existing object modified. Returns false if it is unknown.
    pub fn mark_modified(&mut self, id: u32) -> bool {
        match self.objects.get_mut(&id) {
            Some(entry) => {
                entry.modified = true;
                true
            },
            None => false,
        }
    }

    /// Look up an object.
    pub fn get_object(&self, id: u32) -> Option<&Object> {
        self.objects.get(&id).map(|e| &e.object)
    }

    /// Look up an object together with its bookkeeping.
    pub fn get_indirect(&self, id: u32) -> Option<&IndirectObject> {
        self.objects.get(&id)
    }

    /// Whether the graph holds this object number.
    pub fn contains(&self, id: u32) -> bool {
        self.objects.contains_key(&id)
    }

    /// Whether the object is new or changed.
    pub fn is_modified(&self, id: u32) -> bool {
        self.objects.get(&id).is_some_and(|e| e.modified)
    }

    /// Generation of an object, falling back to the prior revision, then 0.
    pub fn generation(&self, id: u32) -> u16 {
        if let Some(entry) = self.objects.get(&id) {
            return entry.gen;
        }
        match self.prior.as_ref().and_then(|p| p.entry(id)) {
            Some(PriorEntry::InFile { gen, .. }) => *gen,
            _ => 0,
        }
    }

    /// Object numbers held in memory, ascending.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.objects.keys().copied()
    }

    /// Number of objects held in memory.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no objects are held in memory.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Highest object number known to the graph or the prior revision.
    pub fn last_object_number(&self) -> u32 {
        let own = self.objects.keys().next_back().copied().unwrap_or(0);
        let prior = self
            .prior
            .as_ref()
            .map(PriorRevision::last_object_number)
            .unwrap_or(0);
        own.max(prior)
    }

    /// Document catalog, falling back to the prior trailer.
    pub fn root(&self) -> Option<ObjectRef> {
        self.root.or_else(|| self.prior_trailer_ref("Root"))
    }

    /// Set the document catalog.
    pub fn set_root(&mut self, root: ObjectRef) {
        self.root = Some(root);
    }

    /// Document information dictionary, falling back to the prior trailer.
    pub fn info(&self) -> Option<ObjectRef> {
        self.info.or_else(|| self.prior_trailer_ref("Info"))
    }

    /// Set the document information dictionary.
    pub fn set_info(&mut self, info: ObjectRef) {
        self.info = Some(info);
    }

    /// Document ID, falling back to the prior trailer.
    pub fn id(&self) -> Option<FileId> {
        self.id
            .clone()
            .or_else(|| self.prior.as_ref().and_then(PriorRevision::id))
    }

    /// Set the document ID.
    pub fn set_id(&mut self, id: FileId) {
        self.id = Some(id);
    }

    /// Current encryption state.
    pub fn encryption(&self) -> Option<&DocumentEncryption> {
        self.encryption.as_ref()
    }

    /// Attach encryption state (usually what the reader decrypted with).
    pub fn set_encryption(&mut self, encryption: DocumentEncryption) {
        self.encryption = Some(encryption);
    }

    /// The revision this document was loaded from.
    pub fn prior(&self) -> Option<&PriorRevision> {
        self.prior.as_ref()
    }

    /// Object number of the XMP metadata stream referenced by the catalog.
    pub fn metadata_object_number(&self) -> Option<u32> {
        let root = self.root()?;
        self.get_object(root.id)?
            .as_dict()?
            .get("Metadata")?
            .as_reference()
            .map(|r| r.id)
    }

    fn prior_trailer_ref(&self, key: &str) -> Option<ObjectRef> {
        self.prior
            .as_ref()
            .and_then(|p| p.trailer().get(key))
            .and_then(Object::as_reference)
    }
}

/// Where an object of the prior revision lives.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorEntry {
    /// Free slot
    Free,
    /// Uncompressed indirect object occupying `len` bytes at `offset`
    InFile {
        /// Byte offset of `N G obj`
        offset: u64,
        /// Length through `endobj` and its line ending
        len: usize,
        /// Generation number
        gen: u16,
    },
    /// Object packed in an object stream; `body` is its decoded bytes
    InStream {
        /// Containing object stream number
        stream: u32,
        /// Index inside the container
        index: u32,
        /// Serialized object body, without `obj`/`endobj`
        body: Bytes,
    },
}

/// An existing file revision the save builds on.
#[derive(Debug, Clone)]
pub struct PriorRevision {
    data: Bytes,
    xref_offset: u64,
    version: u8,
    trailer: Dictionary,
    xref_stream: bool,
    entries: BTreeMap<u32, PriorEntry>,
}

impl PriorRevision {
    /// Wrap prior bytes whose last cross-reference section starts at `xref_offset`.
    ///
    /// Pass 0 when the file has no cross-reference section.
    pub fn new(data: impl Into<Bytes>, xref_offset: u64) -> Self {
        let data = data.into();
        let version = header_version(&data).unwrap_or(17);
        Self {
            data,
            xref_offset,
            version,
            trailer: Dictionary::new(),
            xref_stream: false,
            entries: BTreeMap::new(),
        }
    }

    /// Wrap prior bytes, locating the last `startxref` by scanning backwards.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let xref_offset = find_startxref(&data)?;
        Ok(Self::new(data, xref_offset))
    }

    /// Set the header version (14 for PDF-1.4).
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Set the prior trailer dictionary.
    pub fn with_trailer(mut self, trailer: Dictionary) -> Self {
        self.trailer = trailer;
        self
    }

    /// Mark the prior cross-reference section as a stream.
    pub fn with_xref_stream(mut self, xref_stream: bool) -> Self {
        self.xref_stream = xref_stream;
        self
    }

    /// Record where an old object lives.
    pub fn with_entry(mut self, id: u32, entry: PriorEntry) -> Self {
        self.entries.insert(id, entry);
        self
    }

    /// Record uncompressed objects by their start offsets.
    ///
    /// Each object is assumed to run until the next object or the xref
    /// section, whichever comes first.
    pub fn with_offsets(mut self, offsets: impl IntoIterator<Item = (u32, u64, u16)>) -> Self {
        let mut sorted: Vec<(u32, u64, u16)> = offsets.into_iter().collect();
        sorted.sort_by_key(|&(_, offset, _)| offset);
        let limit = if self.has_xref() {
            self.xref_offset.min(self.data.len() as u64)
        } else {
            self.data.len() as u64
        };
        for (i, &(id, offset, gen)) in sorted.iter().enumerate() {
            let end = sorted
                .get(i + 1)
                .map(|&(_, next, _)| next)
                .unwrap_or(limit)
                .min(limit);
            let len = end.saturating_sub(offset) as usize;
            self.entries
                .insert(id, PriorEntry::InFile { offset, len, gen });
        }
        self
    }

    /// All prior bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Length of the prior bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the prior revision is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Offset of the prior cross-reference section.
    pub fn xref_offset(&self) -> u64 {
        self.xref_offset
    }

    /// Whether the prior revision ends in a cross-reference section.
    ///
    /// An offset of zero marks a file without one.
    pub fn has_xref(&self) -> bool {
        self.xref_offset > 0
    }

    /// Header version (10..=17).
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Prior trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Whether the prior cross-reference section was a stream.
    pub fn uses_xref_stream(&self) -> bool {
        self.xref_stream
    }

    /// Lookup an old object.
    pub fn entry(&self, id: u32) -> Option<&PriorEntry> {
        self.entries.get(&id)
    }

    /// Old objects, ascending.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &PriorEntry)> + '_ {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    /// Highest old object number.
    pub fn last_object_number(&self) -> u32 {
        let from_entries = self.entries.keys().next_back().copied().unwrap_or(0);
        let from_size = self
            .trailer
            .get("Size")
            .and_then(Object::as_integer)
            .and_then(|s| u32::try_from(s.saturating_sub(1)).ok())
            .unwrap_or(0);
        from_entries.max(from_size)
    }

    /// Raw bytes of an uncompressed old object, `N G obj` through `endobj`.
    pub fn raw_object(&self, id: u32) -> Option<&[u8]> {
        match self.entries.get(&id)? {
            PriorEntry::InFile { offset, len, .. } => {
                let start = usize::try_from(*offset).ok()?;
                self.data.get(start..start.checked_add(*len)?)
            },
            _ => None,
        }
    }

    /// The `/ID` array of the prior trailer.
    pub fn id(&self) -> Option<FileId> {
        let arr = self.trailer.get("ID")?.as_array()?;
        let first = arr.first()?.as_string()?.to_vec();
        let second = arr.get(1).and_then(Object::as_string).map(<[u8]>::to_vec);
        Some(FileId {
            second: second.unwrap_or_else(|| first.clone()),
            first,
        })
    }
}

/// Locate the offset after the last `startxref` keyword.
pub fn find_startxref(bytes: &[u8]) -> Result<u64> {
    let search = b"startxref";
    let mut pos = bytes.len().saturating_sub(search.len());

    loop {
        if bytes[pos..].starts_with(search) {
            let offset_str: String = bytes[pos + search.len()..]
                .iter()
                .skip_while(|&&b| b == b' ' || b == b'\n' || b == b'\r')
                .take_while(|&&b| b.is_ascii_digit())
                .map(|&b| b as char)
                .collect();

            if let Ok(offset) = offset_str.parse::<u64>() {
                return Ok(offset);
            }
        }
        if pos == 0 {
            break;
        }
        pos -= 1;
    }

    Err(Error::InvalidPrior("could not find startxref".to_string()))
}

/// Parse `%PDF-1.x` into `1x`.
fn header_version(bytes: &[u8]) -> Option<u8> {
    let rest = bytes.strip_prefix(b"%PDF-1.")?;
    let digit = *rest.first()?;
    digit.is_ascii_digit().then(|| 10 + (digit - b'0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_prior() -> PriorRevision {
        let data = b"%PDF-1.4\r\n1 0 obj\r\n<<>>\r\nendobj\r\n2 0 obj\r\n42\r\nendobj\r\nxref\r\n0 3\r\ntrailer\r\n<<>>\r\nstartxref\r\n54\r\n%%EOF\r\n".to_vec();
        PriorRevision::from_bytes(data)
            .unwrap()
            .with_offsets([(1, 10, 0), (2, 33, 0)])
    }

    #[test]
    fn test_find_startxref() {
        let prior = sample_prior();
        assert_eq!(prior.xref_offset(), 54);
        assert_eq!(prior.version(), 14);
    }

    #[test]
    fn test_find_startxref_missing() {
        assert!(find_startxref(b"%PDF-1.7\r\n").is_err());
        assert!(find_startxref(b"").is_err());
    }

    #[test]
    fn test_raw_object_ranges() {
        let prior = sample_prior();
        assert_eq!(prior.raw_object(1), Some(&b"1 0 obj\r\n<<>>\r\nendobj\r\n"[..]));
        assert_eq!(prior.raw_object(2), Some(&b"2 0 obj\r\n42\r\nendobj\r\n"[..]));
        assert_eq!(prior.raw_object(3), None);
        assert_eq!(prior.last_object_number(), 2);
    }

    #[test]
    fn test_prior_without_xref_runs_to_end() {
        let data = b"%PDF-1.4\r\n1 0 obj\r\n<<>>\r\nendobj\r\n2 0 obj\r\n42\r\nendobj\r\n".to_vec();
        let prior = PriorRevision::new(data, 0).with_offsets([(1, 10, 0), (2, 33, 0)]);
        assert!(!prior.has_xref());
        assert!(sample_prior().has_xref());
        assert_eq!(prior.raw_object(1), Some(&b"1 0 obj\r\n<<>>\r\nendobj\r\n"[..]));
        assert_eq!(prior.raw_object(2), Some(&b"2 0 obj\r\n42\r\nendobj\r\n"[..]));
    }

    #[test]
    fn test_add_object_numbers_after_prior() {
        let mut doc = Document::with_prior(sample_prior());
        let r = doc.add_object(Object::Null).unwrap();
        assert_eq!(r, ObjectRef::new(3, 0));
        assert!(doc.is_modified(3));
        assert!(!doc.is_modified(1));
    }

    #[test]
    fn test_add_object_exhausted() {
        let mut doc = Document::new();
        doc.insert_object(u32::MAX, 0, Object::Null);
        assert!(matches!(
            doc.add_object(Object::Null),
            Err(Error::ObjectNumberExhausted)
        ));
    }

    #[test]
    fn test_modification_tracking() {
        let mut doc = Document::new();
        doc.insert_object(4, 2, Object::Integer(1));
        assert!(!doc.is_modified(4));
        assert!(doc.mark_modified(4));
        assert!(doc.is_modified(4));
        assert!(!doc.mark_modified(9));

        doc.set_object(4, Object::Integer(2));
        assert_eq!(doc.generation(4), 2);
        assert_eq!(doc.get_object(4), Some(&Object::Integer(2)));
    }

    #[test]
    fn test_root_falls_back_to_prior_trailer() {
        let mut trailer = Dictionary::new();
        trailer.insert("Root".to_string(), Object::Reference(ObjectRef::new(1, 0)));
        trailer.insert(
            "ID".to_string(),
            Object::Array(vec![Object::String(b"abc".to_vec()), Object::String(b"def".to_vec())]),
        );
        let doc = Document::with_prior(sample_prior().with_trailer(trailer));
        assert_eq!(doc.root(), Some(ObjectRef::new(1, 0)));
        let id = doc.id().unwrap();
        assert_eq!(id.first, b"abc");
        assert_eq!(id.second, b"def");
    }

    #[test]
    fn test_metadata_object_number() {
        let mut doc = Document::new();
        let meta = doc.add_object(Object::Stream {
            dict: Dictionary::new(),
            data: Bytes::from_static(b"<x/>"),
        })
        .unwrap();
        let mut catalog = Dictionary::new();
        catalog.insert("Metadata".to_string(), Object::Reference(meta));
        let root = doc.add_object(Object::Dictionary(catalog)).unwrap();
        doc.set_root(root);
        assert_eq!(doc.metadata_object_number(), Some(meta.id));
    }
}
