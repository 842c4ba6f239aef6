//! Resumable PDF file writer.
//!
//! [`Creator`] serializes a [`Document`] in four stages:
//!
//! 1. **Setup**: file version, security, document ID, object tables.
//! 2. **Old objects**: the prior revision's bytes (incremental) or objects
//!    (full rewrite).
//! 3. **New objects**: modified and added objects, optionally packed into
//!    object streams.
//! 4. **Finalize**: the last object stream, the cross-reference section and
//!    the trailer.
//!
//! Stages 2 and 3 poll a [`PauseSignal`] after every object (or every 4 KiB
//! block of copied bytes). A paused save is resumed with
//! [`Creator::continue_with`]; the output is the same whether or not it was
//! interrupted.
//!
//! # Example
//!
//! ```
//! use pdf_creator::document::Document;
//! use pdf_creator::object::{Dictionary, Object};
//! use pdf_creator::writer::{Creator, VecSink};
//! use pdf_creator::SaveOptions;
//!
//! let mut doc = Document::new();
//! let mut catalog = Dictionary::new();
//! catalog.insert("Type".to_string(), Object::Name("Catalog".to_string()));
//! let root = doc.add_object(Object::Dictionary(catalog)).unwrap();
//! doc.set_root(root);
//!
//! let mut creator = Creator::new(&doc, VecSink::new());
//! creator.create(SaveOptions::new()).unwrap();
//! let bytes = creator.into_sink().into_inner();
//! assert!(bytes.starts_with(b"%PDF-1.7"));
//! ```

use super::file_id::{FileId, IdGenerator, RandomIdGenerator};
use super::flate::FlateEncoder;
use super::object_serializer::{ObjectCipher, ObjectSerializer};
use super::object_stream::ObjectStream;
use super::sink::OutputSink;
use super::xref::{ObjectNumbers, XrefBuilder, XrefStreamParams};
use crate::config::{CreateFlags, SaveOptions};
use crate::document::{Document, IndirectObject, PriorEntry};
use crate::encryption::{CryptoHandler, Encryptor, StandardSecurity};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use std::borrow::Cow;
use std::sync::Arc;

/// Block size for copying prior revision bytes.
const COPY_BLOCK: usize = 4096;

/// Trailer keys that are recomputed rather than carried over.
const RECOMPUTED_TRAILER_KEYS: &[&str] = &[
    "Encrypt",
    "Size",
    "Filter",
    "Index",
    "Length",
    "Prev",
    "W",
    "XRefStm",
    "ID",
    "Type",
    "DecodeParms",
];

/// Decides whether a running save should yield.
pub trait PauseSignal {
    /// Polled between objects; returning true suspends the save.
    fn should_pause(&mut self) -> bool;
}

impl<F> PauseSignal for F
where
    F: FnMut() -> bool,
{
    fn should_pause(&mut self) -> bool {
        self()
    }
}

/// A pause signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPause;

impl PauseSignal for NeverPause {
    fn should_pause(&mut self) -> bool {
        false
    }
}

/// Position of a save in the stage machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `create` has not been called
    NotStarted,
    /// Computing version, security and ID
    Setup,
    /// Writing the prior revision
    WriteOld,
    /// Writing new and modified objects
    WriteNew,
    /// Writing the cross-reference section and trailer
    Finalize,
    /// The file is complete
    Done,
    /// A stage failed; the output is unusable
    Failed,
}

/// Result of driving a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Paused; call [`Creator::continue_with`] again
    InProgress(Stage),
    /// The file is complete
    Done,
}

enum StepOutcome {
    Paused,
    Finished,
}

/// Requested change to the document's security.
#[derive(Debug, Clone)]
enum SecurityRequest {
    Keep,
    Remove,
    Set(StandardSecurity),
}

/// Sink wrapper that reports offsets relative to the start of the file.
struct Output<S> {
    sink: S,
    base: u64,
}

impl<S: OutputSink> OutputSink for Output<S> {
    fn offset(&self) -> u64 {
        self.base + self.sink.offset()
    }

    fn write_block(&mut self, data: &[u8]) -> Result<()> {
        self.sink.write_block(data)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    index: usize,
    copied: usize,
}

/// Writes a document to an [`OutputSink`].
pub struct Creator<'a, S: OutputSink> {
    doc: &'a Document,
    out: Output<S>,
    options: SaveOptions,
    stage: Stage,
    cursor: Cursor,
    requested_version: Option<u8>,
    security: SecurityRequest,
    id_generator: Box<dyn IdGenerator + 'a>,

    version: u8,
    version_updated: bool,
    incremental: bool,
    security_changed: bool,
    encrypt_dict: Option<Cow<'a, Dictionary>>,
    encrypt_obj_num: Option<u32>,
    encrypt_is_new: bool,
    skipped_encrypt_obj: Option<u32>,
    handler: Option<Arc<dyn CryptoHandler>>,
    encrypt_metadata: bool,
    file_id: Option<FileId>,
    numbers: ObjectNumbers,
    root_obj: Option<u32>,
    metadata_obj: Option<u32>,
    old_objects: Vec<u32>,
    new_objects: Vec<u32>,

    object_stream: ObjectStream,
    xref: XrefBuilder,
    xref_offset: Option<u64>,
    serializer: ObjectSerializer,
}

impl<'a, S: OutputSink> Creator<'a, S> {
    /// Prepare to write `doc` to `sink`.
    pub fn new(doc: &'a Document, sink: S) -> Self {
        Self {
            doc,
            out: Output { sink, base: 0 },
            options: SaveOptions::default(),
            stage: Stage::NotStarted,
            cursor: Cursor::default(),
            requested_version: None,
            security: SecurityRequest::Keep,
            id_generator: Box::new(RandomIdGenerator),
            version: 17,
            version_updated: false,
            incremental: false,
            security_changed: false,
            encrypt_dict: None,
            encrypt_obj_num: None,
            encrypt_is_new: false,
            skipped_encrypt_obj: None,
            handler: None,
            encrypt_metadata: true,
            file_id: None,
            numbers: ObjectNumbers::default(),
            root_obj: None,
            metadata_obj: None,
            old_objects: Vec::new(),
            new_objects: Vec::new(),
            object_stream: ObjectStream::new(),
            xref: XrefBuilder::new(),
            xref_offset: None,
            serializer: ObjectSerializer::new(),
        }
    }

    /// Use `generator` for new document ID halves.
    pub fn with_id_generator(mut self, generator: impl IdGenerator + 'a) -> Self {
        self.id_generator = Box::new(generator);
        self
    }

    /// Write the file as PDF version `1.{version - 10}`.
    pub fn set_file_version(&mut self, version: u8) -> Result<()> {
        self.ensure_not_started()?;
        if !(10..=17).contains(&version) {
            return Err(Error::InvalidVersion(version));
        }
        self.requested_version = Some(version);
        Ok(())
    }

    /// Write the document without encryption.
    pub fn remove_security(&mut self) -> Result<()> {
        self.ensure_not_started()?;
        self.security = SecurityRequest::Remove;
        Ok(())
    }

    /// Encrypt the document with new password-based security.
    pub fn set_security(&mut self, security: StandardSecurity) -> Result<()> {
        self.ensure_not_started()?;
        self.security = SecurityRequest::Set(security);
        Ok(())
    }

    fn ensure_not_started(&self) -> Result<()> {
        if self.stage == Stage::NotStarted {
            Ok(())
        } else {
            Err(Error::InvalidState("save already started".to_string()))
        }
    }

    /// Start the save.
    ///
    /// Runs to completion unless [`CreateFlags::PROGRESSIVE`] is set, in which
    /// case only setup runs and the caller drives [`continue_with`](Self::continue_with).
    pub fn create(&mut self, options: SaveOptions) -> Result<Progress> {
        self.ensure_not_started()?;
        self.object_stream = ObjectStream::with_max_len(options.object_stream_max_len);
        self.options = options;
        self.stage = Stage::Setup;

        if let Err(e) = self.setup() {
            self.stage = Stage::Failed;
            return Err(e);
        }
        self.stage = Stage::WriteOld;

        if self.options.flags.contains(CreateFlags::PROGRESSIVE) {
            return Ok(Progress::InProgress(self.stage));
        }
        self.continue_with(&mut NeverPause)
    }

    /// Resume the save until it completes or `pause` fires.
    pub fn continue_with(&mut self, pause: &mut dyn PauseSignal) -> Result<Progress> {
        loop {
            let step = match self.stage {
                Stage::WriteOld => self.write_old(pause),
                Stage::WriteNew => self.write_new(pause),
                Stage::Finalize => self.finalize(),
                Stage::Done => return Ok(Progress::Done),
                Stage::NotStarted | Stage::Setup => {
                    return Err(Error::InvalidState("save not started".to_string()))
                },
                Stage::Failed => {
                    return Err(Error::InvalidState("save already failed".to_string()))
                },
            };
            match step {
                Ok(StepOutcome::Paused) => return Ok(Progress::InProgress(self.stage)),
                Ok(StepOutcome::Finished) => {},
                Err(e) => {
                    log::debug!("Save failed in stage {:?}: {}", self.stage, e);
                    self.stage = Stage::Failed;
                    return Err(e);
                },
            }
        }
    }

    fn advance(&mut self, next: Stage) {
        log::debug!("Stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
        self.cursor = Cursor::default();
    }

    // ---- Stage 1 ----

    fn setup(&mut self) -> Result<()> {
        let doc = self.doc;
        let prior = doc.prior();

        let prior_version = prior.map(|p| p.version());
        self.version = self
            .requested_version
            .or(prior_version)
            .unwrap_or(17)
            .clamp(10, 17);
        self.version_updated = match (self.requested_version, prior_version) {
            (Some(requested), Some(old)) => requested != old,
            _ => false,
        };

        self.incremental = self.options.is_incremental();
        if self.incremental && prior.is_none() {
            log::warn!("Incremental save requested without a prior revision; writing a full file");
            self.incremental = false;
        }

        let existing = doc.encryption();
        match &self.security {
            SecurityRequest::Keep => {
                if let Some(enc) = existing {
                    self.encrypt_dict = Some(Cow::Borrowed(&enc.dict));
                    self.handler = Some(Arc::clone(&enc.handler));
                    self.encrypt_obj_num = enc
                        .obj_num
                        .filter(|&n| doc.contains(n) || prior.and_then(|p| p.entry(n)).is_some());
                }
            },
            SecurityRequest::Remove | SecurityRequest::Set(_) => {
                self.security_changed = true;
                self.skipped_encrypt_obj = existing.and_then(|e| e.obj_num);
            },
        }
        let no_original = self.options.flags.contains(CreateFlags::NO_ORIGINAL);
        if self.security_changed && self.incremental && !no_original {
            log::warn!("Security changed; writing a full file instead of an incremental update");
            self.incremental = false;
        }

        self.file_id = self.compute_file_id();

        if let SecurityRequest::Set(security) = &self.security {
            let first = self.file_id.as_ref().map(|id| id.first.as_slice()).unwrap_or(&[]);
            let (dict, handler) = security.build(first);
            self.encrypt_dict = Some(Cow::Owned(dict));
            self.handler = Some(Arc::new(handler));
        }
        self.encrypt_metadata = self
            .handler
            .as_ref()
            .map_or(true, |h| h.encrypt_metadata());

        self.numbers = ObjectNumbers::new(doc.last_object_number());
        // `/Size` must stay representable
        self.numbers.size()?;
        if self.encrypt_dict.is_some() && self.encrypt_obj_num.is_none() {
            self.encrypt_obj_num = Some(self.numbers.allocate()?);
            self.encrypt_is_new = true;
        }

        self.root_obj = doc.root().map(|r| r.id);
        self.metadata_obj = doc.metadata_object_number();
        self.collect_objects();

        if !self.incremental && prior.is_some() && (self.version_updated || self.security_changed) {
            log::warn!("Version or security changed; re-serializing every prior object");
        }

        match prior {
            Some(p) if self.incremental && no_original => self.out.base = p.len(),
            _ => self.out.base = 0,
        }

        if !self.incremental {
            let header = format!("%PDF-1.{}\r\n", self.version - 10);
            self.out.write_str(&header)?;
            self.out.write_block(b"%\xA1\xB3\xC5\xD7\r\n")?;
        }

        log::debug!(
            "Setup: version 1.{}, incremental={}, {} old and {} new objects",
            self.version - 10,
            self.incremental,
            self.old_objects.len(),
            self.new_objects.len()
        );
        Ok(())
    }

    fn compute_file_id(&mut self) -> Option<FileId> {
        let old = self.doc.id();
        if !self.options.generate_id {
            return old;
        }
        let first = match &old {
            Some(id) => id.first.clone(),
            None => self.id_generator.generate(),
        };
        let second = match &old {
            Some(id) if self.incremental && !self.security_changed => id.second.clone(),
            Some(_) => self.id_generator.generate(),
            None => first.clone(),
        };
        Some(FileId { first, second })
    }

    fn collect_objects(&mut self) {
        let doc = self.doc;
        let skip = self.skipped_encrypt_obj;
        let keep = |n: &u32| Some(*n) != skip;

        match doc.prior() {
            _ if self.incremental => {
                self.new_objects = doc
                    .object_numbers()
                    .filter(|&n| doc.is_modified(n))
                    .filter(keep)
                    .collect();
            },
            Some(prior) => {
                self.old_objects = prior
                    .entries()
                    .filter(|(_, e)| !matches!(e, PriorEntry::Free))
                    .map(|(n, _)| n)
                    .filter(keep)
                    .collect();
                self.new_objects = doc
                    .object_numbers()
                    .filter(|&n| matches!(prior.entry(n), None | Some(PriorEntry::Free)))
                    .filter(keep)
                    .collect();
            },
            None => {
                self.new_objects = doc.object_numbers().filter(keep).collect();
            },
        }
    }

    // ---- Stage 2 ----

    fn write_old(&mut self, pause: &mut dyn PauseSignal) -> Result<StepOutcome> {
        let doc = self.doc;
        let handler = self.handler.clone();
        let enc = Encryptor::new(handler.as_deref());

        if let Some(prior) = doc.prior() {
            if self.incremental {
                let data = prior.data();
                let no_original = self.options.flags.contains(CreateFlags::NO_ORIGINAL);
                if !no_original {
                    while self.cursor.copied < data.len() {
                        let end = (self.cursor.copied + COPY_BLOCK).min(data.len());
                        self.out.write_block(&data[self.cursor.copied..end])?;
                        self.cursor.copied = end;
                        if pause.should_pause() {
                            return Ok(StepOutcome::Paused);
                        }
                    }
                }
                // The update starts on a fresh line even when it is written alone
                if !matches!(data.last(), Some(b'\r' | b'\n')) {
                    self.out.write_str("\r\n")?;
                }
                // Without a prior xref the new section must locate every old object
                if !no_original && !prior.has_xref() {
                    self.list_prior_objects()?;
                }
            } else {
                while self.cursor.index < self.old_objects.len() {
                    let num = self.old_objects[self.cursor.index];
                    self.write_old_object(num, &enc)?;
                    self.cursor.index += 1;
                    if pause.should_pause() {
                        return Ok(StepOutcome::Paused);
                    }
                }
            }
        }

        self.advance(Stage::WriteNew);
        Ok(StepOutcome::Finished)
    }

    fn list_prior_objects(&mut self) -> Result<()> {
        let doc = self.doc;
        let Some(prior) = doc.prior() else {
            return Ok(());
        };
        let mut listed = 0usize;
        for (num, entry) in prior.entries() {
            if self.new_objects.binary_search(&num).is_ok() {
                continue;
            }
            match entry {
                PriorEntry::Free => continue,
                PriorEntry::InFile { offset, gen, .. } => self.xref.add_offset(num, *offset, *gen)?,
                PriorEntry::InStream { stream, index, .. } => {
                    self.xref.add_compressed(num, *stream, *index)?
                },
            }
            listed += 1;
        }
        log::debug!("Prior revision has no xref; listing {} old objects", listed);
        Ok(())
    }

    fn write_old_object(&mut self, num: u32, enc: &Encryptor<'_>) -> Result<()> {
        let doc = self.doc;
        let Some(prior) = doc.prior() else {
            return Ok(());
        };
        let Some(entry) = prior.entry(num) else {
            return Ok(());
        };

        let in_stream = matches!(entry, PriorEntry::InStream { .. });
        let rewrite = doc.is_modified(num)
            || self.version_updated
            || self.security_changed
            || (in_stream && enc.is_active() && !self.options.use_object_streams());
        if rewrite {
            let obj = doc.get_indirect(num).ok_or(Error::MissingObject(num))?;
            return self.write_graph_object(num, obj, enc);
        }

        match entry {
            PriorEntry::Free => Ok(()),
            PriorEntry::InFile { gen, .. } => {
                let raw = prior.raw_object(num).ok_or_else(|| {
                    Error::InvalidPrior(format!("object {} lies outside the prior file", num))
                })?;
                let offset = self.out.offset();
                self.out.write_block(raw)?;
                self.xref.add_offset(num, offset, *gen)?;
                log::trace!("Copied object {} ({} bytes)", num, raw.len());
                Ok(())
            },
            PriorEntry::InStream { body, .. } => {
                if self.options.use_object_streams() {
                    self.object_stream.compress_indirect_bytes(num, body);
                    self.flush_object_stream_if_full(enc)
                } else {
                    let mut buf = format!("{} 0 obj\r\n", num).into_bytes();
                    buf.extend_from_slice(body);
                    buf.extend_from_slice(b"\r\nendobj\r\n");
                    let offset = self.out.offset();
                    self.out.write_block(&buf)?;
                    self.xref.add_offset(num, offset, 0)?;
                    log::trace!("Unpacked object {} from its object stream", num);
                    Ok(())
                }
            },
        }
    }

    // ---- Stage 3 ----

    fn write_new(&mut self, pause: &mut dyn PauseSignal) -> Result<StepOutcome> {
        let doc = self.doc;
        let handler = self.handler.clone();
        let enc = Encryptor::new(handler.as_deref());

        while self.cursor.index < self.new_objects.len() {
            let num = self.new_objects[self.cursor.index];
            let obj = doc.get_indirect(num).ok_or(Error::MissingObject(num))?;
            self.write_graph_object(num, obj, &enc)?;
            self.cursor.index += 1;
            if pause.should_pause() {
                return Ok(StepOutcome::Paused);
            }
        }

        if self.encrypt_is_new {
            if let (Some(num), Some(dict)) = (self.encrypt_obj_num, self.encrypt_dict.clone()) {
                self.write_standalone(num, 0, &Object::Dictionary(dict.into_owned()), &enc)?;
            }
        }

        self.advance(Stage::Finalize);
        Ok(StepOutcome::Finished)
    }

    fn write_graph_object(
        &mut self,
        num: u32,
        obj: &IndirectObject,
        enc: &Encryptor<'_>,
    ) -> Result<()> {
        if self.options.use_object_streams() && self.is_object_stream_eligible(num, obj) {
            self.object_stream
                .compress_indirect_object(num, &obj.object)?;
            log::trace!("Packed object {} into object stream", num);
            self.flush_object_stream_if_full(enc)
        } else {
            self.write_standalone(num, obj.gen, &obj.object, enc)
        }
    }

    fn is_object_stream_eligible(&self, num: u32, obj: &IndirectObject) -> bool {
        let object = &obj.object;
        obj.gen == 0
            && !object.is_stream()
            && !object.is_number()
            && Some(num) != self.root_obj
            && Some(num) != self.encrypt_obj_num
            && !object.is_signature_dict()
            && object.dict_type() != Some("Page")
    }

    fn write_standalone(
        &mut self,
        num: u32,
        gen: u16,
        obj: &Object,
        enc: &Encryptor<'_>,
    ) -> Result<()> {
        let cipher = (enc.is_active() && Some(num) != self.encrypt_obj_num)
            .then(|| ObjectCipher::new(*enc, num, gen));

        let mut buf = format!("{} {} obj\r\n", num, gen).into_bytes();
        match obj {
            Object::Stream { dict, data } => {
                let is_metadata = Some(num) == self.metadata_obj;
                let compress = self.options.compress && !is_metadata;
                let (mut dict, encoded) = FlateEncoder::encode_stream(dict, data, compress)?;
                let payload = match &cipher {
                    Some(_) if !is_metadata || self.encrypt_metadata => {
                        enc.encrypt(num, gen, encoded.as_bytes())?
                    },
                    _ => Cow::Borrowed(encoded.as_bytes()),
                };
                if payload.len() != encoded.len() {
                    dict.insert("Length".to_string(), Object::Integer(payload.len() as i64));
                }
                self.serializer
                    .write_stream(&mut buf, &dict, &payload, cipher.as_ref())?;
            },
            other => self
                .serializer
                .write_object(&mut buf, other, cipher.as_ref())?,
        }
        buf.extend_from_slice(b"\r\nendobj\r\n");

        let offset = self.out.offset();
        self.out.write_block(&buf)?;
        self.xref.add_offset(num, offset, gen)?;
        log::trace!("Wrote object {} {} at {}", num, gen, offset);
        Ok(())
    }

    fn flush_object_stream_if_full(&mut self, enc: &Encryptor<'_>) -> Result<()> {
        if self.object_stream.is_not_full() {
            Ok(())
        } else {
            self.flush_object_stream(enc)
        }
    }

    fn flush_object_stream(&mut self, enc: &Encryptor<'_>) -> Result<()> {
        let flushed = self.object_stream.end(
            &mut self.out,
            &mut self.numbers,
            enc,
            self.options.compress,
        )?;
        if let Some(offset) = flushed {
            let container = self.object_stream.obj_num();
            self.xref.add_offset(container, offset, 0)?;
            for (index, item) in self.object_stream.items().iter().enumerate() {
                self.xref
                    .add_compressed(item.obj_num, container, index as u32)?;
            }
            self.object_stream.start();
        }
        Ok(())
    }

    // ---- Stage 4 ----

    fn finalize(&mut self) -> Result<StepOutcome> {
        let handler = self.handler.clone();
        let enc = Encryptor::new(handler.as_deref());
        self.flush_object_stream(&enc)?;

        let mut trailer = self.trailer_entries();
        let prev = self
            .doc
            .prior()
            .filter(|p| self.incremental && p.has_xref())
            .map(|p| p.xref_offset());
        // A prior without an xref gets a complete section
        let full = !self.incremental || self.doc.prior().is_some_and(|p| !p.has_xref());
        let use_stream = self.options.use_object_streams()
            || (self.incremental && self.doc.prior().is_some_and(|p| p.uses_xref_stream()));

        let offset = if use_stream {
            if let Some(id) = &self.file_id {
                trailer.insert("ID".to_string(), id.to_object());
            }
            let offset = self.xref.write_stream(
                &mut self.out,
                &mut self.numbers,
                XrefStreamParams {
                    trailer: &trailer,
                    prev,
                    full,
                    compress: self.options.compress,
                },
            )?;
            self.out.write_str("startxref\r\n")?;
            offset
        } else {
            let size = self.numbers.size()?;
            let offset = self.xref.write_table(&mut self.out, full)?;
            trailer.insert("Size".to_string(), Object::Integer(i64::from(size)));
            if let Some(prev) = prev {
                trailer.insert("Prev".to_string(), Object::Integer(prev as i64));
            }
            if let Some(id) = &self.file_id {
                trailer.insert("ID".to_string(), id.to_object());
            }
            let mut buf = b"trailer\r\n".to_vec();
            self.serializer
                .write_object(&mut buf, &Object::Dictionary(trailer), None)?;
            buf.extend_from_slice(b"\r\nstartxref\r\n");
            self.out.write_block(&buf)?;
            offset
        };
        self.out.write_str(&format!("{}\r\n%%EOF\r\n", offset))?;
        self.xref_offset = Some(offset);

        log::debug!(
            "Finished save: {} xref entries, startxref {}",
            self.xref.len(),
            offset
        );
        self.advance(Stage::Done);
        Ok(StepOutcome::Finished)
    }

    /// Trailer entries other than `/Size`, `/Prev` and `/ID`.
    fn trailer_entries(&self) -> Dictionary {
        let mut trailer = Dictionary::new();
        if let Some(prior) = self.doc.prior() {
            for (key, value) in prior.trailer() {
                if !RECOMPUTED_TRAILER_KEYS.contains(&key.as_str()) {
                    trailer.insert(key.clone(), value.clone());
                }
            }
        }
        if let Some(root) = self.doc.root() {
            trailer.insert("Root".to_string(), Object::Reference(root));
        }
        if let Some(info) = self.doc.info() {
            trailer.insert("Info".to_string(), Object::Reference(info));
        }
        if let (Some(_), Some(num)) = (&self.encrypt_dict, self.encrypt_obj_num) {
            let gen = self.doc.generation(num);
            trailer.insert(
                "Encrypt".to_string(),
                Object::Reference(ObjectRef::new(num, gen)),
            );
        }
        trailer
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Version written to the header, as `10..=17`.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Whether the save appends to the prior revision.
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Cross-reference entries recorded so far.
    pub fn xref(&self) -> &XrefBuilder {
        &self.xref
    }

    /// Offset of the cross-reference section once the save is done.
    pub fn xref_offset(&self) -> Option<u64> {
        self.xref_offset
    }

    /// The `/ID` written to the trailer.
    pub fn file_id(&self) -> Option<&FileId> {
        self.file_id.as_ref()
    }

    /// The `/Encrypt` dictionary in effect for this save.
    pub fn encrypt_dict(&self) -> Option<&Dictionary> {
        self.encrypt_dict.as_deref()
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        &self.out.sink
    }

    /// Take the sink back.
    pub fn into_sink(self) -> S {
        self.out.sink
    }
}

impl<S: OutputSink> std::fmt::Debug for Creator<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Creator")
            .field("stage", &self.stage)
            .field("incremental", &self.incremental)
            .field("version", &self.version)
            .field("offset", &self.out.offset())
            .finish_non_exhaustive()
    }
}
