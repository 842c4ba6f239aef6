#![allow(clippy::enum_variant_names)]

//! # PDF Creator
//!
//! Writes an in-memory PDF object graph to a byte-exact PDF file.
//!
//! ## Features
//!
//! - **Full saves and incremental updates**: append changed objects after the
//!   original bytes with a `/Prev`-linked cross-reference section
//! - **Object streams**: pack small objects into compressed `/ObjStm`
//!   containers with a cross-reference stream (PDF 1.5+)
//! - **Encryption**: strings and stream payloads pass through a pluggable
//!   [`CryptoHandler`]; RC4 and AES-128 standard security is included
//! - **Resumable saves**: the [`writer::Creator`] pauses between objects and
//!   continues later without re-deriving state
//!
//! ## Quick Start
//!
//! ```
//! use pdf_creator::document::Document;
//! use pdf_creator::object::{Dictionary, Object};
//! use pdf_creator::writer::{Creator, Progress, VecSink};
//! use pdf_creator::{CreateFlags, SaveOptions};
//!
//! let mut doc = Document::new();
//! let mut catalog = Dictionary::new();
//! catalog.insert("Type".to_string(), Object::Name("Catalog".to_string()));
//! let root = doc.add_object(Object::Dictionary(catalog))?;
//! doc.set_root(root);
//!
//! let options = SaveOptions::new().with_flags(CreateFlags::OBJECT_STREAM | CreateFlags::PROGRESSIVE);
//! let mut creator = Creator::new(&doc, VecSink::new());
//! let mut progress = creator.create(options)?;
//! while progress != Progress::Done {
//!     progress = creator.continue_with(&mut || false)?;
//! }
//! assert!(creator.sink().as_bytes().ends_with(b"%%EOF\r\n"));
//! # Ok::<(), pdf_creator::Error>(())
//! ```

pub mod config;
pub mod document;
pub mod encryption;
pub mod error;
pub mod object;
pub mod writer;

pub use config::{CreateFlags, SaveOptions};
pub use document::{Document, PriorEntry, PriorRevision};
pub use encryption::{Algorithm, CryptoHandler, Encryptor, StandardSecurity};
pub use error::{Error, Result};
pub use object::{Dictionary, Object, ObjectRef};
