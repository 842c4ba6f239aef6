//! PDF file writing.
//!
//! ## Architecture
//!
//! ```text
//! Document
//!     ↓
//! [Creator] (stage machine, pause/continue)
//!     ↓                     ↓
//! [ObjectStream]        standalone objects
//!     ↓                     ↓
//! [ObjectSerializer] → [FlateEncoder] → [Encryptor]
//!     ↓
//! [XrefBuilder] (table or stream) + trailer
//!     ↓
//! [OutputSink]
//! ```

mod creator;
pub(crate) mod file_id;
mod flate;
mod object_serializer;
mod object_stream;
mod sink;
mod xref;

pub use creator::{Creator, NeverPause, PauseSignal, Progress, Stage};
pub use file_id::{FileId, IdGenerator, RandomIdGenerator};
pub use flate::{Encoded, FlateEncoder};
pub use object_serializer::{ObjectCipher, ObjectSerializer};
pub use object_stream::{ObjectStream, ObjectStreamItem};
pub use sink::{OutputSink, VecSink, WriteSink};
pub use xref::{ObjectNumbers, XrefBuilder, XrefEntry, XrefStreamParams};
