//! # physgen-archive
//!
//! A small self-describing archive for trial output.
//!
//! ## Format
//!
//! ```text
//! "PHGA" | u32 LE version | entry*
//! entry = u32 LE length | gzip(bincode((path, Dataset)))
//! ```
//!
//! Paths are slash-separated (`frames/0003/objects/positions`); groups are
//! implicit and are rebuilt by the reader from the path prefixes. Entries are
//! appended as they are produced, so a trial never has to be held in memory.

pub mod dataset;
pub mod reader;
pub mod writer;

pub use dataset::{Data, Dataset};
pub use reader::Archive;
pub use writer::ArchiveWriter;

/// File magic.
pub const MAGIC: &[u8; 4] = b"PHGA";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound on one compressed entry. Larger lengths mean a corrupt file.
pub const MAX_ENTRY_LEN: usize = 256 * 1024 * 1024;
