//! Reader module — byte sources and the chunked, yielding parse loop.

pub mod chunked;
pub mod source;

pub use chunked::{parse, LogReader, ParseOptions};
pub use source::{ByteSource, FileSource, MemorySource, SourceError};
