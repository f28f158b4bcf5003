// Module structure for the voice/SIP log ingestion engine.

// Core engine
pub mod parser;
pub mod reader;
pub mod merge;

// Ambient
pub mod conf;
pub mod runtime;

pub use conf::IngestConfig;
pub use merge::{merge_sources, FileInput, MergedLogs};
pub use parser::{Dialect, EntryType, LogEntry, LogLevel, ParsingMetrics};
pub use reader::{parse, ByteSource, FileSource, LogReader, MemorySource, ParseOptions, SourceError};
