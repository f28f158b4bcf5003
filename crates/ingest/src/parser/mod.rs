/// Log dialect detection and entry assembly
///
/// Turns raw lines from voice/SIP log exports into normalized, correlatable
/// `LogEntry` records.
///
/// # Architecture
///
/// - `detector.rs`: dialect selection from file name + bounded prefix
/// - `formats/`: one line assembler per dialect
/// - `cursor.rs`: the single open entry and its finalize transition
/// - `finalize.rs`: enrichment pipeline run once per closed entry
/// - `timestamp.rs`, `sip.rs`, `correlate.rs`: enrichment steps
/// - `metrics.rs`: ingestion counters
///
/// Malformed input never fails a run: unmatched lines become continuations,
/// bad rows are skipped, bad timestamps fall back to wall clock.

pub mod assembler;
pub mod correlate;
pub mod cursor;
pub mod detector;
pub mod finalize;
pub mod formats;
pub mod metrics;
pub mod model;
pub mod sip;
pub mod timestamp;
pub mod traits;

// Re-export commonly used types
pub use assembler::{Assembler, RunContext};
pub use detector::detect_dialect;
pub use metrics::{MetricsSnapshot, ParsingMetrics};
pub use model::{Dialect, EntryType, LogEntry, LogLevel};
pub use traits::LineAssembler;

// Defaults
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024; // 2 MiB
pub const DEFAULT_CHUNK_THRESHOLD: usize = 8 * 1024 * 1024; // 8 MiB
pub const DEFAULT_DETECTION_PREFIX: usize = 64 * 1024; // 64 KiB
pub const DEFAULT_YIELD_EVERY_CHUNKS: usize = 1;
pub const DEFAULT_YIELD_EVERY_LINES: usize = 10_000;
pub const DEFAULT_MESSAGE_DISPLAY_LEN: usize = 200;
