pub use super::model::{Dialect, LogEntry};

/// Turns a stream of physical lines into finalized entries.
///
/// Implementations own their open-entry state; finished entries are pushed
/// onto `out` in emission order. Lines arrive without their terminator.
pub trait LineAssembler: Send {
    fn push_line(&mut self, line: &str, out: &mut Vec<LogEntry>);

    /// Flush whatever is still open at end of input.
    fn finish(&mut self, out: &mut Vec<LogEntry>);

    fn dialect(&self) -> Dialect;
}
