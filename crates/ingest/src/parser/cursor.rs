use super::finalize::finalize_entry;
use super::model::LogEntry;

/// Appended once when a payload hits the configured cap.
pub const TRUNCATION_MARKER: &str = "\n…[payload truncated]";

/// Open-entry state of one parse run.
#[derive(Debug, Default)]
pub enum CursorState {
    #[default]
    Idle,
    Assembling(PartialEntry),
}

/// An entry still accepting continuation lines.
#[derive(Debug)]
pub struct PartialEntry {
    entry: LogEntry,
    truncated: bool,
}

/// Result of offering a continuation line to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    Appended,
    /// Cap reached: the line was discarded (the marker is added the first time)
    Truncated { first: bool },
    /// No entry is open; the line precedes the first entry-start
    Dropped,
}

/// Holds at most one open entry and owns the finalize transition.
#[derive(Debug, Default)]
pub struct EntryCursor {
    state: CursorState,
    max_payload_bytes: Option<usize>,
}

impl EntryCursor {
    pub fn new(max_payload_bytes: Option<usize>) -> Self {
        Self { state: CursorState::Idle, max_payload_bytes }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CursorState::Assembling(_))
    }

    /// Open `entry`, finalizing and returning whatever was open before.
    pub fn open(&mut self, entry: LogEntry) -> Option<LogEntry> {
        let previous = self.close();
        self.state = CursorState::Assembling(PartialEntry { entry, truncated: false });
        previous
    }

    /// Append one continuation line to the open entry's payload.
    pub fn append(&mut self, line: &str) -> Append {
        let CursorState::Assembling(partial) = &mut self.state else {
            return Append::Dropped;
        };

        if partial.truncated {
            return Append::Truncated { first: false };
        }

        let payload = &mut partial.entry.payload;
        let separator = usize::from(!payload.is_empty());

        if let Some(cap) = self.max_payload_bytes {
            if payload.len() + separator + line.len() > cap {
                payload.push_str(TRUNCATION_MARKER);
                partial.truncated = true;
                return Append::Truncated { first: true };
            }
        }

        if separator == 1 {
            payload.push('\n');
        }
        payload.push_str(line);
        Append::Appended
    }

    /// Finalize the open entry, if any, leaving the cursor idle.
    pub fn close(&mut self) -> Option<LogEntry> {
        match std::mem::take(&mut self.state) {
            CursorState::Idle => None,
            CursorState::Assembling(partial) => Some(finalize_entry(partial.entry, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::model::LogLevel;

    fn start(id: u64, message: &str) -> LogEntry {
        LogEntry::new(id, 0, "", LogLevel::Info, "c", message)
    }

    #[test]
    fn test_idle_drops_lines() {
        let mut cursor = EntryCursor::new(None);
        assert_eq!(cursor.append("preamble"), Append::Dropped);
        assert!(!cursor.is_open());
        assert!(cursor.close().is_none());
    }

    #[test]
    fn test_first_continuation_has_no_leading_newline() {
        let mut cursor = EntryCursor::new(None);
        assert!(cursor.open(start(1, "m")).is_none());
        cursor.append("one");
        cursor.append("two");

        let entry = cursor.close().unwrap();
        assert_eq!(entry.payload, "one\ntwo");
        assert!(!cursor.is_open());
    }

    #[test]
    fn test_open_finalizes_previous() {
        let mut cursor = EntryCursor::new(None);
        cursor.open(start(1, "first"));
        cursor.append("body");

        let previous = cursor.open(start(2, "second")).unwrap();
        assert_eq!(previous.id, 1);
        assert_eq!(previous.payload, "body");
        assert_eq!(previous.display_message, "first");

        let last = cursor.close().unwrap();
        assert_eq!(last.id, 2);
        assert_eq!(last.payload, "");
    }

    #[test]
    fn test_blank_continuation_lines_are_kept() {
        let mut cursor = EntryCursor::new(None);
        cursor.open(start(1, "m"));
        cursor.append("a");
        cursor.append("");
        cursor.append("b");
        assert_eq!(cursor.close().unwrap().payload, "a\n\nb");
    }

    #[test]
    fn test_payload_cap_marks_once() {
        let mut cursor = EntryCursor::new(Some(8));
        cursor.open(start(1, "m"));
        assert_eq!(cursor.append("1234"), Append::Appended);
        assert_eq!(cursor.append("5678"), Append::Truncated { first: true });
        assert_eq!(cursor.append("9"), Append::Truncated { first: false });

        let entry = cursor.close().unwrap();
        assert_eq!(entry.payload, format!("1234{TRUNCATION_MARKER}"));
    }

    #[test]
    fn test_cap_resets_for_next_entry() {
        let mut cursor = EntryCursor::new(Some(4));
        cursor.open(start(1, "m"));
        cursor.append("too long");
        cursor.open(start(2, "n"));
        assert_eq!(cursor.append("ok"), Append::Appended);
    }
}
