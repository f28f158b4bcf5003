use std::sync::LazyLock;

use regex::Regex;

use crate::parser::assembler::RunContext;
use crate::parser::cursor::{Append, EntryCursor};
use crate::parser::model::{Dialect, LogEntry, LogLevel};
use crate::parser::timestamp;
use crate::parser::traits::LineAssembler;

/// `proto:TCP 2026-01-09T22:46:45.367125Z 10.0.0.1:5060 ---> 10.0.0.2:5060`
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^proto:(\S+)\s+(\S+)\s+(\S+)\s+(--->|<---)\s+(\S+)\s*$").expect("homer header pattern is valid")
});

/// Leading part of a header: everything up to the direction arrow.
static HEADER_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^proto:\S+\s+\S+\s+\S+\s+(?:--->|<---)").expect("homer header start pattern is valid")
});

pub fn is_header(line: &str) -> bool {
    HEADER.is_match(line.trim())
}

/// Header check for a line whose end was not read.
pub fn is_header_start(line: &str) -> bool {
    HEADER_START.is_match(line.trim_start())
}

/// A parsed capture header waiting for its first body line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomerHeader {
    pub proto: String,
    pub raw_timestamp: String,
    pub direction: String,
    pub summary: String,
}

impl HomerHeader {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let caps = HEADER.captures(line)?;
        let src = &caps[3];
        let dst = &caps[5];
        let direction = match &caps[4] {
            "--->" => format!("{src} → {dst}"),
            _ => format!("{src} ← {dst}"),
        };
        Some(Self {
            proto: caps[1].to_string(),
            raw_timestamp: caps[2].to_string(),
            direction,
            summary: line.to_string(),
        })
    }

    pub fn component(&self) -> String {
        format!("{} {}", self.proto, self.direction)
    }

    /// `[src → dst] ` followed by `first_line` cut to `max_chars` characters.
    pub fn message(&self, first_line: &str, max_chars: usize) -> String {
        let text: String = first_line.trim().chars().take(max_chars).collect();
        format!("[{}] {}", self.direction, text)
    }
}

/// Homer SIP capture exports.
///
/// The entry for a record opens on its first non-blank body line so the
/// message never changes after creation. Blank lines inside the body are held
/// back until a non-blank line follows; blank lines at the end of a record
/// are dropped.
#[derive(Debug)]
pub struct HomerAssembler {
    ctx: RunContext,
    cursor: EntryCursor,
    pending: Option<HomerHeader>,
    blank_run: usize,
}

impl HomerAssembler {
    pub fn new(ctx: RunContext) -> Self {
        let cursor = EntryCursor::new(ctx.max_payload_bytes);
        Self { ctx, cursor, pending: None, blank_run: 0 }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Close the current record: either the open entry, or a header with no body.
    fn close_record(&mut self, out: &mut Vec<LogEntry>) {
        self.blank_run = 0;
        if let Some(header) = self.pending.take() {
            let summary = header.summary.clone();
            self.open_entry(header, &summary, false, out);
        }
        if let Some(entry) = self.cursor.close() {
            self.ctx.emit(Dialect::Homer, entry, out);
        }
    }

    fn open_entry(&mut self, header: HomerHeader, first_line: &str, body: bool, out: &mut Vec<LogEntry>) {
        let mut entry = LogEntry::new(
            self.ctx.allocate_id(),
            timestamp::or_wall_clock(timestamp::parse_rfc3339(&header.raw_timestamp)),
            header.raw_timestamp.clone(),
            LogLevel::Info,
            header.component(),
            header.message(first_line, self.ctx.message_display_len),
        );
        entry.is_sip = true;

        if let Some(previous) = self.cursor.open(entry) {
            self.ctx.emit(Dialect::Homer, previous, out);
        }
        if body {
            self.append(first_line);
        }
    }

    fn append(&mut self, line: &str) {
        match self.cursor.append(line) {
            Append::Appended => self.ctx.record(|m| m.record_continuation()),
            Append::Truncated { first: true } => {
                tracing::debug!(file = %self.ctx.file_name, "payload cap reached in capture body");
                self.ctx.record(|m| m.record_payload_truncated());
            }
            Append::Truncated { first: false } => {}
            Append::Dropped => self.ctx.record(|m| m.record_preamble_dropped()),
        }
    }
}

impl LineAssembler for HomerAssembler {
    fn push_line(&mut self, line: &str, out: &mut Vec<LogEntry>) {
        self.ctx.record(|m| m.record_line());

        if let Some(header) = HomerHeader::parse(line) {
            self.close_record(out);
            self.pending = Some(header);
            return;
        }

        let blank = line.trim().is_empty();

        if let Some(header) = self.pending.take() {
            if blank {
                // leading blank lines before the body
                self.pending = Some(header);
            } else {
                self.open_entry(header, line, true, out);
            }
            return;
        }

        if !self.cursor.is_open() {
            tracing::debug!(file = %self.ctx.file_name, "dropping line before first capture header");
            self.ctx.record(|m| m.record_preamble_dropped());
            return;
        }

        if blank {
            self.blank_run += 1;
            return;
        }
        for _ in 0..std::mem::take(&mut self.blank_run) {
            self.append("");
        }
        self.append(line);
    }

    fn finish(&mut self, out: &mut Vec<LogEntry>) {
        self.close_record(out);
    }

    fn dialect(&self) -> Dialect {
        Dialect::Homer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::assembler::assemble_text;
    use chrono::{TimeZone, Utc};

    fn parse(text: &str) -> Vec<LogEntry> {
        assemble_text(text, Dialect::Homer, RunContext::new("capture.txt", 1))
    }

    const INVITE: &str = "proto:TCP 2026-01-09T22:46:45.367125Z 10.0.0.1:1 ---> 10.0.0.2:2\n\
                          \n\
                          INVITE sip:1017@pbx SIP/2.0\n\
                          Call-ID: abc123\n\
                          From: <sip:agent@10.0.0.1>;tag=9\n\
                          \n";

    #[test]
    fn test_header_parse_directions() {
        let out = HomerHeader::parse("proto:UDP 2026-01-09T22:46:45Z a:1 ---> b:2").unwrap();
        assert_eq!(out.component(), "UDP a:1 → b:2");

        let inbound = HomerHeader::parse("proto:TCP 2026-01-09T22:46:45Z a:1 <--- b:2").unwrap();
        assert_eq!(inbound.direction, "a:1 ← b:2");
        assert!(HomerHeader::parse("proto:TCP only-two-fields").is_none());
    }

    #[test]
    fn test_header_start_without_line_end() {
        assert!(is_header_start("proto:TCP 2026-01-09T22:46:45.367125Z 10.0.0.1:1 ---> 10.0"));
        assert!(!is_header("proto:TCP 2026-01-09T22:46:45.367125Z 10.0.0.1:1 ---> 10.0 extra"));
        assert!(!is_header_start("proto:TCP 2026-01-09T22:46:45Z 10.0"));
        assert!(!is_header_start("[INFO] proto:TCP a b c ---> d"));
    }

    #[test]
    fn test_invite_record() {
        let entries = parse(INVITE);
        assert_eq!(entries.len(), 1);
        let e = &entries[0];

        assert!(e.is_sip);
        assert_eq!(e.sip_method.as_deref(), Some("INVITE"));
        assert_eq!(e.call_id.as_deref(), Some("abc123"));
        assert_eq!(e.component, "TCP 10.0.0.1:1 → 10.0.0.2:2");
        assert_eq!(e.message, "[10.0.0.1:1 → 10.0.0.2:2] INVITE sip:1017@pbx SIP/2.0");
        assert_eq!(e.payload, "INVITE sip:1017@pbx SIP/2.0\nCall-ID: abc123\nFrom: <sip:agent@10.0.0.1>;tag=9");
        assert_eq!(e.raw_timestamp, "2026-01-09T22:46:45.367125Z");
        assert_eq!(e.timestamp, Utc.with_ymd_and_hms(2026, 1, 9, 22, 46, 45).unwrap().timestamp_millis() + 367);
    }

    #[test]
    fn test_status_record_and_inner_blank_lines() {
        let text = "proto:UDP 2026-01-09T22:46:46Z 10.0.0.2:2 <--- 10.0.0.1:1\n\
                    SIP/2.0 200 OK\n\
                    Call-ID: abc123\n\
                    \n\
                    v=0\n\
                    \n\
                    \n";
        let e = &parse(text)[0];
        assert_eq!(e.sip_method.as_deref(), Some("200 OK"));
        assert_eq!(e.payload, "SIP/2.0 200 OK\nCall-ID: abc123\n\nv=0");
    }

    #[test]
    fn test_multiple_records_sequential_ids() {
        let text = format!("{INVITE}proto:TCP 2026-01-09T22:46:44Z 10.0.0.2:2 <--- 10.0.0.1:1\nSIP/2.0 100 Trying\n");
        let entries = parse(&text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[1].id, 2);
        assert_eq!(entries[1].sip_method.as_deref(), Some("100 Trying"));
    }

    #[test]
    fn test_header_without_body_uses_summary() {
        let text = "proto:TCP 2026-01-09T22:46:45Z a:1 ---> b:2\n\nproto:TCP 2026-01-09T22:46:46Z a:1 ---> b:2\nBYE sip:x SIP/2.0";
        let entries = parse(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "[a:1 → b:2] proto:TCP 2026-01-09T22:46:45Z a:1 ---> b:2");
        assert_eq!(entries[0].payload, "");
        assert!(entries[0].is_sip);
        assert_eq!(entries[1].sip_method.as_deref(), Some("BYE"));
    }

    #[test]
    fn test_message_truncated_by_chars() {
        let long = "é".repeat(300);
        let text = format!("proto:TCP 2026-01-09T22:46:45Z a ---> b\n{long}");
        let ctx = RunContext::new("c", 1).with_message_display_len(10);
        let entries = assemble_text(&text, Dialect::Homer, ctx);
        assert_eq!(entries[0].message, format!("[a → b] {}", "é".repeat(10)));
        assert_eq!(entries[0].payload, long);
    }

    #[test]
    fn test_lines_before_first_header_dropped() {
        let text = format!("garbage\nmore\n{INVITE}");
        let entries = parse(&text);
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].payload.contains("garbage"));
    }
}
