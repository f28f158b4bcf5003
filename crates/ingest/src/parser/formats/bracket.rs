use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::parser::assembler::RunContext;
use crate::parser::cursor::{Append, EntryCursor};
use crate::parser::model::{Dialect, LogEntry, LogLevel};
use crate::parser::timestamp;
use crate::parser::traits::LineAssembler;

/// `[INFO] [12/17/2024, 5:04:57 AM,388] [svc.Foo]: started`
static LEGACY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\w+)\]\s+\[(\d{1,2}/\d{1,2}/\d{4}),\s*([^\]]+)\]\s+\[([^\]]*)\]:\s?(.*)$")
        .expect("legacy bracket pattern is valid")
});

/// `[ERROR] [2025-01-01 00:00:00,500] [x] boom`
static ISO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\w+)\]\s+\[(\d{4}-\d{2}-\d{2})[ T](\d{2}:\d{2}:\d{2})(?:[,.](\d{1,3}))?\]\s+\[([^\]]*)\]\s?(.*)$")
        .expect("iso bracket pattern is valid")
});

/// Header fields of a recognized entry-start line.
#[derive(Debug, PartialEq, Eq)]
pub struct BracketHeader<'a> {
    pub level: &'a str,
    pub raw_timestamp: String,
    pub timestamp: Option<i64>,
    pub component: &'a str,
    pub message: &'a str,
}

/// Try the legacy grammar, then ISO. `None` means continuation.
pub fn parse_header(line: &str) -> Option<BracketHeader<'_>> {
    if let Some(caps) = LEGACY.captures(line) {
        let date = group(&caps, 2);
        let time = group(&caps, 3).trim();
        return Some(BracketHeader {
            level: group(&caps, 1),
            raw_timestamp: format!("{date}, {time}"),
            timestamp: timestamp::parse_legacy(date, time),
            component: group(&caps, 4).trim(),
            message: group(&caps, 5),
        });
    }

    let caps = ISO.captures(line)?;
    let date = group(&caps, 2);
    let time = group(&caps, 3);
    let millis = caps.get(4).map(|m| m.as_str());
    let raw_timestamp = match millis {
        Some(ms) => format!("{date} {time},{ms}"),
        None => format!("{date} {time}"),
    };
    Some(BracketHeader {
        level: group(&caps, 1),
        raw_timestamp,
        timestamp: timestamp::parse_iso(date, time, millis),
        component: group(&caps, 5).trim(),
        message: group(&caps, 6),
    })
}

fn group<'a>(caps: &Captures<'a>, index: usize) -> &'a str {
    caps.get(index).map(|m| m.as_str()).unwrap_or("")
}

/// Tagged-bracket application logs: one header line, then free-form continuation.
#[derive(Debug)]
pub struct BracketAssembler {
    ctx: RunContext,
    cursor: EntryCursor,
}

impl BracketAssembler {
    pub fn new(ctx: RunContext) -> Self {
        let cursor = EntryCursor::new(ctx.max_payload_bytes);
        Self { ctx, cursor }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    fn start_entry(&mut self, header: BracketHeader<'_>, out: &mut Vec<LogEntry>) {
        let entry = LogEntry::new(
            self.ctx.allocate_id(),
            timestamp::or_wall_clock(header.timestamp),
            header.raw_timestamp,
            LogLevel::from_tag(header.level),
            header.component,
            header.message,
        );
        if let Some(previous) = self.cursor.open(entry) {
            self.ctx.emit(Dialect::TaggedBracket, previous, out);
        }
    }

    fn continue_entry(&mut self, line: &str) {
        match self.cursor.append(line) {
            Append::Appended => self.ctx.record(|m| m.record_continuation()),
            Append::Truncated { first: true } => {
                tracing::debug!(file = %self.ctx.file_name, "payload cap reached, discarding further continuation lines");
                self.ctx.record(|m| m.record_payload_truncated());
            }
            Append::Truncated { first: false } => {}
            Append::Dropped => {
                tracing::debug!(file = %self.ctx.file_name, "dropping line before first entry");
                self.ctx.record(|m| m.record_preamble_dropped());
            }
        }
    }
}

impl LineAssembler for BracketAssembler {
    fn push_line(&mut self, line: &str, out: &mut Vec<LogEntry>) {
        self.ctx.record(|m| m.record_line());
        match parse_header(line) {
            Some(header) => self.start_entry(header, out),
            None => self.continue_entry(line),
        }
    }

    fn finish(&mut self, out: &mut Vec<LogEntry>) {
        if let Some(last) = self.cursor.close() {
            self.ctx.emit(Dialect::TaggedBracket, last, out);
        }
    }

    fn dialect(&self) -> Dialect {
        Dialect::TaggedBracket
    }
}
