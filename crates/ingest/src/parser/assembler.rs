use std::sync::Arc;

use super::formats::{BracketAssembler, DatadogAssembler, HomerAssembler};
use super::metrics::ParsingMetrics;
use super::model::{Dialect, LogEntry};
use super::traits::LineAssembler;

/// Per-run state shared by every dialect: id allocation and provenance.
#[derive(Debug, Clone)]
pub struct RunContext {
    next_id: u64,
    pub file_name: String,
    pub file_color: Option<String>,
    pub metrics: Option<Arc<ParsingMetrics>>,
    pub message_display_len: usize,
    pub max_payload_bytes: Option<usize>,
}

impl RunContext {
    pub fn new(file_name: impl Into<String>, start_id: u64) -> Self {
        Self {
            next_id: start_id,
            file_name: file_name.into(),
            file_color: None,
            metrics: None,
            message_display_len: super::DEFAULT_MESSAGE_DISPLAY_LEN,
            max_payload_bytes: None,
        }
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.file_color = color;
        self
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<ParsingMetrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_message_display_len(mut self, len: usize) -> Self {
        self.message_display_len = len;
        self
    }

    pub fn with_max_payload_bytes(mut self, cap: Option<usize>) -> Self {
        self.max_payload_bytes = cap;
        self
    }

    /// Hand out the next id. Ids are only consumed by entries that get emitted.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The id the next entry would receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Stamp provenance and count the entry.
    pub(crate) fn emit(&self, dialect: Dialect, entry: LogEntry, out: &mut Vec<LogEntry>) {
        let entry = if entry.file_name.is_empty() {
            entry.with_provenance(self.file_name.clone(), self.file_color.clone())
        } else {
            LogEntry { file_color: self.file_color.clone(), ..entry }
        };
        if let Some(m) = &self.metrics {
            m.record_entry(dialect, entry.is_sip);
        }
        out.push(entry);
    }

    pub(crate) fn record(&self, f: impl FnOnce(&ParsingMetrics)) {
        if let Some(m) = &self.metrics {
            f(m);
        }
    }
}

/// Dialect dispatch without trait objects.
#[derive(Debug)]
pub enum Assembler {
    Bracket(BracketAssembler),
    Homer(HomerAssembler),
    Datadog(DatadogAssembler),
}

impl Assembler {
    pub fn new(dialect: Dialect, ctx: RunContext) -> Self {
        match dialect {
            Dialect::TaggedBracket => Assembler::Bracket(BracketAssembler::new(ctx)),
            Dialect::Homer => Assembler::Homer(HomerAssembler::new(ctx)),
            Dialect::DatadogCsv => Assembler::Datadog(DatadogAssembler::new(ctx)),
        }
    }

    pub fn context(&self) -> &RunContext {
        match self {
            Assembler::Bracket(a) => a.context(),
            Assembler::Homer(a) => a.context(),
            Assembler::Datadog(a) => a.context(),
        }
    }
}

impl LineAssembler for Assembler {
    fn push_line(&mut self, line: &str, out: &mut Vec<LogEntry>) {
        match self {
            Assembler::Bracket(a) => a.push_line(line, out),
            Assembler::Homer(a) => a.push_line(line, out),
            Assembler::Datadog(a) => a.push_line(line, out),
        }
    }

    fn finish(&mut self, out: &mut Vec<LogEntry>) {
        match self {
            Assembler::Bracket(a) => a.finish(out),
            Assembler::Homer(a) => a.finish(out),
            Assembler::Datadog(a) => a.finish(out),
        }
    }

    fn dialect(&self) -> Dialect {
        match self {
            Assembler::Bracket(_) => Dialect::TaggedBracket,
            Assembler::Homer(_) => Dialect::Homer,
            Assembler::Datadog(_) => Dialect::DatadogCsv,
        }
    }
}

/// Parse a complete in-memory text with the given dialect. Used by tests and
/// small inputs; large inputs go through the chunked reader.
pub fn assemble_text(text: &str, dialect: Dialect, ctx: RunContext) -> Vec<LogEntry> {
    let mut assembler = Assembler::new(dialect, ctx);
    let mut out = Vec::new();
    for line in text.split_inclusive('\n') {
        let line = line.strip_suffix('\n').unwrap_or(line);
        assembler.push_line(line.strip_suffix('\r').unwrap_or(line), &mut out);
    }
    assembler.finish(&mut out);
    out
}
