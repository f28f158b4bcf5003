//! Chunked reader — bounded byte windows, carry-over, cooperative yield.

use std::sync::Arc;

use async_stream::try_stream;
use bytes::BytesMut;
use futures_util::Stream;
use tracing::{debug, trace};

use crate::conf::IngestConfig;
use crate::parser::assembler::{Assembler, RunContext};
use crate::parser::detector::detect_dialect;
use crate::parser::metrics::ParsingMetrics;
use crate::parser::model::{Dialect, LogEntry};
use crate::parser::traits::LineAssembler;

use super::source::{ByteSource, SourceError};

/// Caller-supplied settings for one file.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Provenance name; defaults to the source's own name
    pub file_name: Option<String>,
    pub file_color: Option<String>,
    /// First id handed out in this run
    pub start_id: u64,
    pub metrics: Option<Arc<ParsingMetrics>>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { file_name: None, file_color: None, start_id: 1, metrics: None }
    }
}

/// Incremental parser over a [`ByteSource`].
///
/// Each call to [`LogReader::next_batch`] reads one window, feeds every
/// complete line to the dialect's assembler and returns the entries that were
/// finalized along the way. Entries come out in file order, not time order.
pub struct LogReader<S> {
    source: S,
    assembler: Assembler,
    metrics: Option<Arc<ParsingMetrics>>,

    size: u64,
    offset: u64,
    window: usize,
    carry: BytesMut,
    finished: bool,

    yield_every_chunks: usize,
    yield_every_lines: usize,
    chunks_since_yield: usize,
    lines_since_yield: usize,
}

impl<S: ByteSource> LogReader<S> {
    /// Sniff the dialect from a bounded prefix and prepare the run.
    pub fn open(source: S, options: ParseOptions, config: &IngestConfig) -> Result<Self, SourceError> {
        let size = source.size();
        let prefix_len = usize::try_from(size.min(config.detection_prefix_bytes as u64)).unwrap_or(0);
        let prefix = source.slice(0, prefix_len)?;

        let file_name = options.file_name.unwrap_or_else(|| source.name().to_string());
        let dialect = detect_dialect(&prefix, &file_name);

        let window = if size <= config.chunk_threshold_bytes as u64 {
            usize::try_from(size).unwrap_or(config.chunk_size_bytes).max(1)
        } else {
            config.chunk_size_bytes.max(1)
        };

        debug!(
            file = %file_name,
            size,
            window,
            dialect = dialect.as_str(),
            "opening log reader"
        );

        let ctx = RunContext::new(file_name, options.start_id)
            .with_color(options.file_color)
            .with_metrics(options.metrics.clone())
            .with_message_display_len(config.message_display_len)
            .with_max_payload_bytes(config.max_payload_bytes);

        Ok(Self {
            source,
            assembler: Assembler::new(dialect, ctx),
            metrics: options.metrics,
            size,
            offset: 0,
            window,
            carry: BytesMut::new(),
            finished: false,
            yield_every_chunks: config.yield_every_chunks.max(1),
            yield_every_lines: config.yield_every_lines.max(1),
            chunks_since_yield: 0,
            lines_since_yield: 0,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.assembler.dialect()
    }

    pub fn file_name(&self) -> &str {
        &self.assembler.context().file_name
    }

    /// Fraction of the source consumed, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.finished || self.size == 0 {
            1.0
        } else {
            self.offset as f64 / self.size as f64
        }
    }

    /// Id the next entry would receive; one past the last emitted id.
    pub fn next_id(&self) -> u64 {
        self.assembler.context().next_id()
    }

    /// Read and assemble one window. `Ok(None)` once input and the last open
    /// entry have both been flushed.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<LogEntry>>, SourceError> {
        if self.finished {
            return Ok(None);
        }

        let mut out = Vec::new();
        if self.offset < self.size {
            let remaining = self.size - self.offset;
            let len = usize::try_from(remaining.min(self.window as u64)).unwrap_or(self.window);
            let bytes = self.source.slice(self.offset, len)?;
            self.offset += len as u64;
            if let Some(m) = &self.metrics {
                m.record_window(len);
            }

            self.carry.extend_from_slice(&bytes);
            let lines = self.drain_lines(&mut out);
            trace!(offset = self.offset, lines, carry = self.carry.len(), "window assembled");

            self.chunks_since_yield += 1;
            self.lines_since_yield += lines;

            if self.offset >= self.size {
                self.finish_input(&mut out);
            }

            if self.chunks_since_yield >= self.yield_every_chunks || self.lines_since_yield >= self.yield_every_lines {
                self.chunks_since_yield = 0;
                self.lines_since_yield = 0;
                if let Some(m) = &self.metrics {
                    m.record_yield();
                }
                tokio::task::yield_now().await;
            }
        } else {
            self.finish_input(&mut out);
        }

        Ok(Some(out))
    }

    /// Consume the reader as a stream of entries.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<LogEntry, SourceError>> {
        try_stream! {
            while let Some(batch) = self.next_batch().await? {
                for entry in batch {
                    yield entry;
                }
            }
        }
    }

    /// Feed every newline-terminated line in the carry buffer to the assembler,
    /// keeping the unterminated tail.
    fn drain_lines(&mut self, out: &mut Vec<LogEntry>) -> usize {
        let Some(last_newline) = self.carry.iter().rposition(|b| *b == b'\n') else {
            return 0;
        };
        let complete = self.carry.split_to(last_newline + 1).freeze();

        let mut count = 0;
        for raw in complete[..last_newline].split(|b| *b == b'\n') {
            self.assembler.push_line(&decode_line(raw), out);
            count += 1;
        }
        count
    }

    fn finish_input(&mut self, out: &mut Vec<LogEntry>) {
        if !self.carry.is_empty() {
            let tail = self.carry.split().freeze();
            self.assembler.push_line(&decode_line(&tail), out);
        }
        self.assembler.finish(out);
        self.finished = true;
        debug!(file = %self.file_name(), next_id = self.next_id(), "log reader finished");
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Parse a whole source, reporting progress after every window and 1.0 at the end.
pub async fn parse<S: ByteSource>(
    source: S,
    options: ParseOptions,
    config: &IngestConfig,
    mut progress: impl FnMut(f64),
) -> Result<Vec<LogEntry>, SourceError> {
    let mut reader = LogReader::open(source, options, config)?;
    let mut entries = Vec::new();
    while let Some(batch) = reader.next_batch().await? {
        entries.extend(batch);
        progress(reader.progress());
    }
    progress(1.0);
    Ok(entries)
}
