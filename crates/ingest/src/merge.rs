//! Multi-file merge — collision-free ids and one time-ordered collection.

use std::sync::Arc;

use tracing::info;

use crate::conf::IngestConfig;
use crate::parser::metrics::ParsingMetrics;
use crate::parser::model::LogEntry;
use crate::reader::chunked::{parse, ParseOptions};
use crate::reader::source::{ByteSource, SourceError};

/// Colors handed to files that arrive without one, in order, cycling.
pub const PALETTE: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7", "#9c755f",
    "#bab0ac",
];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// One file to merge.
pub struct FileInput {
    pub source: Box<dyn ByteSource>,
    pub color: Option<String>,
}

impl FileInput {
    pub fn new(source: impl ByteSource + 'static) -> Self {
        Self { source: Box::new(source), color: None }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// The global, timestamp-sorted entry collection.
#[derive(Debug, Default)]
pub struct MergedLogs {
    entries: Vec<LogEntry>,
    max_id: u64,
    files: usize,
}

impl MergedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starting id for the next file: one past the largest id merged so far.
    pub fn next_start_id(&self) -> u64 {
        self.max_id + 1
    }

    /// Color for the next file when the caller supplied none.
    pub fn next_color(&self) -> &'static str {
        palette_color(self.files)
    }

    /// Add one file's entries and restore global time order.
    ///
    /// Ties on timestamp keep id order, so entries from one file keep their
    /// relative order.
    pub fn absorb(&mut self, mut file_entries: Vec<LogEntry>) {
        file_entries.sort_by_key(|e| (e.timestamp, e.id));
        if let Some(max) = file_entries.iter().map(|e| e.id).max() {
            self.max_id = self.max_id.max(max);
        }
        self.files += 1;
        self.entries.extend(file_entries);
        self.entries.sort_by_key(|e| (e.timestamp, e.id));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// Parse every input in turn and merge the results.
///
/// `progress` receives overall progress in [0, 1] across all files.
pub async fn merge_sources(
    inputs: Vec<FileInput>,
    config: &IngestConfig,
    metrics: Option<Arc<ParsingMetrics>>,
    mut progress: impl FnMut(f64),
) -> Result<MergedLogs, SourceError> {
    let mut merged = MergedLogs::new();
    let total = inputs.len().max(1) as f64;

    for (index, input) in inputs.into_iter().enumerate() {
        let color = input.color.unwrap_or_else(|| merged.next_color().to_string());
        let name = input.source.name().to_string();
        let options = ParseOptions {
            file_name: None,
            file_color: Some(color),
            start_id: merged.next_start_id(),
            metrics: metrics.clone(),
        };

        let entries = parse(input.source, options, config, |p| progress((index as f64 + p) / total)).await?;
        info!(file = %name, entries = entries.len(), start_id = merged.next_start_id(), "file parsed");
        merged.absorb(entries);
    }

    progress(1.0);
    Ok(merged)
}
