use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

use super::model::Dialect;

/// A wrapper that forces the wrapped data onto its own cache line(s).
///
/// Several parse runs (one per file in a merge, or concurrent callers) may
/// share one `ParsingMetrics`; keeping each group on its own 64-byte line
/// avoids false sharing between the hot per-line counters and the rest.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Entries emitted, by dialect
#[derive(Debug, Default)]
pub struct DialectMetrics {
    pub tagged_bracket: AtomicU64,
    pub homer: AtomicU64,
    pub datadog_csv: AtomicU64,
    pub sip: AtomicU64,
}

/// Line-level counters (hottest path - updated per physical line)
#[derive(Debug, Default)]
pub struct LineMetrics {
    pub lines: AtomicU64,
    pub continuations: AtomicU64,
    pub preamble_dropped: AtomicU64,
}

/// Input that was discarded or cut
#[derive(Debug, Default)]
pub struct DiscardMetrics {
    pub rows_skipped: AtomicU64,
    pub payloads_truncated: AtomicU64,
}

/// Reader throughput
#[derive(Debug, Default)]
pub struct ReadMetrics {
    pub windows: AtomicU64,
    pub bytes: AtomicU64,
    pub yields: AtomicU64,
}

/// Counters for ingestion runs.
///
/// All operations use `Ordering::Relaxed`: counters are observational and
/// never feed back into parsing. `snapshot()` is not transactional across
/// fields.
#[derive(Debug, Default)]
pub struct ParsingMetrics {
    pub dialects: CacheAligned<DialectMetrics>,
    pub lines: CacheAligned<LineMetrics>,
    pub discards: CacheAligned<DiscardMetrics>,
    pub reads: CacheAligned<ReadMetrics>,
}

impl ParsingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finalized entry
    #[inline]
    pub fn record_entry(&self, dialect: Dialect, is_sip: bool) {
        let counter = match dialect {
            Dialect::TaggedBracket => &self.dialects.0.tagged_bracket,
            Dialect::Homer => &self.dialects.0.homer,
            Dialect::DatadogCsv => &self.dialects.0.datadog_csv,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        if is_sip {
            self.dialects.0.sip.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_line(&self) {
        self.lines.0.lines.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_continuation(&self) {
        self.lines.0.continuations.fetch_add(1, Ordering::Relaxed);
    }

    /// A line seen before any entry-start
    #[inline]
    pub fn record_preamble_dropped(&self) {
        self.lines.0.preamble_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_row_skipped(&self) {
        self.discards.0.rows_skipped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_payload_truncated(&self) {
        self.discards.0.payloads_truncated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one byte window pulled from a source
    #[inline]
    pub fn record_window(&self, bytes: usize) {
        self.reads.0.windows.fetch_add(1, Ordering::Relaxed);
        self.reads.0.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_yield(&self) {
        self.reads.0.yields.fetch_add(1, Ordering::Relaxed);
    }

    // --- Snapshot Export ---

    pub fn snapshot(&self) -> MetricsSnapshot {
        let tagged_bracket_entries = self.dialects.0.tagged_bracket.load(Ordering::Relaxed);
        let homer_entries = self.dialects.0.homer.load(Ordering::Relaxed);
        let datadog_entries = self.dialects.0.datadog_csv.load(Ordering::Relaxed);

        MetricsSnapshot {
            tagged_bracket_entries,
            homer_entries,
            datadog_entries,
            total_entries: tagged_bracket_entries + homer_entries + datadog_entries,
            sip_entries: self.dialects.0.sip.load(Ordering::Relaxed),

            lines_read: self.lines.0.lines.load(Ordering::Relaxed),
            continuation_lines: self.lines.0.continuations.load(Ordering::Relaxed),
            preamble_lines_dropped: self.lines.0.preamble_dropped.load(Ordering::Relaxed),

            rows_skipped: self.discards.0.rows_skipped.load(Ordering::Relaxed),
            payloads_truncated: self.discards.0.payloads_truncated.load(Ordering::Relaxed),

            windows_read: self.reads.0.windows.load(Ordering::Relaxed),
            bytes_read: self.reads.0.bytes.load(Ordering::Relaxed),
            yields: self.reads.0.yields.load(Ordering::Relaxed),
        }
    }
}

/// A read-only snapshot of ingestion counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    // Entries
    pub tagged_bracket_entries: u64,
    pub homer_entries: u64,
    pub datadog_entries: u64,
    pub total_entries: u64,
    pub sip_entries: u64,

    // Lines
    pub lines_read: u64,
    pub continuation_lines: u64,
    pub preamble_lines_dropped: u64,

    // Discards
    pub rows_skipped: u64,
    pub payloads_truncated: u64,

    // Reader
    pub windows_read: u64,
    pub bytes_read: u64,
    pub yields: u64,
}
