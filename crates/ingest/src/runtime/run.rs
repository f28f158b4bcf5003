//! Run — parse the given files through the merger and print JSON lines.

use std::io::{BufWriter, Write};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::conf::IngestConfig;
use crate::merge::{merge_sources, FileInput};
use crate::parser::metrics::ParsingMetrics;
use crate::parser::model::LogEntry;
use crate::reader::source::FileSource;

/// Merge `paths` and write every entry as one JSON object per line.
pub async fn run(config: IngestConfig, paths: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    if paths.is_empty() {
        warn!("No input files given; usage: ingest <file>...");
        return Ok(());
    }

    let inputs = paths
        .iter()
        .map(|path| FileSource::open(path).map(FileInput::new))
        .collect::<Result<Vec<_>, _>>()?;

    let metrics = Arc::new(ParsingMetrics::new());
    let mut last_reported = 0.0;
    let merged = merge_sources(inputs, &config, Some(Arc::clone(&metrics)), |p| {
        if p - last_reported >= 0.1 || p >= 1.0 {
            debug!(progress = p, "ingest progress");
            last_reported = p;
        }
    })
    .await?;

    let stdout = std::io::stdout();
    write_jsonl(&mut BufWriter::new(stdout.lock()), merged.entries())?;

    let snapshot = metrics.snapshot();
    info!(
        files = paths.len(),
        entries = snapshot.total_entries,
        sip = snapshot.sip_entries,
        rows_skipped = snapshot.rows_skipped,
        bytes = snapshot.bytes_read,
        "ingest complete"
    );
    let counters = serde_json::to_string(&snapshot)?;
    debug!(metrics = %counters, "final counters");
    Ok(())
}

pub fn write_jsonl<W: Write>(out: &mut W, entries: &[LogEntry]) -> Result<(), Box<dyn std::error::Error>> {
    for entry in entries {
        serde_json::to_writer(&mut *out, entry)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
