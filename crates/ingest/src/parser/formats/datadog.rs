use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::parser::assembler::RunContext;
use crate::parser::finalize::finalize_entry;
use crate::parser::model::{Dialect, LogEntry, LogLevel};
use crate::parser::timestamp;
use crate::parser::traits::LineAssembler;

/// `"date","host","service","content"` with `""` as the in-field quote escape.
static ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^\s*"((?:[^"]|"")*)","((?:[^"]|"")*)","((?:[^"]|"")*)","((?:[^"]|"")*)"\s*$"#)
        .expect("datadog row pattern is valid")
});

/// Opening of a physical line that begins a new row: `"date","host","`.
static ROW_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*"[^"]*","[^"]*",""#).expect("datadog row start pattern is valid"));

/// Epoch values below this are seconds, not milliseconds.
const SECONDS_CUTOFF: f64 = 1e11;

const LEVEL_KEYS: &[&str] = &["level", "status", "severity"];
const MESSAGE_KEYS: &[&str] = &["message", "msg"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "@timestamp"];
const LOGGER_KEYS: &[&str] = &["logger.name", "logger_name", "logger"];
const MACHINE_KEYS: &[&str] = &["machine", "hostname", "host"];
const THREAD_KEYS: &[&str] = &["logger.thread_name", "thread_name", "thread"];
const ERROR_KIND_KEYS: &[&str] = &["error.kind", "exception.class"];
const ERROR_MESSAGE_KEYS: &[&str] = &["error.message", "exception.message", "exception"];
const STACK_KEYS: &[&str] = &["error.stack", "stack_trace", "stack"];

/// One CSV row split into its four fields, quotes already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub date: String,
    pub host: String,
    pub service: String,
    pub content: String,
}

impl CsvRow {
    pub fn parse(row: &str) -> Option<Self> {
        let caps = ROW.captures(row)?;
        Some(Self {
            date: unescape(&caps[1]),
            host: unescape(&caps[2]),
            service: unescape(&caps[3]),
            content: unescape(&caps[4]),
        })
    }

    /// The export's column-title row.
    pub fn is_title(&self) -> bool {
        self.date.eq_ignore_ascii_case("date")
            && self.host.eq_ignore_ascii_case("host")
            && self.service.eq_ignore_ascii_case("service")
            && self.content.trim().eq_ignore_ascii_case("content")
    }
}

fn unescape(field: &str) -> String {
    field.replace("\"\"", "\"")
}

/// Datadog CSV exports. Every row is one complete entry.
///
/// A row whose content contains newlines spans several physical lines; lines
/// are buffered until the quote count balances. A line that opens a new row
/// while quotes are still unbalanced ends the buffered fragment, which is then
/// skipped as malformed.
#[derive(Debug)]
pub struct DatadogAssembler {
    ctx: RunContext,
    row: String,
    quotes: usize,
}

impl DatadogAssembler {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx, row: String::new(), quotes: 0 }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    fn flush_row(&mut self, out: &mut Vec<LogEntry>) {
        let row = std::mem::take(&mut self.row);
        self.quotes = 0;
        if row.trim().is_empty() {
            return;
        }

        let Some(fields) = CsvRow::parse(&row) else {
            tracing::warn!(file = %self.ctx.file_name, row_len = row.len(), "skipping malformed CSV row");
            self.ctx.record(|m| m.record_row_skipped());
            return;
        };
        if fields.is_title() {
            return;
        }

        let value = match serde_json::from_str::<Value>(&fields.content) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                tracing::warn!(file = %self.ctx.file_name, "skipping CSV row: content is not a JSON object");
                self.ctx.record(|m| m.record_row_skipped());
                return;
            }
            Err(e) => {
                tracing::warn!(file = %self.ctx.file_name, error = %e, "skipping CSV row with unparseable JSON");
                self.ctx.record(|m| m.record_row_skipped());
                return;
            }
        };

        let entry = build_entry(self.ctx.allocate_id(), &fields, &value);
        let entry = finalize_entry(entry, Some(&value));
        self.ctx.emit(Dialect::DatadogCsv, entry, out);
    }
}

impl LineAssembler for DatadogAssembler {
    fn push_line(&mut self, line: &str, out: &mut Vec<LogEntry>) {
        self.ctx.record(|m| m.record_line());

        if !self.row.is_empty() && ROW_START.is_match(line) {
            tracing::debug!(file = %self.ctx.file_name, "new row started inside an unterminated quoted field");
            self.flush_row(out);
        }

        if self.row.is_empty() {
            if line.trim().is_empty() {
                return;
            }
        } else {
            self.row.push('\n');
            self.ctx.record(|m| m.record_continuation());
        }
        self.row.push_str(line);
        self.quotes += line.bytes().filter(|b| *b == b'"').count();

        if self.quotes % 2 == 0 {
            self.flush_row(out);
        }
    }

    fn finish(&mut self, out: &mut Vec<LogEntry>) {
        if !self.row.is_empty() {
            tracing::debug!(file = %self.ctx.file_name, "input ended inside a quoted CSV field");
            self.flush_row(out);
        }
    }

    fn dialect(&self) -> Dialect {
        Dialect::DatadogCsv
    }
}

fn build_entry(id: u64, row: &CsvRow, value: &Value) -> LogEntry {
    let attrs = value
        .get("attributes")
        .filter(|a| a.is_object())
        .unwrap_or(value);

    let level = lookup_str(attrs, value, LEVEL_KEYS)
        .map(LogLevel::from_tag)
        .unwrap_or_default();

    let full_message = lookup_str(attrs, value, MESSAGE_KEYS).unwrap_or_default();
    let (message, rest) = match full_message.split_once('\n') {
        Some((first, rest)) => (first.trim_end_matches('\r'), Some(rest)),
        None => (full_message, None),
    };

    let json_ts = lookup(attrs, value, TIMESTAMP_KEYS);
    let timestamp = json_ts
        .and_then(json_timestamp)
        .or_else(|| timestamp::parse_rfc3339(&row.date))
        .unwrap_or_else(timestamp::now_millis);
    let raw_timestamp = if row.date.trim().is_empty() {
        json_ts.map(value_text).unwrap_or_default()
    } else {
        row.date.clone()
    };

    let component = lookup_str(attrs, value, LOGGER_KEYS)
        .map(str::to_string)
        .unwrap_or_else(|| row.service.clone());

    let mut payload: Vec<String> = Vec::new();
    if let Some(rest) = rest.filter(|r| !r.trim().is_empty()) {
        payload.push(rest.to_string());
    }
    if let Some(machine) = lookup_str(attrs, value, MACHINE_KEYS) {
        payload.push(format!("machine: {machine}"));
    }
    if let Some(thread) = lookup_str(attrs, value, THREAD_KEYS) {
        payload.push(format!("thread: {thread}"));
    }
    match (lookup_str(attrs, value, ERROR_KIND_KEYS), lookup_str(attrs, value, ERROR_MESSAGE_KEYS)) {
        (Some(kind), Some(msg)) => payload.push(format!("exception: {kind}: {msg}")),
        (Some(only), None) | (None, Some(only)) => payload.push(format!("exception: {only}")),
        (None, None) => {}
    }
    if let Some(stack) = lookup_str(attrs, value, STACK_KEYS) {
        payload.push(stack.to_string());
    }

    let mut entry = LogEntry::new(id, timestamp, raw_timestamp, level, component, message);
    entry.payload = payload.join("\n");
    entry.with_provenance(format!("{}-{}", row.host, row.service), None)
}

/// First key found in `attrs`, then in the root object.
fn lookup<'a>(attrs: &'a Value, root: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| path(attrs, key))
        .or_else(|| keys.iter().find_map(|key| path(root, key)))
}

fn lookup_str<'a>(attrs: &'a Value, root: &'a Value, keys: &[&str]) -> Option<&'a str> {
    let mut found = keys.iter().filter_map(|key| path(attrs, key)).chain(keys.iter().filter_map(|key| path(root, key)));
    found.find_map(|v| v.as_str()).filter(|s| !s.trim().is_empty())
}

/// Dotted path lookup; a literal dotted key is tried first.
fn path<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let map = value.as_object()?;
    if let Some(direct) = map.get(key) {
        return Some(direct).filter(|v| !v.is_null());
    }
    let (head, tail) = key.split_once('.')?;
    path(map.get(head)?, tail)
}

fn json_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().map(epoch_to_millis),
        Value::String(s) => timestamp::parse_rfc3339(s).or_else(|| s.trim().parse::<f64>().ok().map(epoch_to_millis)),
        _ => None,
    }
}

fn epoch_to_millis(raw: f64) -> i64 {
    if raw.abs() < SECONDS_CUTOFF {
        (raw * 1000.0) as i64
    } else {
        raw as i64
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::parser::assembler::assemble_text;
    use crate::parser::metrics::ParsingMetrics;
    use crate::parser::model::EntryType;

    const TITLE: &str = r#""date","host","service","content""#;

    fn parse(text: &str) -> Vec<LogEntry> {
        assemble_text(text, Dialect::DatadogCsv, RunContext::new("export.csv", 1))
    }

    fn row(date: &str, host: &str, service: &str, json: &str) -> String {
        format!(r#""{date}","{host}","{service}","{}""#, json.replace('"', "\"\""))
    }

    // ─── Row shape ──────────────────────────────────────────────

    #[test]
    fn test_csv_row_unescape() {
        let r = CsvRow::parse(r#""2026-01-09T10:00:00Z","h1","svc","{""a"":1}""#).unwrap();
        assert_eq!(r.date, "2026-01-09T10:00:00Z");
        assert_eq!(r.content, r#"{"a":1}"#);
        assert!(!r.is_title());
    }

    #[test]
    fn test_title_row_detected() {
        assert!(CsvRow::parse(TITLE).unwrap().is_title());
        assert!(CsvRow::parse(r#""Date","Host","Service","Content""#).unwrap().is_title());
    }

    #[test]
    fn test_bad_shape_rejected() {
        assert!(CsvRow::parse(r#""only","three","fields""#).is_none());
        assert!(CsvRow::parse("not csv at all").is_none());
    }

    // ─── Assembly ───────────────────────────────────────────────

    #[test]
    fn test_row_to_entry() {
        let json = r#"{"status":"error","message":"call dropped","timestamp":1736935200000,"attributes":{"logger":{"name":"com.acme.CallRouter","thread_name":"io-1"},"reportID":"77","error":{"kind":"IllegalState","message":"no leg","stack":"at a.b(C.java:1)"}}}"#;
        let text = format!("{TITLE}\n{}\n", row("2025-01-15T10:00:00.000Z", "pbx01", "router", json));
        let entries = parse(&text);

        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.level, LogLevel::Error);
        assert_eq!(e.message, "call dropped");
        assert_eq!(e.component, "com.acme.CallRouter");
        assert_eq!(e.display_component, "CallRouter");
        assert_eq!(e.timestamp, 1_736_935_200_000);
        assert_eq!(e.raw_timestamp, "2025-01-15T10:00:00.000Z");
        assert_eq!(e.file_name, "pbx01-router");
        assert_eq!(e.entry_type, EntryType::Json);
        assert_eq!(e.report_id.as_deref(), Some("77"));
        assert_eq!(e.payload, "thread: io-1\nexception: IllegalState: no leg\nat a.b(C.java:1)");
    }

    #[test]
    fn test_timestamp_fallbacks() {
        let seconds = row("", "h", "s", r#"{"message":"m","timestamp":1736935200}"#);
        let iso = row("", "h", "s", r#"{"message":"m","timestamp":"2025-01-15T10:00:00Z"}"#);
        let date_only = row("2025-01-15T10:00:00Z", "h", "s", r#"{"message":"m"}"#);
        let entries = parse(&format!("{seconds}\n{iso}\n{date_only}"));

        assert_eq!(entries.len(), 3);
        for e in &entries {
            assert_eq!(e.timestamp, 1_736_935_200_000);
        }
        assert_eq!(entries[1].raw_timestamp, "2025-01-15T10:00:00Z");
    }

    #[test]
    fn test_multiline_row_buffered_until_quotes_balance() {
        let json = "{\"message\":\"first line\\nsecond line\",\"stack_trace\":\"boom\"}";
        // embed a literal newline inside the quoted content field
        let physical = format!("\"2025-01-15T10:00:00Z\",\"h\",\"s\",\"{}\n\"", json.replace('"', "\"\""));
        let entries = parse(&physical);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "first line");
        assert_eq!(entries[0].payload, "second line\nboom");
    }

    #[test]
    fn test_malformed_json_row_skipped_and_parsing_continues() {
        let metrics = Arc::new(ParsingMetrics::new());
        let ctx = RunContext::new("export.csv", 1).with_metrics(Some(metrics.clone()));

        let bad = row("2025-01-15T10:00:00Z", "h", "s", r#"{"message": "oops""#);
        let good = row("2025-01-15T10:00:01Z", "h", "s", r#"{"message":"fine"}"#);
        let text = format!("{TITLE}\n{bad}\n{good}\n");
        let entries = assemble_text(&text, Dialect::DatadogCsv, ctx);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "fine");
        assert_eq!(entries[0].id, 1);
        assert_eq!(metrics.snapshot().rows_skipped, 1);
    }

    #[test]
    fn test_unterminated_row_does_not_swallow_later_rows() {
        let metrics = Arc::new(ParsingMetrics::new());
        let ctx = RunContext::new("export.csv", 1).with_metrics(Some(metrics.clone()));

        let cut = r#""2025-01-15T10:00:00Z","h","s","{""message"":""cut""}"#;
        let first = row("2025-01-15T10:00:01Z", "h", "s", r#"{"message":"one"}"#);
        let second = row("2025-01-15T10:00:02Z", "h", "s", r#"{"message":"two"}"#);
        let text = format!("{TITLE}\n{cut}\n{first}\n{second}\n");
        let entries = assemble_text(&text, Dialect::DatadogCsv, ctx);

        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["one", "two"]);
        assert_eq!(entries[0].id, 1);
        assert_eq!(metrics.snapshot().rows_skipped, 1);
    }

    #[test]
    fn test_unterminated_last_row_skipped() {
        let good = row("2025-01-15T10:00:01Z", "h", "s", r#"{"message":"fine"}"#);
        let text = format!("{good}\n\"2025-01-15T10:00:02Z\",\"h\",\"s\",\"{{\n");
        let entries = parse(&text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "fine");
    }

    #[test]
    fn test_non_object_content_skipped() {
        let entries = parse(&row("2025-01-15T10:00:00Z", "h", "s", "[1,2]"));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_level_defaults_to_info_and_service_component() {
        let entries = parse(&row("2025-01-15T10:00:00Z", "h", "billing", r#"{"message":"x"}"#));
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].component, "billing");
    }
}
