//! Correlation ids and display normalization.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::model::LogEntry;

/// Nesting depth searched for correlation keys in JSON payloads.
const MAX_JSON_DEPTH: usize = 8;

const REPORT_KEYS: &[&str] = &["reportID", "reportId", "report_id"];
const OPERATOR_KEYS: &[&str] = &["operatorID", "operatorId", "operator_id", "agentId"];
const EXTENSION_KEYS: &[&str] = &["extensionID", "extensionId", "extension_id"];

static REPORT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)report\s*id:\s*(\d+)").expect("report id pattern is valid"));

static EXTENSION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"extensionID:\s*Optional\[(\d+)\]").expect("extension id pattern is valid")
});

static OPERATOR_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"operatorID:\s*Optional\[([\w-]+)\]").expect("operator id pattern is valid")
});

static OPTIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Optional\[([^\[\]]*)\]").expect("optional pattern is valid"));

static GMT_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:Mon|Tue|Wed|Thu|Fri|Sat|Sun)\s+(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2}\s+\d{4}\s+\d{1,2}:\d{2}:\d{2}\s+GMT[+-]\d{4}(?:\s*\([^)]*\))?",
    )
    .expect("gmt timestamp pattern is valid")
});

static ISO_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?")
        .expect("iso timestamp pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Fill report/operator/extension/station ids.
///
/// A JSON object, when available, is authoritative; free text is only
/// scanned when there is none. Fields already set are left alone.
pub fn extract_ids(entry: &mut LogEntry, json: Option<&Value>) {
    match json {
        Some(value) => {
            fill(&mut entry.report_id, find_key(value, REPORT_KEYS, 0));
            fill(&mut entry.operator_id, find_key(value, OPERATOR_KEYS, 0));
            fill(&mut entry.extension_id, find_key(value, EXTENSION_KEYS, 0));
        }
        None => {
            let text = format!("{} {}", entry.message, entry.payload);
            fill(&mut entry.report_id, capture(&REPORT_ID, &text));
            fill(&mut entry.extension_id, capture(&EXTENSION_ID, &text));
            fill(&mut entry.operator_id, capture(&OPERATOR_ID, &text));
        }
    }

    if entry.station_id.is_none() {
        entry.station_id = entry.extension_id.as_deref().and_then(station_from_extension);
    }
}

/// Station number: the extension with its two-character site prefix removed.
pub fn station_from_extension(extension: &str) -> Option<String> {
    if extension.chars().count() > 2 {
        Some(extension.chars().skip(2).collect())
    } else {
        None
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|caps| caps[1].to_string())
}

/// Depth-bounded, breadth-first within each object: direct keys win over nested ones.
fn find_key(value: &Value, keys: &[&str], depth: usize) -> Option<String> {
    if depth > MAX_JSON_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            for key in keys {
                if let Some(found) = map.get(*key).and_then(scalar_text) {
                    return Some(found);
                }
            }
            map.values().find_map(|child| find_key(child, keys, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|child| find_key(child, keys, depth + 1)),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => unwrap_optional(s.trim()),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() || text.eq_ignore_ascii_case("null") || text == "Optional.empty" {
        None
    } else {
        Some(text)
    }
}

fn unwrap_optional(text: &str) -> String {
    let mut current = text.to_string();
    while let Some(inner) = current.strip_prefix("Optional[").and_then(|s| s.strip_suffix(']')) {
        current = inner.to_string();
    }
    current
}

// ─── Display normalization ───────────────────────────────────────

/// Shorten an actor path or dotted logger name to a PascalCase display name.
///
/// `akka://sys/user/call-manager/$a#123` becomes `CallManager`,
/// `com.acme.voice.SipGateway` becomes `SipGateway`.
pub fn display_component(component: &str) -> String {
    let segment = component
        .split('/')
        .map(|s| s.split('#').next().unwrap_or("").trim())
        .filter(|s| {
            !s.is_empty() && !s.starts_with('$') && !s.chars().all(|c| c.is_ascii_digit()) && !s.ends_with(':')
        })
        .next_back()
        .unwrap_or_else(|| component.trim());

    let tail = segment.rsplit('.').find(|s| !s.is_empty()).unwrap_or(segment);
    pascal_case(tail)
}

/// Unwrap `Optional[x]`, strip embedded absolute timestamps, collapse whitespace.
pub fn display_message(message: &str) -> String {
    let mut current = message.to_string();
    loop {
        let next = OPTIONAL.replace_all(&current, "$1").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    let without_gmt = GMT_TIMESTAMP.replace_all(&current, " ");
    let without_iso = ISO_TIMESTAMP.replace_all(&without_gmt, " ");
    WHITESPACE.replace_all(without_iso.trim(), " ").into_owned()
}

/// Compute the display fields from the original component/message.
pub fn normalize_display(entry: &mut LogEntry) {
    entry.display_component = display_component(&entry.component);
    entry.display_message = display_message(&entry.message);
}

fn pascal_case(text: &str) -> String {
    let words: Vec<&str> = text
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();

    // Already a single word: keep inner casing (SipGateway stays SipGateway).
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
