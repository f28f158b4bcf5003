use serde_json::Value;

use super::correlate;
use super::model::{EntryType, LogEntry};
use super::sip;
use super::timestamp;

/// The single finalize transition: runs every enrichment step on a closed entry.
///
/// `json` is the structured body when the dialect already parsed one
/// (Datadog rows); otherwise the payload is tried as a JSON object. Every step
/// reads only original fields, so finalizing the same entry twice yields the
/// same result.
pub fn finalize_entry(mut entry: LogEntry, json: Option<&Value>) -> LogEntry {
    let parsed = match json {
        Some(_) => None,
        None => parse_json_payload(&entry.payload),
    };
    let json = json.or(parsed.as_ref());
    if json.is_some() {
        entry.entry_type = EntryType::Json;
    }

    if let Some(ts) = timestamp::embedded_timestamp(&entry.message, &entry.payload) {
        entry.timestamp = ts;
    }

    correlate::extract_ids(&mut entry, json);
    sip::enrich(&mut entry);
    correlate::normalize_display(&mut entry);
    entry
}

/// Payload as a JSON object, if that is exactly what it is.
fn parse_json_payload(payload: &str) -> Option<Value> {
    let trimmed = payload.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!(error = %e, "payload looks like JSON but does not parse");
            None
        }
    }
}
