//! SIP signaling detection and header extraction.
//!
//! Enrichment reads only `message` and `payload` and writes only the SIP
//! fields (plus `operator_id` when unset), so applying it twice is a no-op.

use std::sync::LazyLock;

use regex::Regex;

use super::model::LogEntry;

/// Request methods recognized when no status or request line is present.
pub const KNOWN_METHODS: &[&str] = &[
    "INVITE", "ACK", "BYE", "CANCEL", "REGISTER", "OPTIONS", "PRACK", "SUBSCRIBE", "NOTIFY",
    "PUBLISH", "INFO", "REFER", "MESSAGE", "UPDATE",
];

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*SIP/2\.0\s+(\d{3})\s+([^\r\n]*?)\s*$").expect("status line pattern is valid")
});

static REQUEST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*([A-Z]+)\s+sips?:\S+\s+SIP/2\.0").expect("request line pattern is valid")
});

static CALL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*Call-ID:\s*(.+?)\s*$").expect("Call-ID pattern is valid"));

static FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*From:\s*(.+?)\s*$").expect("From pattern is valid"));

static TO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*To:\s*(.+?)\s*$").expect("To pattern is valid"));

static AGENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^\s*(?:Contact|From):.*?agentid=([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})",
    )
    .expect("agentid pattern is valid")
});

/// Whether an entry carries SIP signaling.
pub fn is_sip_candidate(message: &str, payload: &str) -> bool {
    payload.contains("SIP/2.0") || message.to_ascii_lowercase().contains("sip")
}

/// Populate SIP fields on `entry` if it looks like SIP traffic.
///
/// `is_sip` is only ever raised, never cleared: Homer records arrive with it
/// already set and keep it even when the body carries no signaling.
pub fn enrich(entry: &mut LogEntry) {
    if !is_sip_candidate(&entry.message, &entry.payload) {
        return;
    }
    entry.is_sip = true;

    if let Some(method) = resolve_method(&entry.message, &entry.payload) {
        entry.sip_method = Some(method);
    }

    // The message doubles as the first body line for some producers.
    let text = joined(&entry.message, &entry.payload);

    if let Some(call_id) = first_capture(&CALL_ID, &text) {
        entry.call_id = Some(call_id);
    }
    if let Some(from) = first_capture(&FROM, &text) {
        entry.sip_from = Some(from);
    }
    if let Some(to) = first_capture(&TO, &text) {
        entry.sip_to = Some(to);
    }
    if entry.operator_id.is_none() {
        entry.operator_id = first_capture(&AGENT_ID, &text).map(|id| id.to_ascii_lowercase());
    }
}

/// Status line, then request line, then a known-method token on the first payload line.
pub fn resolve_method(message: &str, payload: &str) -> Option<String> {
    let text = joined(message, payload);

    if let Some(caps) = STATUS_LINE.captures(&text) {
        let code = &caps[1];
        let reason = caps[2].trim();
        return Some(if reason.is_empty() {
            code.to_string()
        } else {
            format!("{code} {reason}")
        });
    }

    if let Some(caps) = REQUEST_LINE.captures(&text) {
        return Some(caps[1].to_string());
    }

    let first_line = payload.lines().find(|l| !l.trim().is_empty())?;
    first_line
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|token| KNOWN_METHODS.contains(token))
        .map(str::to_string)
}

fn joined(message: &str, payload: &str) -> String {
    if payload.is_empty() {
        message.to_string()
    } else {
        format!("{message}\n{payload}")
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::model::LogLevel;

    fn entry(message: &str, payload: &str) -> LogEntry {
        let mut e = LogEntry::new(1, 0, "", LogLevel::Info, "comp", message);
        e.payload = payload.to_string();
        e
    }

    #[test]
    fn test_request_line_method() {
        let mut e = entry(
            "outbound",
            "INVITE sip:1017@pbx.example.com SIP/2.0\nCall-ID: abc123\nFrom: <sip:a@x>;tag=1\nTo: <sip:b@y>",
        );
        enrich(&mut e);

        assert!(e.is_sip);
        assert_eq!(e.sip_method.as_deref(), Some("INVITE"));
        assert_eq!(e.call_id.as_deref(), Some("abc123"));
        assert_eq!(e.sip_from.as_deref(), Some("<sip:a@x>;tag=1"));
        assert_eq!(e.sip_to.as_deref(), Some("<sip:b@y>"));
    }

    #[test]
    fn test_request_line_method_outside_known_list() {
        let text = "SERVICE sip:presence@pbx SIP/2.0\nCall-ID: p1";
        assert_eq!(resolve_method(text, "").as_deref(), Some("SERVICE"));
    }

    #[test]
    fn test_status_line_wins_over_request_line() {
        let mut e = entry("response", "SIP/2.0 180 Ringing\r\nCSeq: 1 INVITE\r\nCall-ID: x-1\r\n");
        enrich(&mut e);
        assert_eq!(e.sip_method.as_deref(), Some("180 Ringing"));
        assert_eq!(e.call_id.as_deref(), Some("x-1"));
    }

    #[test]
    fn test_method_from_first_payload_line_tokens() {
        let mut e = entry("SIP message received", "sending BYE to gateway\nno signaling here");
        enrich(&mut e);
        assert!(e.is_sip);
        assert_eq!(e.sip_method.as_deref(), Some("BYE"));
    }

    #[test]
    fn test_non_sip_entry_untouched() {
        let mut e = entry("database connected", "pool size 10");
        let before = e.clone();
        enrich(&mut e);
        assert_eq!(e, before);
    }

    #[test]
    fn test_header_names_case_insensitive() {
        let mut e = entry("sip trace", "call-id: lower-case-id\nfrom: alice");
        enrich(&mut e);
        assert_eq!(e.call_id.as_deref(), Some("lower-case-id"));
        assert_eq!(e.sip_from.as_deref(), Some("alice"));
    }

    #[test]
    fn test_agent_id_from_contact() {
        let payload = "REGISTER sip:pbx SIP/2.0\nContact: <sip:agent@10.0.0.5;agentid=3F2504E0-4F89-11D3-9A0C-0305E82C3301>";
        let mut e = entry("reg", payload);
        enrich(&mut e);
        assert_eq!(e.operator_id.as_deref(), Some("3f2504e0-4f89-11d3-9a0c-0305e82c3301"));
    }

    #[test]
    fn test_agent_id_does_not_overwrite_existing_operator() {
        let payload = "REGISTER sip:pbx SIP/2.0\nFrom: <sip:a;agentid=3f2504e0-4f89-11d3-9a0c-0305e82c3301>";
        let mut e = entry("reg", payload);
        e.operator_id = Some("op-from-json".to_string());
        enrich(&mut e);
        assert_eq!(e.operator_id.as_deref(), Some("op-from-json"));
    }

    #[test]
    fn test_enrich_twice_is_idempotent() {
        let mut e = entry(
            "sip",
            "INVITE sip:x@y SIP/2.0\nCall-ID: c1\nContact: <sip:z;agentid=3f2504e0-4f89-11d3-9a0c-0305e82c3301>",
        );
        enrich(&mut e);
        let once = e.clone();
        enrich(&mut e);
        assert_eq!(e, once);
    }

    #[test]
    fn test_is_sip_never_cleared() {
        let mut e = entry("homer record", "");
        e.is_sip = true;
        enrich(&mut e);
        assert!(e.is_sip);
    }
}
