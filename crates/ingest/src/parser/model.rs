use serde::{Deserialize, Serialize};

/// Textual export dialects understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `[LEVEL] [timestamp] [component] message` application logs
    /// (legacy M/D/YYYY and ISO timestamp sub-grammars)
    TaggedBracket,
    /// Homer SIP capture exports (`proto:TCP ts src ---> dst` + raw body)
    Homer,
    /// Datadog CSV exports with an embedded JSON content column
    DatadogCsv,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::TaggedBracket => "tagged_bracket",
            Dialect::Homer => "homer",
            Dialect::DatadogCsv => "datadog_csv",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
    Error,
    Warn,
}

impl LogLevel {
    /// Map a free-form level tag (`ERROR`, `warning`, `trace`, ...) onto the
    /// four levels the rest of the tooling understands. Unknown tags are INFO.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "TRACE" | "VERBOSE" => LogLevel::Debug,
            "WARN" | "WARNING" => LogLevel::Warn,
            "ERROR" | "ERR" | "FATAL" | "SEVERE" | "CRITICAL" | "EMERGENCY" | "ALERT" => {
                LogLevel::Error
            }
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
        }
    }
}

/// Whether correlation data came from a JSON object or from free text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    #[default]
    Log,
    Json,
}

/// One normalized log record.
///
/// Created when an entry-start line is recognized, extended by continuation
/// lines, and finalized exactly once (see [`super::finalize::finalize_entry`]).
/// After emission the engine keeps no reference to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Strictly increasing within a run, offset by the caller per file
    pub id: u64,

    /// Epoch milliseconds (UTC). Never missing: falls back to parse-time wall clock.
    pub timestamp: i64,

    /// Timestamp text exactly as it appeared in the source
    pub raw_timestamp: String,

    pub level: LogLevel,

    /// Logger / actor path as written by the producer
    pub component: String,

    /// First line of the entry
    pub message: String,

    /// Continuation text, newline-joined
    pub payload: String,

    #[serde(rename = "type")]
    pub entry_type: EntryType,

    pub is_sip: bool,

    /// Request method (`INVITE`) or status (`200 OK`)
    pub sip_method: Option<String>,

    pub call_id: Option<String>,
    pub report_id: Option<String>,
    pub operator_id: Option<String>,
    pub extension_id: Option<String>,
    pub station_id: Option<String>,
    pub sip_from: Option<String>,
    pub sip_to: Option<String>,

    /// Merge provenance
    pub file_name: String,
    pub file_color: Option<String>,

    /// Display-only forms of `component` / `message`
    pub display_component: String,
    pub display_message: String,
}

impl LogEntry {
    pub fn new(
        id: u64,
        timestamp: i64,
        raw_timestamp: impl Into<String>,
        level: LogLevel,
        component: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            raw_timestamp: raw_timestamp.into(),
            level,
            component: component.into(),
            message: message.into(),
            payload: String::new(),
            entry_type: EntryType::Log,
            is_sip: false,
            sip_method: None,
            call_id: None,
            report_id: None,
            operator_id: None,
            extension_id: None,
            station_id: None,
            sip_from: None,
            sip_to: None,
            file_name: String::new(),
            file_color: None,
            display_component: String::new(),
            display_message: String::new(),
        }
    }

    pub fn with_provenance(mut self, file_name: impl Into<String>, file_color: Option<String>) -> Self {
        self.file_name = file_name.into();
        self.file_color = file_color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_tag() {
        assert_eq!(LogLevel::from_tag("ERROR"), LogLevel::Error);
        assert_eq!(LogLevel::from_tag("error"), LogLevel::Error);
        assert_eq!(LogLevel::from_tag("WARNING"), LogLevel::Warn);
        assert_eq!(LogLevel::from_tag("trace"), LogLevel::Debug);
        assert_eq!(LogLevel::from_tag("NOTICE"), LogLevel::Info);
        assert_eq!(LogLevel::from_tag(""), LogLevel::Info);
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = LogEntry::new(7, 1_000, "raw", LogLevel::Warn, "svc", "hello")
            .with_provenance("a.log", Some("#ff0000".to_string()));
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["rawTimestamp"], "raw");
        assert_eq!(json["level"], "WARN");
        assert_eq!(json["type"], "LOG");
        assert_eq!(json["isSip"], false);
        assert_eq!(json["fileName"], "a.log");
        assert_eq!(json["fileColor"], "#ff0000");
        assert!(json["callId"].is_null());
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::TaggedBracket.as_str(), "tagged_bracket");
        assert_eq!(Dialect::Homer.as_str(), "homer");
        assert_eq!(Dialect::DatadogCsv.as_str(), "datadog_csv");
    }
}
