use std::path::Path;

use super::formats::homer;
use super::model::Dialect;

/// Pick the dialect for a file from its name and a bounded prefix of its bytes.
///
/// Order matters: a `.csv` extension wins outright, then a Homer capture
/// header on the first non-empty line; everything else is tagged-bracket.
pub fn detect_dialect(prefix: &[u8], file_name: &str) -> Dialect {
    let dialect = if has_csv_extension(file_name) {
        Dialect::DatadogCsv
    } else if first_non_empty_line(prefix).is_some_and(|(line, complete)| {
        if complete {
            homer::is_header(&line)
        } else {
            homer::is_header_start(&line)
        }
    }) {
        Dialect::Homer
    } else {
        Dialect::TaggedBracket
    };

    tracing::debug!(
        file = %file_name,
        prefix_bytes = prefix.len(),
        dialect = dialect.as_str(),
        "dialect detected"
    );
    dialect
}

fn has_csv_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// First line with content, decoded lossily, and whether its newline was seen.
/// A line without one may have been cut by the prefix bound.
fn first_non_empty_line(prefix: &[u8]) -> Option<(String, bool)> {
    let mut rest = prefix;
    loop {
        let (line, complete) = match rest.iter().position(|b| *b == b'\n') {
            Some(end) => (&rest[..end], true),
            None => (rest, false),
        };
        let text = String::from_utf8_lossy(line).trim().to_string();
        if !text.is_empty() {
            return Some((text, complete));
        }
        if !complete {
            return None;
        }
        rest = &rest[line.len() + 1..];
    }
}
