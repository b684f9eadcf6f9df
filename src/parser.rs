use tracing::warn;

use crate::store::Record;

/// Header name reinterpreted as the per-record selection flag.
pub const RESERVED_SELECTED: &str = "selected";

const DELIMITER: char = ',';
const QUOTE: char = '"';
const BOM: char = '\u{feff}';

/// Header row and records produced from one file's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl ParsedTable {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// Parse delimited text into a header row and positional records.
///
/// Quoted fields may carry the delimiter and line breaks. Rows shorter than the
/// header are padded with empty values, longer rows are truncated.
pub fn parse(text: &str) -> ParsedTable {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    let mut lines = logical_lines(text).into_iter();

    let Some(header_line) = lines.next() else {
        return ParsedTable::default();
    };
    let headers: Vec<String> = tokenize(header_line)
        .into_iter()
        .filter(|name| name != RESERVED_SELECTED)
        .collect();

    let rows = lines
        .map(|line| {
            let mut values = tokenize(line).into_iter();
            let mut record = Record::default();
            for header in &headers {
                record.set(header, values.next().unwrap_or_default());
            }
            record
        })
        .collect();

    ParsedTable { headers, rows }
}

/// Split text into non-blank logical lines; a line break inside quotes does not end a line.
///
/// A quote still open at the end of the input is treated as a stray mark: the
/// span from the line that opened it is split on physical line breaks instead.
fn logical_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut in_quotes = false;
    let mut start = 0usize;

    for (idx, ch) in text.char_indices() {
        match ch {
            QUOTE => in_quotes = !in_quotes,
            '\n' if !in_quotes => {
                let line = &text[start..idx];
                push_line(&mut lines, line.strip_suffix('\r').unwrap_or(line));
                start = idx + 1;
            }
            _ => {}
        }
    }
    let tail = &text[start..];
    if in_quotes {
        warn!(
            logical_line = lines.len() + 1,
            "unterminated quote; splitting the rest of the input on line breaks"
        );
        for line in tail.split('\n') {
            push_line(&mut lines, line.strip_suffix('\r').unwrap_or(line));
        }
    } else {
        push_line(&mut lines, tail.strip_suffix('\r').unwrap_or(tail));
    }
    lines
}

fn push_line<'a>(lines: &mut Vec<&'a str>, line: &'a str) {
    if !line.trim().is_empty() {
        lines.push(line);
    }
}

/// Single-pass, quote-aware field scan of one logical line.
fn tokenize(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}
