//! Reading and writing metadata files exchanged with external processes

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::metadata::Metadata;
use crate::domain::process::MetadataFormat;
use crate::domain::ImporterError;

fn separator(format: MetadataFormat) -> char {
    match format {
        MetadataFormat::Colon => ':',
        _ => '=',
    }
}

fn escape(text: &str, separator: Option<char>) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c if Some(c) == separator => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}

/// Byte index of the first separator not preceded by a backslash escape
fn split_index(line: &str, separator: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            return Some(i);
        }
    }
    None
}

/// Serialize metadata; multi-valued fields become repeated keys
pub fn write_metadata(metadata: &Metadata, format: MetadataFormat) -> Result<String, ImporterError> {
    if format == MetadataFormat::Json {
        let object: Map<String, Value> = metadata
            .iter()
            .map(|(name, values)| (name.to_string(), Value::from(values.to_vec())))
            .collect();
        return serde_json::to_string_pretty(&Value::Object(object))
            .map_err(|e| ImporterError::io(format!("Cannot write metadata: {}", e)));
    }

    let sep = separator(format);
    let mut out = String::new();
    for (name, values) in metadata.iter() {
        let key = escape(name, Some(sep));
        for value in values {
            out.push_str(&key);
            out.push(sep);
            out.push_str(&escape(value, None));
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parse metadata written by a process
///
/// Line formats skip blank lines, `#` comments and lines without a
/// separator. JSON values may be strings, scalars or arrays of them.
pub fn read_metadata(text: &str, format: MetadataFormat) -> Result<Metadata, ImporterError> {
    if format == MetadataFormat::Json {
        return read_json(text);
    }

    let sep = separator(format);
    let mut metadata = Metadata::new();

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some(index) = split_index(trimmed, sep) else {
            debug!(line = %trimmed, "Ignoring metadata line without separator");
            continue;
        };

        let key = unescape(trimmed[..index].trim());
        if key.is_empty() {
            continue;
        }
        metadata.add(key, unescape(&trimmed[index + sep.len_utf8()..]));
    }

    Ok(metadata)
}

fn read_json(text: &str) -> Result<Metadata, ImporterError> {
    if text.trim().is_empty() {
        return Ok(Metadata::new());
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|e| ImporterError::io(format!("Invalid metadata JSON: {}", e)))?;
    let Value::Object(object) = value else {
        return Err(ImporterError::io("Metadata JSON must be an object"));
    };

    let mut metadata = Metadata::new();
    for (key, value) in object {
        match value {
            Value::Array(items) => {
                metadata.add_all(key.clone(), items.iter().filter_map(scalar_text));
            }
            other => {
                if let Some(text) = scalar_text(&other) {
                    metadata.add(key, text);
                }
            }
        }
    }
    Ok(metadata)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
