//! Content type determination

use super::metadata::{self, Metadata};

pub const PLAIN_TEXT: &str = "text/plain";
pub const HTML: &str = "text/html";
pub const MARKDOWN: &str = "text/markdown";
pub const JSON: &str = "application/json";
pub const XML: &str = "application/xml";
pub const OCTET_STREAM: &str = "application/octet-stream";

const SNIFF_LEN: usize = 1024;

/// Lower-cased type without parameters (`text/html; charset=x` -> `text/html`)
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Guess from the reference's extension, ignoring query and fragment
pub fn from_reference(reference: &str) -> Option<String> {
    let path = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);

    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Guess from the leading bytes of the content
pub fn sniff(bytes: &[u8]) -> &'static str {
    let sample = &bytes[..bytes.len().min(SNIFF_LEN)];
    let text = match std::str::from_utf8(sample) {
        Ok(text) => text,
        // A multi-byte character may straddle the sample boundary
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&sample[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return OCTET_STREAM,
    };

    if text.contains('\0') {
        return OCTET_STREAM;
    }

    let head = text.trim_start();
    let lower = head.to_ascii_lowercase();

    if (head.starts_with('{') || head.starts_with('['))
        && serde_json::from_slice::<serde_json::Value>(bytes).is_ok()
    {
        return JSON;
    }
    if lower.starts_with("<!doctype html") || lower.starts_with("<html") || lower.contains("<body")
    {
        return HTML;
    }
    if lower.starts_with("<?xml") {
        return XML;
    }
    if head.starts_with("# ") {
        return MARKDOWN;
    }

    PLAIN_TEXT
}

/// Content type from metadata, then reference, then content
pub fn detect(reference: &str, metadata: &Metadata, bytes: &[u8]) -> String {
    if let Some(declared) = metadata.get_first(metadata::CONTENT_TYPE) {
        let declared = essence(declared);
        if !declared.is_empty() {
            return declared;
        }
    }

    from_reference(reference).unwrap_or_else(|| sniff(bytes).to_string())
}
