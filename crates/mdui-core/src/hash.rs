use unicode_normalization::UnicodeNormalization;
use xxhash_rust::xxh3::xxh3_64;

/// Canonicalize text for hashing.
///
/// - CRLF / CR become LF
/// - trailing spaces and tabs are trimmed per line
/// - Unicode is NFC-normalized, so composed and decomposed spellings hash alike
///
/// Leading whitespace is preserved (meaningful in Markdown and code).
pub fn canonicalize_text(input: &str) -> String {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(normalized.len());
    for segment in normalized.split_inclusive('\n') {
        match segment.strip_suffix('\n') {
            Some(line) => {
                out.push_str(line.trim_end_matches([' ', '\t']));
                out.push('\n');
            }
            None => out.push_str(segment.trim_end_matches([' ', '\t'])),
        }
    }

    out.nfc().collect()
}

/// xxh3-64 over UTF-8 bytes as fixed-width 16-char lowercase hex.
pub fn xxh64_hex(input: &str) -> String {
    format!("{:016x}", xxh3_64(input.as_bytes()))
}

/// Content-derived identifier: `<prefix>-<8 hex>`.
///
/// `parts` are canonicalized and joined with a unit separator before hashing,
/// so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn content_id(prefix: &str, parts: &[&str]) -> String {
    let mut payload = String::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            payload.push('\u{1f}');
        }
        payload.push_str(&canonicalize_text(p));
    }
    let hex = xxh64_hex(&payload);
    format!("{prefix}-{}", &hex[..8])
}
