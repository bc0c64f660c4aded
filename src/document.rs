//! Receipt text extraction.
//!
//! Uploaded receipts arrive as raw bytes. Plain-text receipts are decoded
//! as UTF-8. For PDFs, the literal strings passed to the `Tj`/`TJ` text
//! operators are collected from uncompressed content streams. Compressed
//! streams are not inflated, so such PDFs yield little or no text and the
//! parser falls back to its default data.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Empty document")]
    Empty,

    #[error("Unsupported document type: {0}")]
    Unsupported(String),
}

/// Detected document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Sniff the format from magic bytes, then content type and file name.
    pub fn detect(bytes: &[u8], content_type: Option<&str>, file_name: Option<&str>) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(DocumentKind::Pdf);
        }

        let content_type = content_type.unwrap_or_default().to_lowercase();
        let file_name = file_name.unwrap_or_default().to_lowercase();

        if content_type == "application/pdf" || file_name.ends_with(".pdf") {
            return Some(DocumentKind::Pdf);
        }

        if content_type.starts_with("text/")
            || content_type == "application/json"
            || file_name.ends_with(".txt")
            || std::str::from_utf8(bytes).is_ok()
        {
            return Some(DocumentKind::Text);
        }

        None
    }
}

fn text_operator_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    // ( ... ) Tj   or   [ ( ... ) -250 ( ... ) ] TJ
    RE.get_or_init(|| {
        Regex::new(r"(?s)(\((?:[^()\\]|\\.)*\)\s*Tj)|(\[(?:[^\]\\]|\\.)*\]\s*TJ)").ok()
    })
    .as_ref()
}

fn literal_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(((?:[^()\\]|\\.)*)\)").ok())
        .as_ref()
}

/// Undo PDF literal-string escapes.
fn unescape_pdf_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') | Some('f') => {}
            Some(d @ '0'..='7') => {
                let mut code = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            code = code * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if let Some(ch) = char::from_u32(code) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

/// Collect text shown by PDF text operators, one line per operator.
pub fn pdf_text(bytes: &[u8]) -> String {
    let (Some(operators), Some(literals)) = (text_operator_regex(), literal_regex()) else {
        return String::new();
    };

    let source = String::from_utf8_lossy(bytes);
    let mut lines = Vec::new();

    for op in operators.find_iter(&source) {
        let line: String = literals
            .captures_iter(op.as_str())
            .filter_map(|c| c.get(1))
            .map(|m| unescape_pdf_literal(m.as_str()))
            .collect();
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    lines.join("\n")
}

/// Best-effort text for an uploaded receipt.
pub fn receipt_text(
    bytes: &[u8],
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<String, DocumentError> {
    if bytes.is_empty() {
        return Err(DocumentError::Empty);
    }

    match DocumentKind::detect(bytes, content_type, file_name) {
        Some(DocumentKind::Pdf) => Ok(pdf_text(bytes)),
        Some(DocumentKind::Text) => Ok(String::from_utf8_lossy(bytes).trim().to_string()),
        None => Err(DocumentError::Unsupported(
            content_type.unwrap_or("application/octet-stream").to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PDF: &[u8] = b"%PDF-1.3\n1 0 obj\n<< /Length 120 >>\nstream\nBT /F1 12 Tf 10 800 Td (Material Vendor:) Tj ET\nBT 10 780 Td (Premium Hoodies Co.) Tj ET\nBT 10 760 Td [(Order: 100 @ \\$25.00) -250 ( each)] TJ ET\nendstream\nendobj\n%%EOF";

    #[test]
    fn test_detect_kind() {
        assert_eq!(
            DocumentKind::detect(b"%PDF-1.4", None, None),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::detect(&[0xff, 0xfe], Some("application/pdf"), None),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::detect(b"Total: $39.25", Some("text/plain"), Some("r.txt")),
            Some(DocumentKind::Text)
        );
        assert_eq!(
            DocumentKind::detect(&[0xff, 0xfe, 0x00], Some("image/png"), Some("r.png")),
            None
        );
    }

    #[test]
    fn test_pdf_text_operators() {
        let text = pdf_text(SAMPLE_PDF);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Material Vendor:",
                "Premium Hoodies Co.",
                "Order: 100 @ $25.00 each"
            ]
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_pdf_literal(r"a\(b\)c"), "a(b)c");
        assert_eq!(unescape_pdf_literal(r"line\nnext"), "line\nnext");
        assert_eq!(unescape_pdf_literal(r"\101\102"), "AB");
        assert_eq!(unescape_pdf_literal(r"back\\slash"), "back\\slash");
    }

    #[test]
    fn test_receipt_text_plain() {
        let text = receipt_text(b"  QuickShip Logistics $5.75\n", Some("text/plain"), None).unwrap();
        assert_eq!(text, "QuickShip Logistics $5.75");
    }

    #[test]
    fn test_receipt_text_errors() {
        assert!(matches!(receipt_text(b"", None, None), Err(DocumentError::Empty)));
        assert!(matches!(
            receipt_text(&[0xff, 0x00, 0xfe], Some("image/jpeg"), Some("r.jpg")),
            Err(DocumentError::Unsupported(_))
        ));
    }

    #[test]
    fn test_compressed_pdf_yields_no_text() {
        let text = pdf_text(b"%PDF-1.3\nstream\nx\x9c\x01\x02\x03\nendstream");
        assert!(text.is_empty());
    }
}
